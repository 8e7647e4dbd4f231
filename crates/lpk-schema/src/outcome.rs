//! Discriminated result used at every pipeline boundary.

use serde::{Deserialize, Serialize};

/// State of an operation as seen by a caller that must never receive a panic.
///
/// `NotFound` is a regular, non-error outcome (for example a package without
/// a unit catalog), and must not be folded into `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "camelCase")]
pub enum Outcome<T> {
    /// The operation has not completed yet.
    Loading,
    /// The operation produced a value.
    Success(T),
    /// The requested thing legitimately does not exist.
    NotFound,
    /// The operation failed; the reason is meant for humans.
    Error(String),
}

impl<T> Outcome<T> {
    /// Build an `Error` outcome from anything displayable.
    pub fn error(reason: impl std::fmt::Display) -> Self {
        Self::Error(reason.to_string())
    }

    /// Whether this is `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Borrow the success value, if any.
    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Consume the outcome and return the success value, if any.
    pub fn into_success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// The failure reason, if this is `Error`.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Error(reason) => Some(reason),
            _ => None,
        }
    }

    /// Map the success value, leaving the other states untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Loading => Outcome::Loading,
            Self::Success(value) => Outcome::Success(f(value)),
            Self::NotFound => Outcome::NotFound,
            Self::Error(reason) => Outcome::Error(reason),
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Outcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) => Self::Error(e.to_string()),
        }
    }
}

impl<T> Outcome<T> {
    /// Collapse a fallible lookup: `Ok(None)` becomes `NotFound`.
    pub fn from_lookup<E: std::fmt::Display>(result: Result<Option<T>, E>) -> Self {
        match result {
            Ok(Some(value)) => Self::Success(value),
            Ok(None) => Self::NotFound,
            Err(e) => Self::Error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result() {
        let ok: Outcome<u32> = Ok::<_, String>(3).into();
        assert_eq!(ok, Outcome::Success(3));

        let err: Outcome<u32> = Err::<u32, _>("boom").into();
        assert_eq!(err.reason(), Some("boom"));
    }

    #[test]
    fn test_map_keeps_not_found() {
        let nf: Outcome<u32> = Outcome::NotFound;
        assert_eq!(nf.map(|v| v + 1), Outcome::NotFound);
    }

    #[test]
    fn test_from_lookup() {
        assert_eq!(Outcome::from_lookup(Ok::<_, String>(None::<u8>)), Outcome::NotFound);
        assert_eq!(Outcome::from_lookup(Ok::<_, String>(Some(1))), Outcome::Success(1));
    }
}
