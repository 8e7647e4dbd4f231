use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ProtocolError;

/// A primitive-typed value carried in a [`TransportMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ExtraValue {
    String(String),
    Long(i64),
    Float(f32),
    Null,
}

impl ExtraValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Null => "null",
        }
    }
}

/// Explicit target of a launch: the unit app package and its activity class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentName {
    pub package: String,
    pub class: String,
}

/// A message exchanged with a launched unit: an action, an optional explicit
/// component, and a map of typed extras.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentName>,
    #[serde(default)]
    pub extras: BTreeMap<String, ExtraValue>,
}

impl TransportMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &str, value: ExtraValue) -> &mut Self {
        self.extras.insert(key.to_string(), value);
        self
    }

    pub fn put_string(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.put(key, ExtraValue::String(value.into()))
    }

    /// Store an optional long; `None` is written as an explicit null.
    pub fn put_nullable_long(&mut self, key: &str, value: Option<i64>) -> &mut Self {
        self.put(key, value.map_or(ExtraValue::Null, ExtraValue::Long))
    }

    pub fn get(&self, key: &str) -> Option<&ExtraValue> {
        self.extras.get(key)
    }

    /// A string extra; absent or null yields `None`.
    pub(crate) fn string(&self, key: &'static str) -> Result<Option<&str>, ProtocolError> {
        match self.get(key) {
            None | Some(ExtraValue::Null) => Ok(None),
            Some(ExtraValue::String(s)) => Ok(Some(s)),
            Some(other) => Err(wrong_type(key, "string", other)),
        }
    }

    pub(crate) fn require_string(&self, key: &'static str) -> Result<&str, ProtocolError> {
        self.string(key)?.ok_or(ProtocolError::MissingField(key))
    }

    pub(crate) fn long(&self, key: &'static str) -> Result<Option<i64>, ProtocolError> {
        match self.get(key) {
            None | Some(ExtraValue::Null) => Ok(None),
            Some(ExtraValue::Long(v)) => Ok(Some(*v)),
            Some(other) => Err(wrong_type(key, "long", other)),
        }
    }

    /// A non-negative long, as used for every duration on the wire.
    pub(crate) fn duration(&self, key: &'static str) -> Result<Option<u64>, ProtocolError> {
        self.long(key)?
            .map(|v| {
                u64::try_from(v).map_err(|_| ProtocolError::InvalidField {
                    field: key,
                    reason: format!("{v} is negative"),
                })
            })
            .transpose()
    }

    pub(crate) fn float(&self, key: &'static str) -> Result<Option<f32>, ProtocolError> {
        match self.get(key) {
            None | Some(ExtraValue::Null) => Ok(None),
            Some(ExtraValue::Float(v)) => Ok(Some(*v)),
            Some(other) => Err(wrong_type(key, "float", other)),
        }
    }
}

fn wrong_type(field: &'static str, expected: &'static str, found: &ExtraValue) -> ProtocolError {
    ProtocolError::WrongType {
        field,
        expected,
        found: found.type_name(),
    }
}

/// Status code returned by a unit alongside its result message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultCode(pub i32);

impl ResultCode {
    pub const OK: Self = Self(-1);
    pub const CANCELED: Self = Self(0);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

/// What a launched unit hands back to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitResponse {
    pub code: ResultCode,
    #[serde(default)]
    pub data: Option<TransportMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let mut msg = TransportMessage::new();
        msg.put_string("s", "x")
            .put_nullable_long("n", None)
            .put("l", ExtraValue::Long(-4));

        assert_eq!(msg.string("s").unwrap(), Some("x"));
        assert_eq!(msg.long("n").unwrap(), None);
        assert_eq!(msg.long("absent").unwrap(), None);
        assert!(matches!(
            msg.float("s"),
            Err(ProtocolError::WrongType { field: "s", .. })
        ));
        assert!(matches!(
            msg.duration("l"),
            Err(ProtocolError::InvalidField { field: "l", .. })
        ));
    }

    #[test]
    fn test_extra_value_json_shape() {
        let json = serde_json::to_string(&ExtraValue::Long(5)).unwrap();
        assert_eq!(json, r#"{"type":"long","value":5}"#);
        let null: ExtraValue = serde_json::from_str(r#"{"type":"null"}"#).unwrap();
        assert_eq!(null, ExtraValue::Null);
    }
}
