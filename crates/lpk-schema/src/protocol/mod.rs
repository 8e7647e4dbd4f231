//! Launch protocol between the host and a launched learning unit.
//!
//! The host sends a [`TransportMessage`] addressed to the unit's launch
//! activity. The unit answers with a [`UnitResponse`]: a status code plus an
//! optional message whose `resultType` extra selects one of five outcomes.
//!
//! Both halves of the exchange live here so the host and a unit simulator
//! agree on keys and types:
//!
//! | side | encode                | decode                |
//! |------|-----------------------|-----------------------|
//! | host | [`encode_request`]    | [`decode_result`]     |
//! | unit | [`encode_result`]     | [`decode_request`]    |

mod message;
mod request;
mod result;

pub use message::{ComponentName, ExtraValue, ResultCode, TransportMessage, UnitResponse};
pub use request::{LaunchRequest, decode_request, encode_request};
pub use result::{LaunchResult, ResultItem, ResultType, UnitOutcome, decode_result, encode_result};

/// Extra keys used on the wire.
pub mod keys {
    pub const LEARNING_UNIT_ID: &str = "learningUnitId";
    pub const LEARNING_UNIT_RUN_ID: &str = "learningUnitRunId";
    pub const LEARNER_ID: &str = "learnerId";
    pub const SCHOOL_ID: &str = "schoolId";
    pub const STAGE: &str = "stage";
    pub const REMAINING_FOREGROUND_TIME: &str = "remainingForegroundTimeInMs";
    pub const INACTIVITY_TIMEOUT: &str = "inactivityTimeoutInMs";
    pub const ASSETS_BASE_URI: &str = "assetsBaseUri";

    pub const RESULT_TYPE: &str = "resultType";
    pub const SCORE: &str = "score";
    pub const FOREGROUND_DURATION: &str = "foregroundDurationInMs";
    pub const ADDITIONAL_DATA: &str = "additionalData";
    pub const ERROR_DETAILS: &str = "errorDetails";
    pub const ITEMS: &str = "items";
}

/// Broad classification of a [`ProtocolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolErrorKind {
    /// The unit did not deliver a result at all (crash, cancel, no payload).
    Transport,
    /// A payload arrived but it is not a valid result.
    Payload,
}

/// Errors raised while decoding either half of the launch protocol.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Unexpected result code: {0}")]
    NotOk(i32),

    #[error("Result intent was null.")]
    MissingPayload,

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' has the wrong type (expected {expected}, found {found})")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("field '{field}' is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("unknown result type '{0}'")]
    UnknownResultType(String),
}

impl ProtocolError {
    /// Whether the unit failed to answer, or answered with bad data.
    pub fn kind(&self) -> ProtocolErrorKind {
        match self {
            Self::NotOk(_) | Self::MissingPayload => ProtocolErrorKind::Transport,
            _ => ProtocolErrorKind::Payload,
        }
    }
}
