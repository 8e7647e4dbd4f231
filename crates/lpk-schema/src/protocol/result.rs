use serde::{Deserialize, Serialize};
use std::fmt;

use super::keys;
use super::{ExtraValue, ProtocolError, ResultCode, TransportMessage, UnitResponse};

/// Discriminant of a unit result, as written under `resultType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultType {
    Success,
    Abort,
    Error,
    TimeUp,
    TimeoutInactivity,
}

impl ResultType {
    pub const ALL: [Self; 5] = [
        Self::Success,
        Self::Abort,
        Self::Error,
        Self::TimeUp,
        Self::TimeoutInactivity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Abort => "Abort",
            Self::Error => "Error",
            Self::TimeUp => "TimeUp",
            Self::TimeoutInactivity => "TimeoutInactivity",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a unit run ended. Only `Success` has a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UnitOutcome {
    Success { score: f32 },
    Abort,
    Error { details: String },
    TimeUp,
    TimeoutInactivity,
}

impl UnitOutcome {
    pub fn result_type(&self) -> ResultType {
        match self {
            Self::Success { .. } => ResultType::Success,
            Self::Abort => ResultType::Abort,
            Self::Error { .. } => ResultType::Error,
            Self::TimeUp => ResultType::TimeUp,
            Self::TimeoutInactivity => ResultType::TimeoutInactivity,
        }
    }
}

/// Per-question detail a unit may attach to its result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_in_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_first_action_in_ms: Option<u64>,
}

/// Decoded result of a unit run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchResult {
    pub outcome: UnitOutcome,
    pub foreground_duration_ms: u64,
    pub additional_data: Option<String>,
    /// `None` when the unit sent no item list; `Some(vec![])` for an empty one.
    pub items: Option<Vec<ResultItem>>,
}

impl LaunchResult {
    pub fn new(outcome: UnitOutcome, foreground_duration_ms: u64) -> Self {
        Self {
            outcome,
            foreground_duration_ms,
            additional_data: None,
            items: None,
        }
    }

    pub fn result_type(&self) -> ResultType {
        self.outcome.result_type()
    }

    /// Score of a successful run; other outcomes have none.
    pub fn score(&self) -> Option<f32> {
        match self.outcome {
            UnitOutcome::Success { score } => Some(score),
            _ => None,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ProtocolError {
    ProtocolError::InvalidField {
        field,
        reason: reason.into(),
    }
}

/// Build the response a unit returns for `result`.
///
/// # Errors
///
/// Fails if the duration does not fit in a long or the item list cannot be
/// serialized.
pub fn encode_result(result: &LaunchResult) -> Result<UnitResponse, ProtocolError> {
    let mut msg = TransportMessage::new();
    let duration = i64::try_from(result.foreground_duration_ms)
        .map_err(|_| invalid(keys::FOREGROUND_DURATION, "does not fit in a long"))?;

    msg.put_string(keys::RESULT_TYPE, result.result_type().as_str())
        .put(keys::FOREGROUND_DURATION, ExtraValue::Long(duration));

    match &result.outcome {
        UnitOutcome::Success { score } => {
            msg.put(keys::SCORE, ExtraValue::Float(*score));
        }
        UnitOutcome::Error { details } => {
            msg.put_string(keys::ERROR_DETAILS, details);
        }
        _ => {}
    }

    if let Some(data) = &result.additional_data {
        msg.put_string(keys::ADDITIONAL_DATA, data);
    }
    if let Some(items) = &result.items {
        let json = serde_json::to_string(items).map_err(|e| invalid(keys::ITEMS, e.to_string()))?;
        msg.put_string(keys::ITEMS, json);
    }

    Ok(UnitResponse {
        code: ResultCode::OK,
        data: Some(msg),
    })
}

/// Decode the response a unit returned.
///
/// Transport failures (non-OK status, missing message) are reported before
/// the payload is inspected. Every field the selected variant needs is
/// validated here.
///
/// # Errors
///
/// See [`ProtocolError`]; use [`ProtocolError::kind`] to tell a unit that
/// never answered from one that answered with bad data.
pub fn decode_result(response: &UnitResponse) -> Result<LaunchResult, ProtocolError> {
    if !response.code.is_ok() {
        return Err(ProtocolError::NotOk(response.code.0));
    }
    let msg = response.data.as_ref().ok_or(ProtocolError::MissingPayload)?;

    let raw_type = msg.require_string(keys::RESULT_TYPE)?;
    let result_type = ResultType::parse(raw_type)
        .ok_or_else(|| ProtocolError::UnknownResultType(raw_type.to_string()))?;

    let foreground_duration_ms = msg
        .duration(keys::FOREGROUND_DURATION)?
        .ok_or(ProtocolError::MissingField(keys::FOREGROUND_DURATION))?;

    let outcome = match result_type {
        ResultType::Success => {
            let score = msg
                .float(keys::SCORE)?
                .ok_or(ProtocolError::MissingField(keys::SCORE))?;
            if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                return Err(invalid(keys::SCORE, format!("{score} is outside 0.0..=1.0")));
            }
            UnitOutcome::Success { score }
        }
        ResultType::Error => UnitOutcome::Error {
            details: msg.require_string(keys::ERROR_DETAILS)?.to_string(),
        },
        ResultType::Abort => UnitOutcome::Abort,
        ResultType::TimeUp => UnitOutcome::TimeUp,
        ResultType::TimeoutInactivity => UnitOutcome::TimeoutInactivity,
    };

    let items = msg
        .string(keys::ITEMS)?
        .map(|json| serde_json::from_str::<Vec<ResultItem>>(json))
        .transpose()
        .map_err(|e| invalid(keys::ITEMS, e.to_string()))?;

    Ok(LaunchResult {
        outcome,
        foreground_duration_ms,
        additional_data: msg.string(keys::ADDITIONAL_DATA)?.map(str::to_string),
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ProtocolErrorKind;

    fn all_variants() -> Vec<LaunchResult> {
        let item = ResultItem {
            id: Some("q1".to_string()),
            question: Some("1 + 1".to_string()),
            given_answer: Some("2".to_string()),
            correct_answer: Some("2".to_string()),
            score: Some(1.0),
            duration_in_ms: Some(1200),
            time_to_first_action_in_ms: Some(300),
        };

        vec![
            LaunchResult {
                outcome: UnitOutcome::Success { score: 0.75 },
                foreground_duration_ms: 5000,
                additional_data: Some(r#"{"unitRating":"GOOD"}"#.to_string()),
                items: Some(vec![item]),
            },
            LaunchResult::new(UnitOutcome::Abort, 10),
            LaunchResult {
                outcome: UnitOutcome::Error {
                    details: "crashed".to_string(),
                },
                foreground_duration_ms: 0,
                additional_data: None,
                items: Some(Vec::new()),
            },
            LaunchResult::new(UnitOutcome::TimeUp, 60_000),
            LaunchResult::new(UnitOutcome::TimeoutInactivity, 30_000),
        ]
    }

    #[test]
    fn test_every_variant_survives_the_wire() {
        for result in all_variants() {
            let response = encode_result(&result).unwrap();
            assert_eq!(decode_result(&response).unwrap(), result);
        }
    }

    #[test]
    fn test_success_without_score_is_payload_error() {
        let mut response = encode_result(&all_variants()[0]).unwrap();
        if let Some(msg) = response.data.as_mut() {
            msg.extras.remove(keys::SCORE);
        }

        let err = decode_result(&response).unwrap_err();
        assert_eq!(err, ProtocolError::MissingField(keys::SCORE));
        assert_eq!(err.kind(), ProtocolErrorKind::Payload);
    }

    #[test]
    fn test_score_out_of_range() {
        let result = LaunchResult::new(UnitOutcome::Success { score: 1.5 }, 1);
        let response = encode_result(&result).unwrap();
        assert!(matches!(
            decode_result(&response),
            Err(ProtocolError::InvalidField { field: "score", .. })
        ));
    }

    #[test]
    fn test_transport_failures() {
        let cancelled = UnitResponse {
            code: ResultCode::CANCELED,
            data: None,
        };
        let err = decode_result(&cancelled).unwrap_err();
        assert_eq!(err.to_string(), "Unexpected result code: 0");
        assert_eq!(err.kind(), ProtocolErrorKind::Transport);

        let empty = UnitResponse {
            code: ResultCode::OK,
            data: None,
        };
        let err = decode_result(&empty).unwrap_err();
        assert_eq!(err.to_string(), "Result intent was null.");
        assert_eq!(err.kind(), ProtocolErrorKind::Transport);
    }

    #[test]
    fn test_unknown_and_missing_discriminant() {
        let mut msg = TransportMessage::new();
        msg.put("foregroundDurationInMs", ExtraValue::Long(1));
        let mut response = UnitResponse {
            code: ResultCode::OK,
            data: Some(msg.clone()),
        };
        assert_eq!(
            decode_result(&response),
            Err(ProtocolError::MissingField(keys::RESULT_TYPE))
        );

        msg.put_string(keys::RESULT_TYPE, "Finished");
        response.data = Some(msg);
        assert_eq!(
            decode_result(&response),
            Err(ProtocolError::UnknownResultType("Finished".to_string()))
        );
    }

    #[test]
    fn test_abort_exposes_no_score() {
        let result = LaunchResult::new(UnitOutcome::Abort, 1);
        assert_eq!(result.score(), None);
    }

    #[test]
    fn test_malformed_items() {
        let mut response = encode_result(&LaunchResult::new(UnitOutcome::Abort, 1)).unwrap();
        if let Some(msg) = response.data.as_mut() {
            msg.put_string(keys::ITEMS, "not json");
        }
        assert!(matches!(
            decode_result(&response),
            Err(ProtocolError::InvalidField { field: "items", .. })
        ));
    }
}
