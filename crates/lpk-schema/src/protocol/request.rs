use serde::{Deserialize, Serialize};

use super::keys;
use super::{ComponentName, ProtocolError, TransportMessage};
use crate::UnitId;

/// Parameters of a single unit launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    pub unit_id: UnitId,
    pub run_id: String,
    pub learner_id: String,
    pub school_id: String,
    pub stage: String,
    pub remaining_foreground_time_ms: Option<u64>,
    pub inactivity_timeout_ms: Option<u64>,
    /// Base address under which the unit may request its assets.
    pub assets_base_uri: Option<String>,
}

fn as_long(field: &'static str, value: Option<u64>) -> Result<Option<i64>, ProtocolError> {
    value
        .map(|v| {
            i64::try_from(v).map_err(|_| ProtocolError::InvalidField {
                field,
                reason: format!("{v} does not fit in a long"),
            })
        })
        .transpose()
}

/// Build the message that launches `request` on `target`.
///
/// Optional durations are written as explicit nulls; the asset base is
/// omitted when absent.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidField`] if a duration exceeds `i64::MAX`.
pub fn encode_request(
    request: &LaunchRequest,
    target: ComponentName,
    action: &str,
) -> Result<TransportMessage, ProtocolError> {
    let mut msg = TransportMessage {
        action: Some(action.to_string()),
        component: Some(target),
        ..TransportMessage::default()
    };

    msg.put_string(keys::LEARNING_UNIT_ID, request.unit_id.as_str())
        .put_string(keys::LEARNING_UNIT_RUN_ID, &request.run_id)
        .put_string(keys::LEARNER_ID, &request.learner_id)
        .put_string(keys::SCHOOL_ID, &request.school_id)
        .put_string(keys::STAGE, &request.stage)
        .put_nullable_long(
            keys::REMAINING_FOREGROUND_TIME,
            as_long(
                keys::REMAINING_FOREGROUND_TIME,
                request.remaining_foreground_time_ms,
            )?,
        )
        .put_nullable_long(
            keys::INACTIVITY_TIMEOUT,
            as_long(keys::INACTIVITY_TIMEOUT, request.inactivity_timeout_ms)?,
        );

    if let Some(uri) = &request.assets_base_uri {
        msg.put_string(keys::ASSETS_BASE_URI, uri);
    }

    Ok(msg)
}

/// Read a launch request on the unit side.
///
/// # Errors
///
/// Fails when a required string is missing, any extra has the wrong type, or
/// a duration is negative.
pub fn decode_request(msg: &TransportMessage) -> Result<LaunchRequest, ProtocolError> {
    Ok(LaunchRequest {
        unit_id: UnitId::new(msg.require_string(keys::LEARNING_UNIT_ID)?),
        run_id: msg.require_string(keys::LEARNING_UNIT_RUN_ID)?.to_string(),
        learner_id: msg.require_string(keys::LEARNER_ID)?.to_string(),
        school_id: msg.require_string(keys::SCHOOL_ID)?.to_string(),
        stage: msg.require_string(keys::STAGE)?.to_string(),
        remaining_foreground_time_ms: msg.duration(keys::REMAINING_FOREGROUND_TIME)?,
        inactivity_timeout_ms: msg.duration(keys::INACTIVITY_TIMEOUT)?,
        assets_base_uri: msg.string(keys::ASSETS_BASE_URI)?.map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ExtraValue;

    fn request() -> LaunchRequest {
        LaunchRequest {
            unit_id: UnitId::new("u1"),
            run_id: "run".to_string(),
            learner_id: "learner".to_string(),
            school_id: "school".to_string(),
            stage: "test".to_string(),
            remaining_foreground_time_ms: Some(60_000),
            inactivity_timeout_ms: None,
            assets_base_uri: Some("content://assets/com.example.unit?unit=u1".to_string()),
        }
    }

    fn target() -> ComponentName {
        ComponentName {
            package: "com.example.unit".to_string(),
            class: "com.example.unit.MainActivity".to_string(),
        }
    }

    #[test]
    fn test_request_wire_shape() {
        let msg = encode_request(&request(), target(), "LAUNCH").unwrap();

        assert_eq!(msg.action.as_deref(), Some("LAUNCH"));
        assert_eq!(msg.component, Some(target()));
        assert_eq!(
            msg.get(keys::LEARNING_UNIT_ID),
            Some(&ExtraValue::String("u1".to_string()))
        );
        assert_eq!(
            msg.get(keys::REMAINING_FOREGROUND_TIME),
            Some(&ExtraValue::Long(60_000))
        );
        assert_eq!(msg.get(keys::INACTIVITY_TIMEOUT), Some(&ExtraValue::Null));
    }

    #[test]
    fn test_unit_reads_what_host_sends() {
        let msg = encode_request(&request(), target(), "LAUNCH").unwrap();
        assert_eq!(decode_request(&msg).unwrap(), request());
    }

    #[test]
    fn test_asset_base_omitted_when_absent() {
        let mut req = request();
        req.assets_base_uri = None;
        let msg = encode_request(&req, target(), "LAUNCH").unwrap();
        assert!(msg.get(keys::ASSETS_BASE_URI).is_none());
    }

    #[test]
    fn test_decode_request_missing_learner() {
        let mut msg = encode_request(&request(), target(), "LAUNCH").unwrap();
        msg.extras.remove(keys::LEARNER_ID);
        assert_eq!(
            decode_request(&msg),
            Err(ProtocolError::MissingField(keys::LEARNER_ID))
        );
    }

    #[test]
    fn test_decode_request_negative_timeout() {
        let mut msg = encode_request(&request(), target(), "LAUNCH").unwrap();
        msg.put(keys::INACTIVITY_TIMEOUT, ExtraValue::Long(-1));
        assert!(matches!(
            decode_request(&msg),
            Err(ProtocolError::InvalidField { .. })
        ));
    }
}
