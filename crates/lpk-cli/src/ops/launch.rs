//! Launching units and reading their results.
//!
//! The host builds a [`TransportMessage`] addressed to the app's launch
//! activity; the unit answers with a [`UnitResponse`]. [`respond`] plays the
//! unit's side so the exchange can be exercised without a device.

use lpk_schema::protocol::{
    ProtocolErrorKind, decode_request, decode_result, encode_request, encode_result,
};
use lpk_schema::{
    ComponentName, LaunchRequest, LaunchResult, LearningApp, LearningUnit, Outcome, PackageId,
    ProtocolError, TransportMessage, UnitId, UnitResponse,
};
use serde::Serialize;

use crate::ops::{Context, LaunchError};

/// Per-launch overrides of the configured request defaults.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub run_id: Option<String>,
    pub learner_id: Option<String>,
    pub school_id: Option<String>,
    pub stage: Option<String>,
    pub remaining_foreground_time_ms: Option<u64>,
    pub inactivity_timeout_ms: Option<u64>,
}

/// A launch request ready to hand to the unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedLaunch {
    pub app: LearningApp,
    pub unit: LearningUnit,
    pub request: LaunchRequest,
    pub message: TransportMessage,
}

/// Build the launch message for `unit_id` of `package`.
///
/// Both the app and the unit must exist; the request carries an asset base
/// address scoped to the unit.
pub async fn prepare_launch(
    ctx: &Context,
    package: &PackageId,
    unit_id: &UnitId,
    options: &LaunchOptions,
) -> Result<PreparedLaunch, LaunchError> {
    let not_found = |app_missing: bool| {
        let (package, unit) = (package.to_string(), unit_id.to_string());
        if app_missing {
            LaunchError::AppNotFound { package, unit }
        } else {
            LaunchError::UnitNotFound { package, unit }
        }
    };

    let app = ctx.db.find_app(package).await?.ok_or_else(|| not_found(true))?;
    let unit = ctx
        .db
        .units(package)
        .await?
        .into_iter()
        .find(|u| &u.unit_id == unit_id)
        .ok_or_else(|| not_found(false))?;

    let defaults = &ctx.config.request;
    let request = LaunchRequest {
        unit_id: unit_id.clone(),
        run_id: options.run_id.clone().unwrap_or_else(|| defaults.run_id.clone()),
        learner_id: options
            .learner_id
            .clone()
            .unwrap_or_else(|| defaults.learner_id.clone()),
        school_id: options
            .school_id
            .clone()
            .unwrap_or_else(|| defaults.school_id.clone()),
        stage: options.stage.clone().unwrap_or_else(|| defaults.stage.clone()),
        remaining_foreground_time_ms: options.remaining_foreground_time_ms,
        inactivity_timeout_ms: options.inactivity_timeout_ms,
        assets_base_uri: Some(ctx.assets.base_uri(package, unit_id)),
    };

    let target = ComponentName {
        package: app.package.to_string(),
        class: app.launch_class(),
    };
    let message = encode_request(&request, target, &ctx.config.launch_action)?;
    tracing::debug!(package = %package, unit = %unit_id, "prepared launch request");

    Ok(PreparedLaunch {
        app,
        unit,
        request,
        message,
    })
}

/// [`prepare_launch`] as an [`Outcome`].
pub async fn launch(
    ctx: &Context,
    package: &PackageId,
    unit_id: &UnitId,
    options: &LaunchOptions,
) -> Outcome<PreparedLaunch> {
    prepare_launch(ctx, package, unit_id, options).await.into()
}

/// Decode what a unit returned.
pub fn process_unit_result(response: &UnitResponse) -> Outcome<LaunchResult> {
    match decode_result(response) {
        Ok(result) => Outcome::Success(result),
        Err(e) => {
            tracing::warn!(code = response.code.0, error = %e, "unusable unit result");
            Outcome::Error(describe_protocol_error(&e))
        }
    }
}

/// User-facing text for a protocol failure, telling "no result" apart from
/// "bad result".
pub fn describe_protocol_error(err: &ProtocolError) -> String {
    match err.kind() {
        ProtocolErrorKind::Transport => format!("The learning unit did not deliver a result. {err}"),
        ProtocolErrorKind::Payload => format!("The learning unit returned an invalid result: {err}"),
    }
}

/// Unit side of the exchange: validate the request and answer with `result`.
pub fn respond(
    request: &TransportMessage,
    result: &LaunchResult,
) -> Result<(LaunchRequest, UnitResponse), ProtocolError> {
    let request = decode_request(request)?;
    let response = encode_result(result)?;
    Ok((request, response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpk_schema::{ResultCode, UnitOutcome};

    #[test]
    fn test_respond_then_process_recovers_result() {
        let request = LaunchRequest {
            unit_id: UnitId::new("u1"),
            run_id: "run".to_string(),
            learner_id: "learner".to_string(),
            school_id: "school".to_string(),
            stage: "test".to_string(),
            remaining_foreground_time_ms: Some(60_000),
            inactivity_timeout_ms: None,
            assets_base_uri: None,
        };
        let target = ComponentName {
            package: "com.example.unit".to_string(),
            class: "com.example.unit.MainActivity".to_string(),
        };
        let message = encode_request(&request, target, "LAUNCH").unwrap();

        for outcome in [
            UnitOutcome::Success { score: 0.75 },
            UnitOutcome::Abort,
            UnitOutcome::Error {
                details: "boom".to_string(),
            },
            UnitOutcome::TimeUp,
            UnitOutcome::TimeoutInactivity,
        ] {
            let result = LaunchResult::new(outcome, 1234);
            let (seen, response) = respond(&message, &result).unwrap();
            assert_eq!(seen, request);
            assert_eq!(process_unit_result(&response), Outcome::Success(result));
        }
    }

    #[test]
    fn test_transport_and_payload_errors_read_differently() {
        let crashed = UnitResponse {
            code: ResultCode::CANCELED,
            data: None,
        };
        let reason = process_unit_result(&crashed);
        assert_eq!(
            reason.reason(),
            Some("The learning unit did not deliver a result. Unexpected result code: 0")
        );

        let mut data = TransportMessage::new();
        data.put_string("resultType", "Success");
        let bad = UnitResponse {
            code: ResultCode::OK,
            data: Some(data),
        };
        let reason = process_unit_result(&bad);
        assert!(
            reason
                .reason()
                .is_some_and(|r| r.starts_with("The learning unit returned an invalid result"))
        );
    }
}
