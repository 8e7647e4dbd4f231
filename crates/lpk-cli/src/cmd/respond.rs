//! Respond command: plays the unit's side of a launch.

use std::path::Path;

use anyhow::{Context, Result};
use lpk_schema::{LaunchResult, ResultItem, ResultType, TransportMessage, UnitOutcome};

use super::{emit, read_json};
use crate::ops::launch::respond;

/// Everything a unit reports back, as given on the command line.
#[derive(Debug, Clone)]
pub struct ResponseArgs {
    pub result_type: ResultType,
    pub score: Option<f32>,
    pub duration_ms: u64,
    pub details: Option<String>,
    pub additional_data: Option<String>,
    pub items: Option<String>,
}

impl ResponseArgs {
    pub fn into_result(self) -> Result<LaunchResult> {
        let outcome = match self.result_type {
            ResultType::Success => UnitOutcome::Success {
                score: self.score.context("--score is required for Success")?,
            },
            ResultType::Abort => UnitOutcome::Abort,
            ResultType::Error => UnitOutcome::Error {
                details: self.details.unwrap_or_default(),
            },
            ResultType::TimeUp => UnitOutcome::TimeUp,
            ResultType::TimeoutInactivity => UnitOutcome::TimeoutInactivity,
        };
        let items = self
            .items
            .map(|raw| serde_json::from_str::<Vec<ResultItem>>(&raw))
            .transpose()
            .context("--items must be a JSON array of result items")?;

        Ok(LaunchResult {
            outcome,
            foreground_duration_ms: self.duration_ms,
            additional_data: self.additional_data,
            items,
        })
    }
}

pub fn respond_to(request_file: &Path, args: ResponseArgs, out: Option<&Path>) -> Result<()> {
    let message: TransportMessage = read_json(request_file)?;
    let result = args.into_result()?;

    let (request, response) = respond(&message, &result).context("Cannot answer this request")?;
    tracing::debug!(unit = %request.unit_id, run = %request.run_id, "answering launch request");

    emit(&serde_json::to_string_pretty(&response)?, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(result_type: ResultType) -> ResponseArgs {
        ResponseArgs {
            result_type,
            score: None,
            duration_ms: 500,
            details: None,
            additional_data: None,
            items: None,
        }
    }

    #[test]
    fn test_success_requires_score() {
        assert!(args(ResultType::Success).into_result().is_err());

        let mut with_score = args(ResultType::Success);
        with_score.score = Some(1.0);
        let result = with_score.into_result().unwrap();
        assert_eq!(result.score(), Some(1.0));
    }

    #[test]
    fn test_items_are_parsed() {
        let mut a = args(ResultType::TimeUp);
        a.items = Some(r#"[{"id":"q1","score":0.5}]"#.to_string());
        let items = a.into_result().unwrap().items.unwrap();
        assert_eq!(items[0].id.as_deref(), Some("q1"));

        let mut bad = args(ResultType::TimeUp);
        bad.items = Some("not json".to_string());
        assert!(bad.into_result().is_err());
    }
}
