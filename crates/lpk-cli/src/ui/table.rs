//! Table rendering for list-style commands.

use comfy_table::{ContentArrangement, Table, presets};
use lpk_schema::{LaunchResult, LearningApp, LearningUnit, UnitOutcome};

use crate::store::HistoryEvent;

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

pub fn apps_table(apps: &[LearningApp]) -> Table {
    let mut t = table(&["PACKAGE", "NAME", "LAUNCH ACTIVITY"]);
    for app in apps {
        t.add_row(vec![
            app.package.to_string(),
            app.display_name.clone(),
            app.launch_class(),
        ]);
    }
    t
}

pub fn units_table(units: &[LearningUnit]) -> Table {
    let mut t = table(&["UNIT", "ICON", "ASSETS"]);
    for unit in units {
        let assets = if unit.permitted_assets.is_empty() {
            "-".to_string()
        } else {
            unit.permitted_assets.join(", ")
        };
        t.add_row(vec![unit.unit_id.to_string(), unit.icon.clone(), assets]);
    }
    t
}

pub fn history_table(events: &[HistoryEvent]) -> Table {
    let mut t = table(&["TIME", "ACTION", "DETAIL"]);
    for event in events {
        let time = chrono::DateTime::from_timestamp_millis(event.timestamp)
            .unwrap_or_default()
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        t.add_row(vec![time, event.action.clone(), event.detail.clone()]);
    }
    t
}

/// Key/value view of a decoded unit result.
pub fn result_table(result: &LaunchResult) -> Table {
    let mut t = table(&["FIELD", "VALUE"]);
    t.add_row(vec!["result".to_string(), result.result_type().to_string()]);
    match &result.outcome {
        UnitOutcome::Success { score } => {
            t.add_row(vec!["score".to_string(), format!("{score:.2}")]);
        }
        UnitOutcome::Error { details } => {
            t.add_row(vec!["error".to_string(), details.clone()]);
        }
        UnitOutcome::Abort | UnitOutcome::TimeUp | UnitOutcome::TimeoutInactivity => {}
    }
    t.add_row(vec![
        "foreground".to_string(),
        format!("{} ms", result.foreground_duration_ms),
    ]);
    if let Some(data) = &result.additional_data {
        t.add_row(vec!["additional data".to_string(), data.clone()]);
    }
    // Absent and empty item lists are different answers from the unit.
    let items = match &result.items {
        None => "none".to_string(),
        Some(items) if items.is_empty() => "empty list".to_string(),
        Some(items) => format!("{} items", items.len()),
    };
    t.add_row(vec!["items".to_string(), items]);
    t
}
