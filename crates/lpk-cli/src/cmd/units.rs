//! Units command

use anyhow::{Result, anyhow, bail};
use lpk_schema::Outcome;

use super::{Globals, package_id};
use crate::ops::query::list_units;
use crate::ui::table::units_table;

pub async fn units(globals: &Globals, package: &str, json: bool) -> Result<()> {
    let package = package_id(package)?;
    let ctx = globals.context()?;

    let units = match list_units(&ctx, &package).await {
        Outcome::Success(units) => units,
        Outcome::NotFound => bail!("{package} is not imported"),
        Outcome::Error(reason) => return Err(anyhow!(reason)),
        Outcome::Loading => Vec::new(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&units)?);
    } else if units.is_empty() {
        println!("  {package} has no units. Add one with 'lpk unit add {package} <unit>'.");
    } else {
        println!("{}", units_table(&units));
    }
    Ok(())
}
