//! Result command

use std::path::Path;

use anyhow::{Result, bail};
use lpk_schema::{Outcome, UnitResponse};

use super::read_json;
use crate::ops::launch::process_unit_result;
use crate::ui::table::result_table;

/// Decode a unit response file and show the outcome.
pub fn result(file: &Path) -> Result<()> {
    let response: UnitResponse = read_json(file)?;

    match process_unit_result(&response) {
        Outcome::Success(result) => {
            println!("{}", result_table(&result));
            Ok(())
        }
        Outcome::Error(reason) => bail!(reason),
        Outcome::NotFound | Outcome::Loading => bail!("No result in {}", file.display()),
    }
}
