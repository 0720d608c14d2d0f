use anyhow::Result;
use chrono::NaiveDate;

use bday_core::{compare, Config, DuplicatePolicy, Event};

use crate::render;

pub fn run(
    file_events: &[Event],
    remote_events: &[Event],
    config: &Config,
    today: NaiveDate,
) -> Result<()> {
    // Read-only, so remote duplicates only warn
    let result = compare(file_events, remote_events, DuplicatePolicy::Tolerate)?;
    render::print_reconciliation(
        &result,
        file_events.len(),
        remote_events.len(),
        config.verbose,
        today,
    );
    Ok(())
}
