use chrono::NaiveDate;
use owo_colors::OwoColorize;

use bday_core::{Config, Event};

use crate::render;

pub fn run(config: &Config, events: &[Event], today: NaiveDate) {
    println!(
        "{}",
        format!(
            "File '{}' is valid, {} birthdays found.",
            config.input_file.display(),
            events.len()
        )
        .green()
    );
    if config.verbose > 0 {
        render::print_events(events, today);
    }
}
