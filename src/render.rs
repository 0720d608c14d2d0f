//! Colored terminal rendering for events and reconciliation results.

use chrono::NaiveDate;
use owo_colors::OwoColorize;

use bday_core::{Event, Reconciliation};

/// Print a numbered event list, aligned on the index column.
pub fn print_events(events: &[Event], today: NaiveDate) {
    let width = events.len().to_string().len();
    for (idx, event) in events.iter().enumerate() {
        let line = event.describe(today);
        if event.is_birthday_today(today) {
            println!(
                "{:>width$}. {} {}",
                idx + 1,
                line.green(),
                "(today!)".green().bold(),
                width = width
            );
        } else {
            println!("{:>width$}. {}", idx + 1, line, width = width);
        }
    }
    println!();
}

pub fn print_reconciliation(
    result: &Reconciliation,
    file_count: usize,
    remote_count: usize,
    verbose: u8,
    today: NaiveDate,
) {
    println!(
        "{}",
        format!(
            "File has {} events, Google Calendar has {} events.\n\
             {} events are equal,\n\
             {} events are updated,\n\
             {} events are only in file,\n\
             {} events are only in Google Calendar.\n",
            file_count,
            remote_count,
            result.equal.len(),
            result.updated.len(),
            result.file_only.len(),
            result.remote_only.len(),
        )
        .cyan()
    );

    if !result.remote_duplicates.is_empty() {
        println!(
            "{}",
            "Google Calendar contains duplicates. Did you edit the calendar manually?\n\
             Duplicates are ignored here; they will go away after you run 'upload'."
                .yellow()
        );
        print_events(&result.remote_duplicates, today);
    }

    if verbose > 0 && !result.equal.is_empty() {
        println!("{}", "Equal events:".cyan());
        print_events(&result.equal, today);
    }
    if !result.updated.is_empty() {
        println!("{}", "Updated events:".yellow());
        print_events(&result.updated, today);
    }
    if !result.file_only.is_empty() {
        println!("{}", "Events only in file:".yellow());
        print_events(&result.file_only, today);
    }
    if !result.remote_only.is_empty() {
        println!("{}", "Events only in Google Calendar:".yellow());
        print_events(&result.remote_only, today);
    }
}
