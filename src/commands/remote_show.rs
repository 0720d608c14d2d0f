use std::collections::BTreeMap;

use chrono::NaiveDate;
use owo_colors::OwoColorize;

use bday_core::event::{sort_events, SortKey};
use bday_core::{Event, Signature};

use crate::commands::show::sort_description;
use crate::render;

pub fn run(mut events: Vec<Event>, key: SortKey, today: NaiveDate) {
    let foreign: Vec<Event> = events.iter().filter(|e| !e.is_owned()).cloned().collect();
    if !foreign.is_empty() {
        println!(
            "{}",
            format!(
                "{} event(s) in the calendar were not created by this tool.\n\
                 They will be deleted by the next 'upload'; keep birthdays in the file instead.",
                foreign.len()
            )
            .yellow()
        );
        render::print_events(&foreign, today);
    }

    let mut counts: BTreeMap<Signature, usize> = BTreeMap::new();
    for event in &events {
        *counts.entry(event.signature()).or_default() += 1;
    }
    let duplicates: Vec<&Signature> =
        counts.iter().filter(|(_, n)| **n > 1).map(|(s, _)| s).collect();
    if !duplicates.is_empty() {
        println!(
            "{}",
            "Google Calendar contains duplicates. Did you edit the calendar manually?\n\
             They will go away after you run 'upload'."
                .yellow()
        );
        for signature in duplicates {
            println!("  {}", signature.yellow());
        }
        println!();
    }

    println!(
        "{}",
        format!("\nShowing birthdays sorted by {}:\n", sort_description(key)).cyan()
    );
    sort_events(&mut events, key, today);
    render::print_events(&events, today);
}
