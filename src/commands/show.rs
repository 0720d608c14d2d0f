use chrono::NaiveDate;
use owo_colors::OwoColorize;

use bday_core::event::{sort_events, SortKey};
use bday_core::Event;

use crate::render;

pub fn sort_description(key: SortKey) -> &'static str {
    match key {
        SortKey::Year => "year of birth",
        SortKey::MonthDay => "month and day of birth",
        SortKey::NextBirthday => "days to the next birthday",
    }
}

pub fn run(mut events: Vec<Event>, key: SortKey, today: NaiveDate) {
    println!(
        "{}",
        format!("\nShowing birthdays sorted by {}:\n", sort_description(key)).cyan()
    );
    sort_events(&mut events, key, today);
    render::print_events(&events, today);
}
