//! Wire types for Google Calendar event payloads.
//!
//! `RemoteEvent` mirrors the subset of the Calendar v3 event resource this
//! tool reads and writes. The provider crate serializes these structs
//! directly as request/response bodies.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::event::UNKNOWN_YEAR;
use crate::zodiac::Zodiac;

/// Marker line proving an event was created by this tool. Events in the
/// managed calendar that lack it were created by hand and get warned about.
pub const OWNERSHIP_TAG: &str = "managed-by:bday";

/// Stands in for the birth year inside the description when it is unknown.
pub const YEAR_PLACEHOLDER: &str = "????";

const BIRTH_DATE_LABEL: &str = "Date of birth:";
const ZODIAC_LABEL: &str = "Zodiac sign:";
const GENERATED_LABEL: &str = "Generated at:";

pub const YEARLY_RECURRENCE: &str = "RRULE:FREQ=YEARLY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEvent {
    /// Assigned by Google; absent on payloads we are about to create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start: RemoteDateTime,
    #[serde(default)]
    pub end: RemoteDateTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recurrence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<RemoteReminders>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Either an all-day `date` or a timed `dateTime` plus time zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl RemoteDateTime {
    pub fn all_day(date: NaiveDate) -> RemoteDateTime {
        RemoteDateTime {
            date: Some(date),
            date_time: None,
            time_zone: None,
        }
    }

    pub fn timed(date_time: DateTime<FixedOffset>, time_zone: String) -> RemoteDateTime {
        RemoteDateTime {
            date: None,
            date_time: Some(date_time),
            time_zone: Some(time_zone),
        }
    }

    pub fn naive_date(&self) -> Option<NaiveDate> {
        self.date.or_else(|| self.date_time.map(|dt| dt.date_naive()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RemoteReminders {
    #[serde(default)]
    pub use_default: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<ReminderOverride>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReminderOverride {
    pub method: ReminderMethod,
    pub minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    Email,
    Popup,
}

impl RemoteEvent {
    /// Canonical form used for full-equality comparison.
    ///
    /// Drops everything that legitimately differs between a freshly built
    /// payload and one echoed back by Google: the id, the status, the
    /// "generated at" description line, reminder ordering, and the time zone
    /// label (Google may echo a different spelling for the same offset).
    pub fn normalized(&self) -> RemoteEvent {
        let mut event = self.clone();
        event.id = None;
        event.status = None;
        event.description = event
            .description
            .lines()
            .filter(|line| !line.trim_start().starts_with(GENERATED_LABEL))
            .collect::<Vec<_>>()
            .join("\n");
        if let Some(reminders) = event.reminders.as_mut() {
            reminders.overrides.sort();
        }
        event.start.time_zone = None;
        event.end.time_zone = None;
        event
    }

    pub fn is_owned(&self) -> bool {
        self.description
            .lines()
            .any(|line| line.trim() == OWNERSHIP_TAG)
    }
}

/// Build the structured description stored with every uploaded event.
pub fn build_description(
    date: NaiveDate,
    has_year: bool,
    zodiac: Zodiac,
    generated_at: DateTime<Utc>,
) -> String {
    let birth_date = if has_year {
        date.format("%Y-%m-%d").to_string()
    } else {
        format!("{}-{}", YEAR_PLACEHOLDER, date.format("%m-%d"))
    };
    format!(
        "{} {}\n{} {}\n{} {}\n{}",
        BIRTH_DATE_LABEL,
        birth_date,
        ZODIAC_LABEL,
        zodiac,
        GENERATED_LABEL,
        generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        OWNERSHIP_TAG,
    )
}

/// Extract `(birth date, has_year)` from a description written by
/// [`build_description`]. Returns `None` for descriptions this tool did not
/// write (hand-made events).
pub fn parse_birth_date(description: &str) -> Option<(NaiveDate, bool)> {
    let value = description
        .lines()
        .find_map(|line| line.trim().strip_prefix(BIRTH_DATE_LABEL))?
        .trim();

    if let Some(month_day) = value.strip_prefix(YEAR_PLACEHOLDER) {
        let date = NaiveDate::parse_from_str(
            &format!("{}{}", UNKNOWN_YEAR, month_day),
            "%Y-%m-%d",
        )
        .ok()?;
        Some((date, false))
    } else {
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
        Some((date, true))
    }
}
