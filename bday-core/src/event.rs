//! The birthday event model.
//!
//! An [`Event`] is one birthday, either read from the text file or fetched
//! from the managed calendar. All date arithmetic takes `today` as a
//! parameter so callers (and tests) control the clock.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone as _, Utc};

use crate::config::EventSettings;
use crate::error::{BdayError, BdayResult};
use crate::remote::{
    self, ReminderMethod, ReminderOverride, RemoteDateTime, RemoteEvent, RemoteReminders,
    YEARLY_RECURRENCE,
};
use crate::zodiac::Zodiac;

/// Birth year stored for events whose real year is unknown.
/// 1904 is a leap year, so Feb 29 entries stay representable.
pub const UNKNOWN_YEAR: i32 = 1904;

/// Where an event came from. The two cases carry disjoint payloads: file
/// events know how to present and upload themselves, remote events remember
/// the payload (and id) Google handed back.
#[derive(Debug, Clone)]
pub enum EventSource {
    File { settings: Arc<EventSettings> },
    Remote { payload: RemoteEvent, owned: bool },
}

#[derive(Debug, Clone)]
pub struct Event {
    pub date: NaiveDate,
    pub title: String,
    pub has_year: bool,
    pub source: EventSource,
}

/// Identifies "the same birthday" independent of presentation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature {
    pub date: NaiveDate,
    pub title: String,
    pub has_year: bool,
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_year {
            write!(f, "{} {}", self.date.format("%Y-%m-%d"), self.title)
        } else {
            write!(f, "????-{} {}", self.date.format("%m-%d"), self.title)
        }
    }
}

impl Event {
    pub fn from_file(
        date: NaiveDate,
        title: impl Into<String>,
        has_year: bool,
        settings: Arc<EventSettings>,
    ) -> Event {
        let date = if has_year {
            date
        } else {
            date.with_year(UNKNOWN_YEAR)
                .expect("every month/day exists in the leap year 1904")
        };
        Event {
            date,
            title: title.into(),
            has_year,
            source: EventSource::File { settings },
        }
    }

    /// Parse a fetched payload back into an event.
    ///
    /// The birth date comes from the description line this tool writes on
    /// upload; payloads without one (hand-made events) fall back to whichever
    /// of the two start encodings is present. The title is the summary with
    /// zodiac decorations and the configured prefix/postfix removed.
    pub fn from_remote(payload: RemoteEvent, settings: &EventSettings) -> BdayResult<Event> {
        let owned = payload.is_owned();

        let (date, has_year) = match remote::parse_birth_date(&payload.description) {
            Some(parsed) => parsed,
            None => {
                let date = payload.start.naive_date().ok_or_else(|| {
                    BdayError::MalformedRemote(format!(
                        "event '{}' has no start date",
                        payload.summary
                    ))
                })?;
                (date, true)
            }
        };

        let mut title = payload.summary.as_str();
        if !settings.title_prefix.is_empty() {
            title = title.strip_prefix(&settings.title_prefix).unwrap_or(title);
        }
        if !settings.title_postfix.is_empty() {
            title = title.strip_suffix(&settings.title_postfix).unwrap_or(title);
        }
        let title = Zodiac::strip_decorations(title);

        Ok(Event {
            date,
            title,
            has_year,
            source: EventSource::Remote { payload, owned },
        })
    }

    pub fn signature(&self) -> Signature {
        Signature {
            date: self.date,
            title: self.title.clone(),
            has_year: self.has_year,
        }
    }

    pub fn remote_payload(&self) -> Option<&RemoteEvent> {
        match &self.source {
            EventSource::Remote { payload, .. } => Some(payload),
            EventSource::File { .. } => None,
        }
    }

    /// False only for remote events missing the ownership tag.
    pub fn is_owned(&self) -> bool {
        match &self.source {
            EventSource::Remote { owned, .. } => *owned,
            EventSource::File { .. } => true,
        }
    }

    pub fn age(&self, today: NaiveDate) -> i32 {
        let had_birthday_this_year =
            (today.month(), today.day()) >= (self.date.month(), self.date.day());
        today.year() - self.date.year() - if had_birthday_this_year { 0 } else { 1 }
    }

    pub fn is_birthday_today(&self, today: NaiveDate) -> bool {
        (today.month(), today.day()) == (self.date.month(), self.date.day())
    }

    /// The smallest occurrence of this birthday strictly after the last one,
    /// so never in the past relative to `today`.
    pub fn next_birthday(&self, today: NaiveDate) -> NaiveDate {
        add_years(self.date, self.age(today) + 1)
    }

    pub fn days_until_next_birthday(&self, today: NaiveDate) -> i64 {
        self.next_birthday(today).signed_duration_since(today).num_days()
    }

    pub fn zodiac(&self) -> Zodiac {
        Zodiac::for_month_day(self.date.month(), self.date.day())
    }

    /// The title as it appears in the calendar: decorated for file events,
    /// the remote summary verbatim for fetched ones (it was decorated at
    /// upload time).
    pub fn display_title(&self) -> String {
        let settings = match &self.source {
            EventSource::Remote { payload, .. } => return payload.summary.clone(),
            EventSource::File { settings } => settings,
        };

        let mut title = format!(
            "{}{}{}",
            settings.title_prefix, self.title, settings.title_postfix
        );
        let zodiac = self.zodiac();
        match (settings.use_zodiac_signs, settings.use_zodiac_names) {
            (true, true) => {
                let _ = write!(title, " {} ({})", zodiac.symbol(), zodiac.name());
            }
            (true, false) => {
                let _ = write!(title, " {}", zodiac.symbol());
            }
            (false, true) => {
                let _ = write!(title, " {}", zodiac.name());
            }
            (false, false) => {}
        }
        title
    }

    /// Build the payload to store in the calendar. Only file events can be
    /// uploaded; a remote event has nothing local to project back.
    pub fn to_remote(&self, generated_at: DateTime<Utc>) -> BdayResult<RemoteEvent> {
        let settings = match &self.source {
            EventSource::File { settings } => settings,
            EventSource::Remote { .. } => {
                return Err(BdayError::RemoteOnly(self.title.clone()));
            }
        };

        // A plain yearly recurrence on Feb 29 only fires in leap years.
        let start_date = if settings.remind_feb29_on_mar1
            && (self.date.month(), self.date.day()) == (2, 29)
        {
            NaiveDate::from_ymd_opt(self.date.year(), 3, 1)
                .expect("Mar 1 exists in every year")
        } else {
            self.date
        };

        let (start, end) = if settings.use_time {
            let tz = settings.tz()?;
            let start_naive = start_date.and_time(settings.start_time()?);
            let start_local = tz
                .from_local_datetime(&start_naive)
                .earliest()
                .ok_or_else(|| {
                    BdayError::Config(format!(
                        "event_time {} does not exist on {} in {}",
                        settings.event_time, start_date, settings.time_zone
                    ))
                })?;
            let end_local = start_local + settings.duration()?;
            (
                RemoteDateTime::timed(start_local.fixed_offset(), settings.time_zone.clone()),
                RemoteDateTime::timed(end_local.fixed_offset(), settings.time_zone.clone()),
            )
        } else {
            // All-day events use an exclusive end date
            (
                RemoteDateTime::all_day(start_date),
                RemoteDateTime::all_day(start_date + Duration::days(1)),
            )
        };

        let mut overrides: Vec<ReminderOverride> = settings
            .popup_reminders_minutes
            .iter()
            .map(|&minutes| ReminderOverride {
                method: ReminderMethod::Popup,
                minutes,
            })
            .chain(
                settings
                    .email_reminders_minutes
                    .iter()
                    .map(|&minutes| ReminderOverride {
                        method: ReminderMethod::Email,
                        minutes,
                    }),
            )
            .collect();
        overrides.sort();

        Ok(RemoteEvent {
            id: None,
            summary: self.display_title(),
            description: remote::build_description(
                self.date,
                self.has_year,
                self.zodiac(),
                generated_at,
            ),
            start,
            end,
            recurrence: vec![YEARLY_RECURRENCE.to_string()],
            reminders: Some(RemoteReminders {
                use_default: false,
                overrides,
            }),
            status: None,
        })
    }

    /// Projection used for full-equality comparison: what this event looks
    /// like in the calendar, with volatile fields normalized away.
    pub fn normalized_projection(&self) -> BdayResult<RemoteEvent> {
        match &self.source {
            EventSource::Remote { payload, .. } => Ok(payload.normalized()),
            EventSource::File { .. } => {
                Ok(self.to_remote(DateTime::<Utc>::UNIX_EPOCH)?.normalized())
            }
        }
    }

    /// One-line human description, e.g.
    /// `1980-01-01 - Ivan - 46 years old (will be 47 in 148 days)`.
    pub fn describe(&self, today: NaiveDate) -> String {
        let date = if self.has_year {
            self.date.format("%Y-%m-%d").to_string()
        } else {
            format!("????-{}", self.date.format("%m-%d"))
        };
        if self.has_year {
            format!(
                "{} - {} - {} years old (will be {} in {} days)",
                date,
                self.title,
                self.age(today),
                self.age(today) + 1,
                self.days_until_next_birthday(today)
            )
        } else {
            format!(
                "{} - {} (next birthday in {} days)",
                date,
                self.title,
                self.days_until_next_birthday(today)
            )
        }
    }
}

/// Keys the CLI can sort event listings by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// By full birth date (unknown years sort first).
    Year,
    /// By month and day.
    MonthDay,
    /// By days until the next occurrence.
    NextBirthday,
}

pub fn sort_events(events: &mut [Event], key: SortKey, today: NaiveDate) {
    match key {
        SortKey::Year => events.sort_by_key(|e| (e.date, e.title.clone())),
        SortKey::MonthDay => {
            events.sort_by_key(|e| (e.date.month(), e.date.day(), e.title.clone()))
        }
        SortKey::NextBirthday => {
            events.sort_by_key(|e| (e.days_until_next_birthday(today), e.title.clone()))
        }
    }
}

fn add_years(date: NaiveDate, years: i32) -> NaiveDate {
    let year = date.year() + years;
    // Feb 29 lands on Feb 28 in non-leap years
    date.with_year(year).unwrap_or_else(|| {
        NaiveDate::from_ymd_opt(year, 2, 28).expect("Feb 28 exists in every year")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EventSettings;

    fn settings() -> Arc<EventSettings> {
        Arc::new(EventSettings::default())
    }

    fn event(date: NaiveDate, title: &str, has_year: bool) -> Event {
        Event::from_file(date, title, has_year, settings())
    }

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn yearless_dates_normalize_to_sentinel_year() {
        // The year passed in makes no difference when has_year is false
        let a = event(ymd(2020, 1, 1), "Ivan", false);
        let b = event(ymd(1999, 1, 1), "Ivan", false);
        assert_eq!(a.date.year(), UNKNOWN_YEAR);
        assert_eq!(b.date.year(), UNKNOWN_YEAR);
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn age_depends_on_whether_birthday_passed() {
        let today = ymd(2026, 6, 15);
        assert_eq!(event(ymd(2000, 6, 15), "Ivan", true).age(today), 26);
        assert_eq!(event(ymd(2000, 6, 14), "Ivan", true).age(today), 26);
        assert_eq!(event(ymd(2000, 6, 16), "Ivan", true).age(today), 25);
    }

    #[test]
    fn is_birthday_today_matches_month_and_day_only() {
        let today = ymd(2026, 6, 15);
        assert!(event(ymd(2000, 6, 15), "Ivan", true).is_birthday_today(today));
        assert!(!event(ymd(2000, 6, 14), "Ivan", true).is_birthday_today(today));
        assert!(event(ymd(2020, 6, 15), "Ivan", false).is_birthday_today(today));
    }

    #[test]
    fn next_birthday_is_never_in_the_past() {
        let today = ymd(2026, 6, 15);
        for (date, expected) in [
            (ymd(2000, 6, 15), ymd(2027, 6, 15)),
            (ymd(2000, 6, 14), ymd(2027, 6, 14)),
            (ymd(2000, 6, 16), ymd(2026, 6, 16)),
        ] {
            let e = event(date, "Ivan", true);
            assert_eq!(e.next_birthday(today), expected);
            assert!(e.days_until_next_birthday(today) >= 0);
        }
    }

    #[test]
    fn feb29_next_birthday_falls_back_to_feb28() {
        let today = ymd(2026, 1, 1);
        let e = event(ymd(2020, 2, 29), "Ivan", true);
        assert_eq!(e.next_birthday(today), ymd(2026, 2, 28));
    }

    #[test]
    fn display_title_applies_decorations() {
        let plain = event(ymd(2020, 1, 1), "Ivan", true);
        assert_eq!(plain.display_title(), "Ivan");

        let decorated_settings = Arc::new(EventSettings {
            use_zodiac_signs: true,
            use_zodiac_names: true,
            title_prefix: "Birthday of ".to_string(),
            title_postfix: "!".to_string(),
            ..EventSettings::default()
        });
        let decorated = Event::from_file(ymd(2020, 1, 1), "Ivan", true, decorated_settings);
        assert_eq!(
            decorated.display_title(),
            "Birthday of Ivan! \u{2651} (Capricorn)"
        );
    }

    #[test]
    fn to_remote_builds_all_day_yearly_event() {
        let e = event(ymd(1980, 1, 1), "Ivan", true);
        let payload = e.to_remote(Utc::now()).unwrap();
        assert_eq!(payload.summary, "Ivan");
        assert_eq!(payload.start.date, Some(ymd(1980, 1, 1)));
        assert_eq!(payload.end.date, Some(ymd(1980, 1, 2)));
        assert_eq!(payload.recurrence, vec![YEARLY_RECURRENCE.to_string()]);
        let reminders = payload.reminders.unwrap();
        assert!(!reminders.use_default);
        assert_eq!(reminders.overrides.len(), 1);
        assert_eq!(reminders.overrides[0].method, ReminderMethod::Popup);
    }

    #[test]
    fn to_remote_with_time_uses_configured_zone() {
        let timed_settings = Arc::new(EventSettings {
            use_time: true,
            event_time: "09:00".to_string(),
            event_duration: "00:30".to_string(),
            time_zone: "Europe/Moscow".to_string(),
            ..EventSettings::default()
        });
        let e = Event::from_file(ymd(1980, 7, 1), "Ivan", true, timed_settings);
        let payload = e.to_remote(Utc::now()).unwrap();
        let start = payload.start.date_time.unwrap();
        let end = payload.end.date_time.unwrap();
        assert_eq!(payload.start.time_zone.as_deref(), Some("Europe/Moscow"));
        assert_eq!((end - start).num_minutes(), 30);
    }

    #[test]
    fn feb29_shift_moves_start_but_keeps_birth_date() {
        let shifted_settings = Arc::new(EventSettings {
            remind_feb29_on_mar1: true,
            ..EventSettings::default()
        });
        let e = Event::from_file(ymd(2020, 2, 29), "Ivan", true, shifted_settings);
        let payload = e.to_remote(Utc::now()).unwrap();
        assert_eq!(payload.start.date, Some(ymd(2020, 3, 1)));
        assert!(payload.description.contains("2020-02-29"));

        // The description keeps the round trip intact despite the shift
        let back = Event::from_remote(payload, &EventSettings::default()).unwrap();
        assert_eq!(back.signature(), e.signature());
    }

    #[test]
    fn remote_round_trip_preserves_signature_and_content() {
        let decorated_settings = Arc::new(EventSettings {
            use_zodiac_signs: true,
            use_zodiac_names: true,
            ..EventSettings::default()
        });
        for has_year in [true, false] {
            let e = Event::from_file(ymd(1980, 1, 1), "Ivan", has_year, decorated_settings.clone());
            let mut payload = e.to_remote(Utc::now()).unwrap();
            payload.id = Some("remote-id".to_string());
            let back = Event::from_remote(payload, &decorated_settings).unwrap();

            assert_eq!(back.signature(), e.signature());
            assert!(back.is_owned());
            assert_eq!(
                back.normalized_projection().unwrap(),
                e.normalized_projection().unwrap()
            );
        }
    }

    #[test]
    fn from_remote_strips_configured_affixes() {
        let affixed = EventSettings {
            title_prefix: "Birthday of ".to_string(),
            title_postfix: "!".to_string(),
            ..EventSettings::default()
        };
        let e = Event::from_file(ymd(1980, 1, 1), "Ivan", true, Arc::new(affixed.clone()));
        let payload = e.to_remote(Utc::now()).unwrap();
        assert_eq!(payload.summary, "Birthday of Ivan!");
        let back = Event::from_remote(payload, &affixed).unwrap();
        assert_eq!(back.title, "Ivan");
    }

    #[test]
    fn foreign_event_is_flagged_and_reads_start_date() {
        let payload = RemoteEvent {
            id: Some("xyz".to_string()),
            summary: "Ivan".to_string(),
            description: "created by hand".to_string(),
            start: RemoteDateTime::all_day(ymd(1980, 1, 1)),
            end: RemoteDateTime::all_day(ymd(1980, 1, 2)),
            recurrence: vec![],
            reminders: None,
            status: None,
        };
        let e = Event::from_remote(payload, &EventSettings::default()).unwrap();
        assert!(!e.is_owned());
        assert_eq!(e.date, ymd(1980, 1, 1));
        assert!(e.has_year);
    }

    #[test]
    fn to_remote_fails_for_remote_sourced_events() {
        let e = event(ymd(1980, 1, 1), "Ivan", true);
        let payload = e.to_remote(Utc::now()).unwrap();
        let back = Event::from_remote(payload, &EventSettings::default()).unwrap();
        assert!(matches!(
            back.to_remote(Utc::now()),
            Err(BdayError::RemoteOnly(_))
        ));
    }

    #[test]
    fn sort_keys_order_as_documented() {
        let today = ymd(2026, 6, 15);
        let mut events = vec![
            event(ymd(1990, 12, 1), "December", true),
            event(ymd(2000, 1, 20), "January", true),
            event(ymd(1980, 6, 16), "Tomorrow", true),
        ];

        sort_events(&mut events, SortKey::Year, today);
        assert_eq!(events[0].title, "Tomorrow");

        sort_events(&mut events, SortKey::MonthDay, today);
        assert_eq!(events[0].title, "January");

        sort_events(&mut events, SortKey::NextBirthday, today);
        assert_eq!(events[0].title, "Tomorrow");
    }
}
