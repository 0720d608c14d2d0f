//! Tool configuration.
//!
//! Settings are read from a TOML file (default: `<config dir>/bday/config.toml`)
//! into plain structs with per-field defaults, then validated. Every field can
//! also be overridden from the command line; the CLI applies its overrides and
//! re-validates.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{BdayError, BdayResult};

/// Google rejects more than this many reminder overrides per event.
pub const MAX_REMINDER_OVERRIDES: usize = 5;

fn default_input_file() -> PathBuf {
    PathBuf::from("birthdays.txt")
}

fn default_calendar_name() -> String {
    "Birthday Reminder".to_string()
}

fn default_oauth_port() -> u16 {
    8085
}

fn default_event_time() -> String {
    "09:00".to_string()
}

fn default_event_duration() -> String {
    "01:00".to_string()
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

fn default_popup_reminders() -> Vec<u32> {
    vec![10]
}

/// Settings that shape how one birthday is presented and uploaded.
///
/// Kept separate from [`Config`] because every file-sourced event carries a
/// handle to these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSettings {
    #[serde(default)]
    pub use_zodiac_signs: bool,
    #[serde(default)]
    pub use_zodiac_names: bool,
    #[serde(default)]
    pub title_prefix: String,
    #[serde(default)]
    pub title_postfix: String,
    /// When false, events are uploaded as all-day entries.
    #[serde(default)]
    pub use_time: bool,
    /// "HH:MM", only used when `use_time` is set.
    #[serde(default = "default_event_time")]
    pub event_time: String,
    /// "HH:MM", only used when `use_time` is set.
    #[serde(default = "default_event_duration")]
    pub event_duration: String,
    /// IANA time zone name, only used when `use_time` is set.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// Move Feb 29 events to Mar 1 so the yearly recurrence fires every year.
    #[serde(default)]
    pub remind_feb29_on_mar1: bool,
    #[serde(default = "default_popup_reminders")]
    pub popup_reminders_minutes: Vec<u32>,
    #[serde(default)]
    pub email_reminders_minutes: Vec<u32>,
}

impl Default for EventSettings {
    fn default() -> Self {
        EventSettings {
            use_zodiac_signs: false,
            use_zodiac_names: false,
            title_prefix: String::new(),
            title_postfix: String::new(),
            use_time: false,
            event_time: default_event_time(),
            event_duration: default_event_duration(),
            time_zone: default_time_zone(),
            remind_feb29_on_mar1: false,
            popup_reminders_minutes: default_popup_reminders(),
            email_reminders_minutes: Vec::new(),
        }
    }
}

impl EventSettings {
    pub fn start_time(&self) -> BdayResult<NaiveTime> {
        NaiveTime::parse_from_str(&self.event_time, "%H:%M").map_err(|_| {
            BdayError::Config(format!(
                "event_time '{}' is not in HH:MM format",
                self.event_time
            ))
        })
    }

    pub fn duration(&self) -> BdayResult<Duration> {
        let time = NaiveTime::parse_from_str(&self.event_duration, "%H:%M").map_err(|_| {
            BdayError::Config(format!(
                "event_duration '{}' is not in HH:MM format",
                self.event_duration
            ))
        })?;
        let minutes = time.signed_duration_since(NaiveTime::MIN).num_minutes();
        if minutes == 0 {
            return Err(BdayError::Config(
                "event_duration must be longer than 00:00".to_string(),
            ));
        }
        Ok(Duration::minutes(minutes))
    }

    pub fn tz(&self) -> BdayResult<Tz> {
        self.time_zone.parse::<Tz>().map_err(|_| {
            BdayError::Config(format!("unknown time zone '{}'", self.time_zone))
        })
    }

    pub fn validate(&self) -> BdayResult<()> {
        let overrides =
            self.popup_reminders_minutes.len() + self.email_reminders_minutes.len();
        if overrides > MAX_REMINDER_OVERRIDES {
            return Err(BdayError::Config(format!(
                "{} reminders configured, Google allows at most {} per event",
                overrides, MAX_REMINDER_OVERRIDES
            )));
        }
        if self.use_time {
            self.start_time()?;
            self.duration()?;
            self.tz()?;
        }
        Ok(())
    }
}

/// Validated tool configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_input_file")]
    pub input_file: PathBuf,
    #[serde(default = "default_calendar_name")]
    pub calendar_name: String,
    /// Port for the local OAuth callback listener.
    #[serde(default = "default_oauth_port")]
    pub oauth_port: u16,
    #[serde(default)]
    pub verbose: u8,
    #[serde(flatten)]
    pub events: EventSettings,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_file: default_input_file(),
            calendar_name: default_calendar_name(),
            oauth_port: default_oauth_port(),
            verbose: 0,
            events: EventSettings::default(),
        }
    }
}

impl Config {
    /// `<config dir>/bday/config.toml`
    pub fn default_path() -> BdayResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            BdayError::Config("could not determine the user config directory".to_string())
        })?;
        Ok(config_dir.join("bday").join("config.toml"))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// An explicitly given path must exist; a missing default file just means
    /// "use the defaults".
    pub fn load(path: Option<&Path>) -> BdayResult<Config> {
        let config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(BdayError::Config(format!(
                        "config file '{}' not found",
                        path.display()
                    )));
                }
                Self::read_file(path)?
            }
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::read_file(&path)?
                } else {
                    Config::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> BdayResult<Config> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            BdayError::Config(format!("failed to parse '{}': {}", path.display(), e))
        })
    }

    pub fn validate(&self) -> BdayResult<()> {
        if self.calendar_name.trim().is_empty() {
            return Err(BdayError::Config(
                "calendar_name must not be empty".to_string(),
            ));
        }
        self.events.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn parses_full_config() {
        let config: Config = toml::from_str(
            r#"
            input_file = "Birthdays.txt"
            calendar_name = "Birthdays"
            oauth_port = 1025
            use_zodiac_signs = true
            use_zodiac_names = true
            title_prefix = "Birthday of "
            title_postfix = " !"
            use_time = true
            time_zone = "Europe/Moscow"
            event_time = "09:00"
            event_duration = "00:30"
            remind_feb29_on_mar1 = true
            popup_reminders_minutes = [10, 30]
            email_reminders_minutes = [60, 1440]
            "#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.calendar_name, "Birthdays");
        assert_eq!(config.events.popup_reminders_minutes, vec![10, 30]);
        assert_eq!(
            config.events.duration().unwrap(),
            Duration::minutes(30)
        );
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: Config = toml::from_str(r#"calendar_name = "Mine""#).unwrap();
        assert_eq!(config.calendar_name, "Mine");
        assert_eq!(config.events, EventSettings::default());
        assert_eq!(config.oauth_port, default_oauth_port());
    }

    #[test]
    fn rejects_too_many_reminders() {
        let mut config = Config::default();
        config.events.popup_reminders_minutes = vec![1, 2, 3];
        config.events.email_reminders_minutes = vec![4, 5, 6];
        assert!(matches!(config.validate(), Err(BdayError::Config(_))));
    }

    #[test]
    fn rejects_bad_time_zone_and_time() {
        let mut config = Config::default();
        config.events.use_time = true;
        config.events.time_zone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.events.use_time = true;
        config.events.event_time = "9 o'clock".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.events.use_time = true;
        config.events.event_duration = "00:00".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn untimed_config_ignores_time_fields() {
        let mut config = Config::default();
        config.events.use_time = false;
        config.events.time_zone = "Mars/Olympus".to_string();
        config.validate().unwrap();
    }
}
