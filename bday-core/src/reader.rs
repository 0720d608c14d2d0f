//! Reader for the plain-text birthday file.
//!
//! One record per line: `<date> <title>`, where the date is `YYYY-MM-DD` or
//! `MM-DD` (unknown year). `#` starts a comment; blank and comment-only
//! lines are skipped.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::EventSettings;
use crate::error::{BdayError, BdayResult};
use crate::event::{Event, Signature, UNKNOWN_YEAR};

/// A line that could not be parsed, with enough context to fix it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line number.
    pub line_no: usize,
    pub text: String,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} -> {}", self.line_no, self.text, self.message)
    }
}

/// A successfully parsed line. Keeps its position so duplicate reports can
/// point back into the file.
#[derive(Debug, Clone)]
pub struct ParsedLine {
    pub line_no: usize,
    pub text: String,
    pub event: Event,
}

pub fn parse_lines(
    input: &str,
    settings: &Arc<EventSettings>,
) -> (Vec<ParsedLine>, Vec<ParseError>) {
    let mut parsed = Vec::new();
    let mut errors = Vec::new();

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let mut error = |message: String| {
            errors.push(ParseError {
                line_no,
                text: raw.to_string(),
                message,
            });
        };

        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        let (date_token, title) = match content.split_once(char::is_whitespace) {
            Some((date_token, rest)) => (date_token, rest.trim()),
            None => {
                error("expected a title after the date".to_string());
                continue;
            }
        };
        if title.is_empty() {
            error("expected a title after the date".to_string());
            continue;
        }

        let (date, has_year) = match parse_date_token(date_token) {
            Some(parsed) => parsed,
            None => {
                error(format!(
                    "wrong date format '{}', expected YYYY-MM-DD or MM-DD",
                    date_token
                ));
                continue;
            }
        };

        parsed.push(ParsedLine {
            line_no,
            text: raw.to_string(),
            event: Event::from_file(date, title, has_year, settings.clone()),
        });
    }

    (parsed, errors)
}

/// Parse `YYYY-MM-DD` (4-digit year) or `MM-DD`. The length gate rejects
/// 3- and 5-digit years that chrono's `%Y` would happily accept.
fn parse_date_token(token: &str) -> Option<(NaiveDate, bool)> {
    match token.len() {
        10 => NaiveDate::parse_from_str(token, "%Y-%m-%d")
            .ok()
            .map(|date| (date, true)),
        5 => NaiveDate::parse_from_str(&format!("{}-{}", UNKNOWN_YEAR, token), "%Y-%m-%d")
            .ok()
            .map(|date| (date, false)),
        _ => None,
    }
}

/// Parse `input` into events, failing on any bad line or duplicate
/// signature. `path_label` only feeds error messages.
pub fn events_from_str(
    input: &str,
    path_label: &str,
    settings: &Arc<EventSettings>,
) -> BdayResult<Vec<Event>> {
    let (parsed, errors) = parse_lines(input, settings);
    if !errors.is_empty() {
        return Err(BdayError::InvalidInput {
            path: path_label.to_string(),
            count: errors.len(),
            details: errors
                .iter()
                .map(|e| format!("  {}", e))
                .collect::<Vec<_>>()
                .join("\n"),
        });
    }

    let mut by_signature: BTreeMap<Signature, Vec<&ParsedLine>> = BTreeMap::new();
    for line in &parsed {
        by_signature
            .entry(line.event.signature())
            .or_default()
            .push(line);
    }
    let duplicates: Vec<String> = by_signature
        .values()
        .filter(|lines| lines.len() > 1)
        .flat_map(|lines| {
            lines
                .iter()
                .map(|line| format!("  line {}: {}", line.line_no, line.text))
        })
        .collect();
    if !duplicates.is_empty() {
        return Err(BdayError::DuplicateSignatures {
            source_name: format!("'{}'", path_label),
            details: duplicates.join("\n"),
        });
    }

    Ok(parsed.into_iter().map(|line| line.event).collect())
}

pub fn read_events(path: &Path, settings: &Arc<EventSettings>) -> BdayResult<Vec<Event>> {
    let input = std::fs::read_to_string(path)?;
    events_from_str(&input, &path.display().to_string(), settings)
}

#[cfg(test)]
mod tests {
    use chrono::Datelike;

    use super::*;

    fn settings() -> Arc<EventSettings> {
        Arc::new(EventSettings::default())
    }

    fn parse_one(input: &str) -> Event {
        let events = events_from_str(input, "test", &settings()).unwrap();
        assert_eq!(events.len(), 1);
        events.into_iter().next().unwrap()
    }

    #[test]
    fn parses_basic_lines() {
        let event = parse_one("2001-01-01 Ivan");
        assert_eq!(event.title, "Ivan");
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2001, 1, 1).unwrap());
        assert!(event.has_year);

        let event = parse_one("2001-01-01 Ivan Ivanovich");
        assert_eq!(event.title, "Ivan Ivanovich");
    }

    #[test]
    fn handles_comments_and_whitespace() {
        assert_eq!(parse_one("# full line comment\n2001-01-01 Ivan").title, "Ivan");
        assert_eq!(parse_one("\t  \t# comment\n2001-01-01 Ivan").title, "Ivan");
        assert_eq!(parse_one("2001-01-01 Ivan # inline comment").title, "Ivan");
        assert_eq!(parse_one(" \t  2001-01-01 Ivan").title, "Ivan");
        assert_eq!(parse_one("2001-01-01 Ivan Ivanovich   \t\t").title, "Ivan Ivanovich");
    }

    #[test]
    fn yearless_dates_use_the_sentinel_year() {
        let event = parse_one("01-01 Ivan");
        assert!(!event.has_year);
        assert_eq!(event.date.year(), UNKNOWN_YEAR);

        let event = parse_one("02-29 Ivan");
        assert_eq!(event.date, NaiveDate::from_ymd_opt(UNKNOWN_YEAR, 2, 29).unwrap());
    }

    #[test]
    fn accepts_leap_day_in_leap_years_only() {
        assert_eq!(parse_one("2020-02-29 Ivan").date.day(), 29);
        assert!(events_from_str("2023-02-29 Ivan", "test", &settings()).is_err());
        assert!(events_from_str("1900-02-29 Ivan", "test", &settings()).is_err());
    }

    #[test]
    fn rejects_malformed_lines() {
        let bad_lines = [
            "2001-01-01",          // no title
            "Ivan Ivanovich",      // no date
            "2001-01-01Ivan",      // no separator
            "1985-05-00 Ivan",     // day out of range
            "1985-05-38 Ivan",
            "1985-00-01 Ivan",     // month out of range
            "1985-13-01 Ivan",
            "985-05-01 Ivan",      // year must have 4 digits
            "19850-05-01 Ivan",
            "01985-05-01 Ivan",
        ];
        for line in bad_lines {
            let result = events_from_str(line, "test", &settings());
            assert!(
                matches!(result, Err(BdayError::InvalidInput { count: 1, .. })),
                "expected parse failure for {:?}",
                line
            );
        }
    }

    #[test]
    fn error_reports_carry_line_numbers_and_text() {
        let input = "2001-01-01 Ivan\nnot a date\n01-02 Oleg";
        let err = events_from_str(input, "test", &settings()).unwrap_err();
        match err {
            BdayError::InvalidInput { count, details, .. } => {
                assert_eq!(count, 1);
                assert!(details.contains("line 2"));
                assert!(details.contains("not a date"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn duplicate_signatures_fail_validation() {
        let input = "2001-01-01 Ivan\n2001-01-01 Ivan";
        let err = events_from_str(input, "test", &settings()).unwrap_err();
        match err {
            BdayError::DuplicateSignatures { details, .. } => {
                assert!(details.contains("line 1"));
                assert!(details.contains("line 2"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn same_date_with_different_titles_is_fine() {
        let input = "2001-01-01 Ivan\n2001-01-01 Oleg";
        assert_eq!(events_from_str(input, "test", &settings()).unwrap().len(), 2);
    }

    #[test]
    fn yearless_and_dated_twins_do_not_collide() {
        // Same month/day and title, but one has a year: distinct signatures
        let input = "1904-01-01 Ivan\n01-01 Ivan";
        assert_eq!(events_from_str(input, "test", &settings()).unwrap().len(), 2);
    }
}
