//! Typed client for the Calendar v3 REST API.
//!
//! Serializes `bday_core::RemoteEvent` directly as request bodies. Every
//! mutating call retries transient failures with exponential backoff;
//! deleting something that is already gone is a warning, not an error.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::StatusCode;
use serde::Deserialize;

use bday_core::{Config, RemoteEvent};

use crate::auth;

const API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const PAGE_SIZE: &str = "2500";

/// Backoff schedule for transient failures; one attempt per entry, plus the
/// final attempt that gives up.
const RETRY_DELAYS_SECS: [u64; 7] = [1, 2, 4, 8, 16, 32, 64];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventAction {
    Create,
    Update,
    Delete,
}

impl EventAction {
    fn progress_label(self) -> &'static str {
        match self {
            EventAction::Create => "Creating events",
            EventAction::Update => "Updating events",
            EventAction::Delete => "Deleting events",
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListPage {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct CalendarListEntry {
    id: String,
    #[serde(default)]
    summary: String,
}

#[derive(Deserialize)]
struct CalendarResource {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<RemoteEvent>,
    next_page_token: Option<String>,
}

/// A connected client, bound to the managed calendar.
pub struct CalendarApi {
    http: reqwest::Client,
    token: String,
    calendar_id: String,
}

impl CalendarApi {
    /// Authorize and bind to the calendar named in the config, creating it
    /// on first use.
    pub async fn connect(config: &Config) -> Result<CalendarApi> {
        let token = auth::access_token(config.oauth_port).await?;
        let mut api = CalendarApi {
            http: reqwest::Client::new(),
            token,
            calendar_id: String::new(),
        };
        api.calendar_id = api.find_or_create_calendar(&config.calendar_name).await?;
        Ok(api)
    }

    async fn find_or_create_calendar(&self, name: &str) -> Result<String> {
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(format!("{}/users/me/calendarList", API_BASE))
                .bearer_auth(&self.token);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: CalendarListPage = check(request.send().await)?
                .json()
                .await
                .context("Failed to parse calendar list")?;

            if let Some(entry) = page.items.into_iter().find(|c| c.summary == name) {
                return Ok(entry.id);
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        eprintln!("Creating calendar '{}'...", name);
        let created: CalendarResource = check(
            self.http
                .post(format!("{}/calendars", API_BASE))
                .bearer_auth(&self.token)
                .json(&serde_json::json!({ "summary": name }))
                .send()
                .await,
        )?
        .json()
        .await
        .context("Failed to parse created calendar")?;
        Ok(created.id)
    }

    /// Fetch every event in the managed calendar.
    ///
    /// Recurring events come back as single entries (`singleEvents=false`).
    /// Cancelled exceptions of recurring events still show up in the listing
    /// and are filtered out here.
    pub async fn list_events(&self) -> Result<Vec<RemoteEvent>> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(format!("{}/calendars/{}/events", API_BASE, self.calendar_id))
                .bearer_auth(&self.token)
                .query(&[("maxResults", PAGE_SIZE), ("singleEvents", "false")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: EventsPage = check(request.send().await)?
                .json()
                .await
                .context("Failed to parse event list")?;

            events.extend(page.items.into_iter().filter(|event| {
                event.status.as_deref() != Some("cancelled")
                    && event.start.naive_date().is_some()
            }));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(events)
    }

    pub async fn create_events(&self, events: &[RemoteEvent]) -> Result<()> {
        self.process_batch(EventAction::Create, events).await
    }

    /// Every payload must carry the id of the remote event it replaces.
    pub async fn update_events(&self, events: &[RemoteEvent]) -> Result<()> {
        self.process_batch(EventAction::Update, events).await
    }

    pub async fn delete_events(&self, events: &[RemoteEvent]) -> Result<()> {
        self.process_batch(EventAction::Delete, events).await
    }

    async fn process_batch(&self, action: EventAction, events: &[RemoteEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        let bar = ProgressBar::new(events.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:30}] {pos}/{len}")
                .unwrap()
                .progress_chars("=> "),
        );
        bar.set_message(action.progress_label());
        for event in events {
            self.process_one(action, event).await?;
            bar.inc(1);
        }
        bar.finish_and_clear();
        Ok(())
    }

    async fn process_one(&self, action: EventAction, event: &RemoteEvent) -> Result<()> {
        let events_url = format!("{}/calendars/{}/events", API_BASE, self.calendar_id);
        let event_url = |id: &str| format!("{}/{}", events_url, id);
        let id = || {
            event
                .id
                .as_deref()
                .with_context(|| format!("Event '{}' has no remote id", event.summary))
        };

        let mut attempt = 0;
        loop {
            let request = match action {
                EventAction::Create => self.http.post(&events_url).json(event),
                EventAction::Update => self.http.put(event_url(id()?)).json(event),
                EventAction::Delete => self.http.delete(event_url(id()?)),
            };

            let failure = match request.bearer_auth(&self.token).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) if response.status() == StatusCode::GONE => {
                    // Happens when a manually created exception of a
                    // recurring event is deleted after its parent
                    eprintln!(
                        "Event '{}' is already gone, ignoring this error.",
                        event.summary
                    );
                    return Ok(());
                }
                Ok(response) if !is_transient(response.status()) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    bail!(
                        "{} failed for '{}': {} {}",
                        action.progress_label(),
                        event.summary,
                        status,
                        body
                    );
                }
                Ok(response) => format!("status {}", response.status()),
                Err(e) => e.to_string(),
            };

            if attempt >= RETRY_DELAYS_SECS.len() {
                bail!(
                    "{} failed for '{}' after {} attempts: {}",
                    action.progress_label(),
                    event.summary,
                    attempt + 1,
                    failure
                );
            }
            let delay = RETRY_DELAYS_SECS[attempt];
            eprintln!("Request failed with {}, retrying in {}s...", failure, delay);
            tokio::time::sleep(std::time::Duration::from_secs(delay)).await;
            attempt += 1;
        }
    }
}

/// Rate limiting and server hiccups are worth retrying, other client errors
/// are not.
fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::FORBIDDEN
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

fn check(result: reqwest::Result<reqwest::Response>) -> Result<reqwest::Response> {
    let response = result.context("Request to the Calendar API failed")?;
    if !response.status().is_success() {
        bail!("Calendar API returned {}", response.status());
    }
    Ok(response)
}
