//! Authenticated facade over the Google Calendar v3 API.
//!
//! Given an access token, fetches calendar metadata and time-bounded event
//! windows, normalized into the provider-neutral core types. Recurrences
//! arrive flattened (`singleEvents=true`) and ordered by start time.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use yotei_core::{Attendee, CalendarInfo, Event, EventTime, NewEvent, YoteiError, YoteiResult};

pub const GOOGLE_CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

/// Time-bounded fetch window relative to now.
#[derive(Debug, Clone, Copy)]
pub struct FetchWindow {
    pub months_before: u32,
    pub months_after: u32,
}

impl FetchWindow {
    /// Default window for the primary-calendar listing.
    pub const PRIMARY: FetchWindow = FetchWindow {
        months_before: 3,
        months_after: 6,
    };

    /// Default window for a specific calendar's listing.
    pub const ACCOUNT: FetchWindow = FetchWindow {
        months_before: 2,
        months_after: 4,
    };

    fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            now - Months::new(self.months_before),
            now + Months::new(self.months_after),
        )
    }
}

/// The caller's primary calendar plus its events.
#[derive(Debug, Clone, Serialize)]
pub struct PrimaryCalendarData {
    pub email: String,
    pub primary: Option<CalendarInfo>,
    pub events: Vec<Event>,
}

/// Events of one specific calendar.
#[derive(Debug, Clone, Serialize)]
pub struct AccountEvents {
    pub email: String,
    pub events: Vec<Event>,
}

pub struct CalendarClient {
    http: reqwest::Client,
    base_url: String,
}

impl CalendarClient {
    pub fn new() -> Self {
        Self::with_base_url(GOOGLE_CALENDAR_API)
    }

    /// Client against a different endpoint (used by tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        CalendarClient {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetch the caller's calendar list, pick the primary entry, and list
    /// its events inside the window. Page size 1000.
    pub async fn list_primary_and_events(
        &self,
        access_token: &str,
        email: &str,
        window: FetchWindow,
    ) -> YoteiResult<PrimaryCalendarData> {
        let calendars = self.calendar_list(access_token).await?;
        let primary = calendars
            .into_iter()
            .find(|entry| entry.primary == Some(true))
            .map(CalendarListEntry::into_calendar_info);

        let events = self
            .event_window(access_token, "primary", window, 1000)
            .await?;

        Ok(PrimaryCalendarData {
            email: email.to_string(),
            primary,
            events,
        })
    }

    /// List events of an arbitrary calendar inside the window. Page size 500.
    pub async fn list_events(
        &self,
        access_token: &str,
        email: &str,
        calendar_id: &str,
        window: FetchWindow,
    ) -> YoteiResult<AccountEvents> {
        let events = self
            .event_window(access_token, calendar_id, window, 500)
            .await?;

        Ok(AccountEvents {
            email: email.to_string(),
            events,
        })
    }

    /// Create an event on a calendar and return it as stored upstream.
    pub async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &NewEvent,
    ) -> YoteiResult<Event> {
        event.validate()?;

        let url = format!("{}/calendars/{}/events", self.base_url, calendar_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, Some(calendar_id)).await?;

        let raw: RawEvent = response
            .json()
            .await
            .map_err(|err| YoteiError::UpstreamUnavailable(format!("invalid response: {err}")))?;
        raw.into_event(calendar_id).ok_or_else(|| {
            YoteiError::UpstreamUnavailable("created event is missing start or end".to_string())
        })
    }

    async fn calendar_list(&self, access_token: &str) -> YoteiResult<Vec<CalendarListEntry>> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, None).await?;

        let list: CalendarListResponse = response
            .json()
            .await
            .map_err(|err| YoteiError::UpstreamUnavailable(format!("invalid response: {err}")))?;
        Ok(list.items)
    }

    async fn event_window(
        &self,
        access_token: &str,
        calendar_id: &str,
        window: FetchWindow,
        page_size: u32,
    ) -> YoteiResult<Vec<Event>> {
        let (time_min, time_max) = window.bounds(Utc::now());
        let time_min = time_min.to_rfc3339();
        let time_max = time_max.to_rfc3339();
        let page_size = page_size.to_string();
        let url = format!("{}/calendars/{}/events", self.base_url, calendar_id);

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .bearer_auth(access_token)
                .query(&[
                    ("timeMin", time_min.as_str()),
                    ("timeMax", time_max.as_str()),
                    ("singleEvents", "true"),
                    ("orderBy", "startTime"),
                    ("maxResults", page_size.as_str()),
                ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(transport_error)?;
            let response = check_status(response, Some(calendar_id)).await?;
            let page: EventListResponse = response.json().await.map_err(|err| {
                YoteiError::UpstreamUnavailable(format!("invalid response: {err}"))
            })?;

            events.extend(
                page.items
                    .into_iter()
                    .filter_map(|raw| raw.into_event(calendar_id)),
            );

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(events)
    }
}

impl Default for CalendarClient {
    fn default() -> Self {
        Self::new()
    }
}

fn transport_error(err: reqwest::Error) -> YoteiError {
    YoteiError::UpstreamUnavailable(err.to_string())
}

async fn check_status(
    response: reqwest::Response,
    calendar_id: Option<&str>,
) -> YoteiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        reqwest::StatusCode::UNAUTHORIZED => Err(YoteiError::Unauthorized),
        reqwest::StatusCode::NOT_FOUND => Err(YoteiError::InvalidCalendar(
            calendar_id.unwrap_or("primary").to_string(),
        )),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(YoteiError::UpstreamUnavailable(format!("{status}: {body}")))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    summary_override: Option<String>,
    #[serde(default)]
    primary: Option<bool>,
    #[serde(default)]
    background_color: Option<String>,
    #[serde(default)]
    foreground_color: Option<String>,
}

impl CalendarListEntry {
    fn into_calendar_info(self) -> CalendarInfo {
        // For the primary calendar the summary is the account email.
        let email = self.summary.unwrap_or_else(|| self.id.clone());
        let color = match (self.background_color, self.foreground_color) {
            (Some(background), Some(foreground)) => Some(yotei_core::CalendarColor {
                background,
                foreground,
            }),
            _ => None,
        };
        CalendarInfo {
            id: self.id,
            email,
            display_name: self.summary_override,
            color,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<RawEvent>,
    next_page_token: Option<String>,
}

/// Event as it arrives from the API. Start/end are parsed leniently so a
/// single malformed item cannot fail the whole page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(default)]
    id: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    hangout_link: Option<String>,
    start: Option<serde_json::Value>,
    end: Option<serde_json::Value>,
    #[serde(default)]
    attendees: Vec<RawAttendee>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAttendee {
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl RawEvent {
    fn into_event(self, calendar_id: &str) -> Option<Event> {
        let start = event_time(self.start)?;
        let end = event_time(self.end)?;
        let attendees = self
            .attendees
            .into_iter()
            .filter(|attendee| !attendee.email.is_empty())
            .map(|attendee| Attendee {
                email: attendee.email,
                display_name: attendee.display_name,
            })
            .collect();

        Some(Event {
            id: self.id,
            summary: self.summary,
            description: self.description,
            hangout_link: self.hangout_link,
            start,
            end,
            attendees,
            calendar_id: Some(calendar_id.to_string()),
            // Set at aggregation time, not on ingest.
            parent_email: None,
        })
    }
}

fn event_time(value: Option<serde_json::Value>) -> Option<EventTime> {
    serde_json::from_value(value?).ok()
}
