//! Calendar event types.
//!
//! Events come in two shapes: all-day (a calendar date) and timed (a zoned
//! instant). The two are modelled as a tagged variant rather than a pair of
//! optional fields, while the serde representation keeps the upstream wire
//! shape (`{"date": ...}` / `{"dateTime": ...}`).

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{YoteiError, YoteiResult};
use crate::time;

/// A calendar event as cached per account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Video-meeting link, if the event carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hangout_link: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
    /// Identifier of the calendar the event was fetched from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
    /// Email of the account the event belongs to.
    /// Populated during aggregation, never on ingest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_email: Option<String>,
}

impl Event {
    pub fn is_all_day(&self) -> bool {
        matches!(self.start, EventTime::Date(_))
    }

    /// Start as a UTC instant. All-day events count as UTC midnight of
    /// their date, which keeps them ahead of same-day timed events when
    /// sorting in the JST view.
    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.instant()
    }

    /// JST calendar date the event starts on.
    pub fn local_start_date(&self) -> NaiveDate {
        self.start.local_date()
    }

    /// True when the title or the description equals `keyword` exactly.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        self.summary == keyword || self.description.as_deref() == Some(keyword)
    }
}

/// An event attendee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Start or end of an event: an all-day calendar date, or a zoned instant
/// normalized to UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEventTime", into = "RawEventTime")]
pub enum EventTime {
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl EventTime {
    pub fn instant(&self) -> DateTime<Utc> {
        match self {
            EventTime::Date(date) => date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc(),
            EventTime::DateTime(at) => *at,
        }
    }

    /// JST date component. All-day dates are already calendar dates and
    /// need no shifting.
    pub fn local_date(&self) -> NaiveDate {
        match self {
            EventTime::Date(date) => *date,
            EventTime::DateTime(at) => time::local_date(*at),
        }
    }
}

/// Wire form of [`EventTime`]: exactly one of `date` / `dateTime` is set.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_time: Option<DateTime<FixedOffset>>,
}

impl TryFrom<RawEventTime> for EventTime {
    type Error = String;

    fn try_from(raw: RawEventTime) -> Result<Self, Self::Error> {
        match (raw.date, raw.date_time) {
            (Some(date), None) => Ok(EventTime::Date(date)),
            (None, Some(at)) => Ok(EventTime::DateTime(at.with_timezone(&Utc))),
            (Some(_), Some(_)) => Err("event time has both date and dateTime".to_string()),
            (None, None) => Err("event time has neither date nor dateTime".to_string()),
        }
    }
}

impl From<EventTime> for RawEventTime {
    fn from(time: EventTime) -> Self {
        match time {
            EventTime::Date(date) => RawEventTime {
                date: Some(date),
                date_time: None,
            },
            EventTime::DateTime(at) => RawEventTime {
                date: None,
                date_time: Some(at.fixed_offset()),
            },
        }
    }
}

/// An event to be created upstream. The target calendar travels separately
/// (it is part of the request path, not the body).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
}

impl NewEvent {
    /// Checks the start/end invariant before the event is sent upstream.
    pub fn validate(&self) -> YoteiResult<()> {
        match (&self.start, &self.end) {
            (EventTime::DateTime(start), EventTime::DateTime(end)) if end < start => Err(
                YoteiError::InvalidEvent("end precedes start".to_string()),
            ),
            (EventTime::Date(start), EventTime::Date(end)) if end < start => Err(
                YoteiError::InvalidEvent("end precedes start".to_string()),
            ),
            (EventTime::Date(_), EventTime::DateTime(_))
            | (EventTime::DateTime(_), EventTime::Date(_)) => Err(YoteiError::InvalidEvent(
                "start and end must both be all-day or both be timed".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
