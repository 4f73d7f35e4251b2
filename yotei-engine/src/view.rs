//! Derived views over the aggregated account snapshot.
//!
//! Pure functions: the engine recomputes them from each full snapshot push
//! and memoises the results on snapshot identity. All date and hour maths
//! is done in the fixed JST view.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};

use yotei_core::{AccountMap, Attendee, Event, EventTime, time};

/// Session-local visibility per account email. Not persisted.
pub type VisibilityMap = HashMap<String, bool>;

/// Timed events bucketed by `(JST date, JST hour)` for O(1) slot lookups.
pub type DayHourIndex = HashMap<(NaiveDate, u32), Vec<Event>>;

/// Which part of an hour slot to test for overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotHalf {
    First,
    Second,
    Both,
}

/// Result of splitting a day's events into all-day and timed partitions.
#[derive(Debug, Clone, Default)]
pub struct SortedEvents {
    pub all_day: Vec<Event>,
    pub timed: Vec<Event>,
}

/// The unified event stream: events of every shown account, decorated with
/// their parent email, minus events matching a hide keyword.
pub fn all_events(
    accounts: &AccountMap,
    visibility: &VisibilityMap,
    hide_keywords: &[String],
) -> Vec<Event> {
    accounts
        .iter()
        .filter(|(email, _)| visibility.get(email.as_str()).copied().unwrap_or(true))
        .flat_map(|(email, account)| {
            account.events.iter().map(|event| {
                let mut event = event.clone();
                event.parent_email = Some(email.clone());
                event
            })
        })
        .filter(|event| !hide_keywords.iter().any(|keyword| event.matches_keyword(keyword)))
        .collect()
}

/// Events whose JST start date equals the JST date of `at`.
pub fn events_for_date(events: &[Event], at: DateTime<Utc>) -> Vec<Event> {
    let date = time::local_date(at);
    events
        .iter()
        .filter(|event| event.local_start_date() == date)
        .cloned()
        .collect()
}

/// Bucket timed events by their JST start date and hour.
pub fn index_by_day_hour(events: &[Event]) -> DayHourIndex {
    let mut index = DayHourIndex::new();
    for event in events {
        let (EventTime::DateTime(start), EventTime::DateTime(_)) = (&event.start, &event.end)
        else {
            continue;
        };
        index
            .entry((time::local_date(*start), time::local_hour(*start)))
            .or_default()
            .push(event.clone());
    }
    index
}

/// Timed events starting in hour `hour` of `date`.
pub fn events_for_hour_and_day<'a>(
    index: &'a DayHourIndex,
    hour: u32,
    date: NaiveDate,
) -> &'a [Event] {
    index.get(&(date, hour)).map(Vec::as_slice).unwrap_or(&[])
}

/// Whether any timed event of `date` overlaps the given part of the hour
/// slot. Overlap is `event_start < slot_end && event_end > slot_start`.
pub fn has_events_in_time_slot(
    events: &[Event],
    hour: u32,
    date: NaiveDate,
    half: SlotHalf,
) -> bool {
    let hour_start = time::local_midnight(date) + Duration::hours(i64::from(hour));
    let (slot_start, slot_end) = match half {
        SlotHalf::First => (hour_start, hour_start + Duration::minutes(30)),
        SlotHalf::Second => (
            hour_start + Duration::minutes(30),
            hour_start + Duration::hours(1),
        ),
        SlotHalf::Both => (hour_start, hour_start + Duration::hours(1)),
    };

    events.iter().any(|event| {
        let (EventTime::DateTime(start), EventTime::DateTime(end)) = (&event.start, &event.end)
        else {
            return false;
        };
        time::local_date(*start) == date && *start < slot_end && *end > slot_start
    })
}

/// Split into all-day and timed partitions, each ascending by start.
/// All-day events come first in the rendered view.
pub fn sort_events_by_time(events: &[Event]) -> SortedEvents {
    let (mut all_day, mut timed): (Vec<Event>, Vec<Event>) =
        events.iter().cloned().partition(Event::is_all_day);
    all_day.sort_by_key(Event::start_instant);
    timed.sort_by_key(Event::start_instant);
    SortedEvents { all_day, timed }
}

/// How many consecutive days, starting at `day_index`, hold an event with
/// the same summary in the same hour slot. Used to render a multi-day band
/// once at its leftmost occurrence.
pub fn consecutive_days(
    index: &DayHourIndex,
    event: &Event,
    week: &[NaiveDate],
    day_index: usize,
    hour: u32,
) -> usize {
    let mut count = 1;
    for day in week.iter().skip(day_index + 1) {
        let matched = events_for_hour_and_day(index, hour, *day)
            .iter()
            .any(|candidate| candidate.summary == event.summary);
        if matched {
            count += 1;
        } else {
            break;
        }
    }
    count
}

/// True when an earlier day of the week already shows this event's band.
pub fn is_already_displayed(
    index: &DayHourIndex,
    event: &Event,
    week: &[NaiveDate],
    day_index: usize,
    hour: u32,
) -> bool {
    week.iter().take(day_index).any(|day| {
        events_for_hour_and_day(index, hour, *day)
            .iter()
            .any(|candidate| candidate.summary == event.summary)
    })
}

/// All-day events on a given date (the banner row of the weekly view).
pub fn all_day_events_for_date(events: &[Event], date: NaiveDate) -> Vec<Event> {
    events
        .iter()
        .filter(|event| matches!(event.start, EventTime::Date(start) if start == date))
        .cloned()
        .collect()
}

/// Attendees previously seen on a calendar's events, deduplicated by email
/// in first-seen order.
pub fn suggested_attendees(events: &[Event], calendar_id: &str) -> Vec<Attendee> {
    let mut seen = HashSet::new();
    events
        .iter()
        .filter(|event| event.calendar_id.as_deref() == Some(calendar_id))
        .flat_map(|event| event.attendees.iter())
        .filter(|attendee| seen.insert(attendee.email.clone()))
        .cloned()
        .collect()
}
