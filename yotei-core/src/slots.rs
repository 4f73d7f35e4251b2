//! Candidate-slot parsing.
//!
//! Turns a human-written list of tentative meeting slots (one logical
//! candidate per line, Japanese date/weekday conventions) into structured
//! `(date, start, end)` tuples. The parser is total: unparseable input
//! yields an empty list, never an error.

use chrono::{Datelike, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::time;

/// A tentative meeting slot parsed from free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSlot {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Weekday characters in Monday-first order, matching
/// `NaiveDate::weekday().num_days_from_monday()`.
const WEEKDAYS: [&str; 7] = ["月", "火", "水", "木", "金", "土", "日"];

// "M/D" optionally followed by a parenthesised weekday character.
static DATE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})(?:\s*\([月火水木金土日]\))?\s*").unwrap());

// "HH:MM" - or ~ or ～ "HH:MM"
static TIME_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2}):(\d{2})\s*[-~～]\s*(\d{1,2}):(\d{2})").unwrap());

/// Parse candidate slots relative to the current JST date.
pub fn parse_candidate_slots_now(text: &str) -> Vec<CandidateSlot> {
    parse_candidate_slots(text, time::local_today())
}

/// Parse candidate slots from free-form text.
///
/// Each non-empty line (after trimming and stripping a single leading `-`
/// or `・` bullet) must start with an `M/D` date; lines without one are
/// skipped. A month earlier than `today`'s month rolls over to next year.
/// The rest of the line is split on `/`, `,` and `、` into time-range
/// tokens; tokens that don't match `HH:MM ~ HH:MM` are dropped silently.
pub fn parse_candidate_slots(text: &str, today: NaiveDate) -> Vec<CandidateSlot> {
    let mut slots = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        let line = line
            .strip_prefix('-')
            .or_else(|| line.strip_prefix('・'))
            .unwrap_or(line)
            .trim();
        if line.is_empty() {
            continue;
        }

        let Some(captures) = DATE_PREFIX.captures(line) else {
            continue;
        };

        // The captures are \d{1,2}, so these cannot fail.
        let month: u32 = captures[1].parse().unwrap_or(0);
        let day: u32 = captures[2].parse().unwrap_or(0);

        // A month earlier than the current one means next year.
        let year = if month < today.month() {
            today.year() + 1
        } else {
            today.year()
        };
        let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
            continue;
        };

        let matched_end = captures.get(0).map(|m| m.end()).unwrap_or(0);
        let remainder = &line[matched_end..];
        for token in remainder.split(['/', ',', '、']) {
            let Some(range) = TIME_RANGE.captures(token) else {
                continue;
            };
            let (Some(start), Some(end)) = (parse_time(&range[1], &range[2]), parse_time(&range[3], &range[4]))
            else {
                continue;
            };
            slots.push(CandidateSlot { date, start, end });
        }
    }

    slots
}

fn parse_time(hours: &str, minutes: &str) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

/// Render a slot as `M/D(曜) HH:MM~HH:MM` for display.
pub fn format_candidate_slot(slot: &CandidateSlot) -> String {
    let weekday = WEEKDAYS[slot.date.weekday().num_days_from_monday() as usize];
    format!(
        "{}/{}({}) {}~{}",
        slot.date.month(),
        slot.date.day(),
        weekday,
        slot.start.format("%H:%M"),
        slot.end.format("%H:%M"),
    )
}
