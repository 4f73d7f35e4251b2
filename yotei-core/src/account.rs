//! Per-account cache documents.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarInfo;
use crate::event::Event;

/// Cached calendar data for one `(user, email)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCache {
    #[serde(default)]
    pub events: Vec<Event>,
    pub calendar_info: CalendarInfo,
    /// Stamped by the writer on every full replace and append.
    pub last_updated: DateTime<Utc>,
}

/// All cached accounts of a user, keyed by account email.
pub type AccountMap = BTreeMap<String, AccountCache>;

/// Staleness predicate applied by callers; the store itself is oblivious
/// to freshness. An account older than one hour needs a refresh.
pub fn is_stale(last_updated: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - last_updated > Duration::hours(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_stale_threshold() {
        let now = Utc::now();
        assert!(!is_stale(now - Duration::minutes(59), now));
        assert!(is_stale(now - Duration::minutes(61), now));
    }
}
