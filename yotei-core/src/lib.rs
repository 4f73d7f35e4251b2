//! Core types for the yotei calendar aggregator.
//!
//! This crate provides the types shared by the store, the upstream client,
//! the aggregation engine and the HTTP server:
//! - `Event` and related types for calendar events
//! - `AccountCache` / `CalendarInfo` for the per-account cache documents
//! - `slots` for parsing free-text candidate slots
//! - `time` for the fixed Asia/Tokyo view of the calendar

pub mod account;
pub mod calendar;
pub mod error;
pub mod event;
pub mod slots;
pub mod time;
pub mod user;

// Re-export the common types at crate root for convenience
pub use account::{AccountCache, AccountMap, is_stale};
pub use calendar::{CalendarColor, CalendarInfo, CalendarInfoPatch};
pub use error::{YoteiError, YoteiResult};
pub use event::{Attendee, Event, EventTime, NewEvent};
pub use user::UserProfile;
