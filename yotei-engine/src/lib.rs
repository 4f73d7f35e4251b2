//! Aggregation engine for yotei.
//!
//! Consumes the per-account cache snapshots, joins all linked accounts into
//! a single filtered event stream, and exposes the derived views the UI
//! renders (events per date, per hour slot, all-day vs timed split,
//! consecutive-day runs). Also carries the sync wiring that refreshes the
//! cache through the upstream client.

pub mod engine;
pub mod service;
pub mod view;

pub use engine::{CalendarEngine, CalendarView};
pub use service::{AccountSync, SessionSync, SyncService};
pub use view::{DayHourIndex, SlotHalf, SortedEvents, VisibilityMap};
