//! Google upstream integration for yotei.
//!
//! Two pieces: the OAuth token lifecycle (refresh ahead of expiry, one
//! exchange in flight per session) and a thin authenticated facade over the
//! Google Calendar v3 API.

pub mod client;
pub mod token;

pub use client::{
    AccountEvents, CalendarClient, FetchWindow, GOOGLE_CALENDAR_API, PrimaryCalendarData,
};
pub use token::{GOOGLE_TOKEN_URL, OAuthConfig, SessionTokens, TokenBundle, TokenManager};
