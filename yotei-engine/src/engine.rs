//! The per-session aggregation engine.
//!
//! Owns the in-memory account snapshot for one signed-in user: loads the
//! cache (refreshing what the session credential can refresh), follows the
//! store's live snapshot feed, and answers the derived-view queries. The
//! session-local visibility map lives here, never in the cache.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use yotei_core::{
    Attendee, CalendarColor, Event, NewEvent, YoteiResult, is_stale,
};
use yotei_store::DocumentStore;

use crate::service::AccountSync;
use crate::view::{self, DayHourIndex, SlotHalf, SortedEvents, VisibilityMap};

/// Calendar metadata as the UI sees it: the persisted fields joined with
/// the session-local visibility flag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarView {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<CalendarColor>,
    pub is_shown: bool,
}

struct EngineState {
    accounts: yotei_core::AccountMap,
    visibility: VisibilityMap,
    hide_keywords: Vec<String>,
    // Memoised per snapshot.
    all_events: Vec<Event>,
    index: DayHourIndex,
}

impl EngineState {
    fn rebuild(&mut self) {
        self.all_events = view::all_events(&self.accounts, &self.visibility, &self.hide_keywords);
        self.index = view::index_by_day_hour(&self.all_events);
    }

    /// Align the visibility map with the current account set, keeping the
    /// flag of accounts that survive the push. New accounts start shown.
    fn reconcile_visibility(&mut self) {
        self.visibility = self
            .accounts
            .keys()
            .map(|email| {
                let shown = self.visibility.get(email).copied().unwrap_or(true);
                (email.clone(), shown)
            })
            .collect();
    }
}

pub struct CalendarEngine {
    uid: String,
    session_email: String,
    store: Arc<DocumentStore>,
    sync: Arc<dyn AccountSync>,
    state: Arc<RwLock<EngineState>>,
    pump: JoinHandle<()>,
}

impl CalendarEngine {
    /// Load the user's cached accounts and start following live updates.
    ///
    /// Initial load: an empty cache (or one without the session account)
    /// registers the session email; otherwise every stale account matching
    /// the session email is refreshed. Stale accounts owned by other
    /// credentials are skipped.
    pub async fn start(
        store: Arc<DocumentStore>,
        sync: Arc<dyn AccountSync>,
        uid: &str,
        session_email: &str,
    ) -> YoteiResult<Self> {
        let hide_keywords = store
            .read_user(uid)
            .await?
            .map(|profile| profile.hide_keywords)
            .unwrap_or_default();

        let mut accounts = store.read_accounts(uid).await?;
        let now = Utc::now();

        if accounts.is_empty() || !accounts.contains_key(session_email) {
            sync.refresh_primary(uid, session_email).await?;
            accounts = store.read_accounts(uid).await?;
        } else {
            let stale: Vec<String> = accounts
                .iter()
                .filter(|(_, cache)| is_stale(cache.last_updated, now))
                .map(|(email, _)| email.clone())
                .collect();

            let mut refreshed = false;
            for email in stale {
                if email == session_email {
                    sync.refresh_primary(uid, &email).await?;
                    refreshed = true;
                } else {
                    // Refreshing this account needs its own credential,
                    // which this session does not hold.
                    debug!(%email, "skipping stale account not owned by this session");
                }
            }
            if refreshed {
                accounts = store.read_accounts(uid).await?;
            }
        }

        let visibility: VisibilityMap =
            accounts.keys().map(|email| (email.clone(), true)).collect();
        let mut initial = EngineState {
            accounts,
            visibility,
            hide_keywords,
            all_events: Vec::new(),
            index: DayHourIndex::new(),
        };
        initial.rebuild();
        let state = Arc::new(RwLock::new(initial));

        let mut subscription = store.subscribe(uid);
        let pump_state = Arc::clone(&state);
        let pump = tokio::spawn(async move {
            while let Some(snapshot) = subscription.next().await {
                let mut state = pump_state.write().await;
                state.accounts = snapshot;
                state.reconcile_visibility();
                state.rebuild();
            }
        });

        Ok(CalendarEngine {
            uid: uid.to_string(),
            session_email: session_email.to_string(),
            store,
            sync,
            state,
            pump,
        })
    }

    /// The unified filtered event stream, each event decorated with its
    /// parent account email.
    pub async fn all_events(&self) -> Vec<Event> {
        self.state.read().await.all_events.clone()
    }

    /// Calendars joined with their session-local visibility.
    pub async fn calendars(&self) -> Vec<CalendarView> {
        let state = self.state.read().await;
        state
            .accounts
            .iter()
            .map(|(email, account)| {
                let info = &account.calendar_info;
                CalendarView {
                    // The account email doubles as the calendar identifier.
                    id: email.clone(),
                    email: email.clone(),
                    display_name: info.display_name.clone(),
                    color: info.color.clone(),
                    is_shown: state.visibility.get(email).copied().unwrap_or(true),
                }
            })
            .collect()
    }

    /// Flip a calendar's visibility. Session-local; the cache is untouched.
    pub async fn toggle_calendar(&self, email: &str) {
        let mut state = self.state.write().await;
        if let Some(shown) = state.visibility.get_mut(email) {
            *shown = !*shown;
            state.rebuild();
        }
    }

    /// Force a refresh of the session account (the UI's retry path).
    pub async fn refresh(&self) -> YoteiResult<()> {
        self.sync
            .refresh_primary(&self.uid, &self.session_email)
            .await?;
        Ok(())
    }

    pub async fn events_for_date(&self, at: DateTime<Utc>) -> Vec<Event> {
        view::events_for_date(&self.state.read().await.all_events, at)
    }

    pub async fn events_for_hour_and_day(&self, hour: u32, date: NaiveDate) -> Vec<Event> {
        view::events_for_hour_and_day(&self.state.read().await.index, hour, date).to_vec()
    }

    pub async fn has_events_in_time_slot(&self, hour: u32, date: NaiveDate, half: SlotHalf) -> bool {
        view::has_events_in_time_slot(&self.state.read().await.all_events, hour, date, half)
    }

    pub async fn sorted_events_for_date(&self, at: DateTime<Utc>) -> SortedEvents {
        view::sort_events_by_time(&self.events_for_date(at).await)
    }

    pub async fn consecutive_days(
        &self,
        event: &Event,
        week: &[NaiveDate],
        day_index: usize,
        hour: u32,
    ) -> usize {
        view::consecutive_days(&self.state.read().await.index, event, week, day_index, hour)
    }

    pub async fn is_already_displayed(
        &self,
        event: &Event,
        week: &[NaiveDate],
        day_index: usize,
        hour: u32,
    ) -> bool {
        view::is_already_displayed(&self.state.read().await.index, event, week, day_index, hour)
    }

    pub async fn all_day_events_for_date(&self, date: NaiveDate) -> Vec<Event> {
        view::all_day_events_for_date(&self.state.read().await.all_events, date)
    }

    pub async fn suggested_attendees(&self, calendar_id: &str) -> Vec<Attendee> {
        view::suggested_attendees(&self.state.read().await.all_events, calendar_id)
    }

    /// Create an event on a calendar. The primary calendar id is the owning
    /// account's email, so the append lands in that account's document and
    /// the live subscription delivers the update back to this view.
    pub async fn create_event(&self, calendar_id: &str, event: &NewEvent) -> YoteiResult<Event> {
        self.sync
            .create_event(&self.uid, calendar_id, calendar_id, event)
            .await
    }

    /// Add a hide keyword for this user and re-filter the view.
    pub async fn add_hide_keyword(&self, keyword: &str) -> YoteiResult<()> {
        self.store.add_hide_keyword(&self.uid, keyword).await?;
        let mut state = self.state.write().await;
        if !state.hide_keywords.iter().any(|k| k == keyword) {
            state.hide_keywords.push(keyword.to_string());
            state.rebuild();
        }
        Ok(())
    }

    /// Remove a hide keyword for this user and re-filter the view.
    pub async fn remove_hide_keyword(&self, keyword: &str) -> YoteiResult<()> {
        self.store.remove_hide_keyword(&self.uid, keyword).await?;
        let mut state = self.state.write().await;
        state.hide_keywords.retain(|k| k != keyword);
        state.rebuild();
        Ok(())
    }

    /// Stop following store updates and release the subscription.
    pub fn shutdown(self) {
        self.pump.abort();
    }
}

impl Drop for CalendarEngine {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
