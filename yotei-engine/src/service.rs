//! Sync wiring: token manager → upstream client → cache.
//!
//! `SyncService` is the shared fetch-and-persist path used by both the HTTP
//! facade and the engine's initial load. The `AccountSync` trait is the seam
//! the engine consumes, bound to one authenticated session.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use yotei_core::{AccountCache, CalendarInfo, Event, NewEvent, YoteiResult};
use yotei_google::{
    AccountEvents, CalendarClient, FetchWindow, PrimaryCalendarData, SessionTokens, TokenManager,
};
use yotei_store::DocumentStore;

/// Upstream sync operations as seen by the aggregation engine.
#[async_trait]
pub trait AccountSync: Send + Sync {
    /// Fetch the primary calendar and its events for `email`, replacing the
    /// cached account document.
    async fn refresh_primary(&self, uid: &str, email: &str) -> YoteiResult<PrimaryCalendarData>;

    /// Create an event upstream, then append it to the cached account.
    /// An upstream failure leaves the cache untouched.
    async fn create_event(
        &self,
        uid: &str,
        email: &str,
        calendar_id: &str,
        event: &NewEvent,
    ) -> YoteiResult<Event>;
}

/// Production wiring over the real token manager, client and store.
pub struct SyncService {
    tokens: TokenManager,
    client: CalendarClient,
    store: Arc<DocumentStore>,
}

impl SyncService {
    pub fn new(tokens: TokenManager, client: CalendarClient, store: Arc<DocumentStore>) -> Self {
        SyncService {
            tokens,
            client,
            store,
        }
    }

    /// Fetch the primary calendar + events with the session's credential and
    /// persist them as the account document for `email`.
    pub async fn refresh_primary(
        &self,
        uid: &str,
        email: &str,
        session: &SessionTokens,
    ) -> YoteiResult<PrimaryCalendarData> {
        let token = self.tokens.current_access_token(session).await?;
        let data = self
            .client
            .list_primary_and_events(&token, email, FetchWindow::PRIMARY)
            .await?;

        let calendar_info = data
            .primary
            .clone()
            .unwrap_or_else(|| CalendarInfo::for_email(email));
        let cache = AccountCache {
            events: data.events.clone(),
            calendar_info,
            last_updated: Utc::now(),
        };
        self.store.write_account(uid, email, &cache).await?;
        info!(%email, events = cache.events.len(), "refreshed primary calendar");

        Ok(data)
    }

    /// Fetch events of an arbitrary calendar and persist them under that
    /// calendar's account document (the primary calendar id doubles as the
    /// account email), keeping any cached metadata.
    pub async fn refresh_account(
        &self,
        uid: &str,
        session_email: &str,
        calendar_id: &str,
        session: &SessionTokens,
    ) -> YoteiResult<AccountEvents> {
        let token = self.tokens.current_access_token(session).await?;
        let data = self
            .client
            .list_events(&token, session_email, calendar_id, FetchWindow::ACCOUNT)
            .await?;

        let calendar_info = self
            .store
            .read_accounts(uid)
            .await?
            .remove(calendar_id)
            .map(|cached| cached.calendar_info)
            .unwrap_or_else(|| CalendarInfo::for_email(calendar_id));
        let cache = AccountCache {
            events: data.events.clone(),
            calendar_info,
            last_updated: Utc::now(),
        };
        self.store.write_account(uid, calendar_id, &cache).await?;

        Ok(data)
    }

    /// Create an event upstream, then append the stored form to the cache.
    pub async fn create_event(
        &self,
        uid: &str,
        email: &str,
        calendar_id: &str,
        session: &SessionTokens,
        event: &NewEvent,
    ) -> YoteiResult<Event> {
        let token = self.tokens.current_access_token(session).await?;
        let created = self.client.insert_event(&token, calendar_id, event).await?;
        self.store.append_event(uid, email, created.clone()).await?;
        Ok(created)
    }
}

/// `AccountSync` bound to one authenticated session.
pub struct SessionSync {
    service: Arc<SyncService>,
    session: Arc<SessionTokens>,
}

impl SessionSync {
    pub fn new(service: Arc<SyncService>, session: Arc<SessionTokens>) -> Self {
        SessionSync { service, session }
    }
}

#[async_trait]
impl AccountSync for SessionSync {
    async fn refresh_primary(&self, uid: &str, email: &str) -> YoteiResult<PrimaryCalendarData> {
        self.service.refresh_primary(uid, email, &self.session).await
    }

    async fn create_event(
        &self,
        uid: &str,
        email: &str,
        calendar_id: &str,
        event: &NewEvent,
    ) -> YoteiResult<Event> {
        self.service
            .create_event(uid, email, calendar_id, &self.session, event)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use yotei_core::is_stale;
    use yotei_google::{OAuthConfig, TokenBundle};

    use crate::engine::CalendarEngine;

    fn fresh_session() -> Arc<SessionTokens> {
        Arc::new(SessionTokens::new(TokenBundle {
            access_token: "live-token".to_string(),
            refresh_token: "refresh-1".to_string(),
            expires_at: Some(Utc::now() + Duration::hours(1)),
        }))
    }

    fn sync_service(server: &MockServer, store: Arc<DocumentStore>) -> Arc<SyncService> {
        let oauth = OAuthConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            token_url: format!("{}/token", server.uri()),
        };
        Arc::new(SyncService::new(
            TokenManager::new(oauth),
            CalendarClient::with_base_url(server.uri()),
            store,
        ))
    }

    async fn mount_primary_mocks(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "a@x",
                    "summary": "a@x",
                    "primary": true
                }]
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "ev1",
                    "summary": "Standup",
                    "start": {"dateTime": "2025-01-10T09:00:00+09:00"},
                    "end": {"dateTime": "2025-01-10T09:30:00+09:00"}
                }]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_refresh_primary_persists_a_stamped_account() {
        let server = MockServer::start().await;
        mount_primary_mocks(&server).await;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DocumentStore::new(dir.path()));
        let service = sync_service(&server, Arc::clone(&store));

        let data = service
            .refresh_primary("u1", "a@x", &fresh_session())
            .await
            .unwrap();
        assert_eq!(data.primary.as_ref().unwrap().email, "a@x");

        let accounts = store.read_accounts("u1").await.unwrap();
        assert_eq!(accounts["a@x"].events.len(), 1);
        assert!(!is_stale(accounts["a@x"].last_updated, Utc::now()));
    }

    #[tokio::test]
    async fn test_session_sync_drives_the_engine_initial_load() {
        let server = MockServer::start().await;
        mount_primary_mocks(&server).await;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DocumentStore::new(dir.path()));
        let sync = Arc::new(SessionSync::new(
            sync_service(&server, Arc::clone(&store)),
            fresh_session(),
        ));

        let engine = CalendarEngine::start(Arc::clone(&store), sync, "u1", "a@x")
            .await
            .unwrap();

        let events = engine.all_events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Standup");
        assert_eq!(events[0].parent_email.as_deref(), Some("a@x"));
    }
}
