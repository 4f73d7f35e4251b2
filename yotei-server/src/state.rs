//! Shared application state.

use std::sync::Arc;

use yotei_engine::SyncService;
use yotei_google::{CalendarClient, TokenManager};
use yotei_store::DocumentStore;

use crate::config::ServerConfig;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub sessions: Arc<SessionStore>,
    pub sync: Arc<SyncService>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        let store = Arc::new(DocumentStore::new(&config.data_dir));

        let client = match &config.calendar_api_url {
            Some(url) => CalendarClient::with_base_url(url),
            None => CalendarClient::new(),
        };
        let sync = Arc::new(SyncService::new(
            TokenManager::new(config.oauth()),
            client,
            Arc::clone(&store),
        ));

        AppState {
            store,
            sessions: Arc::new(SessionStore::new(&config.session_secret)),
            sync,
        }
    }
}
