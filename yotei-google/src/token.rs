//! OAuth token lifecycle.
//!
//! Guarantees that any outbound call to the calendar service carries a
//! non-expired access credential. The bundle lives in the session, not in
//! the cache, and is refreshed ahead of expiry with at most one exchange
//! in flight per session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use yotei_core::{YoteiError, YoteiResult};

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refresh this many seconds before the access credential expires.
const REFRESH_SAFETY_WINDOW_SECS: i64 = 300;

/// The session-local credential triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry of the access token. Unknown expiry counts as
    /// expired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenBundle {
    /// True when the access token must be refreshed before use:
    /// `expires_at` is absent, or expiry is within the safety window.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => now + Duration::seconds(REFRESH_SAFETY_WINDOW_SECS) >= expires_at,
        }
    }
}

/// Per-session token state: the bundle plus the single-flight refresh gate.
pub struct SessionTokens {
    bundle: RwLock<TokenBundle>,
    refresh_gate: Mutex<()>,
}

impl SessionTokens {
    pub fn new(bundle: TokenBundle) -> Self {
        SessionTokens {
            bundle: RwLock::new(bundle),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Current bundle snapshot.
    pub async fn bundle(&self) -> TokenBundle {
        self.bundle.read().await.clone()
    }
}

/// Client credentials and token endpoint for the refresh exchange.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
}

impl OAuthConfig {
    pub fn google(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        OAuthConfig {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshedTokens {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

/// Performs refresh exchanges against the identity provider.
pub struct TokenManager {
    http: reqwest::Client,
    oauth: OAuthConfig,
}

impl TokenManager {
    pub fn new(oauth: OAuthConfig) -> Self {
        TokenManager {
            http: reqwest::Client::new(),
            oauth,
        }
    }

    /// A non-expired access token for the session, refreshing first if the
    /// stored one is inside the safety window.
    ///
    /// Two racing callers perform at most one exchange: the loser of the
    /// gate re-checks the bundle and normally returns the winner's token.
    /// On a failed exchange the bundle is left untouched.
    pub async fn current_access_token(&self, session: &SessionTokens) -> YoteiResult<String> {
        {
            let bundle = session.bundle.read().await;
            if !bundle.needs_refresh(Utc::now()) {
                return Ok(bundle.access_token.clone());
            }
        }

        let _gate = session.refresh_gate.lock().await;

        let refresh_token = {
            let bundle = session.bundle.read().await;
            if !bundle.needs_refresh(Utc::now()) {
                return Ok(bundle.access_token.clone());
            }
            bundle.refresh_token.clone()
        };

        info!("access token near expiry, refreshing");
        let refreshed = match self.exchange(&refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(err) => {
                // No automatic logout; the user can reauthenticate manually.
                warn!(%err, "token refresh failed");
                return Err(err);
            }
        };

        let mut bundle = session.bundle.write().await;
        bundle.access_token = refreshed.access_token.clone();
        bundle.expires_at = Some(Utc::now() + Duration::seconds(refreshed.expires_in));
        if let Some(rotated) = refreshed.refresh_token {
            bundle.refresh_token = rotated;
        }

        Ok(refreshed.access_token)
    }

    async fn exchange(&self, refresh_token: &str) -> YoteiResult<RefreshedTokens> {
        let params = [
            ("client_id", self.oauth.client_id.as_str()),
            ("client_secret", self.oauth.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let response = self
            .http
            .post(&self.oauth.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|err| YoteiError::RefreshFailed(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YoteiError::RefreshFailed(format!("{status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|err| YoteiError::RefreshFailed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manager(server: &MockServer) -> TokenManager {
        TokenManager::new(OAuthConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            token_url: format!("{}/token", server.uri()),
        })
    }

    fn session(expires_in: Option<i64>) -> SessionTokens {
        SessionTokens::new(TokenBundle {
            access_token: "old-token".to_string(),
            refresh_token: "refresh-1".to_string(),
            expires_at: expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }

    fn refresh_response(refresh_token: Option<&str>) -> ResponseTemplate {
        let mut body = serde_json::json!({
            "access_token": "new-token",
            "expires_in": 3600,
        });
        if let Some(token) = refresh_token {
            body["refresh_token"] = serde_json::json!(token);
        }
        ResponseTemplate::new(200).set_body_json(body)
    }

    #[tokio::test]
    async fn test_fresh_token_skips_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(refresh_response(None))
            .expect(0)
            .mount(&server)
            .await;

        let session = session(Some(3600));
        let token = manager(&server).current_access_token(&session).await.unwrap();
        assert_eq!(token, "old-token");
    }

    #[tokio::test]
    async fn test_refresh_inside_safety_window() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(refresh_response(None))
            .expect(1)
            .mount(&server)
            .await;

        // 100s to expiry is inside the 300s window.
        let session = session(Some(100));
        let token = manager(&server).current_access_token(&session).await.unwrap();
        assert_eq!(token, "new-token");

        let bundle = session.bundle().await;
        assert_eq!(bundle.access_token, "new-token");
        // Provider did not rotate the refresh token, so it is kept.
        assert_eq!(bundle.refresh_token, "refresh-1");
        let expires_at = bundle.expires_at.unwrap();
        assert!(expires_at > Utc::now() + Duration::seconds(3000));
    }

    #[tokio::test]
    async fn test_unknown_expiry_forces_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(refresh_response(None))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(None);
        let token = manager(&server).current_access_token(&session).await.unwrap();
        assert_eq!(token, "new-token");
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_replaces_stored() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(refresh_response(Some("refresh-2")))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(Some(0));
        manager(&server).current_access_token(&session).await.unwrap();
        assert_eq!(session.bundle().await.refresh_token, "refresh-2");
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_bundle_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(Some(100));
        let before = session.bundle().await;
        let result = manager(&server).current_access_token(&session).await;
        assert!(matches!(result, Err(YoteiError::RefreshFailed(_))));

        let after = session.bundle().await;
        assert_eq!(after.access_token, before.access_token);
        assert_eq!(after.refresh_token, before.refresh_token);
        assert_eq!(after.expires_at, before.expires_at);
    }

    #[tokio::test]
    async fn test_concurrent_requests_trigger_one_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(refresh_response(None).set_delay(StdDuration::from_millis(50)))
            .expect(1)
            .mount(&server)
            .await;

        let manager = manager(&server);
        let session = session(Some(100));

        let (first, second) = tokio::join!(
            manager.current_access_token(&session),
            manager.current_access_token(&session),
        );
        assert_eq!(first.unwrap(), "new-token");
        assert_eq!(second.unwrap(), "new-token");
    }
}
