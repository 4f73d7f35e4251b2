//! Signed bearer sessions.
//!
//! A session carries the signed-in user's identity and OAuth token bundle.
//! The token handed to the client is `{id}.{signature}`: a random id plus
//! an HMAC-SHA256 signature under the session secret, so a forged or
//! tampered token never reaches the registry lookup.

use std::collections::HashMap;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::RwLock;
use uuid::Uuid;

use yotei_google::{SessionTokens, TokenBundle};

type HmacSha256 = Hmac<Sha256>;

/// One signed-in user session.
pub struct UserSession {
    pub uid: String,
    pub email: String,
    pub tokens: Arc<SessionTokens>,
}

/// In-memory session registry.
pub struct SessionStore {
    secret: String,
    inner: RwLock<HashMap<String, Arc<UserSession>>>,
}

impl SessionStore {
    pub fn new(secret: impl Into<String>) -> Self {
        SessionStore {
            secret: secret.into(),
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Register a session and return its signed token.
    pub async fn create(&self, uid: &str, email: &str, bundle: TokenBundle) -> String {
        let id = Uuid::new_v4().to_string();
        let session = Arc::new(UserSession {
            uid: uid.to_string(),
            email: email.to_string(),
            tokens: Arc::new(SessionTokens::new(bundle)),
        });
        self.inner.write().await.insert(id.clone(), session);
        format!("{}.{}", id, self.sign(&id))
    }

    /// Verify a token's signature and look up its session.
    pub async fn resolve(&self, token: &str) -> Option<Arc<UserSession>> {
        let (id, signature) = token.split_once('.')?;
        if !self.verify(id, signature) {
            return None;
        }
        self.inner.read().await.get(id).cloned()
    }

    /// Drop a session. In-flight refreshes for it are simply abandoned;
    /// their results have nowhere to land.
    pub async fn revoke(&self, token: &str) {
        if let Some((id, signature)) = token.split_once('.') {
            if self.verify(id, signature) {
                self.inner.write().await.remove(id);
            }
        }
    }

    fn sign(&self, id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn verify(&self, id: &str, signature: &str) -> bool {
        let Ok(bytes) = hex::decode(signature) else {
            return false;
        };
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(id.as_bytes());
        mac.verify_slice(&bytes).is_ok()
    }
}
