//! User profile document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted per-user profile.
///
/// `hide_keywords` is a set of exact-match strings; events whose title or
/// description equals one of them are dropped at aggregation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: String,
    #[serde(default)]
    pub is_anonymous: bool,
    pub last_sign_in_time: DateTime<Utc>,
    #[serde(default)]
    pub hide_keywords: Vec<String>,
}

impl UserProfile {
    pub fn new(uid: &str, email: &str) -> Self {
        UserProfile {
            uid: uid.to_string(),
            email: email.to_string(),
            display_name: String::new(),
            photo_url: String::new(),
            is_anonymous: false,
            last_sign_in_time: Utc::now(),
            hide_keywords: Vec::new(),
        }
    }
}
