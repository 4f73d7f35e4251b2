//! Filesystem-backed document store.
//!
//! Layout: `users/{uid}.json` holds the user profile,
//! `calendars/{uid}/accounts/{email}.json` one cache document per linked
//! account. A per-user mutex linearises writes, so subscribers observe a
//! total order of snapshots consistent with the write order. The store
//! knows nothing about freshness; staleness is the caller's concern.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, broadcast};
use tracing::warn;

use yotei_core::{
    AccountCache, AccountMap, CalendarInfoPatch, Event, UserProfile, YoteiError, YoteiResult,
};

use crate::subscription::Subscription;

/// Capacity of each user's snapshot channel. A lagged subscriber skips to
/// the newest snapshot, which is always a full replacement.
const SNAPSHOT_CHANNEL_CAPACITY: usize = 16;

pub struct DocumentStore {
    root: PathBuf,
    user_locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
    watchers: std::sync::Mutex<HashMap<String, broadcast::Sender<AccountMap>>>,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DocumentStore {
            root: root.into(),
            user_locks: std::sync::Mutex::new(HashMap::new()),
            watchers: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Snapshot of all cached accounts for a user; empty if none.
    pub async fn read_accounts(&self, uid: &str) -> YoteiResult<AccountMap> {
        let dir = self.accounts_dir(uid);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(AccountMap::new());
            }
            Err(err) => return Err(err.into()),
        };

        let mut accounts = AccountMap::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(email) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            // A corrupt cache document is dropped rather than taking the
            // whole snapshot down; the next refresh rewrites it.
            match read_json::<AccountCache>(&path).await {
                Ok(Some(cache)) => {
                    accounts.insert(email.to_string(), cache);
                }
                Ok(None) => {}
                Err(err) => warn!(%email, %err, "skipping unreadable account document"),
            }
        }
        Ok(accounts)
    }

    /// Full replace of one account document. `last_updated` is supplied by
    /// the writer.
    pub async fn write_account(
        &self,
        uid: &str,
        email: &str,
        cache: &AccountCache,
    ) -> YoteiResult<()> {
        let lock = self.user_lock(uid);
        let _guard = lock.lock().await;

        write_json(&self.account_path(uid, email), cache).await?;
        self.publish(uid).await
    }

    /// Partial update of colour / display-name. Events and `last_updated`
    /// are left untouched.
    pub async fn merge_calendar_info(
        &self,
        uid: &str,
        email: &str,
        patch: &CalendarInfoPatch,
    ) -> YoteiResult<()> {
        let lock = self.user_lock(uid);
        let _guard = lock.lock().await;

        let path = self.account_path(uid, email);
        let mut cache: AccountCache = read_json(&path).await?.ok_or_else(|| {
            YoteiError::StoreUnavailable(format!("no cached account for {email}"))
        })?;
        patch.apply_to(&mut cache.calendar_info);

        write_json(&path, &cache).await?;
        self.publish(uid).await
    }

    /// Read–append–stamp–write of a single event. Deliberately not
    /// transactional across concurrent appenders; last writer wins.
    pub async fn append_event(&self, uid: &str, email: &str, event: Event) -> YoteiResult<()> {
        let lock = self.user_lock(uid);
        let _guard = lock.lock().await;

        let path = self.account_path(uid, email);
        let mut cache: AccountCache = read_json(&path).await?.ok_or_else(|| {
            YoteiError::StoreUnavailable(format!("no cached account for {email}"))
        })?;
        cache.events.push(event);
        cache.last_updated = Utc::now();

        write_json(&path, &cache).await?;
        self.publish(uid).await
    }

    /// Subscribe to full account snapshots for a user. Every account write
    /// delivers the complete map; dropping the subscription releases it.
    pub fn subscribe(&self, uid: &str) -> Subscription {
        let mut watchers = self.watchers.lock().expect("watcher map poisoned");
        let sender = watchers
            .entry(uid.to_string())
            .or_insert_with(|| broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY).0);
        Subscription::new(sender.subscribe())
    }

    pub async fn read_user(&self, uid: &str) -> YoteiResult<Option<UserProfile>> {
        read_json(&self.user_path(uid)).await
    }

    pub async fn write_user(&self, profile: &UserProfile) -> YoteiResult<()> {
        let lock = self.user_lock(&profile.uid);
        let _guard = lock.lock().await;
        write_json(&self.user_path(&profile.uid), profile).await
    }

    /// Add a hide keyword to the user's set; a duplicate is a no-op.
    pub async fn add_hide_keyword(&self, uid: &str, keyword: &str) -> YoteiResult<()> {
        self.update_user(uid, |profile| {
            if !profile.hide_keywords.iter().any(|k| k == keyword) {
                profile.hide_keywords.push(keyword.to_string());
            }
        })
        .await
    }

    /// Remove a hide keyword from the user's set.
    pub async fn remove_hide_keyword(&self, uid: &str, keyword: &str) -> YoteiResult<()> {
        self.update_user(uid, |profile| {
            profile.hide_keywords.retain(|k| k != keyword);
        })
        .await
    }

    async fn update_user(
        &self,
        uid: &str,
        mutate: impl FnOnce(&mut UserProfile),
    ) -> YoteiResult<()> {
        let lock = self.user_lock(uid);
        let _guard = lock.lock().await;

        let path = self.user_path(uid);
        let mut profile: UserProfile = read_json(&path)
            .await?
            .ok_or_else(|| YoteiError::StoreUnavailable(format!("no profile for {uid}")))?;
        mutate(&mut profile);
        write_json(&path, &profile).await
    }

    /// Broadcast the current snapshot to any subscribers. Called with the
    /// user lock held so snapshot order matches write order.
    async fn publish(&self, uid: &str) -> YoteiResult<()> {
        let sender = {
            let watchers = self.watchers.lock().expect("watcher map poisoned");
            watchers.get(uid).cloned()
        };
        if let Some(sender) = sender {
            let snapshot = self.read_accounts(uid).await?;
            // No receivers is fine; the user just has no live view open.
            let _ = sender.send(snapshot);
        }
        Ok(())
    }

    fn user_lock(&self, uid: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().expect("lock map poisoned");
        locks
            .entry(uid.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn user_path(&self, uid: &str) -> PathBuf {
        self.root.join("users").join(format!("{}.json", slug(uid)))
    }

    fn accounts_dir(&self, uid: &str) -> PathBuf {
        self.root.join("calendars").join(slug(uid)).join("accounts")
    }

    fn account_path(&self, uid: &str, email: &str) -> PathBuf {
        self.accounts_dir(uid).join(format!("{}.json", slug(email)))
    }
}

/// Make an identifier safe to use as a file name.
fn slug(id: &str) -> String {
    id.replace(['/', '\\', ':'], "_")
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> YoteiResult<Option<T>> {
    let contents = match tokio::fs::read(path).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    serde_json::from_slice(&contents)
        .map(Some)
        .map_err(|err| YoteiError::Serialization(err.to_string()))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> YoteiResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let contents = serde_json::to_vec_pretty(value)
        .map_err(|err| YoteiError::Serialization(err.to_string()))?;

    // Write-then-rename so readers never see a partial document.
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
