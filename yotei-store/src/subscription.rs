//! Live snapshot subscription.

use tokio::sync::broadcast;
use tracing::warn;

use yotei_core::AccountMap;

/// A live feed of full account snapshots for one user.
///
/// Snapshots are complete replacements, never deltas, so a consumer that
/// falls behind can safely skip to the newest one.
pub struct Subscription {
    receiver: broadcast::Receiver<AccountMap>,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<AccountMap>) -> Self {
        Subscription { receiver }
    }

    /// Wait for the next snapshot. Returns `None` once the store side of
    /// the channel is gone.
    pub async fn next(&mut self) -> Option<AccountMap> {
        loop {
            match self.receiver.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscription lagged; skipping to newest snapshot");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Release the subscription. Equivalent to dropping it.
    pub fn unsubscribe(self) {}
}
