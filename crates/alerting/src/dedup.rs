//! Alert Deduplication

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::alert::AlertId;

/// First sighting of an alert id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DedupRecord {
    pub alert_id: AlertId,
    pub first_seen_at: DateTime<Utc>,
}

/// Suppresses repeat deliveries of the same alert id within a window.
///
/// Records live in a sharded map so admission of one id never waits on
/// another id's lock.
pub struct AlertDeduplicator {
    /// Retention window
    window: Duration,
    /// First-seen time by alert id
    records: DashMap<AlertId, DateTime<Utc>>,
}

impl AlertDeduplicator {
    /// Create a new deduplicator
    pub fn new(window: Duration) -> Self {
        info!("Creating alert deduplicator with window {}s", window.num_seconds());
        Self {
            window,
            records: DashMap::new(),
        }
    }

    /// Returns `true` the first time `alert_id` is seen within the window.
    ///
    /// Check and insert happen under the id's shard lock. A stale record
    /// found here is replaced and the id admitted again.
    pub fn observe(&self, alert_id: &str, now: DateTime<Utc>) -> bool {
        match self.records.entry(alert_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if now - *entry.get() >= self.window {
                    debug!("Dedup record for {} expired, admitting again", alert_id);
                    entry.insert(now);
                    true
                } else {
                    debug!("Duplicate alert {} suppressed", alert_id);
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Drop every record older than the window. Returns the number removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records.retain(|_, first_seen| now - *first_seen < self.window);
        let removed = before.saturating_sub(self.records.len());
        if removed > 0 {
            debug!("Evicted {} dedup records", removed);
        }
        removed
    }

    /// Release the record for `alert_id` so its next delivery is admitted.
    ///
    /// For callers that admitted an id but could not finish handling it.
    pub fn forget(&self, alert_id: &str) -> bool {
        let removed = self.records.remove(alert_id).is_some();
        if removed {
            debug!("Dedup record for {} released", alert_id);
        }
        removed
    }

    /// Current record for `alert_id`
    pub fn record(&self, alert_id: &str) -> Option<DedupRecord> {
        self.records.get(alert_id).map(|seen| DedupRecord {
            alert_id: alert_id.to_string(),
            first_seen_at: *seen,
        })
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for AlertDeduplicator {
    fn default() -> Self {
        Self::new(Duration::hours(24))
    }
}
