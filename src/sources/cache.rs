//! Snapshot cache for collected observations.
//!
//! Owned by the caller and consulted only by the collector; the reconciliation
//! core never sees it.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::models::ObservationSet;

use super::types::PropertyQuery;

/// Cache key for one request: canonical address plus the sorted source set.
pub fn fingerprint(query: &PropertyQuery, source_ids: &[&str]) -> String {
    let mut ids: Vec<&str> = source_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    format!("{}|{}", query.canonical_address(), ids.join(","))
}

#[derive(Debug, Clone)]
struct Snapshot {
    observations: ObservationSet,
    cached_at: DateTime<Utc>,
}

impl Snapshot {
    fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.cached_at > ttl
    }
}

/// Thread-safe, TTL-bounded snapshot cache keyed by request fingerprint.
///
/// Clones share the same entries.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    entries: Arc<DashMap<String, Snapshot>>,
    ttl: Duration,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<ObservationSet> {
        self.get_at(key, Utc::now())
    }

    fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<ObservationSet> {
        let hit = self
            .entries
            .get(key)
            .filter(|snapshot| !snapshot.is_stale(now, self.ttl))
            .map(|snapshot| snapshot.observations.clone());

        match hit {
            Some(observations) => {
                debug!("Snapshot cache hit for {}", key);
                Some(observations)
            }
            None => {
                if self
                    .entries
                    .remove_if(key, |_, snapshot| snapshot.is_stale(now, self.ttl))
                    .is_some()
                {
                    debug!("Snapshot for {} expired", key);
                }
                None
            }
        }
    }

    /// Store a snapshot, dropping every entry that has gone stale.
    pub fn insert(&self, key: impl Into<String>, observations: ObservationSet) {
        self.insert_at(key, observations, Utc::now());
    }

    fn insert_at(&self, key: impl Into<String>, observations: ObservationSet, now: DateTime<Utc>) {
        self.entries.retain(|_, snapshot| !snapshot.is_stale(now, self.ttl));
        self.entries.insert(
            key.into(),
            Snapshot {
                observations,
                cached_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
