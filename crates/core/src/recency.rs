//! In-memory recency cache of domain snapshots.
//!
//! Answers "what did we see for this domain recently?" without a round trip
//! to the store. State lives only as long as the process; [`RecencyCache::reload`]
//! rebuilds it from domains the store saw within a window.
//!
//! Snapshots are ordered by their sequence id, so "last" and "most recent"
//! always mean "highest sequence id".

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::store::{Db, Deadline};
use crate::{Domain, Error, Snapshot};

/// Shared, thread-safe snapshot cache. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct RecencyCache {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    last_seq: AtomicU64,
    entries: RwLock<BTreeMap<u64, Snapshot>>,
}

impl RecencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<u64, Snapshot>> {
        self.inner.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<u64, Snapshot>> {
        self.inner.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a detached copy of `domain` under the next sequence id.
    ///
    /// Fails with `EmptyDomain` for a nameless domain without touching the
    /// cache or consuming a sequence id.
    pub fn append(&self, domain: &Domain) -> Result<Snapshot, Error> {
        if domain.name.is_empty() {
            return Err(Error::EmptyDomain);
        }

        let mut entries = self.write();
        let seq = self.inner.last_seq.load(Ordering::Acquire) + 1;
        let snapshot = Snapshot::new(seq, domain)?;
        entries.insert(seq, snapshot.clone());
        self.inner.last_seq.store(seq, Ordering::Release);

        tracing::trace!(key = %snapshot.key(), "appended snapshot");
        Ok(snapshot)
    }

    /// Every cached observation of `domain`'s name, oldest first.
    pub fn lookup_by_name(&self, domain: &Domain) -> Result<Vec<Domain>, Error> {
        if domain.name.is_empty() {
            return Err(Error::EmptyDomain);
        }

        Ok(self
            .read()
            .values()
            .filter(|snapshot| snapshot.domain_name == domain.name)
            .map(|snapshot| snapshot.domain.clone())
            .collect())
    }

    /// One domain per distinct name, taken from its most recent snapshot.
    ///
    /// Results are ordered by the sequence id of the winning snapshot.
    pub fn most_recent_per_name(&self) -> Vec<Domain> {
        let entries = self.read();
        let mut latest: HashMap<&str, &Snapshot> = HashMap::new();
        for snapshot in entries.values() {
            latest.insert(snapshot.domain_name.as_str(), snapshot);
        }

        let mut winners: Vec<&Snapshot> = latest.into_values().collect();
        winners.sort_by_key(|snapshot| snapshot.seq);
        winners.into_iter().map(|snapshot| snapshot.domain.clone()).collect()
    }

    /// Append a snapshot for every domain the store updated within `window`.
    ///
    /// Returns the full cache contents afterwards, in sequence order.
    pub async fn reload(&self, db: &Db, deadline: Deadline, window: Duration) -> Result<Vec<Snapshot>, Error> {
        let domains = db.list_domains_updated_within(deadline, window).await?;
        let loaded = domains.len();
        for domain in &domains {
            self.append(domain)?;
        }

        let snapshots = self.snapshots();
        tracing::info!(loaded, cached = snapshots.len(), window_secs = window.as_secs(), "reloaded recency cache");
        Ok(snapshots)
    }

    /// All cached snapshots in sequence order.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
