//! Transactional reconciliation of observed domains.
//!
//! Each operation runs as one unit of work through
//! [`Db::with_transaction`]: the domain and its servers are re-read inside
//! the transaction, compared against the recency cache where needed, and
//! written back before commit. Any failure rolls the whole unit back.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::recency::RecencyCache;
use crate::store::{Db, Deadline, Queries};
use crate::topology::{TopologyPolicy, topology_changed};
use crate::{Domain, Error, Snapshot};

/// Outcome of a reconciliation operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Reconciliation {
    /// The domain (with servers) as read inside the transaction.
    pub stored: Domain,
    /// The domain after this operation's writes.
    pub updated: Domain,
    /// Earlier observations of the same name, oldest first.
    pub history: Vec<Domain>,
}

/// Orchestrates store writes and recency lookups for observed domains.
#[derive(Debug, Clone)]
pub struct Reconciler {
    db: Db,
    recency: RecencyCache,
    policy: TopologyPolicy,
}

impl Reconciler {
    pub fn new(db: Db, recency: RecencyCache, policy: TopologyPolicy) -> Self {
        Self { db, recency, policy }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn recency(&self) -> &RecencyCache {
        &self.recency
    }

    /// Persist the domain row and then each of its servers, in order.
    ///
    /// A domain must enter the store with at least one server.
    pub async fn store_topology(&self, deadline: Deadline, domain: &Domain) -> Result<Reconciliation, Error> {
        require_identity(domain)?;
        if domain.servers.is_empty() {
            return Err(Error::EmptyServerSet(domain.id.clone()));
        }
        if let Some(stray) = domain.servers.iter().find(|s| s.domain_id != domain.id) {
            return Err(Error::InvalidInput(format!(
                "server {} references domain {}, expected {}",
                stray.id, stray.domain_id, domain.id
            )));
        }

        let domain = domain.clone();
        let outcome = self
            .db
            .with_transaction(deadline, move |q| {
                let mut stored = q.create_domain(&domain)?;
                for (position, server) in domain.servers.iter().enumerate() {
                    stored.servers.push(q.create_server(server, position)?);
                }
                Ok(Reconciliation { stored: stored.clone(), updated: stored, history: Vec::new() })
            })
            .await?;

        tracing::debug!(
            domain_id = %outcome.updated.id,
            domain_name = %outcome.updated.name,
            servers = outcome.updated.servers.len(),
            "stored topology"
        );
        Ok(outcome)
    }

    /// Set the domain grade to the grade of its primary (index 0) server.
    pub async fn assign_grade(&self, deadline: Deadline, domain: &Domain) -> Result<Reconciliation, Error> {
        require_identity(domain)?;
        let id = domain.id.clone();

        let outcome = self
            .db
            .with_transaction(deadline, move |q| {
                let stored = reread(q, &id)?;
                let updated = apply_grade(q, &stored)?;
                Ok(Reconciliation { stored, updated, history: Vec::new() })
            })
            .await?;

        tracing::debug!(domain_id = %outcome.updated.id, ssl_grade = ?outcome.updated.ssl_grade, "assigned grade");
        Ok(outcome)
    }

    /// Copy the grade of the most recent earlier observation into the
    /// previous-grade field. Without history the domain is left as stored.
    pub async fn assign_previous_grade(&self, deadline: Deadline, domain: &Domain) -> Result<Reconciliation, Error> {
        require_identity(domain)?;
        let (id, recency) = (domain.id.clone(), self.recency.clone());

        let outcome = self
            .db
            .with_transaction(deadline, move |q| {
                let stored = reread(q, &id)?;
                let history = recency.lookup_by_name(&stored)?;
                let updated = apply_previous_grade(q, &stored, &history)?;
                Ok(Reconciliation { stored, updated, history })
            })
            .await?;

        tracing::debug!(
            domain_id = %outcome.updated.id,
            history = outcome.history.len(),
            previous_ssl_grade = ?outcome.updated.previous_ssl_grade,
            "assigned previous grade"
        );
        Ok(outcome)
    }

    /// Compare the servers against the most recent earlier observation and
    /// record whether the topology changed. Without history the domain is
    /// left as stored.
    pub async fn assign_topology_changed(
        &self, deadline: Deadline, domain: &Domain,
    ) -> Result<Reconciliation, Error> {
        require_identity(domain)?;
        let (id, recency, policy) = (domain.id.clone(), self.recency.clone(), self.policy);

        let outcome = self
            .db
            .with_transaction(deadline, move |q| {
                let stored = reread(q, &id)?;
                let history = recency.lookup_by_name(&stored)?;
                let updated = apply_topology_changed(q, &stored, &history, policy)?;
                Ok(Reconciliation { stored, updated, history })
            })
            .await?;

        tracing::debug!(
            domain_id = %outcome.updated.id,
            history = outcome.history.len(),
            server_changed = outcome.updated.server_changed,
            "assigned topology change"
        );
        Ok(outcome)
    }

    /// Grade, previous grade and topology change in a single transaction.
    pub async fn initialize(&self, deadline: Deadline, domain: &Domain) -> Result<Reconciliation, Error> {
        require_identity(domain)?;
        let (id, recency, policy) = (domain.id.clone(), self.recency.clone(), self.policy);

        let outcome = self
            .db
            .with_transaction(deadline, move |q| {
                let stored = reread(q, &id)?;
                let history = recency.lookup_by_name(&stored)?;

                let graded = apply_grade(q, &stored)?;
                let with_previous = apply_previous_grade(q, &graded, &history)?;
                let updated = apply_topology_changed(q, &with_previous, &history, policy)?;
                Ok(Reconciliation { stored, updated, history })
            })
            .await?;

        tracing::debug!(
            domain_id = %outcome.updated.id,
            domain_name = %outcome.updated.name,
            ssl_grade = ?outcome.updated.ssl_grade,
            previous_ssl_grade = ?outcome.updated.previous_ssl_grade,
            server_changed = outcome.updated.server_changed,
            "initialized domain"
        );
        Ok(outcome)
    }

    /// Append a snapshot of `domain` to the recency cache.
    pub fn record(&self, domain: &Domain) -> Result<Snapshot, Error> {
        self.recency.append(domain)
    }

    /// Warm the recency cache with domains the store updated within `window`.
    pub async fn reload_recent(&self, deadline: Deadline, window: Duration) -> Result<Vec<Snapshot>, Error> {
        self.recency.reload(&self.db, deadline, window).await
    }

    /// The most recent cached observation of every domain name.
    pub fn recent_domains(&self) -> Vec<Domain> {
        self.recency.most_recent_per_name()
    }

    /// Full observation flow: store the topology, initialize the derived
    /// fields, then record the result in the recency cache.
    pub async fn observe(&self, deadline: Deadline, domain: &Domain) -> Result<Reconciliation, Error> {
        let stored = self.store_topology(deadline, domain).await?;
        let outcome = self.initialize(deadline, &stored.updated).await?;
        self.record(&outcome.updated)?;
        Ok(outcome)
    }
}

fn require_identity(domain: &Domain) -> Result<(), Error> {
    if domain.id.is_empty() {
        return Err(Error::EmptyDomainIdentifier);
    }
    Ok(())
}

/// Read a domain and its servers, which must exist and be non-empty.
fn reread(q: &Queries<'_>, id: &str) -> Result<Domain, Error> {
    let domain = q
        .get_domain_with_servers(id)?
        .ok_or_else(|| Error::NoSuchRecord(format!("domain {id}")))?;
    if domain.servers.is_empty() {
        return Err(Error::EmptyServerSet(id.to_string()));
    }
    Ok(domain)
}

fn apply_grade(q: &Queries<'_>, current: &Domain) -> Result<Domain, Error> {
    let primary = current
        .primary_server()
        .ok_or_else(|| Error::EmptyServerSet(current.id.clone()))?;
    let mut updated = q.update_domain_grade(&current.id, &primary.ssl_grade)?;
    updated.servers = current.servers.clone();
    Ok(updated)
}

fn apply_previous_grade(q: &Queries<'_>, current: &Domain, history: &[Domain]) -> Result<Domain, Error> {
    let Some(last) = history.last() else {
        return Ok(current.clone());
    };
    let mut updated = q.update_domain_previous_grade(&current.id, last.ssl_grade.as_deref())?;
    updated.servers = current.servers.clone();
    Ok(updated)
}

fn apply_topology_changed(
    q: &Queries<'_>, current: &Domain, history: &[Domain], policy: TopologyPolicy,
) -> Result<Domain, Error> {
    let Some(last) = history.last() else {
        return Ok(current.clone());
    };
    let changed = topology_changed(current, last, policy);
    let mut updated = q.update_domain_server_changed(&current.id, changed)?;
    updated.servers = current.servers.clone();
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Server;

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    async fn reconciler(policy: TopologyPolicy) -> Reconciler {
        let db = Db::open_in_memory().await.unwrap();
        Reconciler::new(db, RecencyCache::new(), policy)
    }

    fn observation(name: &str, servers: &[(&str, &str)]) -> Domain {
        let mut domain = Domain::new(name, "https://server.com/icon.png", "Title of the page").unwrap();
        for (address, grade) in servers {
            let server = Server::new(*address, *grade, "US", "Amazon.com, Inc.", &domain).unwrap();
            domain.push_server(server).unwrap();
        }
        domain
    }

    #[tokio::test]
    async fn test_store_topology_persists_servers_in_order() {
        let r = reconciler(TopologyPolicy::default()).await;
        let domain = observation("example.com", &[("1.1.1.1", "B"), ("2.2.2.2", "A")]);

        let outcome = r.store_topology(deadline(), &domain).await.unwrap();
        assert_eq!(outcome.updated.id, domain.id);
        let addresses: Vec<_> = outcome.updated.servers.iter().map(|s| s.address.as_str()).collect();
        assert_eq!(addresses, ["1.1.1.1", "2.2.2.2"]);

        let reread = r.db().get_domain_with_servers(deadline(), &domain.id).await.unwrap().unwrap();
        assert_eq!(reread.servers.len(), 2);
        assert_eq!(reread.servers[0].address, "1.1.1.1");
    }

    #[tokio::test]
    async fn test_store_topology_requires_servers() {
        let r = reconciler(TopologyPolicy::default()).await;
        let domain = observation("example.com", &[]);

        let result = r.store_topology(deadline(), &domain).await;
        assert!(matches!(result, Err(Error::EmptyServerSet(_))));
        assert!(r.db().get_domain(deadline(), &domain.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_topology_is_atomic() {
        let r = reconciler(TopologyPolicy::default()).await;
        let mut domain = observation("example.com", &[("1.1.1.1", "B"), ("2.2.2.2", "A")]);
        domain.servers[1].id = domain.servers[0].id.clone();

        let result = r.store_topology(deadline(), &domain).await;
        assert!(matches!(result, Err(Error::QueryFailed(_))));
        assert!(r.db().get_domain(deadline(), &domain.id).await.unwrap().is_none());
        assert!(r.db().list_servers_by_domain(deadline(), &domain.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_operations_require_domain_identity() {
        let r = reconciler(TopologyPolicy::default()).await;
        let mut domain = observation("example.com", &[("1.1.1.1", "B")]);
        domain.id.clear();

        assert!(matches!(r.store_topology(deadline(), &domain).await, Err(Error::EmptyDomainIdentifier)));
        assert!(matches!(r.assign_grade(deadline(), &domain).await, Err(Error::EmptyDomainIdentifier)));
        assert!(matches!(r.assign_previous_grade(deadline(), &domain).await, Err(Error::EmptyDomainIdentifier)));
        assert!(matches!(
            r.assign_topology_changed(deadline(), &domain).await,
            Err(Error::EmptyDomainIdentifier)
        ));
        assert!(matches!(r.initialize(deadline(), &domain).await, Err(Error::EmptyDomainIdentifier)));
    }

    #[tokio::test]
    async fn test_assign_grade_uses_primary_server() {
        let r = reconciler(TopologyPolicy::default()).await;
        let domain = observation("example.com", &[("1.1.1.1", "B"), ("2.2.2.2", "A+")]);
        r.store_topology(deadline(), &domain).await.unwrap();

        let outcome = r.assign_grade(deadline(), &domain).await.unwrap();
        assert!(outcome.stored.ssl_grade.is_none());
        assert_eq!(outcome.updated.ssl_grade.as_deref(), Some("B"));
        assert!(outcome.updated.updated_at >= outcome.stored.updated_at);
    }

    #[tokio::test]
    async fn test_assign_grade_missing_domain() {
        let r = reconciler(TopologyPolicy::default()).await;
        let domain = observation("example.com", &[("1.1.1.1", "B")]);

        let result = r.assign_grade(deadline(), &domain).await;
        assert!(matches!(result, Err(Error::NoSuchRecord(_))));
    }

    #[tokio::test]
    async fn test_assign_grade_without_stored_servers() {
        let r = reconciler(TopologyPolicy::default()).await;
        let domain = observation("example.com", &[]);
        r.db().create_domain(deadline(), &domain).await.unwrap();

        let result = r.assign_grade(deadline(), &domain).await;
        assert!(matches!(result, Err(Error::EmptyServerSet(_))));
    }

    #[tokio::test]
    async fn test_previous_grade_without_history_is_noop() {
        let r = reconciler(TopologyPolicy::default()).await;
        let domain = observation("example.com", &[("1.1.1.1", "B")]);
        r.store_topology(deadline(), &domain).await.unwrap();

        let outcome = r.assign_previous_grade(deadline(), &domain).await.unwrap();
        assert!(outcome.history.is_empty());
        assert_eq!(outcome.updated.previous_ssl_grade, domain.previous_ssl_grade);
        assert_eq!(outcome.updated, outcome.stored);
    }

    #[tokio::test]
    async fn test_previous_grade_from_single_snapshot() {
        let r = reconciler(TopologyPolicy::default()).await;
        let mut earlier = observation("example.com", &[("1.1.1.1", "C")]);
        earlier.ssl_grade = Some("C".into());
        r.record(&earlier).unwrap();

        let domain = observation("example.com", &[("1.1.1.1", "A")]);
        r.store_topology(deadline(), &domain).await.unwrap();

        let outcome = r.assign_previous_grade(deadline(), &domain).await.unwrap();
        assert_eq!(outcome.history.len(), 1);
        assert_eq!(outcome.updated.previous_ssl_grade.as_deref(), Some("C"));
    }

    #[tokio::test]
    async fn test_previous_grade_uses_most_recent_snapshot() {
        let r = reconciler(TopologyPolicy::default()).await;
        for grade in ["F", "C", "B"] {
            let mut earlier = observation("example.com", &[("1.1.1.1", grade)]);
            earlier.ssl_grade = Some(grade.into());
            r.record(&earlier).unwrap();
        }

        let domain = observation("example.com", &[("1.1.1.1", "A")]);
        r.store_topology(deadline(), &domain).await.unwrap();

        let outcome = r.assign_previous_grade(deadline(), &domain).await.unwrap();
        assert_eq!(outcome.history.len(), 3);
        assert_eq!(outcome.updated.previous_ssl_grade.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_topology_changed_against_last_snapshot() {
        let r = reconciler(TopologyPolicy::default()).await;
        let earlier = observation("example.com", &[("1.1.1.1", "A"), ("2.2.2.2", "A")]);
        r.record(&earlier).unwrap();

        let same = observation("example.com", &[("1.1.1.1", "A"), ("2.2.2.2", "A")]);
        r.store_topology(deadline(), &same).await.unwrap();
        let outcome = r.assign_topology_changed(deadline(), &same).await.unwrap();
        assert!(!outcome.updated.server_changed);

        let moved = observation("example.com", &[("1.1.1.1", "A"), ("3.3.3.3", "A")]);
        r.store_topology(deadline(), &moved).await.unwrap();
        let outcome = r.assign_topology_changed(deadline(), &moved).await.unwrap();
        assert!(outcome.updated.server_changed);
    }

    #[tokio::test]
    async fn test_topology_without_history_is_noop() {
        let r = reconciler(TopologyPolicy::default()).await;
        let domain = observation("example.com", &[("1.1.1.1", "A")]);
        r.store_topology(deadline(), &domain).await.unwrap();

        let outcome = r.assign_topology_changed(deadline(), &domain).await.unwrap();
        assert!(!outcome.updated.server_changed);
        assert_eq!(outcome.updated, outcome.stored);
    }

    #[tokio::test]
    async fn test_two_observation_scenario() {
        let r = reconciler(TopologyPolicy::default()).await;

        let first = observation("example.com", &[("1.1.1.1", "B")]);
        r.store_topology(deadline(), &first).await.unwrap();
        let graded = r.assign_grade(deadline(), &first).await.unwrap();
        assert_eq!(graded.updated.ssl_grade.as_deref(), Some("B"));
        r.record(&graded.updated).unwrap();

        let second = observation("example.com", &[("1.1.1.1", "A")]);
        r.store_topology(deadline(), &second).await.unwrap();

        let previous = r.assign_previous_grade(deadline(), &second).await.unwrap();
        assert_eq!(previous.updated.previous_ssl_grade.as_deref(), Some("B"));

        // Only the grade differs, which still counts when grade takes part in comparison.
        let topology = r.assign_topology_changed(deadline(), &second).await.unwrap();
        assert!(topology.updated.server_changed);
    }

    #[tokio::test]
    async fn test_grade_only_difference_ignored_when_configured() {
        let r = reconciler(TopologyPolicy { compare_grade: false }).await;

        let first = observation("example.com", &[("1.1.1.1", "B")]);
        r.observe(deadline(), &first).await.unwrap();

        let second = observation("example.com", &[("1.1.1.1", "A")]);
        let outcome = r.observe(deadline(), &second).await.unwrap();
        assert!(!outcome.updated.server_changed);
        assert_eq!(outcome.updated.previous_ssl_grade.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_initialize_sets_all_fields_at_once() {
        let r = reconciler(TopologyPolicy::default()).await;
        let mut earlier = observation("example.com", &[("1.1.1.1", "B"), ("2.2.2.2", "B")]);
        earlier.ssl_grade = Some("B".into());
        r.record(&earlier).unwrap();

        let domain = observation("example.com", &[("1.1.1.1", "A+"), ("2.2.2.2", "B")]);
        r.store_topology(deadline(), &domain).await.unwrap();

        let outcome = r.initialize(deadline(), &domain).await.unwrap();
        assert_eq!(outcome.updated.ssl_grade.as_deref(), Some("A+"));
        assert_eq!(outcome.updated.previous_ssl_grade.as_deref(), Some("B"));
        assert!(outcome.updated.server_changed);
        assert_eq!(outcome.updated.servers.len(), 2);

        let persisted = r.db().get_domain(deadline(), &domain.id).await.unwrap().unwrap();
        assert_eq!(persisted.ssl_grade.as_deref(), Some("A+"));
        assert_eq!(persisted.previous_ssl_grade.as_deref(), Some("B"));
        assert!(persisted.server_changed);
    }

    #[tokio::test]
    async fn test_observe_records_snapshot() {
        let r = reconciler(TopologyPolicy::default()).await;
        let domain = observation("example.com", &[("1.1.1.1", "B")]);

        let outcome = r.observe(deadline(), &domain).await.unwrap();
        assert_eq!(outcome.updated.ssl_grade.as_deref(), Some("B"));
        assert!(outcome.history.is_empty());

        let recent = r.recent_domains();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].ssl_grade.as_deref(), Some("B"));
        assert_eq!(recent[0].servers.len(), 1);
    }

    #[tokio::test]
    async fn test_reload_recent_feeds_history() {
        let r = reconciler(TopologyPolicy::default()).await;
        let first = observation("example.com", &[("1.1.1.1", "B")]);
        r.store_topology(deadline(), &first).await.unwrap();
        r.assign_grade(deadline(), &first).await.unwrap();

        // A fresh cache over the same store, as after a restart.
        let restarted = Reconciler::new(r.db().clone(), RecencyCache::new(), TopologyPolicy::default());
        let snapshots = restarted.reload_recent(deadline(), Duration::from_secs(3600)).await.unwrap();
        assert_eq!(snapshots.len(), 1);

        let second = observation("example.com", &[("1.1.1.1", "A")]);
        restarted.store_topology(deadline(), &second).await.unwrap();
        let outcome = restarted.assign_previous_grade(deadline(), &second).await.unwrap();
        assert_eq!(outcome.updated.previous_ssl_grade.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_concurrent_assign_grade() {
        let r = reconciler(TopologyPolicy::default()).await;
        let domain = observation("example.com", &[("1.1.1.1", "B"), ("2.2.2.2", "A")]);
        r.store_topology(deadline(), &domain).await.unwrap();

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let (r, domain) = (r.clone(), domain.clone());
                tokio::spawn(async move { r.assign_grade(deadline(), &domain).await })
            })
            .collect();

        for task in tasks {
            let outcome = task.await.unwrap().unwrap();
            assert_eq!(outcome.updated.id, domain.id);
            assert_eq!(outcome.updated.servers.len(), domain.servers.len());
            assert_eq!(outcome.updated.ssl_grade.as_deref(), Some("B"));
        }

        let persisted = r.db().get_domain(deadline(), &domain.id).await.unwrap().unwrap();
        assert_eq!(persisted.ssl_grade.as_deref(), Some("B"));
    }
}
