use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplicaId(pub String);

impl ReplicaId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ReplicaId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ReplicaId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One running process, as seen by every other process through the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicaRecord {
    pub id: ReplicaId,
    pub started_at_ms: u64,
    pub last_heartbeat_ms: u64,
}

impl ReplicaRecord {
    pub fn new(id: ReplicaId, now_ms: u64) -> Self {
        Self {
            id,
            started_at_ms: now_ms,
            last_heartbeat_ms: now_ms,
        }
    }

    pub fn is_dead(&self, now_ms: u64, dead_timeout_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_heartbeat_ms) > dead_timeout_ms
    }

    /// Still inside its start-up grace period, so not eligible to lead.
    pub fn is_warming(&self, now_ms: u64, grace_ms: u64) -> bool {
        now_ms.saturating_sub(self.started_at_ms) < grace_ms
    }
}

/// Leadership as derived from the replica records at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadershipView {
    pub leader: Option<ReplicaId>,
    /// Eligible replicas, sorted.
    pub eligible: Vec<ReplicaId>,
    pub warming: Vec<ReplicaId>,
    /// Records whose heartbeat is older than the dead timeout.
    pub dead: Vec<ReplicaId>,
}

/// Pure leader computation: drop dead records, drop replicas still in their
/// grace period, pick the smallest remaining id.
pub fn compute_leadership(
    records: &[ReplicaRecord],
    now_ms: u64,
    dead_timeout_ms: u64,
    grace_ms: u64,
) -> LeadershipView {
    let mut view = LeadershipView::default();

    for record in records {
        if record.is_dead(now_ms, dead_timeout_ms) {
            view.dead.push(record.id.clone());
        } else if record.is_warming(now_ms, grace_ms) {
            view.warming.push(record.id.clone());
        } else {
            view.eligible.push(record.id.clone());
        }
    }

    view.eligible.sort();
    view.warming.sort();
    view.dead.sort();
    view.leader = view.eligible.first().cloned();
    view
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaStatus {
    pub replica_id: ReplicaId,
    pub is_leader: bool,
    pub view: LeadershipView,
}
