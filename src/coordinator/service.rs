use super::types::{LeadershipView, ReplicaId, ReplicaRecord, ReplicaStatus, compute_leadership};
use crate::clock::Clock;
use crate::config::CoordinatorConfig;
use crate::error::AppResult;
use crate::storage::Store;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct ReplicaCoordinator {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    local_id: ReplicaId,
    config: CoordinatorConfig,
    is_leader: AtomicBool,
}

impl ReplicaCoordinator {
    pub fn new(
        store: Arc<Store>,
        clock: Arc<dyn Clock>,
        local_id: ReplicaId,
        config: CoordinatorConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            clock,
            local_id,
            config,
            is_leader: AtomicBool::new(false),
        })
    }

    pub fn local_id(&self) -> &ReplicaId {
        &self.local_id
    }

    pub fn is_leader(&self) -> bool {
        self.is_leader.load(Ordering::SeqCst)
    }

    fn dead_timeout_ms(&self) -> u64 {
        self.config.dead_timeout().as_millis() as u64
    }

    fn grace_ms(&self) -> u64 {
        self.config.grace().as_millis() as u64
    }

    /// Writes this replica's record with a fresh start time.
    pub fn register(&self) {
        let now = self.clock.now_ms();
        self.store.replicas.put(
            self.local_id.0.clone(),
            ReplicaRecord::new(self.local_id.clone(), now),
        );
        info!("Registered replica {}", self.local_id);
    }

    /// Refreshes the heartbeat. A record pruned while this process was
    /// unresponsive is recreated and goes through the grace period again.
    pub fn heartbeat(&self) -> AppResult<()> {
        let now = self.clock.now_ms();
        self.store.replicas.upsert_with(
            &self.local_id.0,
            || {
                tracing::warn!("Replica record {} was missing, re-registering", self.local_id);
                ReplicaRecord::new(self.local_id.clone(), now)
            },
            |record| -> AppResult<()> {
                record.last_heartbeat_ms = now;
                Ok(())
            },
        )
    }

    /// One coordination round: heartbeat, recompute leadership, and if leader,
    /// prune dead records.
    pub fn tick(&self) -> AppResult<LeadershipView> {
        self.heartbeat()?;

        let now = self.clock.now_ms();
        let records = self.store.replicas.find(|_| true);
        let view = compute_leadership(&records, now, self.dead_timeout_ms(), self.grace_ms());

        let leading = view.leader.as_ref() == Some(&self.local_id);
        let was_leading = self.is_leader.swap(leading, Ordering::SeqCst);
        match (was_leading, leading) {
            (false, true) => info!("Replica {} is now the leader", self.local_id),
            (true, false) => info!(
                "Replica {} stepped down (leader: {:?})",
                self.local_id,
                view.leader.as_ref().map(|id| id.0.as_str())
            ),
            _ => {}
        }

        if leading && !view.dead.is_empty() {
            let dead_timeout_ms = self.dead_timeout_ms();
            for id in &view.dead {
                // Re-checked under the map lock: a late heartbeat keeps the record.
                let pruned = self
                    .store
                    .replicas
                    .remove_if(&id.0, |record| record.is_dead(now, dead_timeout_ms));
                if let Some(record) = pruned {
                    info!(
                        "Pruned dead replica {} (last heartbeat {} ms ago)",
                        id,
                        now.saturating_sub(record.last_heartbeat_ms)
                    );
                }
            }
        }

        Ok(view)
    }

    /// Heartbeat loop; runs until `token` is cancelled, then deregisters.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.heartbeat_interval());
        info!(
            "Coordinator loop started for {} (every {:?})",
            self.local_id,
            self.config.heartbeat_interval()
        );

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.tick() {
                        tracing::warn!("Coordination round failed: {}", e);
                    }
                }
            }
        }

        self.deregister();
    }

    /// Deletes this replica's record so others need not wait for it to go stale.
    pub fn deregister(&self) {
        self.is_leader.store(false, Ordering::SeqCst);
        if self.store.replicas.remove(&self.local_id.0).is_some() {
            info!("Deregistered replica {}", self.local_id);
        }
    }

    pub fn status(&self) -> ReplicaStatus {
        let records = self.store.replicas.find(|_| true);
        let view = compute_leadership(
            &records,
            self.clock.now_ms(),
            self.dead_timeout_ms(),
            self.grace_ms(),
        );
        ReplicaStatus {
            replica_id: self.local_id.clone(),
            is_leader: self.is_leader(),
            view,
        }
    }
}
