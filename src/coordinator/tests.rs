//! Coordinator Module Tests
//!
//! ## Test Scopes
//! - **Election**: smallest eligible id wins; grace and dead filtering.
//! - **Service**: heartbeats, leader-only pruning, deregistration, shutdown.

#[cfg(test)]
mod tests {
    use crate::clock::{Clock, ManualClock};
    use crate::config::CoordinatorConfig;
    use crate::coordinator::service::ReplicaCoordinator;
    use crate::coordinator::types::{ReplicaId, ReplicaRecord, compute_leadership};
    use crate::storage::Store;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    const SEC: u64 = 1_000;
    const DEAD: u64 = 30 * SEC;
    const GRACE: u64 = 15 * SEC;

    fn record(id: &str, started_at_ms: u64, last_heartbeat_ms: u64) -> ReplicaRecord {
        ReplicaRecord {
            id: ReplicaId::from(id),
            started_at_ms,
            last_heartbeat_ms,
        }
    }

    fn config() -> CoordinatorConfig {
        CoordinatorConfig {
            heartbeat_interval_secs: 5,
            dead_timeout_secs: 30,
            grace_secs: 15,
        }
    }

    fn coordinator(store: &Arc<Store>, clock: &Arc<ManualClock>, id: &str) -> Arc<ReplicaCoordinator> {
        ReplicaCoordinator::new(store.clone(), clock.clone(), ReplicaId::from(id), config())
    }

    // ============================================================
    // ELECTION
    // ============================================================

    #[test]
    fn test_smallest_id_leads_when_all_stable() {
        let now = 100 * SEC;
        let records = vec![
            record("r2", 0, now - SEC),
            record("r3", 0, now),
            record("r1", 0, now - 2 * SEC),
        ];

        let view = compute_leadership(&records, now, DEAD, GRACE);

        assert_eq!(view.leader, Some(ReplicaId::from("r1")));
        assert_eq!(view.eligible.len(), 3);
        assert!(view.dead.is_empty());
    }

    #[test]
    fn test_leader_is_deterministic_across_orderings() {
        let now = 100 * SEC;
        let mut records = vec![
            record("b", 0, now),
            record("a", 0, now),
            record("c", 0, now),
        ];
        let first = compute_leadership(&records, now, DEAD, GRACE).leader;
        records.reverse();
        let second = compute_leadership(&records, now, DEAD, GRACE).leader;

        assert_eq!(first, second);
        assert_eq!(first, Some(ReplicaId::from("a")));
    }

    #[test]
    fn test_replica_in_grace_period_cannot_lead() {
        let now = 100 * SEC;
        let records = vec![
            record("r1", now - 5 * SEC, now),
            record("r2", 0, now),
        ];

        let view = compute_leadership(&records, now, DEAD, GRACE);

        assert_eq!(view.leader, Some(ReplicaId::from("r2")));
        assert_eq!(view.warming, vec![ReplicaId::from("r1")]);
    }

    #[test]
    fn test_dead_replica_is_excluded() {
        let now = 100 * SEC;
        let records = vec![
            record("r1", 0, now - 31 * SEC),
            record("r2", 0, now),
        ];

        let view = compute_leadership(&records, now, DEAD, GRACE);

        assert_eq!(view.leader, Some(ReplicaId::from("r2")));
        assert_eq!(view.dead, vec![ReplicaId::from("r1")]);
    }

    #[test]
    fn test_no_leader_when_everyone_is_new() {
        let now = 100 * SEC;
        let records = vec![record("r1", now, now), record("r2", now - SEC, now)];

        assert_eq!(compute_leadership(&records, now, DEAD, GRACE).leader, None);
        assert_eq!(compute_leadership(&[], now, DEAD, GRACE).leader, None);
    }

    // ============================================================
    // SERVICE
    // ============================================================

    #[test]
    fn test_three_replicas_elect_r1() {
        let store = Store::new();
        let clock = Arc::new(ManualClock::new(0));
        let replicas: Vec<_> = ["r3", "r1", "r2"]
            .iter()
            .map(|id| coordinator(&store, &clock, id))
            .collect();
        for replica in &replicas {
            replica.register();
        }

        clock.advance(Duration::from_secs(20));
        for replica in &replicas {
            replica.tick().unwrap();
        }

        let leaders: Vec<&str> = replicas
            .iter()
            .filter(|r| r.is_leader())
            .map(|r| r.local_id().0.as_str())
            .collect();
        assert_eq!(leaders, vec!["r1"]);
    }

    #[test]
    fn test_only_leader_prunes_dead_records() {
        let store = Store::new();
        let clock = Arc::new(ManualClock::new(0));
        let r1 = coordinator(&store, &clock, "r1");
        let r2 = coordinator(&store, &clock, "r2");
        r1.register();
        r2.register();
        store.replicas.put("r0", record("r0", 0, 0));

        clock.advance(Duration::from_secs(40));
        r1.heartbeat().unwrap();

        // r2 sees r0 dead but is not the leader.
        let view = r2.tick().unwrap();
        assert_eq!(view.dead, vec![ReplicaId::from("r0")]);
        assert!(store.replicas.contains("r0"));

        r1.tick().unwrap();
        assert!(r1.is_leader());
        assert!(!store.replicas.contains("r0"));
        assert_eq!(store.replicas.len(), 2);
    }

    #[test]
    fn test_silent_leader_hands_over_after_dead_timeout() {
        let store = Store::new();
        let clock = Arc::new(ManualClock::new(0));
        let r1 = coordinator(&store, &clock, "r1");
        let r2 = coordinator(&store, &clock, "r2");
        r1.register();
        r2.register();
        clock.advance(Duration::from_secs(20));
        r1.tick().unwrap();
        r2.tick().unwrap();
        assert!(r1.is_leader());

        // r1 stops ticking.
        clock.advance(Duration::from_secs(31));
        r2.tick().unwrap();

        assert!(r2.is_leader());
        assert!(!store.replicas.contains("r1"));
    }

    #[test]
    fn test_heartbeat_recreates_pruned_record() {
        let store = Store::new();
        let clock = Arc::new(ManualClock::new(5 * SEC));
        let r1 = coordinator(&store, &clock, "r1");

        r1.heartbeat().unwrap();

        let record = store.replicas.get("r1").unwrap();
        assert_eq!(record.started_at_ms, clock.now_ms());
    }

    #[test]
    fn test_deregister_hands_over_immediately() {
        let store = Store::new();
        let clock = Arc::new(ManualClock::new(0));
        let r1 = coordinator(&store, &clock, "r1");
        let r2 = coordinator(&store, &clock, "r2");
        r1.register();
        r2.register();
        clock.advance(Duration::from_secs(20));
        r1.tick().unwrap();
        r2.tick().unwrap();

        r1.deregister();
        r2.tick().unwrap();

        assert!(!r1.is_leader());
        assert!(r2.is_leader());
    }

    #[tokio::test]
    async fn test_run_loop_deregisters_on_cancel() {
        let store = Store::new();
        let clock = Arc::new(ManualClock::new(0));
        let r1 = coordinator(&store, &clock, "r1");
        r1.register();
        let token = CancellationToken::new();

        let handle = tokio::spawn(r1.clone().run(token.clone()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        handle.await.unwrap();

        assert!(store.replicas.is_empty());
        assert!(!r1.is_leader());
    }
}
