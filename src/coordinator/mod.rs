//! Replica Coordination Module
//!
//! Elects one replica among the running processes to run periodic maintenance.
//! Replicas never talk to each other; they only write heartbeats to the shared
//! store and read everybody else's.
//!
//! ## Core Mechanisms
//! - **Heartbeats**: each replica refreshes its record on a fixed interval.
//! - **Failure detection**: a record whose heartbeat is older than the dead
//!   timeout no longer counts and is pruned by the leader.
//! - **Grace period**: a freshly started replica cannot lead, so a rolling
//!   deploy does not bounce leadership between new processes.
//! - **Election**: the smallest eligible id leads. Nothing about leadership is
//!   persisted; every replica derives it from the records.

pub mod service;
pub mod types;

pub use service::ReplicaCoordinator;
pub use types::{LeadershipView, ReplicaId, ReplicaRecord, ReplicaStatus, compute_leadership};

#[cfg(test)]
mod tests;
