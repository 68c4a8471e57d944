//! Per-target mutation locks
//!
//! Every read-classify-write sequence on a target (a vote, an acceptance,
//! a reconciliation) holds the target's mutex for its whole duration, so
//! two requests on the same target inside this process run one after the
//! other. Requests on different targets never contend.

use bson::oid::ObjectId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db::schemas::TargetKind;

/// Idle entries are pruned once the map grows past this size
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Default)]
pub struct TargetLocks {
    locks: DashMap<(TargetKind, ObjectId), Arc<Mutex<()>>>,
}

impl TargetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a target
    pub async fn lock(&self, kind: TargetKind, id: ObjectId) -> OwnedMutexGuard<()> {
        if self.locks.len() > PRUNE_THRESHOLD {
            self.prune_idle();
        }

        let mutex = self
            .locks
            .entry((kind, id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        mutex.lock_owned().await
    }

    /// Drop entries nobody holds or waits on
    pub fn prune_idle(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
