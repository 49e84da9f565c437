//! Latest-snapshot cell shared between the control loop and the observers.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::domain::Snapshot;

/// Holds at most one snapshot; `set` replaces it whole.
///
/// Readers get an `Arc` to an immutable snapshot, so a reader can never see
/// fields from two different cycles. The lock only guards the pointer swap.
#[derive(Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    latest: RwLock<Option<Arc<Snapshot>>>,
    version: AtomicU64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<Snapshot>> {
        self.inner.latest.read().clone()
    }

    pub fn set(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        *self.inner.latest.write() = Some(snapshot);
        self.inner.version.fetch_add(1, Ordering::Release);
    }

    /// Number of snapshots published so far
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }
}
