//! Liveness tokens for map controller mounts.
//!
//! Every controller gets a fresh [`MountToken`]. Its clones travel with the
//! background acquisitions; once the controller is torn down the token is
//! revoked and late results are dropped instead of applied.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_MOUNT: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MountId(u64);

#[derive(Debug, Clone)]
pub struct MountToken {
    id: MountId,
    alive: Arc<AtomicBool>,
}

impl MountToken {
    pub fn new() -> Self {
        Self {
            id: MountId(NEXT_MOUNT.fetch_add(1, Ordering::Relaxed)),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> MountId {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Marks the mount as gone for every clone of this token.
    pub fn revoke(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

impl Default for MountToken {
    fn default() -> Self {
        Self::new()
    }
}
