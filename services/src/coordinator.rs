//! Traffic arbitration for the rolling-deploy overlap window.
//!
//! Two process instances are briefly live against the same storage volume
//! during a blue-green rollover. Nothing here implements consensus: data
//! correctness comes entirely from the storage engine's uniqueness
//! constraint, and every store write revalidates against storage rather than
//! process memory. This component only feeds the health probe that the
//! balancer uses to decide where to route traffic.

use sea_orm::DatabaseConnection;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

pub struct InstanceCoordinator {
    db: DatabaseConnection,
    draining: AtomicBool,
}

impl InstanceCoordinator {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            draining: AtomicBool::new(false),
        }
    }

    /// Live probe of the shared storage volume. This is the boolean the
    /// health endpoint reports; it is never cached.
    pub async fn storage_reachable(&self) -> bool {
        match self.db.ping().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "storage ping failed");
                false
            }
        }
    }

    /// Whether this instance should receive traffic: storage reachable and
    /// not draining for shutdown. Routing only — a request that still lands
    /// here while not ready is handled correctly regardless.
    pub async fn ready(&self) -> bool {
        !self.is_draining() && self.storage_reachable().await
    }

    /// Flags this instance as leaving the pool so the balancer shifts
    /// traffic to its replacement while in-flight requests finish.
    pub fn begin_drain(&self) {
        if !self.draining.swap(true, Ordering::SeqCst) {
            info!("instance draining: health probe will now report not-ready");
        }
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }
}
