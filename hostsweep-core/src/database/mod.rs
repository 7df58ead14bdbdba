//! Persistence for scans, targets and results.
//!
//! Application code only sees the [`ports`] traits, bundled into a
//! [`ScanStore`]. The Postgres adapters are used in production; the
//! [`MemoryStore`] backs ephemeral deployments and tests.

pub mod memory;
pub mod ports;
pub mod postgres;

use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;

use sqlx::PgPool;

pub use memory::MemoryStore;
use ports::{ResultRepository, ScanRepository, TargetRepository};
use postgres::{
    PostgresResultRepository, PostgresScanRepository, PostgresTargetRepository,
};

/// Aggregates the repository ports used by the scan services.
#[derive(Clone)]
pub struct ScanStore {
    pub scans: Arc<dyn ScanRepository>,
    pub targets: Arc<dyn TargetRepository>,
    pub results: Arc<dyn ResultRepository>,
}

impl fmt::Debug for ScanStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanStore")
            .field("scans", &type_name_of_val(self.scans.as_ref()))
            .field("targets", &type_name_of_val(self.targets.as_ref()))
            .field("results", &type_name_of_val(self.results.as_ref()))
            .finish()
    }
}

impl ScanStore {
    pub fn from_postgres(pool: PgPool) -> Self {
        Self {
            scans: Arc::new(PostgresScanRepository::new(pool.clone())),
            targets: Arc::new(PostgresTargetRepository::new(pool.clone())),
            results: Arc::new(PostgresResultRepository::new(pool)),
        }
    }

    /// Every port served by the same in-memory store.
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            scans: store.clone(),
            targets: store.clone(),
            results: store,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(MemoryStore::new()))
    }
}
