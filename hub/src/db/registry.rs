use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use super::pool::{open_ro_pool, DbPool};
use crate::error::HubError;

/// Process-wide cache of store pools keyed by connection target.
///
/// Pools are created on first use and never replaced. A target that fails to
/// connect is recorded as offline and every later lookup fails fast without
/// touching the filesystem. Clone-able via internal Arc.
#[derive(Clone)]
pub struct ConnectionRegistry {
    pools: Arc<RwLock<HashMap<PathBuf, DbPool>>>,
    offline: Arc<RwLock<HashSet<PathBuf>>>,
    max_size: u32,
    timeout: Duration,
}

impl ConnectionRegistry {
    pub fn new(max_size: u32, timeout: Duration) -> Self {
        Self {
            pools: Arc::new(RwLock::new(HashMap::new())),
            offline: Arc::new(RwLock::new(HashSet::new())),
            max_size,
            timeout,
        }
    }

    /// Get the pool for `target`, connecting on first use.
    pub fn connect(&self, target: &Path) -> Result<DbPool, HubError> {
        if self.is_offline(target) {
            return Err(HubError::Connection(format!(
                "{} is marked offline",
                target.display()
            )));
        }

        {
            let pools = self.pools.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(pool) = pools.get(target) {
                return Ok(pool.clone());
            }
        }

        tracing::info!("Connecting to {} ...", target.display());
        match open_ro_pool(target, self.max_size, self.timeout) {
            Ok(pool) => {
                let mut pools = self.pools.write().unwrap_or_else(PoisonError::into_inner);
                // A concurrent first use may have won the race; keep its pool.
                let entry = pools.entry(target.to_path_buf()).or_insert(pool);
                tracing::info!("Connected: {}", target.display());
                Ok(entry.clone())
            }
            Err(e) => {
                tracing::error!("Connection failed for {}: {e}", target.display());
                self.offline
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(target.to_path_buf());
                Err(HubError::Connection(format!(
                    "Cannot connect to store {}: {e}",
                    target.display()
                )))
            }
        }
    }

    pub fn is_offline(&self, target: &Path) -> bool {
        self.offline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(target)
    }

    /// Number of targets with a live pool.
    #[cfg(test)]
    pub fn connected(&self) -> usize {
        self.pools.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
