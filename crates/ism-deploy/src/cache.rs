//! Content-addressed deployment cache
//!
//! Maps `(fingerprint, chain)` to the address deployed for it. Every key
//! holds an async once-cell: the first [`DeploymentCache::get_or_deploy`]
//! caller runs the deployment and every concurrent caller for the same key
//! waits for it and reuses the address. A failed deployment leaves the key
//! empty so a later attempt can run.
//!
//! The cache lives for one session unless the caller explicitly snapshots
//! it and seeds a fresh one.

use crate::error::CacheInconsistency;
use dashmap::DashMap;
use ism_config::{Address, ChainId, ConfigError, DomainId, Fingerprint};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A materialized node: produced once per `(fingerprint, chain)`, never mutated
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedNode {
    pub fingerprint: Fingerprint,
    pub address: Address,
    pub chain: ChainId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    fingerprint: Fingerprint,
    domain: DomainId,
}

impl CacheKey {
    fn new(fingerprint: Fingerprint, chain: &ChainId) -> Self {
        Self {
            fingerprint,
            domain: chain.domain(),
        }
    }
}

/// Result of [`DeploymentCache::get_or_deploy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOutcome {
    pub address: Address,
    /// `true` if another caller produced the address
    pub reused: bool,
}

/// Concurrency-safe memo of deployed modules
#[derive(Debug, Default)]
pub struct DeploymentCache {
    entries: DashMap<CacheKey, Arc<OnceCell<ResolvedNode>>>,
}

impl DeploymentCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: CacheKey) -> Arc<OnceCell<ResolvedNode>> {
        // Clone the Arc so no map guard is held across an await.
        self.entries.entry(key).or_default().value().clone()
    }

    /// Address recorded for a fingerprint on a chain
    #[must_use]
    pub fn lookup(&self, fingerprint: Fingerprint, chain: &ChainId) -> Option<Address> {
        self.entries
            .get(&CacheKey::new(fingerprint, chain))
            .and_then(|cell| cell.get().map(|node| node.address))
    }

    /// Record an address
    ///
    /// Recording the same address twice is a no-op. Waits for a deployment
    /// of the same key that is already in flight, then compares.
    ///
    /// # Errors
    /// `CacheInconsistency` if a different address is already recorded
    pub async fn record(
        &self,
        fingerprint: Fingerprint,
        chain: &ChainId,
        address: Address,
    ) -> Result<(), CacheInconsistency> {
        let cell = self.cell(CacheKey::new(fingerprint, chain));
        let stored = cell
            .get_or_init(|| async {
                ResolvedNode {
                    fingerprint,
                    address,
                    chain: chain.clone(),
                }
            })
            .await;
        if stored.address == address {
            Ok(())
        } else {
            tracing::error!(
                "Cache inconsistency for {} on {}: recorded {}, attempted {}",
                fingerprint,
                chain,
                stored.address,
                address
            );
            Err(CacheInconsistency {
                fingerprint,
                chain: chain.clone(),
                recorded: stored.address,
                attempted: address,
            })
        }
    }

    /// Return the cached address, or run `deploy` exactly once for this key
    ///
    /// Concurrent callers for the same key wait for the running deployment.
    /// If it fails, the key stays empty and one of the waiters runs its own
    /// `deploy`.
    ///
    /// # Errors
    /// Whatever `deploy` returns
    pub async fn get_or_deploy<F, Fut, E>(
        &self,
        fingerprint: Fingerprint,
        chain: &ChainId,
        deploy: F,
    ) -> Result<CacheOutcome, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Address, E>>,
    {
        let cell = self.cell(CacheKey::new(fingerprint, chain));
        let ran = AtomicBool::new(false);
        let node = cell
            .get_or_try_init(|| async {
                ran.store(true, Ordering::SeqCst);
                let address = deploy().await?;
                Ok::<_, E>(ResolvedNode {
                    fingerprint,
                    address,
                    chain: chain.clone(),
                })
            })
            .await?;
        Ok(CacheOutcome {
            address: node.address,
            reused: !ran.load(Ordering::SeqCst),
        })
    }

    /// Seed from previously persisted nodes
    ///
    /// # Errors
    /// `CacheInconsistency` if a node disagrees with one already present
    pub async fn seed(
        &self,
        nodes: impl IntoIterator<Item = ResolvedNode>,
    ) -> Result<usize, CacheInconsistency> {
        let mut count = 0;
        for node in nodes {
            self.record(node.fingerprint, &node.chain, node.address).await?;
            count += 1;
        }
        Ok(count)
    }

    /// Every recorded node, ordered by domain then fingerprint
    #[must_use]
    pub fn snapshot(&self) -> CacheSnapshot {
        let mut nodes: Vec<ResolvedNode> = self
            .entries
            .iter()
            .filter_map(|entry| entry.value().get().cloned())
            .collect();
        nodes.sort_by(|a, b| {
            (a.chain.domain(), a.fingerprint).cmp(&(b.chain.domain(), b.fingerprint))
        });
        CacheSnapshot { nodes }
    }

    /// Number of recorded nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serializable cache contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub nodes: Vec<ResolvedNode>,
}

impl CacheSnapshot {
    /// Read a JSON snapshot
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write as pretty JSON
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| ConfigError::io_error(path, e))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
