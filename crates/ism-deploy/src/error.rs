//! Deployment errors
//!
//! - [`ProviderError`]: the external deploy capability failed one call
//! - [`CacheInconsistency`]: one `(fingerprint, chain)` pair produced two addresses
//! - [`DeployError`]: anything that ends a session, naming the offending node

use crate::state::NodeState;
use ism_config::{Address, ChainId, ConfigError, DomainId, Fingerprint, ModuleKind, NodePath, PolicyError};
use ism_planner::PlanError;
use ism_registry::RegistryError;
use std::time::Duration;

/// Failure of a single `deploy_one` call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The chain or provider refused the deployment
    #[error("deployment rejected: {0}")]
    Rejected(String),

    /// Network or RPC failure
    #[error("transport error: {0}")]
    Transport(String),

    /// No confirmation within the configured timeout
    #[error("deployment timed out after {0:?}")]
    Timeout(Duration),

    /// Capability cannot deploy this kind
    #[error("module kind {0} is not supported by this deployer")]
    Unsupported(ModuleKind),
}

/// A second record for a cache key disagrees with the first
///
/// Signals a non-deterministic deploy capability. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "cache inconsistency for {fingerprint} on {chain}: recorded {recorded}, attempted {attempted}"
)]
pub struct CacheInconsistency {
    pub fingerprint: Fingerprint,
    pub chain: ChainId,
    pub recorded: Address,
    pub attempted: Address,
}

/// Errors that end a deployment session
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Validation or planning failed; nothing was deployed
    #[error(transparent)]
    Planning(#[from] PlanError),

    /// The deploy capability failed for one node
    #[error("deploying {kind} at {node} ({}) failed: {cause}", .fingerprint.short())]
    NodeFailed {
        node: NodePath,
        kind: ModuleKind,
        fingerprint: Fingerprint,
        #[source]
        cause: ProviderError,
    },

    /// Resolved parameters violate an invariant
    #[error("invalid parameters at {node}: {source}")]
    InvalidParams {
        node: NodePath,
        #[source]
        source: PolicyError,
    },

    /// Cache detected a non-deterministic deploy
    #[error(transparent)]
    Inconsistent(#[from] CacheInconsistency),

    /// Session cancelled before every node was deployed
    #[error("deployment cancelled after {completed} nodes completed")]
    Cancelled { completed: usize },

    /// Plan was validated for another domain
    #[error("plan was built for domain {planned} but is being executed on {chain}")]
    ChainMismatch { planned: DomainId, chain: ChainId },

    /// Node state machine violation
    #[error("illegal state transition at {node}: {from:?} -> {to:?}")]
    IllegalTransition {
        node: NodePath,
        from: NodeState,
        to: NodeState,
    },

    /// Chain registry lookup failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Configuration document could not be read or bound
    #[error(transparent)]
    Document(#[from] ConfigError),
}

impl DeployError {
    /// Whether a fresh session over the same cache may succeed
    ///
    /// Provider failures and cancellation are retryable; every other error
    /// needs a configuration or code change.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeployError::NodeFailed { .. } | DeployError::Cancelled { .. }
        )
    }

    /// Path of the node the error is about, if any
    #[must_use]
    pub fn node(&self) -> Option<&NodePath> {
        match self {
            DeployError::Planning(err) => Some(err.path()),
            DeployError::NodeFailed { node, .. }
            | DeployError::InvalidParams { node, .. }
            | DeployError::IllegalTransition { node, .. } => Some(node),
            DeployError::Inconsistent(_)
            | DeployError::Cancelled { .. }
            | DeployError::ChainMismatch { .. }
            | DeployError::Registry(_)
            | DeployError::Document(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ism_config::CanonicalHasher;

    #[test]
    fn only_provider_failures_and_cancellation_retry() {
        let failed = DeployError::NodeFailed {
            node: NodePath::root(),
            kind: ModuleKind::Routing,
            fingerprint: CanonicalHasher::new().finish(),
            cause: ProviderError::Transport("connection reset".into()),
        };
        assert!(failed.is_retryable());
        assert!(DeployError::Cancelled { completed: 2 }.is_retryable());

        let inconsistent = DeployError::from(CacheInconsistency {
            fingerprint: CanonicalHasher::new().finish(),
            chain: ChainId::new("test1", DomainId(13371)),
            recorded: Address::new([1; 32]),
            attempted: Address::new([2; 32]),
        });
        assert!(!inconsistent.is_retryable());

        let planning = DeployError::from(PlanError::DepthExceeded {
            path: NodePath::root(),
            max: 1,
        });
        assert!(!planning.is_retryable());
        assert_eq!(planning.node(), Some(&NodePath::root()));
    }

    #[test]
    fn node_failure_names_the_node() {
        let err = DeployError::NodeFailed {
            node: NodePath::root().member(1),
            kind: ModuleKind::MessageIdMultisig,
            fingerprint: CanonicalHasher::new().finish(),
            cause: ProviderError::Rejected("out of gas".into()),
        };
        let message = err.to_string();
        assert!(message.contains("root.modules.1"));
        assert!(message.contains("out of gas"));
    }
}
