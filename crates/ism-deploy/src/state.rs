//! Per-node deployment state machine
//!
//! `Pending → Validated → (CacheHit | Deploying) → Deployed | Failed`
//!
//! `Deployed` and `Failed` are terminal. A failed node is never retried
//! within its session; a new session replans and reuses the cache.

use serde::{Deserialize, Serialize};

/// Lifecycle of one planned node within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeState {
    Pending,
    Validated,
    CacheHit,
    Deploying,
    Deployed,
    Failed,
}

impl NodeState {
    /// Whether no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty()
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: NodeState) -> &'static [NodeState] {
    use NodeState::*;
    match from {
        Pending => &[Validated, Failed],
        Validated => &[CacheHit, Deploying, Failed],
        CacheHit => &[Deployed],
        Deploying => &[Deployed, Failed],
        Deployed | Failed => &[],
    }
}

/// Rejected state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal state transition: {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: NodeState,
    pub to: NodeState,
}

/// Check a single transition
///
/// # Errors
/// `TransitionError` if `to` is not reachable from `from`
pub fn validate_transition(from: NodeState, to: NodeState) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: [NodeState; 6] = [
        NodeState::Pending,
        NodeState::Validated,
        NodeState::CacheHit,
        NodeState::Deploying,
        NodeState::Deployed,
        NodeState::Failed,
    ];

    #[test]
    fn happy_paths() {
        assert!(validate_transition(NodeState::Pending, NodeState::Validated).is_ok());
        assert!(validate_transition(NodeState::Validated, NodeState::CacheHit).is_ok());
        assert!(validate_transition(NodeState::CacheHit, NodeState::Deployed).is_ok());
        assert!(validate_transition(NodeState::Validated, NodeState::Deploying).is_ok());
        assert!(validate_transition(NodeState::Deploying, NodeState::Deployed).is_ok());
    }

    #[test]
    fn failed_is_final() {
        for to in ALL {
            assert!(validate_transition(NodeState::Failed, to).is_err());
        }
        assert!(NodeState::Failed.is_terminal());
        assert!(NodeState::Deployed.is_terminal());
        assert!(!NodeState::Deploying.is_terminal());
    }

    #[test]
    fn cannot_skip_validation() {
        assert!(validate_transition(NodeState::Pending, NodeState::Deploying).is_err());
        assert!(validate_transition(NodeState::Pending, NodeState::Deployed).is_err());
    }

    proptest! {
        #[test]
        fn prop_transitions_match_table(
            from in proptest::sample::select(ALL.to_vec()),
            to in proptest::sample::select(ALL.to_vec()),
        ) {
            let allowed = allowed_transitions(from).contains(&to);
            prop_assert_eq!(validate_transition(from, to).is_ok(), allowed);
        }
    }
}
