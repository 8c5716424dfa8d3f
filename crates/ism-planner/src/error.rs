//! Planning errors
//!
//! Every variant names the offending node. None of them are retryable: the
//! configuration itself has to change.

use ism_config::{NodePath, PolicyError};

/// Errors produced while validating and planning a configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// A node violates one of its invariants
    #[error("invalid configuration at {path}: {source}")]
    Policy {
        path: NodePath,
        #[source]
        source: PolicyError,
    },

    /// A reference was reached while it was still being expanded
    #[error("cyclic configuration at {path}: {}", .chain.join(" -> "))]
    CyclicConfiguration { path: NodePath, chain: Vec<String> },

    /// A reference names no library entry
    #[error("unresolved reference '{name}' at {path}")]
    UnresolvedReference { path: NodePath, name: String },

    /// Nesting exceeds the configured bound
    #[error("configuration at {path} nests deeper than {max} levels")]
    DepthExceeded { path: NodePath, max: usize },
}

impl PlanError {
    /// Path of the node that failed
    #[must_use]
    pub fn path(&self) -> &NodePath {
        match self {
            PlanError::Policy { path, .. }
            | PlanError::CyclicConfiguration { path, .. }
            | PlanError::UnresolvedReference { path, .. }
            | PlanError::DepthExceeded { path, .. } => path,
        }
    }

    /// Wrap a policy violation found at `path`
    pub(crate) fn policy(path: &NodePath, source: PolicyError) -> Self {
        PlanError::Policy {
            path: path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_shows_reference_chain() {
        let err = PlanError::CyclicConfiguration {
            path: NodePath::definition("b").member(0),
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(
            err.to_string(),
            "cyclic configuration at @b.modules.0: a -> b -> a"
        );
    }
}
