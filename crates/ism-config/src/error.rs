//! Error types for the configuration model
//!
//! - [`PolicyError`]: a node violates a structural or numeric invariant
//! - [`ConfigError`]: a serialized configuration could not be read or bound

use crate::address::{Address, DomainId};
use crate::kind::ModuleKind;
use crate::path::NodePath;
use std::path::PathBuf;

/// Invariant violated by a single configuration node
///
/// These are caller errors and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Threshold outside `[1, max]`
    #[error("invalid {kind} threshold {threshold}: must be within [1, {max}]")]
    InvalidThreshold {
        kind: ModuleKind,
        threshold: u32,
        max: usize,
    },

    /// Multisig with no validators
    #[error("multisig validator set is empty")]
    EmptyValidatorSet,

    /// Same validator listed twice
    #[error("duplicate validator {0}")]
    DuplicateValidator(Address),

    /// Aggregation with no members
    #[error("aggregation has no member modules")]
    EmptyAggregation,

    /// Routing lists a domain twice
    #[error("routing lists domain {0} more than once")]
    DuplicateRoute(DomainId),

    /// Routing module routes to the domain it is deployed on
    #[error("routing module deployed on domain {0} cannot route to its own domain")]
    SelfRoute(DomainId),
}

/// Errors reading or binding a serialized configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Routing key names a chain the resolver does not know
    #[error("unknown chain '{chain}' in routing entry at {path}")]
    UnknownChain { path: NodePath, chain: String },

    /// Two routing keys bind to the same domain
    #[error("routing at {path} lists domain {domain} more than once")]
    DuplicateRoute { path: NodePath, domain: DomainId },

    /// JSON syntax or shape error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML syntax or shape error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML syntax or shape error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// File could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No reader for the file extension
    #[error("unsupported config format: '{0}'")]
    UnsupportedFormat(String),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_error_display() {
        let err = PolicyError::InvalidThreshold {
            kind: ModuleKind::MessageIdMultisig,
            threshold: 2,
            max: 1,
        };
        assert_eq!(
            err.to_string(),
            "invalid messageIdMultisig threshold 2: must be within [1, 1]"
        );
    }

    #[test]
    fn config_error_names_path() {
        let err = ConfigError::UnknownChain {
            path: NodePath::root().route("nowhere"),
            chain: "nowhere".to_string(),
        };
        assert!(err.to_string().contains("root.domains.nowhere"));
    }
}
