//! Registry errors

use ism_config::{ConfigError, DomainId};

/// Errors loading or querying the chain registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No chain with this name
    #[error("unknown chain '{0}'")]
    UnknownChain(String),

    /// No chain with this domain id
    #[error("no chain registered for domain {0}")]
    UnknownDomain(DomainId),

    /// Two entries share a name
    #[error("chain '{0}' is registered more than once")]
    DuplicateChain(String),

    /// Two entries share a domain id
    #[error("domain {domain} is registered by both '{first}' and '{second}'")]
    DuplicateDomain {
        domain: DomainId,
        first: String,
        second: String,
    },

    /// Name is empty or not a valid registry key
    #[error("invalid chain name '{0}': expected lowercase letters, digits, '-' or '_'")]
    InvalidName(String),

    /// Metadata file could not be read or parsed
    #[error(transparent)]
    Source(#[from] ConfigError),
}
