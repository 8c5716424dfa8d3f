//! Chain metadata registry
//!
//! Loaded once at process start and never mutated. Names are matched
//! case-insensitively and stored lowercase.

use crate::error::RegistryError;
use ism_config::{ChainId, ConfigError, DomainId, DomainResolver};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Protocol family of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolType {
    #[default]
    Ethereum,
    Sealevel,
    Cosmos,
}

/// RPC endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcUrl {
    pub http: String,
}

/// Metadata for one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMetadata {
    /// Registry key
    pub name: String,
    /// Stable domain id
    pub domain_id: DomainId,
    /// Native chain id, when it differs from the domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub protocol: ProtocolType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rpc_urls: Vec<RpcUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ChainMetadata {
    /// Metadata with only the required fields
    #[must_use]
    pub fn new(name: impl Into<String>, domain_id: DomainId) -> Self {
        Self {
            name: name.into(),
            domain_id,
            chain_id: None,
            protocol: ProtocolType::Ethereum,
            rpc_urls: Vec::new(),
            display_name: None,
        }
    }

    /// Set the protocol family
    #[must_use]
    pub fn with_protocol(mut self, protocol: ProtocolType) -> Self {
        self.protocol = protocol;
        self
    }

    /// Add an RPC endpoint
    #[must_use]
    pub fn with_rpc(mut self, http: impl Into<String>) -> Self {
        self.rpc_urls.push(RpcUrl { http: http.into() });
        self
    }

    /// Deployment target for this chain
    #[inline]
    #[must_use]
    pub fn chain(&self) -> ChainId {
        ChainId::new(self.name.clone(), self.domain_id)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    #[serde(default)]
    chains: Vec<ChainMetadata>,
}

/// Read-only lookup from chain names to domains and metadata
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: Vec<ChainMetadata>,
    by_name: HashMap<String, usize>,
    by_domain: HashMap<DomainId, usize>,
}

impl ChainRegistry {
    /// Build a registry from metadata entries
    ///
    /// # Errors
    /// `InvalidName`, `DuplicateChain` or `DuplicateDomain`
    pub fn new(chains: impl IntoIterator<Item = ChainMetadata>) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for mut meta in chains {
            meta.name = normalize(&meta.name)?;
            if registry.by_name.contains_key(&meta.name) {
                return Err(RegistryError::DuplicateChain(meta.name));
            }
            if let Some(&existing) = registry.by_domain.get(&meta.domain_id) {
                return Err(RegistryError::DuplicateDomain {
                    domain: meta.domain_id,
                    first: registry.chains[existing].name.clone(),
                    second: meta.name,
                });
            }
            let index = registry.chains.len();
            registry.by_name.insert(meta.name.clone(), index);
            registry.by_domain.insert(meta.domain_id, index);
            registry.chains.push(meta);
        }
        Ok(registry)
    }

    /// Parse from JSON
    ///
    /// # Errors
    /// Returns error if the input does not parse or fails validation
    pub fn from_json_str(input: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(input).map_err(ConfigError::from)?;
        Self::new(file.chains)
    }

    /// Parse from YAML
    ///
    /// # Errors
    /// Returns error if the input does not parse or fails validation
    pub fn from_yaml_str(input: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_yaml::from_str(input).map_err(ConfigError::from)?;
        Self::new(file.chains)
    }

    /// Parse from TOML
    ///
    /// # Errors
    /// Returns error if the input does not parse or fails validation
    pub fn from_toml_str(input: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = toml::from_str(input).map_err(ConfigError::from)?;
        Self::new(file.chains)
    }

    /// Load from a file, choosing the format from its extension
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let registry = match extension.as_str() {
            "json" => Self::from_json_str(&contents),
            "yaml" | "yml" => Self::from_yaml_str(&contents),
            "toml" => Self::from_toml_str(&contents),
            other => Err(ConfigError::UnsupportedFormat(other.to_string()).into()),
        }?;
        tracing::debug!(
            "Loaded {} chains from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Domain id of a chain
    ///
    /// # Errors
    /// `UnknownChain` if the name is not registered
    pub fn resolve_domain(&self, name: &str) -> Result<DomainId, RegistryError> {
        self.metadata(name).map(|m| m.domain_id)
    }

    /// Deployment target for a chain
    ///
    /// # Errors
    /// `UnknownChain` if the name is not registered
    pub fn chain(&self, name: &str) -> Result<ChainId, RegistryError> {
        self.metadata(name).map(ChainMetadata::chain)
    }

    /// Chain registered for a domain
    ///
    /// # Errors
    /// `UnknownDomain` if no chain uses this domain
    pub fn chain_by_domain(&self, domain: DomainId) -> Result<ChainId, RegistryError> {
        self.by_domain
            .get(&domain)
            .map(|&i| self.chains[i].chain())
            .ok_or(RegistryError::UnknownDomain(domain))
    }

    /// Full metadata of a chain
    ///
    /// # Errors
    /// `UnknownChain` if the name is not registered
    pub fn metadata(&self, name: &str) -> Result<&ChainMetadata, RegistryError> {
        self.by_name
            .get(&name.to_ascii_lowercase())
            .map(|&i| &self.chains[i])
            .ok_or_else(|| RegistryError::UnknownChain(name.to_string()))
    }

    /// Registered chains in load order
    pub fn chains(&self) -> impl Iterator<Item = &ChainMetadata> {
        self.chains.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl DomainResolver for ChainRegistry {
    fn resolve_domain(&self, chain: &str) -> Option<DomainId> {
        ChainRegistry::resolve_domain(self, chain).ok()
    }
}

fn normalize(name: &str) -> Result<String, RegistryError> {
    let lower = name.trim().to_ascii_lowercase();
    let valid = !lower.is_empty()
        && lower
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if valid {
        Ok(lower)
    } else {
        Err(RegistryError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ChainRegistry {
        ChainRegistry::new([
            ChainMetadata::new("test1", DomainId(13371)),
            ChainMetadata::new("Test2", DomainId(13372)).with_protocol(ProtocolType::Sealevel),
        ])
        .unwrap()
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let registry = registry();
        assert_eq!(registry.resolve_domain("TEST1").unwrap(), DomainId(13371));
        assert_eq!(registry.chain("test2").unwrap().name(), "test2");
        assert_eq!(
            registry.metadata("test2").unwrap().protocol,
            ProtocolType::Sealevel
        );
    }

    #[test]
    fn reverse_lookup_by_domain() {
        let registry = registry();
        assert_eq!(
            registry.chain_by_domain(DomainId(13372)).unwrap(),
            ChainId::new("test2", DomainId(13372))
        );
        assert!(matches!(
            registry.chain_by_domain(DomainId(1)),
            Err(RegistryError::UnknownDomain(DomainId(1)))
        ));
    }

    #[test]
    fn rejects_duplicates() {
        let dup_name = ChainRegistry::new([
            ChainMetadata::new("a", DomainId(1)),
            ChainMetadata::new("A", DomainId(2)),
        ]);
        assert!(matches!(dup_name, Err(RegistryError::DuplicateChain(n)) if n == "a"));

        let dup_domain = ChainRegistry::new([
            ChainMetadata::new("a", DomainId(1)),
            ChainMetadata::new("b", DomainId(1)),
        ]);
        assert!(matches!(
            dup_domain,
            Err(RegistryError::DuplicateDomain { first, second, .. }) if first == "a" && second == "b"
        ));
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(matches!(
            ChainRegistry::new([ChainMetadata::new("bad name", DomainId(1))]),
            Err(RegistryError::InvalidName(_))
        ));
    }

    #[test]
    fn acts_as_domain_resolver() {
        let registry = registry();
        let resolver: &dyn DomainResolver = &registry;
        assert_eq!(resolver.resolve_domain("test1"), Some(DomainId(13371)));
        assert_eq!(resolver.resolve_domain("nowhere"), None);
    }
}
