//! Engine settings
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! max_concurrent_deployments = 4
//! deploy_timeout_secs = 300
//! max_depth = 64
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum EngineConfigError {
    #[error("engine config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("engine config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("engine config invalid: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Upper bound on concurrent `deploy_one` calls
    pub max_concurrent_deployments: usize,
    /// Per-call timeout; unset means wait indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_timeout_secs: Option<u64>,
    /// Nesting limit for the resolver
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_deployments: 4,
            deploy_timeout_secs: None,
            max_depth: ism_planner::DEFAULT_MAX_DEPTH,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_max_concurrent_deployments(mut self, max: usize) -> Self {
        self.max_concurrent_deployments = max;
        self
    }

    #[must_use]
    pub fn with_deploy_timeout(mut self, timeout: Duration) -> Self {
        self.deploy_timeout_secs = Some(timeout.as_secs());
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[inline]
    #[must_use]
    pub fn deploy_timeout(&self) -> Option<Duration> {
        self.deploy_timeout_secs.map(Duration::from_secs)
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// Returns error on malformed TOML or invalid values
    pub fn from_toml_str(s: &str) -> Result<Self, EngineConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is invalid
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EngineConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// # Errors
    /// `Invalid` if concurrency or depth is zero, or the timeout is zero
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        if self.max_concurrent_deployments == 0 {
            return Err(EngineConfigError::Invalid(
                "max_concurrent_deployments must be at least 1".into(),
            ));
        }
        if self.max_depth == 0 {
            return Err(EngineConfigError::Invalid("max_depth must be at least 1".into()));
        }
        if self.deploy_timeout_secs == Some(0) {
            return Err(EngineConfigError::Invalid(
                "deploy_timeout_secs must be positive when set".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.deploy_timeout(), None);
    }

    #[test]
    fn partial_document_overrides() {
        let config = EngineConfig::from_toml_str(
            "max_concurrent_deployments = 8\ndeploy_timeout_secs = 30\n",
        )
        .unwrap();
        assert_eq!(config.max_concurrent_deployments, 8);
        assert_eq!(config.deploy_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.max_depth, ism_planner::DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = EngineConfig::from_toml_str("max_concurrent_deployments = 0").unwrap_err();
        assert!(matches!(err, EngineConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EngineConfig::from_toml_str("max_concurency = 2").unwrap_err();
        assert!(matches!(err, EngineConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "max_depth = 8").unwrap();
        let config = EngineConfig::from_path(&path).unwrap();
        assert_eq!(config.max_depth, 8);
    }
}
