//! Registry-aware facade over sessions
//!
//! Resolves chain names through a [`ChainRegistry`], binds configuration
//! documents, and runs sessions with one [`EngineConfig`].

use crate::cache::DeploymentCache;
use crate::cancel::CancellationHandle;
use crate::capability::DeployCapability;
use crate::config::EngineConfig;
use crate::error::DeployError;
use crate::executor::DeploymentResult;
use crate::session::DeploymentSession;
use ism_config::{BoundDocument, IsmDocument, ModuleConfig, ModuleLibrary};
use ism_planner::{DependencyResolver, DeploymentPlan};
use ism_registry::ChainRegistry;
use std::sync::Arc;

pub struct Engine {
    registry: ChainRegistry,
    config: EngineConfig,
    capability: Arc<dyn DeployCapability>,
}

impl Engine {
    #[must_use]
    pub fn new(registry: ChainRegistry, capability: Arc<dyn DeployCapability>) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
            capability,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Bind chain names in a document to domains
    ///
    /// # Errors
    /// `Document` if a route names an unknown chain
    pub fn bind(&self, document: &IsmDocument) -> Result<BoundDocument, DeployError> {
        Ok(document.bind(&self.registry)?)
    }

    fn session<'a>(
        &'a self,
        cache: &'a DeploymentCache,
        library: &'a ModuleLibrary,
    ) -> DeploymentSession<'a> {
        DeploymentSession::new(cache, self.capability.as_ref())
            .with_config(self.config.clone())
            .with_library(library)
    }

    /// Plan `root` for the named chain
    ///
    /// # Errors
    /// `Registry` for an unknown chain, `Planning` for invalid configuration
    pub fn plan(
        &self,
        chain: &str,
        root: &ModuleConfig,
        library: &ModuleLibrary,
    ) -> Result<DeploymentPlan, DeployError> {
        let chain = self.registry.chain(chain)?;
        let cache = DeploymentCache::new();
        self.session(&cache, library).plan(root, &chain)
    }

    /// Check every node of a document without choosing a chain
    ///
    /// Unreferenced definitions are checked too. Returns the chain-free plan
    /// of the root.
    ///
    /// # Errors
    /// `Document` for unknown chains, `Planning` for the first invalid node
    pub fn validate(&self, document: &IsmDocument) -> Result<DeploymentPlan, DeployError> {
        let bound = self.bind(document)?;
        let resolver = DependencyResolver::standalone()
            .with_max_depth(self.config.max_depth)
            .with_library(&bound.library);
        for (name, _) in bound.library.iter() {
            resolver.plan(&ModuleConfig::reference(name))?;
        }
        let plan = resolver.plan(&bound.root)?;
        tracing::debug!(
            "Validated {} definitions and a {}-step root",
            bound.library.len(),
            plan.len()
        );
        Ok(plan)
    }

    /// Deploy `root` on the named chain
    ///
    /// # Errors
    /// See [`DeployError`]
    pub async fn deploy(
        &self,
        chain: &str,
        root: &ModuleConfig,
        library: &ModuleLibrary,
        cache: &DeploymentCache,
    ) -> Result<DeploymentResult, DeployError> {
        let chain = self.registry.chain(chain)?;
        self.session(cache, library).run(root, &chain).await
    }

    /// Bind and deploy a document on the named chain
    ///
    /// # Errors
    /// See [`DeployError`]
    pub async fn deploy_document(
        &self,
        chain: &str,
        document: &IsmDocument,
        cache: &DeploymentCache,
        cancel: Option<CancellationHandle>,
    ) -> Result<DeploymentResult, DeployError> {
        let chain = self.registry.chain(chain)?;
        let bound = self.bind(document)?;
        let mut session = self.session(cache, &bound.library);
        if let Some(cancel) = cancel {
            session = session.with_cancellation(cancel);
        }
        session.run(&bound.root, &chain).await
    }
}
