//! Deployment sessions
//!
//! A session validates and plans a configuration for one chain, then
//! executes the plan through a shared [`DeploymentCache`]. Planning errors
//! surface before any external call. Deployment errors leave the cache
//! intact, so a fresh session over the same cache retries only what is
//! missing.

use crate::cache::DeploymentCache;
use crate::cancel::CancellationHandle;
use crate::capability::DeployCapability;
use crate::config::EngineConfig;
use crate::error::DeployError;
use crate::executor::{DeploymentExecutor, DeploymentResult};
use ism_config::{ChainId, ModuleConfig, ModuleLibrary};
use ism_planner::{DependencyResolver, DeploymentPlan};
use tracing::Instrument;
use uuid::Uuid;

/// Validate, plan and deploy `root` on `chain` with default settings
///
/// # Errors
/// See [`DeployError`]
pub async fn resolve_and_deploy(
    root: &ModuleConfig,
    chain: &ChainId,
    cache: &DeploymentCache,
    deploy: &dyn DeployCapability,
) -> Result<DeploymentResult, DeployError> {
    DeploymentSession::new(cache, deploy).run(root, chain).await
}

/// One configured deployment attempt
pub struct DeploymentSession<'a> {
    id: Uuid,
    cache: &'a DeploymentCache,
    capability: &'a dyn DeployCapability,
    config: EngineConfig,
    library: Option<&'a ModuleLibrary>,
    cancel: Option<CancellationHandle>,
}

impl<'a> DeploymentSession<'a> {
    #[must_use]
    pub fn new(cache: &'a DeploymentCache, capability: &'a dyn DeployCapability) -> Self {
        Self {
            id: Uuid::new_v4(),
            cache,
            capability,
            config: EngineConfig::default(),
            library: None,
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Named definitions that `Reference` nodes resolve against
    #[must_use]
    pub fn with_library(mut self, library: &'a ModuleLibrary) -> Self {
        self.library = Some(library);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, handle: CancellationHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Validate and plan without deploying
    ///
    /// # Errors
    /// `Planning` if any node is invalid or the configuration is cyclic
    pub fn plan(&self, root: &ModuleConfig, chain: &ChainId) -> Result<DeploymentPlan, DeployError> {
        let mut resolver =
            DependencyResolver::new(chain.domain()).with_max_depth(self.config.max_depth);
        if let Some(library) = self.library {
            resolver = resolver.with_library(library);
        }
        let plan = resolver.plan(root)?;
        tracing::debug!("Planned {} steps for {}:\n{}", plan.len(), chain, plan);
        Ok(plan)
    }

    /// Plan and execute
    ///
    /// # Errors
    /// See [`DeployError`]
    pub async fn run(
        &self,
        root: &ModuleConfig,
        chain: &ChainId,
    ) -> Result<DeploymentResult, DeployError> {
        let span = tracing::info_span!("session", id = %self.id, chain = %chain);
        async {
            let plan = self.plan(root, chain)?;
            self.execute(&plan, chain).await
        }
        .instrument(span)
        .await
    }

    /// Execute an existing plan
    ///
    /// # Errors
    /// See [`DeployError`]
    pub async fn execute(
        &self,
        plan: &DeploymentPlan,
        chain: &ChainId,
    ) -> Result<DeploymentResult, DeployError> {
        let mut executor = DeploymentExecutor::new(self.cache, self.capability)
            .with_max_concurrency(self.config.max_concurrent_deployments);
        if let Some(timeout) = self.config.deploy_timeout() {
            executor = executor.with_timeout(timeout);
        }
        if let Some(cancel) = &self.cancel {
            executor = executor.with_cancellation(cancel.clone());
        }

        match executor.execute(plan, chain).await {
            Ok(result) => {
                tracing::info!(
                    "Session {} deployed root {} on {}: {} nodes, {} calls, {} reused",
                    self.id,
                    result.root_address,
                    chain,
                    result.nodes.len(),
                    result.deploy_calls,
                    result.reused()
                );
                Ok(result)
            }
            Err(err) => {
                tracing::warn!(
                    "Session {} on {} failed (retryable: {}): {}",
                    self.id,
                    chain,
                    err.is_retryable(),
                    err
                );
                Err(err)
            }
        }
    }
}
