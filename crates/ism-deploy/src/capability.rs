//! The external single-module deploy capability
//!
//! The engine never deploys anything itself. Each planned node that misses
//! the cache is handed to a [`DeployCapability`] with its children's
//! addresses already substituted in.

use crate::error::ProviderError;
use ism_config::{Address, ChainId, ModuleKind, ModuleParams};
use std::sync::Arc;

/// Deploys one module and returns its address
///
/// Calls may take minutes. The engine's cache, not the capability, is what
/// prevents duplicate deployments.
#[async_trait::async_trait]
pub trait DeployCapability: Send + Sync {
    /// Deploy a module of `kind` with concrete `params` on `chain`
    async fn deploy_one(
        &self,
        kind: ModuleKind,
        params: &ModuleParams,
        chain: &ChainId,
    ) -> Result<Address, ProviderError>;
}

#[async_trait::async_trait]
impl<T> DeployCapability for Arc<T>
where
    T: DeployCapability + ?Sized,
{
    async fn deploy_one(
        &self,
        kind: ModuleKind,
        params: &ModuleParams,
        chain: &ChainId,
    ) -> Result<Address, ProviderError> {
        (**self).deploy_one(kind, params, chain).await
    }
}
