//! Deterministic in-process deploy capability
//!
//! Addresses are derived from the chain's domain and the module fingerprint,
//! the way a counterfactual factory deployment would assign them. Running
//! the same configuration twice yields the same addresses.

use crate::capability::DeployCapability;
use crate::error::ProviderError;
use ism_config::{Address, ChainId, DomainId, ModuleKind, ModuleParams, ResolvedModule};
use parking_lot::Mutex;
use std::collections::BTreeMap;

const ADDRESS_CONTEXT: &str = "ism-deploy 2024 simulated factory address v1";

/// Derive the address a module would receive on `domain`
#[must_use]
pub fn simulated_address(domain: DomainId, module: &ResolvedModule) -> Address {
    let mut hasher = blake3::Hasher::new_derive_key(ADDRESS_CONTEXT);
    hasher.update(&domain.get().to_be_bytes());
    hasher.update(module.fingerprint().as_bytes());
    let digest = hasher.finalize();
    let mut evm = [0u8; 20];
    evm.copy_from_slice(&digest.as_bytes()[12..]);
    Address::from_evm(evm)
}

/// Simulated deployer that remembers what it deployed
#[derive(Debug, Default)]
pub struct SimulatedDeployer {
    deployed: Mutex<BTreeMap<Address, (DomainId, ResolvedModule)>>,
}

impl SimulatedDeployer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct modules deployed
    #[must_use]
    pub fn deployed_count(&self) -> usize {
        self.deployed.lock().len()
    }

    /// Module deployed at `address`, if any
    #[must_use]
    pub fn module_at(&self, address: &Address) -> Option<ResolvedModule> {
        self.deployed
            .lock()
            .get(address)
            .map(|(_, module)| module.clone())
    }
}

#[async_trait::async_trait]
impl DeployCapability for SimulatedDeployer {
    async fn deploy_one(
        &self,
        kind: ModuleKind,
        params: &ModuleParams,
        chain: &ChainId,
    ) -> Result<Address, ProviderError> {
        let module = ResolvedModule::from_parts(kind, params.clone()).ok_or_else(|| {
            ProviderError::Rejected(format!("parameters do not describe a {kind} module"))
        })?;
        let address = simulated_address(chain.domain(), &module);
        tracing::debug!("Simulated {} deployment on {}: {}", kind, chain, address);
        self.deployed
            .lock()
            .insert(address, (chain.domain(), module));
        Ok(address)
    }
}
