//! Testing utilities for the ISM workspace
//!
//! Shared fixtures and a [`RecordingDeployer`] that counts calls, records
//! parameters, and can be told to fail or stall.

#![allow(missing_docs)]

use ism_config::{
    Address, AggregationConfig, ChainId, DomainId, ModuleConfig, ModuleKind, ModuleParams,
    MultisigConfig, ResolvedModule, RootMode, RoutingConfig,
};
use ism_deploy::{simulated_address, DeployCapability, ProviderError};
use ism_registry::{ChainMetadata, ChainRegistry};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const TEST1_DOMAIN: DomainId = DomainId(13371);
pub const TEST2_DOMAIN: DomainId = DomainId(13372);
pub const TEST3_DOMAIN: DomainId = DomainId(13373);

/// Address with every byte of its 20-byte form set to `n`
pub fn addr(n: u8) -> Address {
    Address::from_evm([n; 20])
}

pub fn addrs(ns: &[u8]) -> Vec<Address> {
    ns.iter().copied().map(addr).collect()
}

pub fn test1() -> ChainId {
    ChainId::new("test1", TEST1_DOMAIN)
}

pub fn test2() -> ChainId {
    ChainId::new("test2", TEST2_DOMAIN)
}

/// Registry with `test1`, `test2` and `test3`
pub fn test_registry() -> ChainRegistry {
    ChainRegistry::new([
        ChainMetadata::new("test1", TEST1_DOMAIN),
        ChainMetadata::new("test2", TEST2_DOMAIN),
        ChainMetadata::new("test3", TEST3_DOMAIN),
    ])
    .unwrap()
}

pub fn multisig(validators: &[u8], threshold: u32) -> ModuleConfig {
    MultisigConfig::new(addrs(validators), threshold, RootMode::MessageId)
        .unwrap()
        .into()
}

pub fn aggregation(members: Vec<ModuleConfig>, threshold: u32) -> ModuleConfig {
    AggregationConfig::new(members, threshold).unwrap().into()
}

pub fn routing(owner: Address, routes: Vec<(DomainId, ModuleConfig)>) -> ModuleConfig {
    RoutingConfig::new(owner, routes).unwrap().into()
}

/// `Aggregation{[Multisig{[A,B,C], 2}, Multisig{[D,E], 1}], 1}`
pub fn aggregation_scenario() -> ModuleConfig {
    aggregation(
        vec![multisig(&[0xa, 0xb, 0xc], 2), multisig(&[0xd, 0xe], 1)],
        1,
    )
}

/// `Routing{O, {1: Leaf(0xAAA), 2: Leaf(0xBBB)}}`
pub fn routing_scenario() -> ModuleConfig {
    routing(
        addr(0x0f),
        vec![
            (DomainId(1), ModuleConfig::leaf(addr(0xaa))),
            (DomainId(2), ModuleConfig::leaf(addr(0xbb))),
        ],
    )
}

/// One observed `deploy_one` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployCall {
    pub kind: ModuleKind,
    pub params: ModuleParams,
    pub chain: ChainId,
}

#[derive(Debug)]
struct FailureRule {
    kind: Option<ModuleKind>,
    remaining: Option<usize>,
    error: ProviderError,
}

/// Deploy capability that records every call
///
/// Addresses match [`SimulatedDeployer`](ism_deploy::SimulatedDeployer), so
/// results are deterministic across runs.
#[derive(Debug, Default)]
pub struct RecordingDeployer {
    calls: Mutex<Vec<DeployCall>>,
    failures: Mutex<Vec<FailureRule>>,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Fail every call for `kind` until cleared
    pub fn fail_kind(&self, kind: ModuleKind, error: ProviderError) {
        self.failures.lock().push(FailureRule {
            kind: Some(kind),
            remaining: None,
            error,
        });
    }

    /// Fail the next call for `kind` only
    pub fn fail_kind_once(&self, kind: ModuleKind, error: ProviderError) {
        self.failures.lock().push(FailureRule {
            kind: Some(kind),
            remaining: Some(1),
            error,
        });
    }

    /// Fail the next `n` calls of any kind
    pub fn fail_next(&self, n: usize, error: ProviderError) {
        self.failures.lock().push(FailureRule {
            kind: None,
            remaining: Some(n),
            error,
        });
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Every call in arrival order, failed ones included
    pub fn calls(&self) -> Vec<DeployCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_for(&self, kind: ModuleKind) -> usize {
        self.calls.lock().iter().filter(|c| c.kind == kind).count()
    }

    /// Highest number of calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn injected_failure(&self, kind: ModuleKind) -> Option<ProviderError> {
        let mut failures = self.failures.lock();
        let index = failures
            .iter()
            .position(|rule| rule.kind.map_or(true, |k| k == kind))?;
        let rule = &mut failures[index];
        let error = rule.error.clone();
        if let Some(remaining) = rule.remaining.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                failures.remove(index);
            }
        }
        Some(error)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl DeployCapability for RecordingDeployer {
    async fn deploy_one(
        &self,
        kind: ModuleKind,
        params: &ModuleParams,
        chain: &ChainId,
    ) -> Result<Address, ProviderError> {
        self.calls.lock().push(DeployCall {
            kind,
            params: params.clone(),
            chain: chain.clone(),
        });
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.injected_failure(kind) {
            return Err(error);
        }
        let module = ResolvedModule::from_parts(kind, params.clone())
            .ok_or_else(|| ProviderError::Rejected(format!("params do not match {kind}")))?;
        Ok(simulated_address(chain.domain(), &module))
    }
}
