//! Deployment executor
//!
//! Drives a [`DeploymentPlan`] against one chain. A step becomes ready once
//! every step it depends on is deployed; the smallest ready step starts
//! first, so a concurrency limit of one follows plan order exactly. Up to
//! `max_concurrency` external calls run at once.
//!
//! On the first failure, or on cancellation, no new steps start. Calls
//! already in flight are allowed to finish so their results land in the
//! cache, then the session ends with the first error.

use crate::cache::DeploymentCache;
use crate::cancel::CancellationHandle;
use crate::capability::DeployCapability;
use crate::error::{DeployError, ProviderError};
use crate::state::{validate_transition, NodeState};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use ism_config::{Address, ChainId, Fingerprint, ModuleKind, NodePath, ResolvedModule};
use ism_planner::{DeploymentPlan, InvariantValidator, PlannedNode, StepId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What happened to one planned node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
    pub step: StepId,
    pub path: NodePath,
    pub kind: ModuleKind,
    pub fingerprint: Fingerprint,
    pub address: Address,
    /// Address came from the cache rather than a call made for this node
    pub reused: bool,
}

/// Outcome of a successful session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub chain: ChainId,
    pub root_address: Address,
    /// Every planned module's fingerprint and address
    pub all_deployed: BTreeMap<Fingerprint, Address>,
    /// Per-node reports in plan order
    pub nodes: Vec<NodeReport>,
    /// External `deploy_one` calls made by this session
    pub deploy_calls: usize,
}

impl DeploymentResult {
    /// Number of nodes whose address came from the cache
    #[must_use]
    pub fn reused(&self) -> usize {
        self.nodes.iter().filter(|n| n.reused).count()
    }
}

/// Runs plans against a deploy capability, memoizing through a cache
pub struct DeploymentExecutor<'a> {
    cache: &'a DeploymentCache,
    capability: &'a dyn DeployCapability,
    max_concurrency: usize,
    deploy_timeout: Option<Duration>,
    cancel: Option<CancellationHandle>,
}

impl<'a> DeploymentExecutor<'a> {
    /// Sequential executor without timeout or cancellation
    #[must_use]
    pub fn new(cache: &'a DeploymentCache, capability: &'a dyn DeployCapability) -> Self {
        Self {
            cache,
            capability,
            max_concurrency: 1,
            deploy_timeout: None,
            cancel: None,
        }
    }

    /// Allow up to `max` concurrent deploy calls (minimum 1)
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Fail a deploy call that has not returned within `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deploy_timeout = Some(timeout);
        self
    }

    /// Stop issuing deployments once `handle` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, handle: CancellationHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    /// Execute `plan` on `chain`
    ///
    /// # Errors
    /// - `ChainMismatch` or `Planning` if the plan is not valid for `chain`
    /// - `InvalidParams` if resolved parameters violate an invariant
    /// - `NodeFailed` for the first failing deploy call
    /// - `Cancelled` if cancelled before every node was deployed
    pub async fn execute(
        &self,
        plan: &DeploymentPlan,
        chain: &ChainId,
    ) -> Result<DeploymentResult, DeployError> {
        match plan.local_domain() {
            Some(planned) if planned != chain.domain() => {
                return Err(DeployError::ChainMismatch {
                    planned,
                    chain: chain.clone(),
                });
            }
            Some(_) => {}
            None => plan.check_domain(chain.domain())?,
        }

        let calls = AtomicUsize::new(0);
        let mut run = Run::new(plan);
        let validator = InvariantValidator::for_domain(chain.domain());
        let mut in_flight: FuturesUnordered<BoxFuture<'_, Completion>> = FuturesUnordered::new();
        let mut first_error: Option<DeployError> = None;
        let mut cancelled = false;

        loop {
            if !cancelled && self.cancel.as_ref().is_some_and(CancellationHandle::is_cancelled) {
                cancelled = true;
            }
            let halted = cancelled || first_error.is_some();

            while !halted && in_flight.len() < self.max_concurrency {
                let Some(id) = run.ready.pop_first() else {
                    break;
                };
                match self.start(&mut run, &validator, id, chain) {
                    Ok(Started::Done) => {}
                    Ok(Started::Call(module, fingerprint)) => {
                        let call = self.deploy(id, module, fingerprint, chain, &calls);
                        in_flight.push(Box::pin(call));
                    }
                    Err(err) => {
                        first_error = Some(err);
                        break;
                    }
                }
            }

            if in_flight.is_empty() {
                break;
            }

            let completion = tokio::select! {
                biased;
                Some(done) = in_flight.next() => done,
                () = wait_cancelled(self.cancel.as_ref()), if !cancelled => {
                    tracing::warn!(
                        "Cancellation requested on {}; draining {} in-flight deployments",
                        chain,
                        in_flight.len()
                    );
                    cancelled = true;
                    continue;
                }
            };

            if let Err(err) = self.finish(&mut run, completion) {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        let completed = run.deployed();
        if completed < plan.len() {
            tracing::warn!(
                "Session on {} cancelled with {} of {} nodes deployed",
                chain,
                completed,
                plan.len()
            );
            return Err(DeployError::Cancelled { completed });
        }

        let root_address = plan
            .root()
            .address(|id| run.addresses[id.index()])
            .ok_or_else(|| DeployError::Cancelled { completed })?;
        let mut nodes = run.reports;
        nodes.sort_by_key(|n| n.step);
        let all_deployed = nodes.iter().map(|n| (n.fingerprint, n.address)).collect();
        Ok(DeploymentResult {
            chain: chain.clone(),
            root_address,
            all_deployed,
            nodes,
            deploy_calls: calls.load(Ordering::SeqCst),
        })
    }

    /// Validate a ready step and either finish it from the cache or hand back
    /// the module to deploy
    fn start(
        &self,
        run: &mut Run<'_>,
        validator: &InvariantValidator,
        id: StepId,
        chain: &ChainId,
    ) -> Result<Started, DeployError> {
        let step = run.step(id);
        let module = step
            .template
            .resolve(|dep| run.addresses[dep.index()])
            .ok_or_else(|| DeployError::IllegalTransition {
                node: step.path.clone(),
                from: NodeState::Pending,
                to: NodeState::Validated,
            })?;
        if let Err(source) = validator.validate_params(&module) {
            run.transition(id, NodeState::Failed)?;
            return Err(DeployError::InvalidParams {
                node: step.path.clone(),
                source,
            });
        }
        run.transition(id, NodeState::Validated)?;

        let fingerprint = module.fingerprint();
        if let Some(address) = self.cache.lookup(fingerprint, chain) {
            tracing::debug!(
                "Cache hit for {} at {}: {}",
                module.kind(),
                step.path,
                address
            );
            run.transition(id, NodeState::CacheHit)?;
            run.complete(id, module.kind(), fingerprint, address, true)?;
            return Ok(Started::Done);
        }

        run.transition(id, NodeState::Deploying)?;
        Ok(Started::Call(module, fingerprint))
    }

    async fn deploy(
        &self,
        id: StepId,
        module: ResolvedModule,
        fingerprint: Fingerprint,
        chain: &ChainId,
        calls: &AtomicUsize,
    ) -> Completion {
        let outcome = self
            .cache
            .get_or_deploy(fingerprint, chain, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                self.invoke(&module, chain).await
            })
            .await;
        Completion {
            id,
            kind: module.kind(),
            fingerprint,
            outcome: outcome.map(|o| (o.address, o.reused)),
        }
    }

    async fn invoke(&self, module: &ResolvedModule, chain: &ChainId) -> Result<Address, ProviderError> {
        let call = self.capability.deploy_one(module.kind(), module.params(), chain);
        match self.deploy_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(ProviderError::Timeout(limit))),
            None => call.await,
        }
    }

    fn finish(&self, run: &mut Run<'_>, completion: Completion) -> Result<(), DeployError> {
        let Completion {
            id,
            kind,
            fingerprint,
            outcome,
        } = completion;
        match outcome {
            Ok((address, reused)) => {
                let path = &run.step(id).path;
                if reused {
                    tracing::debug!("Reused concurrent deployment of {} at {}: {}", kind, path, address);
                } else {
                    tracing::info!("Deployed {} at {}: {}", kind, path, address);
                }
                run.complete(id, kind, fingerprint, address, reused)
            }
            Err(cause) => {
                let node = run.step(id).path.clone();
                tracing::warn!("Deployment of {} at {} failed: {}", kind, node, cause);
                run.transition(id, NodeState::Failed)?;
                Err(DeployError::NodeFailed {
                    node,
                    kind,
                    fingerprint,
                    cause,
                })
            }
        }
    }
}

async fn wait_cancelled(handle: Option<&CancellationHandle>) {
    match handle {
        Some(handle) => handle.cancelled().await,
        None => std::future::pending().await,
    }
}

enum Started {
    /// Finished synchronously from the cache
    Done,
    /// Needs an external call
    Call(ResolvedModule, Fingerprint),
}

struct Completion {
    id: StepId,
    kind: ModuleKind,
    fingerprint: Fingerprint,
    outcome: Result<(Address, bool), ProviderError>,
}

/// Mutable bookkeeping for one execution
struct Run<'p> {
    plan: &'p DeploymentPlan,
    states: Vec<NodeState>,
    addresses: Vec<Option<Address>>,
    waiting_on: Vec<usize>,
    dependents: Vec<Vec<StepId>>,
    ready: BTreeSet<StepId>,
    reports: Vec<NodeReport>,
}

impl<'p> Run<'p> {
    fn new(plan: &'p DeploymentPlan) -> Self {
        let waiting_on: Vec<usize> = plan.steps().iter().map(|s| s.dependencies.len()).collect();
        let ready = plan
            .steps()
            .iter()
            .filter(|s| s.dependencies.is_empty())
            .map(|s| s.id)
            .collect();
        Self {
            plan,
            states: vec![NodeState::Pending; plan.len()],
            addresses: vec![None; plan.len()],
            waiting_on,
            dependents: plan.dependents(),
            ready,
            reports: Vec::with_capacity(plan.len()),
        }
    }

    fn step(&self, id: StepId) -> &'p PlannedNode {
        &self.plan.steps()[id.index()]
    }

    fn transition(&mut self, id: StepId, to: NodeState) -> Result<(), DeployError> {
        let from = self.states[id.index()];
        validate_transition(from, to).map_err(|err| DeployError::IllegalTransition {
            node: self.step(id).path.clone(),
            from: err.from,
            to: err.to,
        })?;
        self.states[id.index()] = to;
        Ok(())
    }

    fn complete(
        &mut self,
        id: StepId,
        kind: ModuleKind,
        fingerprint: Fingerprint,
        address: Address,
        reused: bool,
    ) -> Result<(), DeployError> {
        self.transition(id, NodeState::Deployed)?;
        self.addresses[id.index()] = Some(address);
        let path = self.step(id).path.clone();
        self.reports.push(NodeReport {
            step: id,
            path,
            kind,
            fingerprint,
            address,
            reused,
        });
        for &dependent in &self.dependents[id.index()] {
            let waiting = &mut self.waiting_on[dependent.index()];
            *waiting -= 1;
            if *waiting == 0 {
                self.ready.insert(dependent);
            }
        }
        Ok(())
    }

    fn deployed(&self) -> usize {
        self.states
            .iter()
            .filter(|s| **s == NodeState::Deployed)
            .count()
    }
}
