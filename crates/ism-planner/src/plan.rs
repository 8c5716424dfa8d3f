//! Deployment plans
//!
//! A [`DeploymentPlan`] is the ordered list of modules a configuration needs
//! deployed. Steps are stored in post-order: every step's dependencies have
//! smaller ids. Children are referenced through [`Slot`]s, which hold either
//! an address known up front (a leaf) or the id of an earlier step whose
//! address becomes known once it is deployed.

use crate::error::PlanError;
use ism_config::{
    Address, CanonicalHasher, DomainId, Fingerprint, ModuleKind, NodePath, PolicyError,
    ResolvedModule, RootMode,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Index of a step within its plan
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StepId(pub usize);

impl StepId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl Display for StepId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a child module's address comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Slot {
    /// Already deployed
    Address(Address),
    /// Produced by an earlier step
    Step(StepId),
}

impl Slot {
    /// Concrete address, looking up step results with `resolve`
    pub fn address(&self, resolve: impl Fn(StepId) -> Option<Address>) -> Option<Address> {
        match self {
            Slot::Address(address) => Some(*address),
            Slot::Step(id) => resolve(*id),
        }
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Address(address) => write!(f, "{}", address.short()),
            Slot::Step(id) => write!(f, "{id}"),
        }
    }
}

/// Module parameters with children as slots
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ModuleTemplate {
    Multisig {
        root_mode: RootMode,
        validators: Vec<Address>,
        threshold: u32,
    },
    Aggregation {
        members: Vec<Slot>,
        threshold: u32,
    },
    Routing {
        owner: Address,
        routes: BTreeMap<DomainId, Slot>,
    },
    OpStack {
        native_bridge: Address,
    },
    Null,
}

impl ModuleTemplate {
    /// Kind this template deploys
    #[must_use]
    pub fn kind(&self) -> ModuleKind {
        match self {
            ModuleTemplate::Multisig { root_mode, .. } => root_mode.kind(),
            ModuleTemplate::Aggregation { .. } => ModuleKind::Aggregation,
            ModuleTemplate::Routing { .. } => ModuleKind::Routing,
            ModuleTemplate::OpStack { .. } => ModuleKind::OpStack,
            ModuleTemplate::Null => ModuleKind::Null,
        }
    }

    /// Child slots in parameter order
    #[must_use]
    pub fn slots(&self) -> Vec<Slot> {
        match self {
            ModuleTemplate::Aggregation { members, .. } => members.clone(),
            ModuleTemplate::Routing { routes, .. } => routes.values().copied().collect(),
            ModuleTemplate::Multisig { .. }
            | ModuleTemplate::OpStack { .. }
            | ModuleTemplate::Null => Vec::new(),
        }
    }

    /// Steps this template waits for, ascending and deduplicated
    #[must_use]
    pub fn dependencies(&self) -> Vec<StepId> {
        let mut deps: Vec<StepId> = self
            .slots()
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Step(id) => Some(id),
                Slot::Address(_) => None,
            })
            .collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }

    /// Substitute child addresses
    ///
    /// Returns `None` if a referenced step has no address yet.
    pub fn resolve(&self, lookup: impl Fn(StepId) -> Option<Address>) -> Option<ResolvedModule> {
        let module = match self {
            ModuleTemplate::Multisig {
                root_mode,
                validators,
                threshold,
            } => ResolvedModule::multisig(*root_mode, validators.clone(), *threshold),
            ModuleTemplate::Aggregation { members, threshold } => {
                let modules = members
                    .iter()
                    .map(|slot| slot.address(&lookup))
                    .collect::<Option<Vec<_>>>()?;
                ResolvedModule::aggregation(modules, *threshold)
            }
            ModuleTemplate::Routing { owner, routes } => {
                let resolved = routes
                    .iter()
                    .map(|(domain, slot)| slot.address(&lookup).map(|a| (*domain, a)))
                    .collect::<Option<BTreeMap<_, _>>>()?;
                ResolvedModule::routing(*owner, resolved)
            }
            ModuleTemplate::OpStack { native_bridge } => ResolvedModule::op_stack(*native_bridge),
            ModuleTemplate::Null => ResolvedModule::null(),
        };
        Some(module)
    }

    /// Structural key: equal templates over equal children share a key
    ///
    /// Step slots hash as the key of the step they point at, so identical
    /// subtrees reached through different paths collapse to one step.
    pub(crate) fn structural_key(&self, step_keys: &[Fingerprint]) -> Fingerprint {
        fn slot(hasher: &mut CanonicalHasher, slot: &Slot, step_keys: &[Fingerprint]) {
            match slot {
                Slot::Address(address) => {
                    hasher.tag(0).address(address);
                }
                Slot::Step(id) => {
                    hasher.tag(1).fingerprint(&step_keys[id.index()]);
                }
            }
        }

        let mut hasher = CanonicalHasher::new();
        hasher.str("plan-node").tag(self.kind().tag());
        match self {
            ModuleTemplate::Multisig {
                validators,
                threshold,
                ..
            } => {
                hasher.addresses(validators).u32(*threshold);
            }
            ModuleTemplate::Aggregation { members, threshold } => {
                hasher.count(members.len());
                for member in members {
                    slot(&mut hasher, member, step_keys);
                }
                hasher.u32(*threshold);
            }
            ModuleTemplate::Routing { owner, routes } => {
                hasher.address(owner).count(routes.len());
                for (domain, route) in routes {
                    hasher.domain(*domain);
                    slot(&mut hasher, route, step_keys);
                }
            }
            ModuleTemplate::OpStack { native_bridge } => {
                hasher.address(native_bridge);
            }
            ModuleTemplate::Null => {}
        }
        hasher.finish()
    }
}

/// One module to deploy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedNode {
    /// Position in the plan
    pub id: StepId,
    /// Structural identity used for deduplication
    pub key: Fingerprint,
    /// First path at which this node was reached
    pub path: NodePath,
    /// Parameters with child slots
    pub template: ModuleTemplate,
    /// Steps that must be deployed first
    pub dependencies: Vec<StepId>,
}

impl PlannedNode {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ModuleKind {
        self.template.kind()
    }
}

/// Ordered deployment steps for one configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    steps: Vec<PlannedNode>,
    root: Slot,
    local_domain: Option<DomainId>,
}

impl DeploymentPlan {
    pub(crate) fn new(steps: Vec<PlannedNode>, root: Slot, local_domain: Option<DomainId>) -> Self {
        Self {
            steps,
            root,
            local_domain,
        }
    }

    /// Steps in dependency order
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[PlannedNode] {
        &self.steps
    }

    /// Step by id
    #[inline]
    #[must_use]
    pub fn step(&self, id: StepId) -> Option<&PlannedNode> {
        self.steps.get(id.index())
    }

    /// Where the root module's address comes from
    #[inline]
    #[must_use]
    pub fn root(&self) -> Slot {
        self.root
    }

    /// Domain the plan was validated for, if any
    #[inline]
    #[must_use]
    pub fn local_domain(&self) -> Option<DomainId> {
        self.local_domain
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// For each step, the steps that depend on it
    #[must_use]
    pub fn dependents(&self) -> Vec<Vec<StepId>> {
        let mut dependents = vec![Vec::new(); self.steps.len()];
        for step in &self.steps {
            for dep in &step.dependencies {
                dependents[dep.index()].push(step.id);
            }
        }
        dependents
    }

    /// Check a plan built without a target against the domain it will run on
    ///
    /// # Errors
    /// `Policy(SelfRoute)` naming the first routing step that routes to `domain`
    pub fn check_domain(&self, domain: DomainId) -> Result<(), PlanError> {
        for step in &self.steps {
            if let ModuleTemplate::Routing { routes, .. } = &step.template {
                if routes.contains_key(&domain) {
                    return Err(PlanError::policy(&step.path, PolicyError::SelfRoute(domain)));
                }
            }
        }
        Ok(())
    }
}

impl Display for DeploymentPlan {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "{} {} at {}", step.id, step.kind(), step.path)?;
            let slots = step.template.slots();
            if !slots.is_empty() {
                let rendered: Vec<String> = slots.iter().map(ToString::to_string).collect();
                write!(f, " <- [{}]", rendered.join(", "))?;
            }
            writeln!(f)?;
        }
        write!(f, "root: {}", self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::new([n; 32])
    }

    #[test]
    fn dependencies_are_sorted_and_unique() {
        let template = ModuleTemplate::Aggregation {
            members: vec![
                Slot::Step(StepId(2)),
                Slot::Address(addr(1)),
                Slot::Step(StepId(0)),
                Slot::Step(StepId(2)),
            ],
            threshold: 1,
        };
        assert_eq!(template.dependencies(), vec![StepId(0), StepId(2)]);
    }

    #[test]
    fn resolve_waits_for_children() {
        let template = ModuleTemplate::Aggregation {
            members: vec![Slot::Step(StepId(0)), Slot::Address(addr(7))],
            threshold: 1,
        };
        assert!(template.resolve(|_| None).is_none());
        let resolved = template.resolve(|_| Some(addr(3))).unwrap();
        assert_eq!(resolved, ResolvedModule::aggregation(vec![addr(3), addr(7)], 1));
    }

    #[test]
    fn structural_key_distinguishes_slot_sources() {
        let keys = vec![CanonicalHasher::new().str("child").finish()];
        let via_step = ModuleTemplate::Aggregation {
            members: vec![Slot::Step(StepId(0))],
            threshold: 1,
        };
        let via_address = ModuleTemplate::Aggregation {
            members: vec![Slot::Address(addr(0))],
            threshold: 1,
        };
        assert_ne!(
            via_step.structural_key(&keys),
            via_address.structural_key(&keys)
        );
    }
}
