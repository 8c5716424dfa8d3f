//! Dependency resolution
//!
//! Walks a configuration tree in post-order, validating every node on the
//! way down and appending each deployable node after its children. Library
//! references are expanded in place; a reference reached again while its own
//! expansion is still in progress is a cycle.

use crate::error::PlanError;
use crate::plan::{DeploymentPlan, ModuleTemplate, PlannedNode, Slot, StepId};
use crate::validator::InvariantValidator;
use ism_config::{DomainId, Fingerprint, ModuleConfig, ModuleLibrary, NodePath};
use std::collections::HashMap;

/// Default bound on nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Builds deployment plans
#[derive(Debug, Clone)]
pub struct DependencyResolver<'a> {
    validator: InvariantValidator,
    library: Option<&'a ModuleLibrary>,
    max_depth: usize,
}

impl<'a> DependencyResolver<'a> {
    /// Resolver for plans deployed on `local_domain`
    #[must_use]
    pub fn new(local_domain: DomainId) -> Self {
        Self {
            validator: InvariantValidator::for_domain(local_domain),
            library: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Resolver with no target; self-routes are checked when the plan is executed
    #[must_use]
    pub fn standalone() -> Self {
        Self {
            validator: InvariantValidator::standalone(),
            library: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Resolve references against `library`
    #[must_use]
    pub fn with_library(mut self, library: &'a ModuleLibrary) -> Self {
        self.library = Some(library);
        self
    }

    /// Bound nesting depth
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Plan the deployment of `root`
    ///
    /// # Errors
    /// The first invalid node, unresolved or cyclic reference, or depth
    /// violation; no plan is produced if any node is invalid
    pub fn plan(&self, root: &ModuleConfig) -> Result<DeploymentPlan, PlanError> {
        let mut walk = Walk {
            resolver: self,
            steps: Vec::new(),
            keys: Vec::new(),
            by_key: HashMap::new(),
            expanding: Vec::new(),
            expanded: HashMap::new(),
        };
        let root_slot = walk.visit(root, &NodePath::root(), 0)?;
        tracing::debug!(
            "Planned {} steps from {} configuration nodes",
            walk.steps.len(),
            root.node_count()
        );
        Ok(DeploymentPlan::new(
            walk.steps,
            root_slot,
            self.validator.local_domain(),
        ))
    }
}

/// Plan `root` for deployment on `local_domain` with default settings
///
/// # Errors
/// See [`DependencyResolver::plan`]
pub fn plan(root: &ModuleConfig, local_domain: DomainId) -> Result<DeploymentPlan, PlanError> {
    DependencyResolver::new(local_domain).plan(root)
}

struct Walk<'r, 'a> {
    resolver: &'r DependencyResolver<'a>,
    steps: Vec<PlannedNode>,
    keys: Vec<Fingerprint>,
    by_key: HashMap<Fingerprint, StepId>,
    expanding: Vec<String>,
    expanded: HashMap<String, Slot>,
}

impl Walk<'_, '_> {
    fn visit(
        &mut self,
        node: &ModuleConfig,
        path: &NodePath,
        depth: usize,
    ) -> Result<Slot, PlanError> {
        if depth > self.resolver.max_depth {
            return Err(PlanError::DepthExceeded {
                path: path.clone(),
                max: self.resolver.max_depth,
            });
        }
        self.resolver
            .validator
            .validate(node)
            .map_err(|source| PlanError::policy(path, source))?;

        let template = match node {
            ModuleConfig::Leaf(address) => return Ok(Slot::Address(*address)),
            ModuleConfig::Reference(name) => return self.expand(name, path, depth),
            ModuleConfig::Multisig(multisig) => ModuleTemplate::Multisig {
                root_mode: multisig.root_mode(),
                validators: multisig.validators().to_vec(),
                threshold: multisig.threshold(),
            },
            ModuleConfig::Aggregation(aggregation) => {
                let members = aggregation
                    .members()
                    .iter()
                    .enumerate()
                    .map(|(i, member)| self.visit(member, &path.member(i), depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                ModuleTemplate::Aggregation {
                    members,
                    threshold: aggregation.threshold(),
                }
            }
            ModuleConfig::Routing(routing) => {
                let mut routes = std::collections::BTreeMap::new();
                for (domain, child) in routing.routes() {
                    let slot = self.visit(child, &path.route(domain), depth + 1)?;
                    routes.insert(*domain, slot);
                }
                ModuleTemplate::Routing {
                    owner: routing.owner(),
                    routes,
                }
            }
            ModuleConfig::ExternalBridge(bridge) => ModuleTemplate::OpStack {
                native_bridge: bridge.native_bridge(),
            },
            ModuleConfig::Null => ModuleTemplate::Null,
        };
        Ok(Slot::Step(self.push(template, path)))
    }

    fn expand(&mut self, name: &str, path: &NodePath, depth: usize) -> Result<Slot, PlanError> {
        if let Some(slot) = self.expanded.get(name) {
            return Ok(*slot);
        }
        if let Some(start) = self.expanding.iter().position(|n| n == name) {
            let mut chain = self.expanding[start..].to_vec();
            chain.push(name.to_string());
            return Err(PlanError::CyclicConfiguration {
                path: path.clone(),
                chain,
            });
        }
        let definition = self
            .resolver
            .library
            .and_then(|library| library.get(name))
            .ok_or_else(|| PlanError::UnresolvedReference {
                path: path.clone(),
                name: name.to_string(),
            })?;

        self.expanding.push(name.to_string());
        let slot = self.visit(definition, &NodePath::definition(name), depth + 1)?;
        self.expanding.pop();
        self.expanded.insert(name.to_string(), slot);
        Ok(slot)
    }

    fn push(&mut self, template: ModuleTemplate, path: &NodePath) -> StepId {
        let key = template.structural_key(&self.keys);
        if let Some(&existing) = self.by_key.get(&key) {
            return existing;
        }
        let id = StepId(self.steps.len());
        self.steps.push(PlannedNode {
            id,
            key,
            path: path.clone(),
            dependencies: template.dependencies(),
            template,
        });
        self.keys.push(key);
        self.by_key.insert(key, id);
        id
    }
}
