//! Resolved deployment parameters
//!
//! A [`ResolvedModule`] is a configuration node with every child replaced by
//! its deployed address. It is what the deploy capability receives, and its
//! [`ResolvedModule::fingerprint`] is the deduplication key: two nodes that
//! resolve to the same kind and parameters share a fingerprint no matter how
//! their children were described.

use crate::address::{Address, DomainId};
use crate::fingerprint::{CanonicalHasher, Fingerprint};
use crate::kind::{ModuleKind, RootMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-kind parameters with child addresses substituted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ModuleParams {
    /// Multisig validator set (sorted) and threshold
    Multisig {
        validators: Vec<Address>,
        threshold: u32,
    },
    /// Member module addresses in configuration order
    Aggregation { modules: Vec<Address>, threshold: u32 },
    /// Route table by origin domain
    Routing {
        owner: Address,
        routes: BTreeMap<DomainId, Address>,
    },
    /// Native bridge address
    OpStack {
        #[serde(rename = "nativeBridge")]
        native_bridge: Address,
    },
    /// No parameters
    Null,
}

/// A module ready to be deployed: kind plus concrete parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedModule {
    kind: ModuleKind,
    params: ModuleParams,
}

impl ResolvedModule {
    /// Multisig module; validators are sorted
    #[must_use]
    pub fn multisig(root_mode: RootMode, mut validators: Vec<Address>, threshold: u32) -> Self {
        validators.sort_unstable();
        Self {
            kind: root_mode.kind(),
            params: ModuleParams::Multisig {
                validators,
                threshold,
            },
        }
    }

    /// Aggregation over already deployed members
    #[must_use]
    pub fn aggregation(modules: Vec<Address>, threshold: u32) -> Self {
        Self {
            kind: ModuleKind::Aggregation,
            params: ModuleParams::Aggregation { modules, threshold },
        }
    }

    /// Routing over already deployed routes
    #[must_use]
    pub fn routing(owner: Address, routes: BTreeMap<DomainId, Address>) -> Self {
        Self {
            kind: ModuleKind::Routing,
            params: ModuleParams::Routing { owner, routes },
        }
    }

    /// Native bridge module
    #[must_use]
    pub fn op_stack(native_bridge: Address) -> Self {
        Self {
            kind: ModuleKind::OpStack,
            params: ModuleParams::OpStack { native_bridge },
        }
    }

    /// Null module
    #[must_use]
    pub fn null() -> Self {
        Self {
            kind: ModuleKind::Null,
            params: ModuleParams::Null,
        }
    }

    /// Pair a kind with parameters, or `None` if the parameters do not
    /// belong to that kind
    #[must_use]
    pub fn from_parts(kind: ModuleKind, params: ModuleParams) -> Option<Self> {
        let matches = match &params {
            ModuleParams::Multisig { .. } => kind.is_multisig(),
            ModuleParams::Aggregation { .. } => kind == ModuleKind::Aggregation,
            ModuleParams::Routing { .. } => kind == ModuleKind::Routing,
            ModuleParams::OpStack { .. } => kind == ModuleKind::OpStack,
            ModuleParams::Null => kind == ModuleKind::Null,
        };
        matches.then_some(Self { kind, params })
    }

    /// Kind to deploy
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    /// Concrete parameters
    #[inline]
    #[must_use]
    pub fn params(&self) -> &ModuleParams {
        &self.params
    }

    /// Content fingerprint over kind and parameters
    ///
    /// The deployment chain is not hashed; cache keys pair the fingerprint
    /// with the chain.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = CanonicalHasher::new();
        hasher.tag(self.kind.tag());
        match &self.params {
            ModuleParams::Multisig {
                validators,
                threshold,
            } => {
                hasher.addresses(validators).u32(*threshold);
            }
            ModuleParams::Aggregation { modules, threshold } => {
                hasher.addresses(modules).u32(*threshold);
            }
            ModuleParams::Routing { owner, routes } => {
                hasher.address(owner).count(routes.len());
                for (domain, address) in routes {
                    hasher.domain(*domain).address(address);
                }
            }
            ModuleParams::OpStack { native_bridge } => {
                hasher.address(native_bridge);
            }
            ModuleParams::Null => {}
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::new([n; 32])
    }

    #[test]
    fn multisig_fingerprint_ignores_validator_order() {
        let a = ResolvedModule::multisig(RootMode::MessageId, vec![addr(1), addr(2)], 1);
        let b = ResolvedModule::multisig(RootMode::MessageId, vec![addr(2), addr(1)], 1);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn root_mode_changes_fingerprint() {
        let a = ResolvedModule::multisig(RootMode::MessageId, vec![addr(1)], 1);
        let b = ResolvedModule::multisig(RootMode::MerkleRoot, vec![addr(1)], 1);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn from_parts_checks_kind() {
        let module = ResolvedModule::op_stack(addr(4));
        let rebuilt = ResolvedModule::from_parts(module.kind(), module.params().clone());
        assert_eq!(rebuilt, Some(module.clone()));
        assert_eq!(
            ResolvedModule::from_parts(ModuleKind::Routing, module.params().clone()),
            None
        );
    }

    #[test]
    fn aggregation_member_order_matters() {
        let a = ResolvedModule::aggregation(vec![addr(1), addr(2)], 1);
        let b = ResolvedModule::aggregation(vec![addr(2), addr(1)], 1);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn routing_fingerprint_covers_routes() {
        let mut routes = BTreeMap::new();
        routes.insert(DomainId(1), addr(0xaa));
        let one = ResolvedModule::routing(addr(9), routes.clone());
        routes.insert(DomainId(2), addr(0xbb));
        let two = ResolvedModule::routing(addr(9), routes);
        assert_ne!(one.fingerprint(), two.fingerprint());
    }

    #[test]
    fn distinct_kinds_never_collide() {
        assert_ne!(
            ResolvedModule::null().fingerprint(),
            ResolvedModule::op_stack(Address::ZERO).fingerprint()
        );
    }

    #[test]
    fn params_serialize_tagged() {
        let json = serde_json::to_value(ResolvedModule::op_stack(addr(3))).unwrap();
        assert_eq!(json["kind"], 6);
        assert_eq!(json["params"]["type"], "opStack");
    }
}
