//! The recursive module configuration model
//!
//! [`ModuleConfig`] is a closed sum over the policy kinds. Composite nodes own
//! their children by value; equality and hashing are structural, so two
//! configurations that describe the same policy compare equal regardless of
//! where they came from.
//!
//! The validating constructors ([`MultisigConfig::new`],
//! [`AggregationConfig::new`], [`RoutingConfig::new`]) reject invariant
//! violations up front. Configurations decoded from the serialized form are
//! checked later, by the planner, so the error can name the node's path.

use crate::address::{Address, DomainId};
use crate::error::PolicyError;
use crate::kind::{ModuleKind, RootMode};
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// A security module configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleConfig {
    /// An already deployed module
    Leaf(Address),
    /// m-of-n validator signatures
    Multisig(MultisigConfig),
    /// m-of-n child modules
    Aggregation(AggregationConfig),
    /// Child module chosen by origin domain
    Routing(RoutingConfig),
    /// Provider-specific native bridge module
    ExternalBridge(ExternalBridgeConfig),
    /// Accepts every message
    Null,
    /// Named entry of a [`ModuleLibrary`], expanded during planning
    Reference(String),
}

impl ModuleConfig {
    /// Reference an already deployed module
    #[inline]
    #[must_use]
    pub fn leaf(address: Address) -> Self {
        Self::Leaf(address)
    }

    /// Reference a library entry by name
    #[inline]
    #[must_use]
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference(name.into())
    }

    /// Deployable kind, if this node deploys anything
    #[must_use]
    pub fn kind(&self) -> Option<ModuleKind> {
        match self {
            Self::Leaf(_) | Self::Reference(_) => None,
            Self::Multisig(m) => Some(m.kind()),
            Self::Aggregation(_) => Some(ModuleKind::Aggregation),
            Self::Routing(_) => Some(ModuleKind::Routing),
            Self::ExternalBridge(_) => Some(ModuleKind::OpStack),
            Self::Null => Some(ModuleKind::Null),
        }
    }

    /// Whether this node is already an address
    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Number of nodes in the tree, not expanding references
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + match self {
            Self::Aggregation(a) => a.members.iter().map(Self::node_count).sum(),
            Self::Routing(r) => r.routes.values().map(Self::node_count).sum(),
            Self::Leaf(_)
            | Self::Multisig(_)
            | Self::ExternalBridge(_)
            | Self::Null
            | Self::Reference(_) => 0,
        }
    }
}

impl From<MultisigConfig> for ModuleConfig {
    fn from(value: MultisigConfig) -> Self {
        Self::Multisig(value)
    }
}

impl From<AggregationConfig> for ModuleConfig {
    fn from(value: AggregationConfig) -> Self {
        Self::Aggregation(value)
    }
}

impl From<RoutingConfig> for ModuleConfig {
    fn from(value: RoutingConfig) -> Self {
        Self::Routing(value)
    }
}

impl From<ExternalBridgeConfig> for ModuleConfig {
    fn from(value: ExternalBridgeConfig) -> Self {
        Self::ExternalBridge(value)
    }
}

impl From<Address> for ModuleConfig {
    fn from(value: Address) -> Self {
        Self::Leaf(value)
    }
}

/// Check a multisig validator set and threshold
///
/// `validators` must be sorted.
///
/// # Errors
/// Returns the first violated invariant
pub fn check_multisig(
    kind: ModuleKind,
    validators: &[Address],
    threshold: u32,
) -> Result<(), PolicyError> {
    if validators.is_empty() {
        return Err(PolicyError::EmptyValidatorSet);
    }
    if let Some(pair) = validators.windows(2).find(|w| w[0] == w[1]) {
        return Err(PolicyError::DuplicateValidator(pair[0]));
    }
    check_threshold(kind, threshold, validators.len())
}

/// Check an m-of-n threshold
///
/// # Errors
/// Returns [`PolicyError::InvalidThreshold`] unless `1 <= threshold <= max`
pub fn check_threshold(kind: ModuleKind, threshold: u32, max: usize) -> Result<(), PolicyError> {
    if threshold == 0 || threshold as usize > max {
        return Err(PolicyError::InvalidThreshold {
            kind,
            threshold,
            max,
        });
    }
    Ok(())
}

/// Multisig policy over a fixed validator set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MultisigConfig {
    validators: Vec<Address>,
    threshold: u32,
    root_mode: RootMode,
}

impl MultisigConfig {
    /// Create a multisig configuration
    ///
    /// Validators are stored in canonical (sorted) order.
    ///
    /// # Errors
    /// `EmptyValidatorSet`, `DuplicateValidator` or `InvalidThreshold`
    pub fn new(
        validators: impl IntoIterator<Item = Address>,
        threshold: u32,
        root_mode: RootMode,
    ) -> Result<Self, PolicyError> {
        let config = Self::from_parts(validators, threshold, root_mode);
        config.check()?;
        Ok(config)
    }

    /// Build without checking invariants (decoding path)
    pub(crate) fn from_parts(
        validators: impl IntoIterator<Item = Address>,
        threshold: u32,
        root_mode: RootMode,
    ) -> Self {
        let mut validators: Vec<Address> = validators.into_iter().collect();
        validators.sort_unstable();
        Self {
            validators,
            threshold,
            root_mode,
        }
    }

    /// Check this node's invariants
    ///
    /// # Errors
    /// Returns the first violated invariant
    pub fn check(&self) -> Result<(), PolicyError> {
        check_multisig(self.kind(), &self.validators, self.threshold)
    }

    /// Replace the validator set, re-checking the threshold
    ///
    /// # Errors
    /// Same as [`MultisigConfig::new`]
    pub fn with_validators(
        &self,
        validators: impl IntoIterator<Item = Address>,
    ) -> Result<Self, PolicyError> {
        Self::new(validators, self.threshold, self.root_mode)
    }

    /// Replace the threshold
    ///
    /// # Errors
    /// Same as [`MultisigConfig::new`]
    pub fn with_threshold(&self, threshold: u32) -> Result<Self, PolicyError> {
        Self::new(self.validators.iter().copied(), threshold, self.root_mode)
    }

    /// Validators in canonical order
    #[inline]
    #[must_use]
    pub fn validators(&self) -> &[Address] {
        &self.validators
    }

    /// Signatures required
    #[inline]
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Checkpoint the validators sign
    #[inline]
    #[must_use]
    pub fn root_mode(&self) -> RootMode {
        self.root_mode
    }

    /// Deployed kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ModuleKind {
        self.root_mode.kind()
    }
}

/// Aggregation policy: accepts when `threshold` members accept
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregationConfig {
    members: Vec<ModuleConfig>,
    threshold: u32,
}

impl AggregationConfig {
    /// Create an aggregation configuration
    ///
    /// # Errors
    /// `EmptyAggregation` or `InvalidThreshold`
    pub fn new(members: Vec<ModuleConfig>, threshold: u32) -> Result<Self, PolicyError> {
        let config = Self::from_parts(members, threshold);
        config.check()?;
        Ok(config)
    }

    pub(crate) fn from_parts(members: Vec<ModuleConfig>, threshold: u32) -> Self {
        Self { members, threshold }
    }

    /// Check this node's invariants (not its members')
    ///
    /// # Errors
    /// Returns the first violated invariant
    pub fn check(&self) -> Result<(), PolicyError> {
        if self.members.is_empty() {
            return Err(PolicyError::EmptyAggregation);
        }
        check_threshold(ModuleKind::Aggregation, self.threshold, self.members.len())
    }

    /// Member configurations in order
    #[inline]
    #[must_use]
    pub fn members(&self) -> &[ModuleConfig] {
        &self.members
    }

    /// Members required to accept
    #[inline]
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

/// Routing policy: one child module per origin domain
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingConfig {
    owner: Address,
    routes: BTreeMap<DomainId, ModuleConfig>,
}

impl RoutingConfig {
    /// Create a routing configuration
    ///
    /// # Errors
    /// `DuplicateRoute` if a domain appears twice
    pub fn new(
        owner: Address,
        routes: impl IntoIterator<Item = (DomainId, ModuleConfig)>,
    ) -> Result<Self, PolicyError> {
        let mut map = BTreeMap::new();
        for (domain, module) in routes {
            if map.insert(domain, module).is_some() {
                return Err(PolicyError::DuplicateRoute(domain));
            }
        }
        Ok(Self { owner, routes: map })
    }

    pub(crate) fn from_map(owner: Address, routes: BTreeMap<DomainId, ModuleConfig>) -> Self {
        Self { owner, routes }
    }

    /// Check this node against the domain it will be deployed on
    ///
    /// # Errors
    /// `SelfRoute` if `local_domain` is among the routes
    pub fn check_for_domain(&self, local_domain: DomainId) -> Result<(), PolicyError> {
        if self.routes.contains_key(&local_domain) {
            return Err(PolicyError::SelfRoute(local_domain));
        }
        Ok(())
    }

    /// Owner allowed to update routes
    #[inline]
    #[must_use]
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Routes by origin domain
    #[inline]
    #[must_use]
    pub fn routes(&self) -> &BTreeMap<DomainId, ModuleConfig> {
        &self.routes
    }
}

/// Native bridge verification policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalBridgeConfig {
    native_bridge: Address,
}

impl ExternalBridgeConfig {
    /// Create a bridge configuration
    #[inline]
    #[must_use]
    pub fn new(native_bridge: Address) -> Self {
        Self { native_bridge }
    }

    /// Bridge contract the module trusts
    #[inline]
    #[must_use]
    pub fn native_bridge(&self) -> Address {
        self.native_bridge
    }
}

/// Named module definitions that [`ModuleConfig::Reference`] nodes point to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleLibrary {
    entries: IndexMap<String, ModuleConfig>,
}

impl ModuleLibrary {
    /// Empty library
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a definition, returning the previous one
    pub fn insert(&mut self, name: impl Into<String>, config: ModuleConfig) -> Option<ModuleConfig> {
        self.entries.insert(name.into(), config)
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, config: ModuleConfig) -> Self {
        self.insert(name, config);
        self
    }

    /// Look up a definition
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModuleConfig> {
        self.entries.get(name)
    }

    /// Number of definitions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no definitions
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Definitions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModuleConfig)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::new([n; 32])
    }

    #[test]
    fn multisig_rejects_threshold_above_set() {
        let err = MultisigConfig::new([addr(1)], 2, RootMode::MessageId).unwrap_err();
        assert_eq!(
            err,
            PolicyError::InvalidThreshold {
                kind: ModuleKind::MessageIdMultisig,
                threshold: 2,
                max: 1
            }
        );
    }

    #[test]
    fn multisig_rejects_zero_threshold_and_empty_set() {
        assert!(matches!(
            MultisigConfig::new([addr(1)], 0, RootMode::MerkleRoot),
            Err(PolicyError::InvalidThreshold { threshold: 0, .. })
        ));
        assert_eq!(
            MultisigConfig::new([], 1, RootMode::MerkleRoot),
            Err(PolicyError::EmptyValidatorSet)
        );
    }

    #[test]
    fn multisig_rejects_duplicates() {
        let err = MultisigConfig::new([addr(2), addr(1), addr(2)], 1, RootMode::MessageId)
            .unwrap_err();
        assert_eq!(err, PolicyError::DuplicateValidator(addr(2)));
    }

    #[test]
    fn multisig_equality_ignores_validator_order() {
        let a = MultisigConfig::new([addr(1), addr(2)], 1, RootMode::MessageId).unwrap();
        let b = MultisigConfig::new([addr(2), addr(1)], 1, RootMode::MessageId).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn replacing_validators_rechecks_threshold() {
        let m = MultisigConfig::new([addr(1), addr(2), addr(3)], 3, RootMode::MessageId).unwrap();
        assert!(m.with_validators([addr(1), addr(2)]).is_err());
        let smaller = m.with_threshold(2).unwrap().with_validators([addr(4), addr(5)]).unwrap();
        assert_eq!(smaller.validators(), &[addr(4), addr(5)]);
        assert_eq!(m.validators().len(), 3);
    }

    #[test]
    fn aggregation_invariants() {
        assert_eq!(
            AggregationConfig::new(vec![], 1),
            Err(PolicyError::EmptyAggregation)
        );
        assert!(AggregationConfig::new(vec![ModuleConfig::Null], 2).is_err());
        assert!(AggregationConfig::new(vec![ModuleConfig::Null, ModuleConfig::Null], 2).is_ok());
    }

    #[test]
    fn routing_rejects_duplicate_and_self_routes() {
        let dup = RoutingConfig::new(
            addr(9),
            [
                (DomainId(1), ModuleConfig::Null),
                (DomainId(1), ModuleConfig::Leaf(addr(1))),
            ],
        );
        assert_eq!(dup, Err(PolicyError::DuplicateRoute(DomainId(1))));

        let routing = RoutingConfig::new(addr(9), [(DomainId(1), ModuleConfig::Null)]).unwrap();
        assert_eq!(
            routing.check_for_domain(DomainId(1)),
            Err(PolicyError::SelfRoute(DomainId(1)))
        );
        assert!(routing.check_for_domain(DomainId(2)).is_ok());
    }

    #[test]
    fn kinds_and_counts() {
        let multisig = MultisigConfig::new([addr(1)], 1, RootMode::MerkleRoot).unwrap();
        let agg = AggregationConfig::new(
            vec![multisig.clone().into(), ModuleConfig::Leaf(addr(3))],
            1,
        )
        .unwrap();
        let root: ModuleConfig = agg.into();
        assert_eq!(root.kind(), Some(ModuleKind::Aggregation));
        assert_eq!(root.node_count(), 3);
        assert_eq!(ModuleConfig::Leaf(addr(1)).kind(), None);
        assert_eq!(
            ModuleConfig::from(multisig).kind(),
            Some(ModuleKind::MerkleRootMultisig)
        );
    }

    #[test]
    fn library_preserves_order() {
        let lib = ModuleLibrary::new()
            .with("b", ModuleConfig::Null)
            .with("a", ModuleConfig::Leaf(addr(1)));
        let names: Vec<&str> = lib.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(lib.get("a").is_some());
        assert_eq!(lib.len(), 2);
    }
}
