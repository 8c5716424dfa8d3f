//! Invariant validation
//!
//! Pure checks on a single node. Recursion into children is the resolver's
//! job; the validator never looks below the node it is given and never
//! touches anything outside it.

use ism_config::{
    check_multisig, check_threshold, DomainId, ModuleConfig, ModuleKind, ModuleParams,
    PolicyError, ResolvedModule,
};

/// Checks one node's numeric and structural invariants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvariantValidator {
    local_domain: Option<DomainId>,
}

impl InvariantValidator {
    /// Validator with no deployment target; the self-route check is skipped
    #[inline]
    #[must_use]
    pub fn standalone() -> Self {
        Self { local_domain: None }
    }

    /// Validator for nodes deployed on `domain`
    #[inline]
    #[must_use]
    pub fn for_domain(domain: DomainId) -> Self {
        Self {
            local_domain: Some(domain),
        }
    }

    #[inline]
    #[must_use]
    pub fn local_domain(&self) -> Option<DomainId> {
        self.local_domain
    }

    /// Validate a configuration node
    ///
    /// # Errors
    /// The first violated invariant
    pub fn validate(&self, node: &ModuleConfig) -> Result<(), PolicyError> {
        match node {
            ModuleConfig::Multisig(multisig) => multisig.check(),
            ModuleConfig::Aggregation(aggregation) => aggregation.check(),
            ModuleConfig::Routing(routing) => match self.local_domain {
                Some(domain) => routing.check_for_domain(domain),
                None => Ok(()),
            },
            ModuleConfig::Leaf(_)
            | ModuleConfig::ExternalBridge(_)
            | ModuleConfig::Null
            | ModuleConfig::Reference(_) => Ok(()),
        }
    }

    /// Validate concrete deployment parameters
    ///
    /// Used right before a deploy call, after child addresses are known.
    ///
    /// # Errors
    /// The first violated invariant
    pub fn validate_params(&self, module: &ResolvedModule) -> Result<(), PolicyError> {
        match module.params() {
            ModuleParams::Multisig {
                validators,
                threshold,
            } => {
                let mut sorted = validators.clone();
                sorted.sort_unstable();
                check_multisig(module.kind(), &sorted, *threshold)
            }
            ModuleParams::Aggregation { modules, threshold } => {
                if modules.is_empty() {
                    return Err(PolicyError::EmptyAggregation);
                }
                check_threshold(ModuleKind::Aggregation, *threshold, modules.len())
            }
            ModuleParams::Routing { routes, .. } => match self.local_domain {
                Some(domain) if routes.contains_key(&domain) => {
                    Err(PolicyError::SelfRoute(domain))
                }
                _ => Ok(()),
            },
            ModuleParams::OpStack { .. } | ModuleParams::Null => Ok(()),
        }
    }
}

/// Validate a node without a deployment target
///
/// # Errors
/// The first violated invariant
pub fn validate(node: &ModuleConfig) -> Result<(), PolicyError> {
    InvariantValidator::standalone().validate(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ism_config::{Address, AggregationConfig, MultisigConfig, RootMode, RoutingConfig};
    use std::collections::BTreeMap;

    fn addr(n: u8) -> Address {
        Address::new([n; 32])
    }

    #[test]
    fn validation_is_not_recursive() {
        let bad: ModuleConfig = serde_json::from_str(
            r#"{ "type": "aggregation", "threshold": 1, "modules": [
                { "type": "messageIdMultisig", "validators": ["0x1"], "threshold": 2 }
            ] }"#,
        )
        .unwrap();
        assert!(validate(&bad).is_ok());
    }

    #[test]
    fn self_route_needs_a_domain() {
        let routing: ModuleConfig =
            RoutingConfig::new(addr(9), [(DomainId(5), ModuleConfig::Leaf(addr(1)))])
                .unwrap()
                .into();
        assert!(validate(&routing).is_ok());
        assert_eq!(
            InvariantValidator::for_domain(DomainId(5)).validate(&routing),
            Err(PolicyError::SelfRoute(DomainId(5)))
        );
        assert!(InvariantValidator::for_domain(DomainId(6))
            .validate(&routing)
            .is_ok());
    }

    #[test]
    fn params_validation_catches_unsorted_duplicates() {
        let validator = InvariantValidator::standalone();
        let module = ResolvedModule::multisig(RootMode::MessageId, vec![addr(2), addr(1), addr(2)], 1);
        assert_eq!(
            validator.validate_params(&module),
            Err(PolicyError::DuplicateValidator(addr(2)))
        );
        let agg = ResolvedModule::aggregation(vec![addr(1)], 2);
        assert!(validator.validate_params(&agg).is_err());
    }

    #[test]
    fn params_validation_checks_self_route() {
        let mut routes = BTreeMap::new();
        routes.insert(DomainId(7), addr(1));
        let module = ResolvedModule::routing(addr(9), routes);
        assert_eq!(
            InvariantValidator::for_domain(DomainId(7)).validate_params(&module),
            Err(PolicyError::SelfRoute(DomainId(7)))
        );
    }

    #[test]
    fn valid_nodes_pass() {
        let multisig = MultisigConfig::new([addr(1), addr(2)], 2, RootMode::MerkleRoot).unwrap();
        assert!(validate(&multisig.into()).is_ok());
        let agg = AggregationConfig::new(vec![ModuleConfig::Null], 1).unwrap();
        assert!(validate(&agg.into()).is_ok());
    }
}
