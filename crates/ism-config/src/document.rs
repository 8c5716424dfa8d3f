//! Serialized configuration form
//!
//! [`RawModule`] mirrors the textual shape of a module configuration:
//!
//! ```text
//! "0x…"                                             leaf address
//! { "ref": "name" }                                 library reference
//! { "type": "messageIdMultisig", "validators": [...], "threshold": 2 }
//! { "type": "aggregation", "modules": [...], "threshold": 1 }
//! { "type": "routing", "owner": "0x…", "domains": { "test2": ..., "1000": ... } }
//! { "type": "opStack", "nativeBridge": "0x…" }
//! { "type": "null" }
//! ```
//!
//! `type` may also be the numeric module kind tag (`{ "type": 5, ... }` is a
//! message id multisig); retired tags are rejected.
//!
//! Decoding never checks invariants. [`RawModule::bind`] turns the raw form
//! into a [`ModuleConfig`], resolving routing keys that name chains through a
//! [`DomainResolver`]; invariant violations surface later, during planning,
//! where the error can name the node.

use crate::address::{Address, DomainId};
use crate::error::ConfigError;
use crate::kind::{ModuleKind, RootMode};
use crate::module::{
    AggregationConfig, ExternalBridgeConfig, ModuleConfig, ModuleLibrary, MultisigConfig,
    RoutingConfig,
};
use crate::path::NodePath;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::path::Path;

/// Maps chain names used as routing keys to domain ids
pub trait DomainResolver {
    /// Domain of `chain`, if known
    fn resolve_domain(&self, chain: &str) -> Option<DomainId>;
}

/// Resolver that only understands numeric keys
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericDomains;

impl DomainResolver for NumericDomains {
    fn resolve_domain(&self, chain: &str) -> Option<DomainId> {
        chain.parse().ok()
    }
}

impl<F> DomainResolver for F
where
    F: Fn(&str) -> Option<DomainId>,
{
    fn resolve_domain(&self, chain: &str) -> Option<DomainId> {
        self(chain)
    }
}

/// Routing table key: a numeric domain or a chain name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RouteKey {
    /// Numeric domain id
    Domain(DomainId),
    /// Chain name, bound through a [`DomainResolver`]
    Chain(String),
}

impl Display for RouteKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RouteKey::Domain(domain) => write!(f, "{domain}"),
            RouteKey::Chain(name) => f.write_str(name),
        }
    }
}

impl Serialize for RouteKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Map keys are strings in every supported format.
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RouteKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct RouteKeyVisitor;

        impl serde::de::Visitor<'_> for RouteKeyVisitor {
            type Value = RouteKey;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a domain id or chain name")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u32::try_from(value)
                    .map(|d| RouteKey::Domain(DomainId(d)))
                    .map_err(|_| E::custom(format!("domain id {value} out of range")))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u32::try_from(value)
                    .map(|d| RouteKey::Domain(DomainId(d)))
                    .map_err(|_| E::custom(format!("domain id {value} out of range")))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if value.is_empty() {
                    return Err(E::custom("empty routing key"));
                }
                Ok(match value.parse::<u32>() {
                    Ok(domain) => RouteKey::Domain(DomainId(domain)),
                    Err(_) => RouteKey::Chain(value.to_string()),
                })
            }
        }

        deserializer.deserialize_any(RouteKeyVisitor)
    }
}

/// `{ "ref": "name" }`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawReference {
    /// Library entry name
    #[serde(rename = "ref")]
    pub name: String,
}

/// A module object with a `type` tag
///
/// `type` is either the kind name or its stable numeric tag. Fields that do
/// not belong to the kind are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RawTypedModule {
    /// Routing by origin domain
    Routing {
        /// Route owner
        owner: Address,
        /// Routes keyed by domain id or chain name
        domains: BTreeMap<RouteKey, RawModule>,
    },
    /// m-of-n over members
    Aggregation {
        /// Members in order
        modules: Vec<RawModule>,
        /// Members required
        threshold: u32,
    },
    /// Merkle root multisig
    MerkleRootMultisig {
        /// Validator set
        validators: Vec<Address>,
        /// Signatures required
        threshold: u32,
    },
    /// Message id multisig
    MessageIdMultisig {
        /// Validator set
        validators: Vec<Address>,
        /// Signatures required
        threshold: u32,
    },
    /// Native bridge
    OpStack {
        /// Trusted bridge contract
        #[serde(rename = "nativeBridge")]
        native_bridge: Address,
    },
    /// Accepts everything
    Null,
}

/// `type` field: a kind name or a numeric tag, never a variant index
struct KindTag(ModuleKind);

impl<'de> Deserialize<'de> for KindTag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct KindTagVisitor;

        impl serde::de::Visitor<'_> for KindTagVisitor {
            type Value = KindTag;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a module type name or numeric module type")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let tag = u8::try_from(value)
                    .map_err(|_| E::custom(format!("unknown module kind tag {value}")))?;
                ModuleKind::try_from(tag).map(KindTag).map_err(E::custom)
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let tag = u8::try_from(value)
                    .map_err(|_| E::custom(format!("unknown module kind tag {value}")))?;
                ModuleKind::try_from(tag).map(KindTag).map_err(E::custom)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                ModuleKind::from_name(value)
                    .map(KindTag)
                    .ok_or_else(|| E::custom(format!("unknown module type '{value}'")))
            }
        }

        deserializer.deserialize_any(KindTagVisitor)
    }
}

/// Union of every typed module field, checked against the kind afterwards
#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct TypedFields {
    #[serde(rename = "type")]
    kind: KindTag,
    owner: Option<Address>,
    domains: Option<BTreeMap<RouteKey, RawModule>>,
    modules: Option<Vec<RawModule>>,
    threshold: Option<u32>,
    validators: Option<Vec<Address>>,
    native_bridge: Option<Address>,
}

impl TryFrom<TypedFields> for RawTypedModule {
    type Error = String;

    fn try_from(fields: TypedFields) -> Result<Self, Self::Error> {
        let TypedFields {
            kind: KindTag(kind),
            owner,
            domains,
            modules,
            threshold,
            validators,
            native_bridge,
        } = fields;

        let routing = kind == ModuleKind::Routing;
        let aggregation = kind == ModuleKind::Aggregation;
        let stray = [
            ("owner", owner.is_some() && !routing),
            ("domains", domains.is_some() && !routing),
            ("modules", modules.is_some() && !aggregation),
            ("threshold", threshold.is_some() && !aggregation && !kind.is_multisig()),
            ("validators", validators.is_some() && !kind.is_multisig()),
            ("nativeBridge", native_bridge.is_some() && kind != ModuleKind::OpStack),
        ];
        if let Some((field, _)) = stray.iter().find(|(_, present)| *present) {
            return Err(format!("unknown field `{field}` for {kind} module"));
        }

        let missing = |field: &str| format!("missing field `{field}` for {kind} module");
        Ok(match kind {
            ModuleKind::Routing => RawTypedModule::Routing {
                owner: owner.ok_or_else(|| missing("owner"))?,
                domains: domains.unwrap_or_default(),
            },
            ModuleKind::Aggregation => RawTypedModule::Aggregation {
                modules: modules.ok_or_else(|| missing("modules"))?,
                threshold: threshold.ok_or_else(|| missing("threshold"))?,
            },
            ModuleKind::MerkleRootMultisig => RawTypedModule::MerkleRootMultisig {
                validators: validators.ok_or_else(|| missing("validators"))?,
                threshold: threshold.ok_or_else(|| missing("threshold"))?,
            },
            ModuleKind::MessageIdMultisig => RawTypedModule::MessageIdMultisig {
                validators: validators.ok_or_else(|| missing("validators"))?,
                threshold: threshold.ok_or_else(|| missing("threshold"))?,
            },
            ModuleKind::OpStack => RawTypedModule::OpStack {
                native_bridge: native_bridge.ok_or_else(|| missing("nativeBridge"))?,
            },
            ModuleKind::Null => RawTypedModule::Null,
        })
    }
}

impl<'de> Deserialize<'de> for RawTypedModule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        TypedFields::deserialize(deserializer)?
            .try_into()
            .map_err(serde::de::Error::custom)
    }
}

/// Any serialized module configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawModule {
    /// Deployed address
    Address(Address),
    /// Library reference
    Reference(RawReference),
    /// Typed module object
    Module(RawTypedModule),
}

impl RawModule {
    /// Bind as a root configuration
    ///
    /// # Errors
    /// `UnknownChain` or `DuplicateRoute` for routing keys
    pub fn bind(&self, resolver: &dyn DomainResolver) -> Result<ModuleConfig, ConfigError> {
        self.bind_at(resolver, &NodePath::root())
    }

    /// Bind a node located at `path`
    ///
    /// # Errors
    /// `UnknownChain` or `DuplicateRoute` for routing keys
    pub fn bind_at(
        &self,
        resolver: &dyn DomainResolver,
        path: &NodePath,
    ) -> Result<ModuleConfig, ConfigError> {
        let module = match self {
            RawModule::Address(address) => ModuleConfig::Leaf(*address),
            RawModule::Reference(reference) => ModuleConfig::Reference(reference.name.clone()),
            RawModule::Module(typed) => match typed {
                RawTypedModule::MerkleRootMultisig {
                    validators,
                    threshold,
                } => ModuleConfig::Multisig(MultisigConfig::from_parts(
                    validators.iter().copied(),
                    *threshold,
                    RootMode::MerkleRoot,
                )),
                RawTypedModule::MessageIdMultisig {
                    validators,
                    threshold,
                } => ModuleConfig::Multisig(MultisigConfig::from_parts(
                    validators.iter().copied(),
                    *threshold,
                    RootMode::MessageId,
                )),
                RawTypedModule::Aggregation { modules, threshold } => {
                    let members = modules
                        .iter()
                        .enumerate()
                        .map(|(i, m)| m.bind_at(resolver, &path.member(i)))
                        .collect::<Result<Vec<_>, _>>()?;
                    ModuleConfig::Aggregation(AggregationConfig::from_parts(members, *threshold))
                }
                RawTypedModule::Routing { owner, domains } => {
                    let mut routes = BTreeMap::new();
                    for (key, raw) in domains {
                        let route_path = path.route(key);
                        let domain = match key {
                            RouteKey::Domain(domain) => *domain,
                            RouteKey::Chain(name) => resolver.resolve_domain(name).ok_or_else(
                                || ConfigError::UnknownChain {
                                    path: route_path.clone(),
                                    chain: name.clone(),
                                },
                            )?,
                        };
                        let child = raw.bind_at(resolver, &route_path)?;
                        if routes.insert(domain, child).is_some() {
                            return Err(ConfigError::DuplicateRoute {
                                path: path.clone(),
                                domain,
                            });
                        }
                    }
                    ModuleConfig::Routing(RoutingConfig::from_map(*owner, routes))
                }
                RawTypedModule::OpStack { native_bridge } => {
                    ModuleConfig::ExternalBridge(ExternalBridgeConfig::new(*native_bridge))
                }
                RawTypedModule::Null => ModuleConfig::Null,
            },
        };
        Ok(module)
    }
}

impl From<&ModuleConfig> for RawModule {
    fn from(config: &ModuleConfig) -> Self {
        match config {
            ModuleConfig::Leaf(address) => RawModule::Address(*address),
            ModuleConfig::Reference(name) => RawModule::Reference(RawReference { name: name.clone() }),
            ModuleConfig::Multisig(m) => {
                let validators = m.validators().to_vec();
                let threshold = m.threshold();
                RawModule::Module(match m.root_mode() {
                    RootMode::MerkleRoot => RawTypedModule::MerkleRootMultisig {
                        validators,
                        threshold,
                    },
                    RootMode::MessageId => RawTypedModule::MessageIdMultisig {
                        validators,
                        threshold,
                    },
                })
            }
            ModuleConfig::Aggregation(a) => RawModule::Module(RawTypedModule::Aggregation {
                modules: a.members().iter().map(RawModule::from).collect(),
                threshold: a.threshold(),
            }),
            ModuleConfig::Routing(r) => RawModule::Module(RawTypedModule::Routing {
                owner: r.owner(),
                domains: r
                    .routes()
                    .iter()
                    .map(|(domain, m)| (RouteKey::Domain(*domain), RawModule::from(m)))
                    .collect(),
            }),
            ModuleConfig::ExternalBridge(b) => RawModule::Module(RawTypedModule::OpStack {
                native_bridge: b.native_bridge(),
            }),
            ModuleConfig::Null => RawModule::Module(RawTypedModule::Null),
        }
    }
}

impl Serialize for ModuleConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        RawModule::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ModuleConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        RawModule::deserialize(deserializer)?
            .bind(&NumericDomains)
            .map_err(serde::de::Error::custom)
    }
}

/// A root configuration with its named definitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IsmDocument {
    /// Named definitions referenced with `{ "ref": name }`
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub modules: IndexMap<String, RawModule>,
    /// The configuration to deploy
    pub root: RawModule,
}

/// An [`IsmDocument`] with every routing key bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundDocument {
    /// Root configuration
    pub root: ModuleConfig,
    /// Named definitions
    pub library: ModuleLibrary,
}

impl IsmDocument {
    /// Document with no library
    #[must_use]
    pub fn new(root: RawModule) -> Self {
        Self {
            modules: IndexMap::new(),
            root,
        }
    }

    /// Document describing an in-memory configuration
    #[must_use]
    pub fn from_config(root: &ModuleConfig, library: &ModuleLibrary) -> Self {
        Self {
            modules: library
                .iter()
                .map(|(name, config)| (name.to_string(), RawModule::from(config)))
                .collect(),
            root: RawModule::from(root),
        }
    }

    /// Parse from JSON
    ///
    /// # Errors
    /// Returns error if the input is not a valid document
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Parse from YAML
    ///
    /// # Errors
    /// Returns error if the input is not a valid document
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(input)?)
    }

    /// Parse from TOML
    ///
    /// # Errors
    /// Returns error if the input is not a valid document
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Load a document, choosing the format from the file extension
    ///
    /// # Errors
    /// Returns error if the file cannot be read, has an unknown extension or
    /// does not parse
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        match extension.as_str() {
            "json" => Self::from_json_str(&contents),
            "yaml" | "yml" => Self::from_yaml_str(&contents),
            "toml" => Self::from_toml_str(&contents),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Pretty-printed JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Bind the root and every definition
    ///
    /// # Errors
    /// The first routing key that does not bind
    pub fn bind(&self, resolver: &dyn DomainResolver) -> Result<BoundDocument, ConfigError> {
        let mut library = ModuleLibrary::new();
        for (name, raw) in &self.modules {
            library.insert(name.clone(), raw.bind_at(resolver, &NodePath::definition(name))?);
        }
        Ok(BoundDocument {
            root: self.root.bind(resolver)?,
            library,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr(n: u8) -> Address {
        Address::new([n; 32])
    }

    fn test_chains(name: &str) -> Option<DomainId> {
        match name {
            "test1" => Some(DomainId(13371)),
            "test2" => Some(DomainId(13372)),
            "test3" => Some(DomainId(13373)),
            _ => None,
        }
    }

    #[test]
    fn parses_leaf_and_typed_modules() {
        let raw: RawModule = serde_json::from_str(
            r#"{ "type": "aggregation", "threshold": 1, "modules": [
                "0xaaa",
                { "type": "messageIdMultisig", "validators": ["0x1", "0x2"], "threshold": 2 },
                { "type": "null" }
            ] }"#,
        )
        .unwrap();
        let config = raw.bind(&NumericDomains).unwrap();
        let ModuleConfig::Aggregation(agg) = &config else {
            panic!("expected aggregation, got {config:?}");
        };
        assert_eq!(agg.members().len(), 3);
        assert_eq!(agg.members()[0], ModuleConfig::Leaf("0xaaa".parse().unwrap()));
        assert_eq!(agg.members()[1].kind(), Some(ModuleKind::MessageIdMultisig));
        assert_eq!(agg.members()[2], ModuleConfig::Null);
    }

    #[test]
    fn routing_keys_bind_through_resolver() {
        let raw: RawModule = serde_json::from_str(
            r#"{ "type": "routing", "owner": "0x9", "domains": {
                "test2": "0xaa",
                "1000": { "type": "null" }
            } }"#,
        )
        .unwrap();
        let config = raw.bind(&test_chains).unwrap();
        let ModuleConfig::Routing(routing) = config else {
            panic!("expected routing");
        };
        let domains: Vec<u32> = routing.routes().keys().map(|d| d.get()).collect();
        assert_eq!(domains, vec![1000, 13372]);
    }

    #[test]
    fn unknown_chain_names_the_route() {
        let raw: RawModule = serde_json::from_str(
            r#"{ "type": "routing", "owner": "0x9", "domains": { "nowhere": "0x1" } }"#,
        )
        .unwrap();
        let err = raw.bind(&test_chains).unwrap_err();
        match err {
            ConfigError::UnknownChain { path, chain } => {
                assert_eq!(chain, "nowhere");
                assert_eq!(path.to_string(), "root.domains.nowhere");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn name_and_id_for_same_domain_is_duplicate() {
        let raw: RawModule = serde_json::from_str(
            r#"{ "type": "routing", "owner": "0x9", "domains": { "test1": "0x1", "13371": "0x2" } }"#,
        )
        .unwrap();
        assert!(matches!(
            raw.bind(&test_chains),
            Err(ConfigError::DuplicateRoute { domain: DomainId(13371), .. })
        ));
    }

    #[test]
    fn decoding_keeps_invalid_nodes() {
        let config: ModuleConfig = serde_json::from_str(
            r#"{ "type": "merkleRootMultisig", "validators": ["0x1"], "threshold": 2 }"#,
        )
        .unwrap();
        let ModuleConfig::Multisig(m) = config else {
            panic!("expected multisig");
        };
        assert!(m.check().is_err());
    }

    #[test]
    fn module_config_json_roundtrip() {
        let config: ModuleConfig = RoutingConfig::new(
            addr(9),
            [
                (DomainId(1), ModuleConfig::Leaf(addr(0xaa))),
                (
                    DomainId(2),
                    MultisigConfig::new([addr(2), addr(1)], 1, RootMode::MerkleRoot)
                        .unwrap()
                        .into(),
                ),
                (DomainId(3), ModuleConfig::reference("shared")),
            ],
        )
        .unwrap()
        .into();
        let json = serde_json::to_string(&config).unwrap();
        let back: ModuleConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn retired_type_tag_is_rejected() {
        let result: Result<RawModule, _> =
            serde_json::from_str(r#"{ "type": "legacyMultisig", "validators": [], "threshold": 1 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn yaml_document_with_library() {
        let doc = IsmDocument::from_yaml_str(
            r#"
modules:
  shared:
    type: messageIdMultisig
    validators: ["0x1", "0x2", "0x3"]
    threshold: 2
root:
  type: routing
  owner: "0x9"
  domains:
    test2: { ref: shared }
    13373: { ref: shared }
"#,
        )
        .unwrap();
        let bound = doc.bind(&test_chains).unwrap();
        assert_eq!(bound.library.len(), 1);
        let ModuleConfig::Routing(routing) = &bound.root else {
            panic!("expected routing");
        };
        assert_eq!(
            routing.routes().get(&DomainId(13373)),
            Some(&ModuleConfig::reference("shared"))
        );
    }

    #[test]
    fn toml_document() {
        let doc = IsmDocument::from_toml_str(
            r#"
[root]
type = "aggregation"
threshold = 1
modules = ["0x1", { type = "opStack", nativeBridge = "0x2" }]
"#,
        )
        .unwrap();
        let bound = doc.bind(&NumericDomains).unwrap();
        assert_eq!(bound.root.node_count(), 3);
    }

    #[test]
    fn from_path_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("ism.json");
        let doc = IsmDocument::from_config(
            &ModuleConfig::reference("a"),
            &ModuleLibrary::new().with("a", ModuleConfig::Null),
        );
        std::fs::write(&json_path, doc.to_json_pretty().unwrap()).unwrap();
        assert_eq!(IsmDocument::from_path(&json_path).unwrap(), doc);

        let txt_path = dir.path().join("ism.txt");
        std::fs::write(&txt_path, "root = 1").unwrap();
        assert!(matches!(
            IsmDocument::from_path(&txt_path),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "txt"
        ));
        assert!(matches!(
            IsmDocument::from_path(dir.path().join("missing.json")),
            Err(ConfigError::Io { .. })
        ));
    }
}
