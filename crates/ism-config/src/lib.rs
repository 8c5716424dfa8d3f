//! ISM Configuration Model
//!
//! Recursive, polymorphic security module configurations and the content
//! fingerprints used to deduplicate their deployments.
//!
//! # Core Concepts
//!
//! - [`ModuleConfig`]: Tagged union over the module kinds; composite nodes own their children
//! - [`ModuleKind`]: Closed set of deployable kinds with stable numeric tags
//! - [`ResolvedModule`]: A node with child addresses substituted, as handed to a deployer
//! - [`Fingerprint`]: 32-byte Blake3 digest of a resolved module
//! - [`NodePath`]: Dotted path naming a node inside a tree
//! - [`IsmDocument`]: Serialized root configuration plus named definitions
//!
//! # Example
//!
//! ```rust,ignore
//! use ism_config::{AggregationConfig, ModuleConfig, MultisigConfig, RootMode};
//!
//! let multisig = MultisigConfig::new([a, b, c], 2, RootMode::MessageId)?;
//! let root: ModuleConfig = AggregationConfig::new(vec![multisig.into(), leaf.into()], 1)?.into();
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod address;
mod document;
mod error;
mod fingerprint;
mod kind;
mod module;
mod params;
mod path;

pub use address::{Address, AddressError, ChainId, DomainId};
pub use document::{
    BoundDocument, DomainResolver, IsmDocument, NumericDomains, RawModule, RawReference,
    RawTypedModule, RouteKey,
};
pub use error::{ConfigError, PolicyError};
pub use fingerprint::{CanonicalHasher, Fingerprint, FingerprintError};
pub use kind::{KindError, ModuleKind, RootMode};
pub use module::{
    check_multisig, check_threshold, AggregationConfig, ExternalBridgeConfig, ModuleConfig,
    ModuleLibrary, MultisigConfig, RoutingConfig,
};
pub use params::{ModuleParams, ResolvedModule};
pub use path::{NodePath, PathError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
