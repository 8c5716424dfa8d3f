//! Chain Registry
//!
//! Read-only lookup from chain names to numeric domain ids and chain
//! metadata. Implements [`ism_config::DomainResolver`] so serialized routing
//! tables can name chains instead of domains.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod registry;

pub use error::RegistryError;
pub use registry::{ChainMetadata, ChainRegistry, ProtocolType, RpcUrl};
