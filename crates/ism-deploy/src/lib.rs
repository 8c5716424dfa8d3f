//! ISM Deployment Engine
//!
//! Turns an ISM configuration tree into deployed modules on one chain,
//! deploying each distinct module at most once.
//!
//! # Core Concepts
//!
//! - [`resolve_and_deploy`]: Validate, plan and deploy in one call
//! - [`DeploymentCache`]: `(fingerprint, chain) → address`, exactly-once under concurrency
//! - [`DeploymentExecutor`]: Dependency-ordered, bounded-concurrency execution of a plan
//! - [`DeployCapability`]: The external single-module deployer
//! - [`Engine`]: Chain registry, documents and settings in one place
//!
//! Every node moves through [`NodeState`]: `Pending → Validated →
//! CacheHit | Deploying → Deployed | Failed`.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cache;
mod cancel;
mod capability;
mod config;
mod engine;
mod error;
mod executor;
mod logging;
mod session;
mod simulated;
mod state;

pub use cache::{CacheOutcome, CacheSnapshot, DeploymentCache, ResolvedNode};
pub use cancel::CancellationHandle;
pub use capability::DeployCapability;
pub use config::{EngineConfig, EngineConfigError};
pub use engine::Engine;
pub use error::{CacheInconsistency, DeployError, ProviderError};
pub use executor::{DeploymentExecutor, DeploymentResult, NodeReport};
pub use logging::init_tracing;
pub use session::{resolve_and_deploy, DeploymentSession};
pub use simulated::{simulated_address, SimulatedDeployer};
pub use state::{allowed_transitions, validate_transition, NodeState, TransitionError};
