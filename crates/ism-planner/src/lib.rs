//! ISM Deployment Planner
//!
//! Validates configuration nodes and orders them for deployment.
//!
//! # Core Concepts
//!
//! - [`InvariantValidator`]: Pure single-node checks, runnable standalone
//! - [`DependencyResolver`]: Post-order walk producing a [`DeploymentPlan`]
//! - [`DeploymentPlan`]: Steps with child [`Slot`]s, children before parents
//!
//! Planning either produces a plan in which every node is valid or fails
//! before anything is deployed.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod plan;
mod resolver;
mod validator;

pub use error::PlanError;
pub use plan::{DeploymentPlan, ModuleTemplate, PlannedNode, Slot, StepId};
pub use resolver::{plan, DependencyResolver, DEFAULT_MAX_DEPTH};
pub use validator::{validate, InvariantValidator};
