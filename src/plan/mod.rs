//! Predicate-gated, mutually exclusive component activation.

mod component;
mod error;
mod planner;
mod predicate;

pub use component::{ComponentSpec, GroupSpec, Registry};
pub use error::PlanError;
pub use planner::{ActivationPlanner, ActivationResult, Conflict, Diagnostic, Subject};
pub use predicate::{Predicate, PredicateError};
