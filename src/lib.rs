//! Environment-tier configuration resolution and mutually exclusive
//! component activation.
//!
//! [`ConfigResolver`] picks each key from the first tier that defines it,
//! falling back to defaults. [`ActivationPlanner`] evaluates component
//! predicates against the result and activates at most one component per
//! group, reporting conflicts instead of choosing a winner.

pub mod config;
pub mod context;
mod error;
pub mod logging;
pub mod plan;

pub use config::{
    ConfigError, ConfigResolver, ConfigSource, ConfigValue, Mapping, ResolvedConfig, Strictness,
};
pub use context::{Applier, Deployment};
pub use error::Error;
pub use plan::{
    ActivationPlanner, ActivationResult, ComponentSpec, Diagnostic, GroupSpec, Predicate, Registry,
};
