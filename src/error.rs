use crate::config::ConfigError;
use crate::plan::{Conflict, PlanError};
use thiserror::Error;

/// Top-level error type for the tierplan library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("planning error: {0}")]
    Plan(#[from] PlanError),

    #[error("deployment requires a resolved configuration")]
    MissingConfig,

    #[error("conflicting activation: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    ConflictingActivation(Vec<Conflict>),

    #[error("failed to apply component '{component}': {source}")]
    Apply {
        component: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
