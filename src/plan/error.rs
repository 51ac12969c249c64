use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlanError {
    #[error("component '{0}' is declared more than once")]
    DuplicateComponent(String),

    #[error("group '{0}' is declared more than once")]
    DuplicateGroup(String),

    #[error("component or group name must not be empty")]
    EmptyName,

    #[error("failed to read component registry '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse component registry from {origin}: {source}")]
    Parse {
        origin: String,
        source: toml::de::Error,
    },
}
