use std::path::PathBuf;
use thiserror::Error;

use super::resolve::ReferenceError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("no configuration sources and no defaults given")]
    EmptySourceList,

    #[error("missing configuration key(s): {}", .0.join(", "))]
    MissingKey(Vec<String>),

    #[error("required config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config from {origin}: {source}")]
    ParseError {
        origin: String,
        source: toml::de::Error,
    },

    #[error("cannot use non-scalar value for key: {0}")]
    NonScalarValue(String),

    #[error("cannot resolve references in key '{key}': {source}")]
    Reference {
        key: String,
        source: ReferenceError,
    },
}
