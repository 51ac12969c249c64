//! Layered configuration resolution across environment tiers.

mod env;
mod error;
mod file;
mod resolve;
mod resolver;
mod source;
mod value;

pub use error::ConfigError;
pub use file::first_found;
pub use resolve::{ReferenceError, Unresolved};
pub use resolver::{ConfigResolver, Origin, ResolvedConfig, Strictness};
pub use source::{ConfigSource, SourceBuilder};
pub use value::{flatten_table, ConfigValue, Mapping};
