//! Environment tier sources.

use std::path::{Path, PathBuf};

use super::env::load_env_vars;
use super::file::load_config_file;
use super::value::{flatten_table, ConfigValue, Mapping};
use super::ConfigError;

/// One environment tier and the mappings loaded for it.
///
/// Mappings are kept in priority order: index 0 wins over later mappings
/// within the same tier. A source is immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSource {
    tier: String,
    mappings: Vec<Mapping>,
}

impl ConfigSource {
    /// Creates a source for `tier` with a single mapping.
    pub fn new(tier: impl Into<String>, mapping: Mapping) -> Self {
        Self {
            tier: tier.into(),
            mappings: vec![mapping],
        }
    }

    /// Starts building a source for `tier` from several inputs.
    pub fn builder(tier: impl Into<String>) -> SourceBuilder {
        SourceBuilder {
            tier: tier.into(),
            inputs: Vec::new(),
        }
    }

    pub fn tier(&self) -> &str {
        &self.tier
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Returns the first value defined for `key` in this tier.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.mappings.iter().find_map(|m| m.get(key))
    }

    /// Iterates over every key defined in this tier (may repeat).
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.mappings.iter().flat_map(|m| m.keys())
    }
}

#[derive(Debug)]
enum SourceInput {
    Mapping(Mapping),
    File { path: PathBuf, required: bool },
    Toml(String),
    Env { prefix: String, separator: String },
}

/// Builder for a [`ConfigSource`].
///
/// Inputs are loaded in registration order, and earlier registrations take
/// priority over later ones within the tier:
///
/// ```no_run
/// use tierplan::ConfigSource;
///
/// // env overrides -> uat file -> shared file
/// let uat = ConfigSource::builder("uat")
///     .with_env("DEPLOY", "__")
///     .with_file("env-vars/uat.toml", true)
///     .with_file("env-vars/shared.toml", false)
///     .build()?;
/// # Ok::<(), tierplan::ConfigError>(())
/// ```
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct SourceBuilder {
    tier: String,
    inputs: Vec<SourceInput>,
}

impl SourceBuilder {
    /// Adds an in-memory mapping.
    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.inputs.push(SourceInput::Mapping(mapping));
        self
    }

    /// Adds a TOML file.
    ///
    /// If `required` is `true`, the build fails if the file doesn't exist.
    /// Optional files that are missing are skipped.
    pub fn with_file(mut self, path: impl AsRef<Path>, required: bool) -> Self {
        self.inputs.push(SourceInput::File {
            path: path.as_ref().to_path_buf(),
            required,
        });
        self
    }

    /// Adds inline TOML text.
    pub fn with_toml_str(mut self, contents: impl Into<String>) -> Self {
        self.inputs.push(SourceInput::Toml(contents.into()));
        self
    }

    /// Adds environment variables with the given prefix.
    ///
    /// `DEPLOY__DB__PORT=5432` with prefix `DEPLOY` and separator `__`
    /// becomes key `db.port` with integer value `5432`.
    pub fn with_env(mut self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.inputs.push(SourceInput::Env {
            prefix: prefix.into(),
            separator: separator.into(),
        });
        self
    }

    /// Loads every input and produces the immutable source.
    pub fn build(self) -> Result<ConfigSource, ConfigError> {
        let mut mappings = Vec::with_capacity(self.inputs.len());

        for input in self.inputs {
            match input {
                SourceInput::Mapping(mapping) => mappings.push(mapping),
                SourceInput::File { path, required } => {
                    if let Some(table) = load_config_file(&path, required)? {
                        mappings.push(flatten_table(&table)?);
                    }
                }
                SourceInput::Toml(contents) => {
                    let table: toml::Table =
                        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                            origin: format!("inline TOML for tier '{}'", self.tier),
                            source: e,
                        })?;
                    mappings.push(flatten_table(&table)?);
                }
                SourceInput::Env { prefix, separator } => {
                    mappings.push(load_env_vars(std::env::vars(), &prefix, &separator));
                }
            }
        }

        tracing::debug!(tier = %self.tier, mappings = mappings.len(), "Built config source");

        Ok(ConfigSource {
            tier: self.tier,
            mappings,
        })
    }
}
