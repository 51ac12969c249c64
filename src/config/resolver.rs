//! First-found resolution across environment tiers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::resolve::{resolve_references, ReferenceError, Unresolved};
use super::source::ConfigSource;
use super::value::{ConfigValue, Mapping};
use super::ConfigError;

/// How missing required keys are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Any missing required key fails the whole resolution.
    #[default]
    Strict,
    /// Missing keys are collected on the [`ResolvedConfig`].
    Lenient,
}

/// Where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Tier(String),
    Defaults,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Tier(tier) => write!(f, "tier '{tier}'"),
            Origin::Defaults => f.write_str("defaults"),
        }
    }
}

/// Resolves keys across an ordered list of [`ConfigSource`]s.
///
/// The first source that defines a key wins; `defaults` are consulted only
/// when no source defines it.
///
/// ```
/// use tierplan::{ConfigResolver, ConfigSource, ConfigValue, Mapping};
///
/// let uat = ConfigSource::new("uat", Mapping::from([("enable_nginx_lb".into(), true.into())]));
/// let shared = ConfigSource::new("default", Mapping::from([("enable_nginx_lb".into(), false.into())]));
///
/// let resolved = ConfigResolver::new().resolve(&[uat, shared])?;
/// assert_eq!(resolved.get("enable_nginx_lb")?, &ConfigValue::Bool(true));
/// # Ok::<(), tierplan::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    defaults: Mapping,
    required: BTreeSet<String>,
    strictness: Strictness,
    interpolate: bool,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver {
    /// Creates a strict resolver with no defaults.
    ///
    /// Interpolation is off, so every value is returned exactly as its
    /// source defines it.
    pub fn new() -> Self {
        Self {
            defaults: Mapping::new(),
            required: BTreeSet::new(),
            strictness: Strictness::Strict,
            interpolate: false,
        }
    }

    /// Sets the global defaults consulted after every source.
    pub fn with_defaults(mut self, defaults: Mapping) -> Self {
        self.defaults = defaults;
        self
    }

    /// Marks a key as required: it must resolve from a source or the defaults.
    pub fn require(mut self, key: impl Into<String>) -> Self {
        self.required.insert(key.into());
        self
    }

    pub fn require_all<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Enables or disables `${key}` interpolation of resolved strings.
    ///
    /// A key whose references cannot be resolved fails the resolution in
    /// strict mode; in lenient mode it is left out of the result and
    /// reported by [`ResolvedConfig::unresolved`].
    pub fn with_interpolation(mut self, enabled: bool) -> Self {
        self.interpolate = enabled;
        self
    }

    pub fn defaults(&self) -> &Mapping {
        &self.defaults
    }

    /// Finds the value for one key: first source that defines it, then defaults.
    pub fn lookup<'a>(
        &'a self,
        sources: &'a [ConfigSource],
        key: &str,
    ) -> Option<(&'a ConfigValue, Origin)> {
        sources
            .iter()
            .find_map(|source| {
                source
                    .get(key)
                    .map(|value| (value, Origin::Tier(source.tier().to_string())))
            })
            .or_else(|| self.defaults.get(key).map(|value| (value, Origin::Defaults)))
    }

    /// Resolves every key defined by `sources`, the defaults, or the
    /// required set.
    ///
    /// Index 0 of `sources` has the highest priority. Each key is looked up
    /// independently; missing required keys either fail the resolution
    /// (strict) or are recorded on the result (lenient).
    pub fn resolve(&self, sources: &[ConfigSource]) -> Result<ResolvedConfig, ConfigError> {
        if sources.is_empty() && self.defaults.is_empty() {
            return Err(ConfigError::EmptySourceList);
        }

        let keys: BTreeSet<&String> = sources
            .iter()
            .flat_map(|source| source.keys())
            .chain(self.defaults.keys())
            .chain(self.required.iter())
            .collect();

        let mut values = Mapping::new();
        let mut origins = BTreeMap::new();
        let mut missing = Vec::new();

        for key in keys {
            match self.lookup(sources, key) {
                Some((value, origin)) => {
                    tracing::trace!(key = %key, %origin, "Resolved key");
                    values.insert(key.clone(), value.clone());
                    origins.insert(key.clone(), origin);
                }
                None => missing.push(key.clone()),
            }
        }

        if !missing.is_empty() {
            tracing::warn!(missing = ?missing, strictness = ?self.strictness, "Required keys not found");
            if self.strictness == Strictness::Strict {
                return Err(ConfigError::MissingKey(missing));
            }
        }

        let mut unresolved = Unresolved::new();
        if self.interpolate {
            unresolved = resolve_references(&mut values);
            if let Some((key, source)) = unresolved.first_key_value() {
                tracing::warn!(unresolved = ?unresolved.keys().collect::<Vec<_>>(), "References could not be resolved");
                if self.strictness == Strictness::Strict {
                    return Err(ConfigError::Reference {
                        key: key.clone(),
                        source: source.clone(),
                    });
                }
            }
            for key in unresolved.keys() {
                origins.remove(key);
            }
        }

        tracing::debug!(
            sources = sources.len(),
            keys = values.len(),
            missing = missing.len(),
            unresolved = unresolved.len(),
            "Resolved configuration"
        );

        Ok(ResolvedConfig {
            values,
            origins,
            missing,
            unresolved,
        })
    }
}

/// The outcome of a resolution: an immutable key/value snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConfig {
    values: Mapping,
    origins: BTreeMap<String, Origin>,
    missing: Vec<String>,
    unresolved: Unresolved,
}

impl ResolvedConfig {
    /// Looks up a key, failing with [`ConfigError::MissingKey`] if absent.
    pub fn get(&self, key: &str) -> Result<&ConfigValue, ConfigError> {
        self.values
            .get(key)
            .ok_or_else(|| ConfigError::MissingKey(vec![key.to_string()]))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns which source supplied `key`.
    ///
    /// Values built directly from a mapping have no origin.
    pub fn origin(&self, key: &str) -> Option<&Origin> {
        self.origins.get(key)
    }

    /// Required keys that could not be resolved (lenient mode only).
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    /// Keys whose `${...}` references failed (lenient mode only).
    ///
    /// These keys are absent from the values.
    pub fn unresolved(&self) -> &BTreeMap<String, ReferenceError> {
        &self.unresolved
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.unresolved.is_empty()
    }

    pub fn values(&self) -> &Mapping {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, ConfigValue)> for ResolvedConfig {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
            origins: BTreeMap::new(),
            missing: Vec::new(),
            unresolved: Unresolved::new(),
        }
    }
}
