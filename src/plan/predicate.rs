//! Boolean predicates over a resolved configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigValue, ResolvedConfig};

/// Why a predicate could not be evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum PredicateError {
    #[error("key '{0}' is not defined")]
    MissingKey(String),

    #[error("key '{key}' is not a boolean (found '{value}')")]
    NotBoolean { key: String, value: ConfigValue },
}

/// A boolean expression over a [`ResolvedConfig`].
///
/// In TOML a predicate is written as an inline table, e.g.
/// `{ flag = "enable_nginx_lb" }` or
/// `{ all = [{ flag = "a" }, { not = { flag = "b" } }] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Always true.
    #[default]
    Always,
    /// True when the key holds a true boolean.
    Flag(String),
    /// True when the key holds this value.
    ///
    /// Integers and floats compare numerically, so `1` equals `1.0`. No
    /// other coercion happens: the string `"true"` does not equal the
    /// boolean `true`, and `"80"` does not equal `80`. Use [`Predicate::Flag`]
    /// for string-encoded booleans.
    Equals { key: String, value: ConfigValue },
    Not(Box<Predicate>),
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn flag(key: impl Into<String>) -> Self {
        Predicate::Flag(key.into())
    }

    pub fn equals(key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        Predicate::Equals {
            key: key.into(),
            value: value.into(),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Predicate) -> Self {
        Predicate::Not(Box::new(inner))
    }

    /// Evaluates the predicate.
    ///
    /// A key that is absent from `config` is an error, never `false`.
    /// `all` and `any` short-circuit left to right.
    pub fn evaluate(&self, config: &ResolvedConfig) -> Result<bool, PredicateError> {
        match self {
            Predicate::Always => Ok(true),
            Predicate::Flag(key) => {
                let value = lookup(config, key)?;
                value.as_bool().ok_or_else(|| PredicateError::NotBoolean {
                    key: key.clone(),
                    value: value.clone(),
                })
            }
            Predicate::Equals { key, value } => Ok(values_equal(lookup(config, key)?, value)),
            Predicate::Not(inner) => inner.evaluate(config).map(|b| !b),
            Predicate::All(preds) => {
                for pred in preds {
                    if !pred.evaluate(config)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Any(preds) => {
                for pred in preds {
                    if pred.evaluate(config)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Every configuration key this predicate may read.
    pub fn keys(&self) -> BTreeSet<&str> {
        let mut keys = BTreeSet::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys<'a>(&'a self, keys: &mut BTreeSet<&'a str>) {
        match self {
            Predicate::Always => {}
            Predicate::Flag(key) | Predicate::Equals { key, .. } => {
                keys.insert(key);
            }
            Predicate::Not(inner) => inner.collect_keys(keys),
            Predicate::All(preds) | Predicate::Any(preds) => {
                for pred in preds {
                    pred.collect_keys(keys);
                }
            }
        }
    }
}

fn lookup<'a>(config: &'a ResolvedConfig, key: &str) -> Result<&'a ConfigValue, PredicateError> {
    config
        .get(key)
        .map_err(|_| PredicateError::MissingKey(key.to_string()))
}

fn values_equal(actual: &ConfigValue, expected: &ConfigValue) -> bool {
    match (actual, expected) {
        (ConfigValue::Integer(i), ConfigValue::Float(f))
        | (ConfigValue::Float(f), ConfigValue::Integer(i)) => *i as f64 == *f,
        _ => actual == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, ConfigValue)]) -> ResolvedConfig {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_flag() {
        let cfg = config(&[("on", true.into()), ("off", "no".into()), ("port", 80.into())]);

        assert_eq!(Predicate::flag("on").evaluate(&cfg), Ok(true));
        assert_eq!(Predicate::flag("off").evaluate(&cfg), Ok(false));
        assert_eq!(
            Predicate::flag("port").evaluate(&cfg),
            Err(PredicateError::NotBoolean {
                key: "port".into(),
                value: ConfigValue::Integer(80),
            })
        );
        assert_eq!(
            Predicate::flag("absent").evaluate(&cfg),
            Err(PredicateError::MissingKey("absent".into()))
        );
    }

    #[test]
    fn test_combinators() {
        let cfg = config(&[("env", "uat".into()), ("lb", true.into())]);

        let pred = Predicate::All(vec![
            Predicate::equals("env", "uat"),
            Predicate::not(Predicate::flag("lb")),
        ]);
        assert_eq!(pred.evaluate(&cfg), Ok(false));

        let pred = Predicate::Any(vec![Predicate::equals("env", "prod"), Predicate::flag("lb")]);
        assert_eq!(pred.evaluate(&cfg), Ok(true));

        assert_eq!(Predicate::All(vec![]).evaluate(&cfg), Ok(true));
        assert_eq!(Predicate::Any(vec![]).evaluate(&cfg), Ok(false));
    }

    #[test]
    fn test_equals_compares_numbers_not_strings() {
        let cfg = config(&[("workers", 4.into()), ("ratio", 0.5.into()), ("lb", "true".into())]);

        assert_eq!(Predicate::equals("workers", 4.0).evaluate(&cfg), Ok(true));
        assert_eq!(Predicate::equals("workers", 4.5).evaluate(&cfg), Ok(false));
        assert_eq!(Predicate::equals("ratio", 0.5).evaluate(&cfg), Ok(true));
        assert_eq!(Predicate::equals("workers", "4").evaluate(&cfg), Ok(false));
        assert_eq!(Predicate::equals("lb", true).evaluate(&cfg), Ok(false));
        assert_eq!(Predicate::flag("lb").evaluate(&cfg), Ok(true));
    }

    #[test]
    fn test_short_circuit_skips_missing_keys() {
        let cfg = config(&[("lb", false.into())]);
        let pred = Predicate::All(vec![Predicate::flag("lb"), Predicate::flag("absent")]);
        assert_eq!(pred.evaluate(&cfg), Ok(false));
    }

    #[test]
    fn test_keys() {
        let pred = Predicate::All(vec![
            Predicate::flag("b"),
            Predicate::not(Predicate::equals("a", 1)),
            Predicate::Always,
        ]);
        assert_eq!(pred.keys().into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Holder {
            when: Predicate,
        }

        let holder: Holder = toml::from_str(
            r#"when = { all = [{ flag = "load_balancer_is_required" }, { equals = { key = "env", value = "uat" } }] }"#,
        )
        .unwrap();

        assert_eq!(
            holder.when,
            Predicate::All(vec![
                Predicate::flag("load_balancer_is_required"),
                Predicate::equals("env", "uat"),
            ])
        );

        let holder: Holder = toml::from_str(r#"when = "always""#).unwrap();
        assert_eq!(holder.when, Predicate::Always);
    }
}
