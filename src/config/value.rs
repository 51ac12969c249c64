//! Scalar configuration values and flat key/value mappings.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use super::ConfigError;

/// A flat mapping from dotted key to scalar value.
pub type Mapping = BTreeMap<String, ConfigValue>;

/// A single resolved configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ConfigValue {
    /// Interprets the value as a boolean.
    ///
    /// Booleans pass through. Strings `true`/`false`/`yes`/`no` are accepted
    /// case-insensitively. Everything else is `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::String(s) => parse_bool(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Coerces a raw string to the most specific type:
    /// boolean, integer, float, or string (fallback).
    pub fn coerce(s: &str) -> Self {
        if s.eq_ignore_ascii_case("true") {
            return ConfigValue::Bool(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return ConfigValue::Bool(false);
        }

        if looks_like_integer(s) {
            if let Ok(i) = s.parse::<i64>() {
                return ConfigValue::Integer(i);
            }
        }

        if s.contains('.') {
            if let Ok(f) = s.parse::<f64>() {
                return ConfigValue::Float(f);
            }
        }

        ConfigValue::String(s.to_string())
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Integer(i) => write!(f, "{i}"),
            ConfigValue::Float(x) => write!(f, "{x}"),
            ConfigValue::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<i32> for ConfigValue {
    fn from(i: i32) -> Self {
        ConfigValue::Integer(i64::from(i))
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Integer(i)
    }
}

impl From<f64> for ConfigValue {
    fn from(f: f64) -> Self {
        ConfigValue::Float(f)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

/// Flattens a TOML table into a [`Mapping`] with dotted keys.
///
/// `[db] port = 5432` becomes `db.port = 5432`. Arrays are rejected.
pub fn flatten_table(table: &Table) -> Result<Mapping, ConfigError> {
    let mut out = Mapping::new();
    flatten_into(&mut out, "", table)?;
    Ok(out)
}

fn flatten_into(out: &mut Mapping, prefix: &str, table: &Table) -> Result<(), ConfigError> {
    for (key, value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        let scalar = match value {
            Value::Table(nested) => {
                flatten_into(out, &path, nested)?;
                continue;
            }
            Value::String(s) => ConfigValue::String(s.clone()),
            Value::Integer(i) => ConfigValue::Integer(*i),
            Value::Float(f) => ConfigValue::Float(*f),
            Value::Boolean(b) => ConfigValue::Bool(*b),
            Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
            Value::Array(_) => return Err(ConfigError::NonScalarValue(path)),
        };
        out.insert(path, scalar);
    }
    Ok(())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}

fn looks_like_integer(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
