//! Variable reference resolution for resolved values.
//!
//! Supports `${key}` syntax for referencing other resolved keys.
//! Use `$${...}` to escape and produce a literal `${...}`.

use std::collections::BTreeMap;

use thiserror::Error;

use super::value::{ConfigValue, Mapping};

const MAX_ITERATIONS: usize = 100;

/// Why a single key's references could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ReferenceError {
    #[error("circular reference")]
    Circular,

    #[error("referenced key not found: {0}")]
    NotFound(String),

    #[error("invalid reference path: {0}")]
    InvalidPath(String),

    #[error("unclosed reference (missing '}}')")]
    Unclosed,
}

/// Keys whose references failed, with the reason.
pub type Unresolved = BTreeMap<String, ReferenceError>;

/// Resolves all `${key}` references in the mapping.
///
/// Iteratively resolves references until no more substitutions are made,
/// then unescapes `$$`. A string consisting of exactly one reference takes
/// the referenced value as-is, keeping its type.
///
/// Each key fails on its own: a key whose references cannot be resolved is
/// removed from `mapping` and returned, and the other keys keep resolving.
/// Keys that still change after the iteration limit are circular.
pub fn resolve_references(mapping: &mut Mapping) -> Unresolved {
    let mut failed = Unresolved::new();

    for _ in 0..MAX_ITERATIONS {
        let snapshot = mapping.clone();
        let mut changed = Vec::new();
        let mut errors = Vec::new();

        for (key, value) in mapping.iter_mut() {
            match resolve_value(value, &snapshot) {
                Ok(0) => {}
                Ok(_) => changed.push(key.clone()),
                Err(e) => errors.push((key.clone(), e)),
            }
        }

        if changed.is_empty() && errors.is_empty() {
            unescape_all(mapping);
            return failed;
        }

        for (key, e) in errors {
            mapping.remove(&key);
            failed.insert(key, e);
        }
    }

    // One more pass to find what is still cycling.
    let snapshot = mapping.clone();
    let cycling: Vec<String> = snapshot
        .iter()
        .filter(|(_, value)| !matches!(resolve_value(&mut ConfigValue::clone(value), &snapshot), Ok(0)))
        .map(|(key, _)| key.clone())
        .collect();
    for key in cycling {
        mapping.remove(&key);
        failed.insert(key, ReferenceError::Circular);
    }

    unescape_all(mapping);
    failed
}

fn resolve_value(value: &mut ConfigValue, root: &Mapping) -> Result<usize, ReferenceError> {
    let ConfigValue::String(s) = value else {
        return Ok(0);
    };

    if let Some(path) = whole_reference(s) {
        *value = lookup(root, path)?.clone();
        return Ok(1);
    }

    resolve_string(s, root)
}

/// Returns the path if `s` is exactly `${path}`.
fn whole_reference(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("${")?.strip_suffix('}')?;
    if inner.contains('}') || inner.contains('$') {
        return None;
    }
    Some(inner)
}

/// Substitutes `${...}` references in a string, leaving `$$` escapes intact.
fn resolve_string(s: &mut String, root: &Mapping) -> Result<usize, ReferenceError> {
    let mut result = String::with_capacity(s.len());
    let mut substitutions = 0;
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        match chars.peek() {
            Some('$') => {
                chars.next();
                result.push_str("$$");
            }
            Some('{') => {
                chars.next();
                let path = consume_until(&mut chars, '}').ok_or(ReferenceError::Unclosed)?;
                result.push_str(&lookup(root, &path)?.to_string());
                substitutions += 1;
            }
            _ => result.push('$'),
        }
    }

    *s = result;
    Ok(substitutions)
}

fn consume_until(chars: &mut std::iter::Peekable<std::str::Chars>, delim: char) -> Option<String> {
    let mut result = String::new();
    for ch in chars.by_ref() {
        if ch == delim {
            return Some(result);
        }
        result.push(ch);
    }
    None
}

fn lookup<'a>(root: &'a Mapping, path: &str) -> Result<&'a ConfigValue, ReferenceError> {
    let valid = !path.is_empty()
        && path
            .split('.')
            .all(|p| !p.is_empty() && !p.chars().any(char::is_whitespace));
    if !valid {
        return Err(ReferenceError::InvalidPath(path.to_string()));
    }

    root.get(path)
        .ok_or_else(|| ReferenceError::NotFound(path.to_string()))
}

fn unescape_all(mapping: &mut Mapping) {
    for value in mapping.values_mut() {
        if let ConfigValue::String(s) = value {
            if s.contains("$$") {
                *s = s.replace("$$", "$");
            }
        }
    }
}
