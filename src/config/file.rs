//! File-based tier loading.

use std::path::Path;

use super::source::ConfigSource;
use super::ConfigError;

/// Builds one source per tier from `<dir>/<tier>.toml`, in the given order.
///
/// Tiers without a file are skipped, so the first tier that has a file ends
/// up with the highest priority. Pass the tiers most-specific first:
///
/// ```no_run
/// let sources = tierplan::config::first_found("env-vars", &["uat", "default"])?;
/// # Ok::<(), tierplan::ConfigError>(())
/// ```
pub fn first_found(dir: impl AsRef<Path>, tiers: &[&str]) -> Result<Vec<ConfigSource>, ConfigError> {
    let dir = dir.as_ref();
    let mut sources = Vec::new();

    for tier in tiers {
        let path = dir.join(format!("{tier}.toml"));
        if !path.is_file() {
            tracing::debug!(?path, tier, "No tier file found, skipping");
            continue;
        }
        sources.push(ConfigSource::builder(*tier).with_file(&path, true).build()?);
    }

    Ok(sources)
}

/// Loads and parses a TOML config file.
///
/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
pub(crate) fn load_config_file(
    path: &Path,
    required: bool,
) -> Result<Option<toml::Table>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let table = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                origin: format!("'{}'", path.display()),
                source: e,
            })?;
            Ok(Some(table))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                Err(ConfigError::FileNotFound(path.to_path_buf()))
            } else {
                Ok(None)
            }
        }
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigValue;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_load_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "key = \"value\"").unwrap();

        let table = load_config_file(file.path(), true).unwrap().unwrap();
        assert_eq!(table.get("key"), Some(&toml::Value::String("value".into())));
    }

    #[test]
    fn test_required_missing() {
        let result = load_config_file(Path::new("/nonexistent/path/config.toml"), true);
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_optional_missing() {
        let result = load_config_file(Path::new("/nonexistent/path/config.toml"), false);
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "key = ").unwrap();

        let result = load_config_file(file.path(), true);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_first_found_skips_missing_tiers() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("uat.toml"), "enable_nginx_lb = true").unwrap();
        std::fs::write(dir.path().join("default.toml"), "enable_nginx_lb = false").unwrap();

        let sources = first_found(dir.path(), &["prod", "uat", "default"]).unwrap();

        let tiers: Vec<&str> = sources.iter().map(|s| s.tier()).collect();
        assert_eq!(tiers, vec!["uat", "default"]);
        assert_eq!(
            sources[0].get("enable_nginx_lb"),
            Some(&ConfigValue::Bool(true))
        );
    }
}
