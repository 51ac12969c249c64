use super::value::{ConfigValue, Mapping};

/// Collects variables starting with `prefix` + `separator` into a mapping.
///
/// Remaining segments are lowercased and joined with `.`, so with prefix
/// `DEPLOY` and separator `__`, `DEPLOY__DB__PORT` maps to `db.port`.
/// An empty separator matches nothing.
pub(crate) fn load_env_vars<I>(vars: I, prefix: &str, separator: &str) -> Mapping
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut mapping = Mapping::new();
    if separator.is_empty() {
        return mapping;
    }

    let prefix_with_sep = format!("{prefix}{separator}");

    for (key, value) in vars {
        let Some(path_str) = key.strip_prefix(&prefix_with_sep) else {
            continue;
        };
        if path_str.is_empty() {
            continue;
        }

        let path: Vec<String> = path_str
            .split(separator)
            .map(|s| s.to_lowercase())
            .collect();
        if path.iter().any(String::is_empty) {
            continue;
        }

        mapping.insert(path.join("."), ConfigValue::coerce(&value));
    }

    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_prefix_and_nesting() {
        let mapping = load_env_vars(
            vars(&[
                ("DEPLOY__ENABLE_NGINX_LB", "true"),
                ("DEPLOY__DB__PORT", "3306"),
                ("OTHER__DB__PORT", "1"),
                ("DEPLOY__", "ignored"),
            ]),
            "DEPLOY",
            "__",
        );

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["enable_nginx_lb"], ConfigValue::Bool(true));
        assert_eq!(mapping["db.port"], ConfigValue::Integer(3306));
    }

    #[test]
    fn test_empty_segments_skipped() {
        let mapping = load_env_vars(vars(&[("DEPLOY__A____B", "x")]), "DEPLOY", "__");
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_empty_separator_matches_nothing() {
        let mapping = load_env_vars(vars(&[("DEPLOYX", "1")]), "DEPLOY", "");
        assert!(mapping.is_empty());
    }
}
