//! Component and group declarations.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::predicate::Predicate;
use super::PlanError;

/// A component that may be activated, e.g. a load balancer role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    /// Mutual-exclusion group: at most one member is ever active.
    pub group: String,
    #[serde(default)]
    pub when: Predicate,
}

impl ComponentSpec {
    pub fn new(name: impl Into<String>, group: impl Into<String>, when: Predicate) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            when,
        }
    }
}

/// A mutual-exclusion group with an optional gate.
///
/// When the gate evaluates false, no member of the group may activate,
/// whatever the members' own predicates say.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<Predicate>,
}

impl GroupSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gate: None,
        }
    }

    pub fn gated(name: impl Into<String>, gate: Predicate) -> Self {
        Self {
            name: name.into(),
            gate: Some(gate),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GroupEntry {
    #[serde(default)]
    gate: Option<Predicate>,
}

/// Component declarations as authored in TOML.
///
/// ```toml
/// [groups.lb]
/// gate = { flag = "load_balancer_is_required" }
///
/// [[components]]
/// name = "nginx"
/// group = "lb"
/// when = { flag = "enable_nginx_lb" }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Registry {
    #[serde(default)]
    groups: BTreeMap<String, GroupEntry>,
    #[serde(default)]
    components: Vec<ComponentSpec>,
}

impl Registry {
    pub fn from_toml_str(contents: &str) -> Result<Self, PlanError> {
        toml::from_str(contents).map_err(|e| PlanError::Parse {
            origin: "inline registry".to_string(),
            source: e,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| PlanError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&contents).map_err(|e| PlanError::Parse {
            origin: format!("'{}'", path.display()),
            source: e,
        })
    }

    /// Splits the registry into component and group specs.
    pub fn into_specs(self) -> (Vec<ComponentSpec>, Vec<GroupSpec>) {
        let groups = self
            .groups
            .into_iter()
            .map(|(name, entry)| GroupSpec {
                name,
                gate: entry.gate,
            })
            .collect();
        (self.components, groups)
    }
}
