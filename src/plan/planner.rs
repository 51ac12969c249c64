//! Mutual-exclusion activation planning.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use super::component::{ComponentSpec, GroupSpec, Registry};
use super::predicate::PredicateError;
use super::PlanError;
use crate::config::ResolvedConfig;

/// More than one candidate qualified in the same group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub group: String,
    /// Every qualifying component, in declaration order.
    pub contenders: Vec<String>,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "conflict: {} in group {}",
            self.contenders.join(", "),
            self.group
        )
    }
}

/// What a failed predicate belonged to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Component(String),
    Group(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Component(name) => write!(f, "component {name}"),
            Subject::Group(name) => write!(f, "gate of group {name}"),
        }
    }
}

/// A note produced while planning.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    Conflict(Conflict),
    /// The group gate was false; these candidates were suppressed.
    GateClosed { group: String, suppressed: Vec<String> },
    /// The component's predicate evaluated false. Informational.
    UnmetPredicate { component: String },
    /// A predicate could not be evaluated; its subject did not activate.
    PredicateFailed { subject: Subject, error: PredicateError },
    /// A member predicate failed, so the group's outcome is unknown and
    /// these candidates were suppressed with it.
    Undetermined { group: String, suppressed: Vec<String> },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Conflict(conflict) => fmt::Display::fmt(conflict, f),
            Diagnostic::GateClosed { group, suppressed } => {
                write!(f, "gate closed: group {group} suppressed {}", suppressed.join(", "))
            }
            Diagnostic::UnmetPredicate { component } => write!(f, "unmet predicate: {component}"),
            Diagnostic::PredicateFailed { subject, error } => {
                write!(f, "predicate failed for {subject}: {error}")
            }
            Diagnostic::Undetermined { group, suppressed } => {
                write!(f, "undetermined: group {group} suppressed {}", suppressed.join(", "))
            }
        }
    }
}

/// The components chosen for one resolved configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivationResult {
    active: BTreeSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl ActivationResult {
    pub fn active(&self) -> &BTreeSet<String> {
        &self.active
    }

    pub fn is_active(&self, component: &str) -> bool {
        self.active.contains(component)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::Conflict(conflict) => Some(conflict),
            _ => None,
        })
    }

    pub fn has_conflicts(&self) -> bool {
        self.conflicts().next().is_some()
    }
}

/// Decides which components are active for a [`ResolvedConfig`].
///
/// Components in the same group are mutually exclusive. If more than one
/// qualifies, none of them activates and a [`Conflict`] is reported; the
/// planner never picks a winner on its own. A member whose predicate fails
/// leaves the group undetermined, and nothing in it activates.
#[derive(Debug, Clone)]
pub struct ActivationPlanner {
    components: Vec<ComponentSpec>,
    groups: BTreeMap<String, GroupSpec>,
}

impl ActivationPlanner {
    /// Creates a planner from component and group declarations.
    ///
    /// Groups referenced by components but not declared are ungated.
    pub fn new(components: Vec<ComponentSpec>, groups: Vec<GroupSpec>) -> Result<Self, PlanError> {
        let mut seen = HashSet::new();
        for component in &components {
            if component.name.is_empty() || component.group.is_empty() {
                return Err(PlanError::EmptyName);
            }
            if !seen.insert(component.name.as_str()) {
                return Err(PlanError::DuplicateComponent(component.name.clone()));
            }
        }

        let mut by_name = BTreeMap::new();
        for group in groups {
            if group.name.is_empty() {
                return Err(PlanError::EmptyName);
            }
            if by_name.contains_key(&group.name) {
                return Err(PlanError::DuplicateGroup(group.name));
            }
            by_name.insert(group.name.clone(), group);
        }

        Ok(Self {
            components,
            groups: by_name,
        })
    }

    pub fn from_registry(registry: Registry) -> Result<Self, PlanError> {
        let (components, groups) = registry.into_specs();
        Self::new(components, groups)
    }

    pub fn components(&self) -> &[ComponentSpec] {
        &self.components
    }

    /// Every configuration key read by a component predicate or group gate.
    pub fn required_keys(&self) -> BTreeSet<String> {
        let components = self.components.iter().map(|c| &c.when);
        let gates = self.groups.values().filter_map(|g| g.gate.as_ref());

        components
            .chain(gates)
            .flat_map(|pred| pred.keys())
            .map(str::to_string)
            .collect()
    }

    /// Computes the active set for `resolved`.
    pub fn plan(&self, resolved: &ResolvedConfig) -> ActivationResult {
        let mut diagnostics = Vec::new();
        let mut candidates: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut undetermined = BTreeSet::new();

        for component in &self.components {
            match component.when.evaluate(resolved) {
                Ok(true) => candidates
                    .entry(component.group.as_str())
                    .or_default()
                    .push(component.name.as_str()),
                Ok(false) => diagnostics.push(Diagnostic::UnmetPredicate {
                    component: component.name.clone(),
                }),
                Err(error) => {
                    tracing::warn!(component = %component.name, %error, "Component predicate failed");
                    diagnostics.push(Diagnostic::PredicateFailed {
                        subject: Subject::Component(component.name.clone()),
                        error,
                    });
                    undetermined.insert(component.group.as_str());
                }
            }
        }

        let mut active = BTreeSet::new();

        let groups: BTreeSet<&str> = candidates
            .keys()
            .chain(undetermined.iter())
            .copied()
            .collect();

        for group in groups {
            let members = candidates.remove(group).unwrap_or_default();
            if !self.gate_open(group, &members, resolved, &mut diagnostics) {
                continue;
            }

            if undetermined.contains(group) {
                tracing::warn!(group, suppressed = ?members, "Group undetermined");
                diagnostics.push(Diagnostic::Undetermined {
                    group: group.to_string(),
                    suppressed: members.iter().map(|m| m.to_string()).collect(),
                });
                continue;
            }

            match members.as_slice() {
                [] => {}
                [winner] => {
                    active.insert(winner.to_string());
                }
                contenders => {
                    let conflict = Conflict {
                        group: group.to_string(),
                        contenders: contenders.iter().map(|c| c.to_string()).collect(),
                    };
                    tracing::warn!(%conflict, "Conflicting activation");
                    diagnostics.push(Diagnostic::Conflict(conflict));
                }
            }
        }

        tracing::debug!(active = ?active, diagnostics = diagnostics.len(), "Planned activation");

        ActivationResult {
            active,
            diagnostics,
        }
    }

    fn gate_open(
        &self,
        group: &str,
        members: &[&str],
        resolved: &ResolvedConfig,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> bool {
        let Some(gate) = self.groups.get(group).and_then(|g| g.gate.as_ref()) else {
            return true;
        };

        match gate.evaluate(resolved) {
            Ok(true) => true,
            Ok(false) => {
                tracing::debug!(group, suppressed = ?members, "Group gate closed");
                diagnostics.push(Diagnostic::GateClosed {
                    group: group.to_string(),
                    suppressed: members.iter().map(|m| m.to_string()).collect(),
                });
                false
            }
            Err(error) => {
                tracing::warn!(group, %error, "Group gate failed");
                diagnostics.push(Diagnostic::PredicateFailed {
                    subject: Subject::Group(group.to_string()),
                    error,
                });
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigValue;
    use crate::plan::Predicate;

    fn config(pairs: &[(&str, ConfigValue)]) -> ResolvedConfig {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn lb_planner() -> ActivationPlanner {
        ActivationPlanner::new(
            vec![
                ComponentSpec::new("nginx", "lb", Predicate::flag("enable_nginx_lb")),
                ComponentSpec::new("apache", "lb", Predicate::flag("enable_apache_lb")),
            ],
            vec![GroupSpec::gated("lb", Predicate::flag("load_balancer_is_required"))],
        )
        .unwrap()
    }

    #[test]
    fn test_single_candidate_activates() {
        let cfg = config(&[
            ("load_balancer_is_required", true.into()),
            ("enable_nginx_lb", true.into()),
            ("enable_apache_lb", false.into()),
        ]);

        let result = lb_planner().plan(&cfg);

        assert!(result.is_active("nginx"));
        assert_eq!(result.active().len(), 1);
        assert!(!result.has_conflicts());
        assert_eq!(
            result.diagnostics(),
            [Diagnostic::UnmetPredicate {
                component: "apache".into()
            }]
        );
    }

    #[test]
    fn test_conflict_excludes_whole_group() {
        let cfg = config(&[
            ("load_balancer_is_required", true.into()),
            ("enable_nginx_lb", true.into()),
            ("enable_apache_lb", true.into()),
        ]);

        let result = lb_planner().plan(&cfg);

        assert!(result.active().is_empty());
        let conflicts: Vec<_> = result.conflicts().collect();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].to_string(), "conflict: nginx, apache in group lb");
    }

    #[test]
    fn test_zero_candidates_is_valid() {
        let cfg = config(&[
            ("load_balancer_is_required", true.into()),
            ("enable_nginx_lb", false.into()),
            ("enable_apache_lb", false.into()),
        ]);

        let result = lb_planner().plan(&cfg);

        assert!(result.active().is_empty());
        assert!(!result.has_conflicts());
        assert_eq!(result.diagnostics().len(), 2);
    }

    #[test]
    fn test_closed_gate_suppresses_candidates() {
        let cfg = config(&[
            ("load_balancer_is_required", false.into()),
            ("enable_nginx_lb", true.into()),
            ("enable_apache_lb", true.into()),
        ]);

        let result = lb_planner().plan(&cfg);

        assert!(result.active().is_empty());
        assert!(!result.has_conflicts());
        assert_eq!(
            result.diagnostics(),
            [Diagnostic::GateClosed {
                group: "lb".into(),
                suppressed: vec!["nginx".into(), "apache".into()],
            }]
        );
    }

    #[test]
    fn test_failed_gate_suppresses_group() {
        let cfg = config(&[
            ("enable_nginx_lb", true.into()),
            ("enable_apache_lb", false.into()),
        ]);

        let result = lb_planner().plan(&cfg);

        assert!(result.active().is_empty());
        assert!(result.diagnostics().contains(&Diagnostic::PredicateFailed {
            subject: Subject::Group("lb".into()),
            error: PredicateError::MissingKey("load_balancer_is_required".into()),
        }));
    }

    #[test]
    fn test_missing_component_key_is_not_false() {
        let cfg = config(&[
            ("load_balancer_is_required", true.into()),
            ("enable_nginx_lb", true.into()),
        ]);

        let result = lb_planner().plan(&cfg);

        assert!(result.active().is_empty());
        assert_eq!(
            result.diagnostics(),
            [
                Diagnostic::PredicateFailed {
                    subject: Subject::Component("apache".into()),
                    error: PredicateError::MissingKey("enable_apache_lb".into()),
                },
                Diagnostic::Undetermined {
                    group: "lb".into(),
                    suppressed: vec!["nginx".into()],
                },
            ]
        );
    }

    #[test]
    fn test_non_boolean_member_blocks_sibling() {
        let cfg = config(&[
            ("load_balancer_is_required", true.into()),
            ("enable_nginx_lb", true.into()),
            ("enable_apache_lb", "maybe".into()),
        ]);

        let result = lb_planner().plan(&cfg);

        assert!(!result.is_active("nginx"));
        assert!(result.active().is_empty());
        assert!(!result.has_conflicts());
        assert_eq!(
            result.diagnostics().last().unwrap().to_string(),
            "undetermined: group lb suppressed nginx"
        );
    }

    #[test]
    fn test_closed_gate_wins_over_failed_member() {
        let cfg = config(&[
            ("load_balancer_is_required", false.into()),
            ("enable_nginx_lb", 1.into()),
            ("enable_apache_lb", false.into()),
        ]);

        let result = lb_planner().plan(&cfg);

        assert!(result.active().is_empty());
        assert_eq!(
            result.diagnostics().last(),
            Some(&Diagnostic::GateClosed {
                group: "lb".into(),
                suppressed: vec![],
            })
        );
    }

    #[test]
    fn test_groups_are_independent() {
        let planner = ActivationPlanner::new(
            vec![
                ComponentSpec::new("nginx", "lb", Predicate::flag("nginx")),
                ComponentSpec::new("mysql", "db", Predicate::Always),
                ComponentSpec::new("webserver", "web", Predicate::Always),
            ],
            vec![],
        )
        .unwrap();

        let result = planner.plan(&config(&[("nginx", true.into())]));

        let active: Vec<&str> = result.active().iter().map(String::as_str).collect();
        assert_eq!(active, vec!["mysql", "nginx", "webserver"]);
    }

    #[test]
    fn test_construction_errors() {
        let dup = ActivationPlanner::new(
            vec![
                ComponentSpec::new("nginx", "lb", Predicate::Always),
                ComponentSpec::new("nginx", "other", Predicate::Always),
            ],
            vec![],
        );
        assert!(matches!(dup, Err(PlanError::DuplicateComponent(n)) if n == "nginx"));

        let dup_group = ActivationPlanner::new(vec![], vec![GroupSpec::new("lb"), GroupSpec::new("lb")]);
        assert!(matches!(dup_group, Err(PlanError::DuplicateGroup(_))));

        let empty = ActivationPlanner::new(vec![ComponentSpec::new("", "lb", Predicate::Always)], vec![]);
        assert!(matches!(empty, Err(PlanError::EmptyName)));
    }

    #[test]
    fn test_required_keys() {
        let keys: Vec<String> = lb_planner().required_keys().into_iter().collect();
        assert_eq!(
            keys,
            vec![
                "enable_apache_lb",
                "enable_nginx_lb",
                "load_balancer_is_required"
            ]
        );
    }
}
