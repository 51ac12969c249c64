//! Deployment context: a resolved configuration and its activation plan.

use crate::config::ResolvedConfig;
use crate::plan::{ActivationPlanner, ActivationResult};
use crate::Error;

/// Provisions components chosen by a [`Deployment`].
///
/// Implementations install or start the actual services; the crate only
/// decides which ones.
pub trait Applier {
    type Error: std::error::Error + Send + Sync + 'static;

    fn activate(&mut self, component: &str, config: &ResolvedConfig) -> Result<(), Self::Error>;
}

/// A resolved configuration together with the plan computed from it.
///
/// ## Example
///
/// ```no_run
/// use tierplan::{ActivationPlanner, ConfigResolver, Deployment, Registry};
///
/// let sources = tierplan::config::first_found("env-vars", &["uat", "default"])?;
/// let planner = ActivationPlanner::from_registry(Registry::from_file("components.toml")?)?;
/// let resolved = ConfigResolver::new()
///     .require_all(planner.required_keys())
///     .resolve(&sources)?;
///
/// let deployment = Deployment::builder().with_config(resolved).build(&planner)?;
/// for component in deployment.plan().active() {
///     println!("activate {component}");
/// }
/// # Ok::<(), tierplan::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Deployment {
    config: ResolvedConfig,
    plan: ActivationResult,
}

impl Deployment {
    /// Creates a new builder for constructing a `Deployment`.
    pub fn builder() -> DeploymentBuilder<()> {
        DeploymentBuilder { config: None }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn plan(&self) -> &ActivationResult {
        &self.plan
    }

    /// Hands every active component, in name order, to `applier`.
    ///
    /// Refuses to apply anything while the plan contains conflicts.
    pub fn apply<A: Applier>(&self, applier: &mut A) -> Result<(), Error> {
        let conflicts: Vec<_> = self.plan.conflicts().cloned().collect();
        if !conflicts.is_empty() {
            return Err(Error::ConflictingActivation(conflicts));
        }

        for component in self.plan.active() {
            tracing::debug!(component = %component, "Applying component");
            applier
                .activate(component, &self.config)
                .map_err(|e| Error::Apply {
                    component: component.clone(),
                    source: Box::new(e),
                })?;
        }

        Ok(())
    }
}

/// Builder for constructing a [`Deployment`].
///
/// The builder starts with no config (`DeploymentBuilder<()>`) and
/// transitions to `DeploymentBuilder<ResolvedConfig>` when
/// [`with_config`](Self::with_config) is called.
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct DeploymentBuilder<C> {
    config: Option<C>,
}

impl DeploymentBuilder<()> {
    /// Attaches the resolved configuration to plan against.
    pub fn with_config(self, config: ResolvedConfig) -> DeploymentBuilder<ResolvedConfig> {
        DeploymentBuilder {
            config: Some(config),
        }
    }

    /// Fails: no configuration was attached.
    pub fn build(self, _planner: &ActivationPlanner) -> Result<Deployment, Error> {
        Err(Error::MissingConfig)
    }
}

impl DeploymentBuilder<ResolvedConfig> {
    /// Plans the attached configuration with `planner`.
    pub fn build(self, planner: &ActivationPlanner) -> Result<Deployment, Error> {
        let config = self.config.ok_or(Error::MissingConfig)?;
        let plan = planner.plan(&config);
        Ok(Deployment { config, plan })
    }
}
