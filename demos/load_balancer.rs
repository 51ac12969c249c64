use std::convert::Infallible;

use tierplan::{ActivationPlanner, Applier, ConfigResolver, Deployment, Registry, ResolvedConfig};

struct PrintApplier;

impl Applier for PrintApplier {
    type Error = Infallible;

    fn activate(&mut self, component: &str, config: &ResolvedConfig) -> Result<(), Infallible> {
        let dsn = config.get("mysql.dsn").map(ToString::to_string).unwrap_or_default();
        println!("activate {component} (mysql: {dsn})");
        Ok(())
    }
}

fn main() -> Result<(), tierplan::Error> {
    let _ = tierplan::logging::init();

    // DEPLOY_ENV=prod falls through to default.toml.
    let env = std::env::var("DEPLOY_ENV").unwrap_or_else(|_| "uat".to_string());
    let sources = tierplan::config::first_found("demos/env-vars", &[env.as_str(), "default"])?;

    let planner = ActivationPlanner::from_registry(Registry::from_file("demos/components.toml")?)?;
    let resolved = ConfigResolver::new()
        .with_interpolation(true)
        .require_all(planner.required_keys())
        .resolve(&sources)?;

    let deployment = Deployment::builder().with_config(resolved).build(&planner)?;
    for diagnostic in deployment.plan().diagnostics() {
        println!("note: {diagnostic}");
    }

    deployment.apply(&mut PrintApplier)
}
