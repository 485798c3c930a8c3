//! `sstk plan`: Display the composition before it is deployed.

use clap::Args;
use serverstack_common::config::AppConfig;
use serverstack_compose::Composition;

use crate::output::{format_capabilities, pad, rule};

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Only show the named stack.
    #[arg(long)]
    pub stack: Option<String>,
}

/// Executes the `plan` command.
///
/// Composes the app and prints every stack in build order with its
/// resources, bindings, routes, and outputs.
///
/// # Errors
///
/// Returns an error if composition fails or the requested stack is unknown.
pub fn execute(args: &PlanArgs, config: AppConfig) -> anyhow::Result<()> {
    let composition = super::compose(config)?;
    if let Some(ref name) = args.stack {
        if composition.stack(name).is_none() {
            anyhow::bail!("unknown stack: {name}");
        }
    }
    print!("{}", render(&composition, args.stack.as_deref()));
    Ok(())
}

fn render(composition: &Composition, only: Option<&str>) -> String {
    let config = composition.config();
    let mut out = String::new();
    out.push_str(&format!(
        "Deployment Plan for: {} ({}, {})\n",
        config.name, config.stage, config.region
    ));
    out.push_str(&rule());
    out.push_str("\n\n");

    let stacks = composition
        .stacks()
        .iter()
        .filter(|s| only.is_none_or(|name| s.name() == name));
    let mut shown = 0_usize;
    for stack in stacks {
        shown += 1;
        out.push_str(&format!(
            "  + {} ({})\n",
            stack.name(),
            composition.physical_name(stack)
        ));
        let dependencies: Vec<&str> = stack.dependency_names().collect();
        if !dependencies.is_empty() {
            out.push_str(&format!("      uses: {}\n", dependencies.join(", ")));
        }
        for resource in stack.resources().iter() {
            out.push_str(&format!(
                "      {}: {}\n",
                resource.reference().kind(),
                resource.reference().name()
            ));
        }
        for binding in stack.bindings() {
            out.push_str(&format!(
                "      bind {} -> {} {}\n",
                binding.resource().path(),
                binding.consumer(),
                format_capabilities(binding.capabilities())
            ));
        }
        for route in stack.routes() {
            out.push_str(&format!(
                "      {} {} -> {} [{}]\n",
                pad(route.method().as_str(), 6),
                route.path().as_str(),
                route.handler(),
                route.authorizer()
            ));
        }
        for (name, value) in stack.outputs() {
            out.push_str(&format!("      output {name} = {value}\n"));
        }
    }

    out.push('\n');
    out.push_str(&format!("  {shown} stack(s) will be deployed.\n"));
    if only.is_none() {
        out.push_str(&format!(
            "  Order: {}\n",
            composition.deployment_order().join(" -> ")
        ));
    }
    out
}
