//! `sstk outputs`: Display stack outputs.

use clap::Args;
use serverstack_common::config::AppConfig;
use serverstack_compose::resolver::{PlaceholderResolver, ResolvedOutput};

use crate::output::pad;

/// Arguments for the `outputs` command.
#[derive(Args, Debug)]
pub struct OutputsArgs {
    /// Print outputs as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `outputs` command.
///
/// Nothing is deployed, so attribute outputs resolve to placeholders
/// naming the physical stack, resource, and attribute.
///
/// # Errors
///
/// Returns an error if composition or resolution fails.
pub fn execute(args: &OutputsArgs, config: AppConfig) -> anyhow::Result<()> {
    let composition = super::compose(config)?;
    let outputs = composition.resolve_outputs(&PlaceholderResolver)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outputs)?);
    } else {
        print!("{}", render(&outputs));
    }
    Ok(())
}

fn render(outputs: &[ResolvedOutput]) -> String {
    if outputs.is_empty() {
        return "No outputs.\n".to_string();
    }
    let width = outputs
        .iter()
        .map(|o| o.stack.len() + o.name.len() + 1)
        .max()
        .unwrap_or_default();
    outputs
        .iter()
        .map(|o| {
            let key = format!("{}.{}", o.stack, o.name);
            format!("{}  {}\n", pad(&key, width), o.value)
        })
        .collect()
}
