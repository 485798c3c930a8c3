//! CLI command definitions and dispatch.

pub mod outputs;
pub mod plan;
pub mod synth;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serverstack_common::config::AppConfig;
use serverstack_common::constants::{BIN_NAME, DEFAULT_CONFIG_FILE};
use serverstack_compose::Composition;

/// Serverstack: compose serverless stacks and inspect the result.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to the app configuration file.
    ///
    /// Without this flag `serverstack.yaml` is read when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Deployment stage, overriding the configuration file.
    #[arg(long, global = true, env = "SERVERSTACK_STAGE")]
    pub stage: Option<String>,

    /// Deployment region, overriding the configuration file.
    #[arg(long, global = true, env = "SERVERSTACK_REGION")]
    pub region: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Display the stacks, resources, bindings, and routes in build order.
    Plan(plan::PlanArgs),
    /// Write the deployment manifest and its digest.
    Synth(synth::SynthArgs),
    /// Display every stack output with placeholder physical values.
    Outputs(outputs::OutputsArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if configuration, composition, or the command fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    match cli.command {
        Command::Plan(args) => plan::execute(&args, config),
        Command::Synth(args) => synth::execute(&args, config),
        Command::Outputs(args) => outputs::execute(&args, config),
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let path = cli
        .config
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let config = crate::config::load(path, cli.config.is_some())?;
    crate::config::apply_overrides(config, cli.stage.as_deref(), cli.region.as_deref())
}

/// Composes the notes backend, logging the outcome.
pub(crate) fn compose(config: AppConfig) -> anyhow::Result<Composition> {
    tracing::info!(app = %config.name, stage = %config.stage, region = %config.region, "composing");
    let composition = crate::stacks::compose(config)
        .map_err(|e| anyhow::anyhow!("composition failed: {e}"))?;
    tracing::info!(stacks = composition.stacks().len(), "composition finished");
    Ok(composition)
}
