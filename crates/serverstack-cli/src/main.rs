//! # sstk: Serverstack CLI
//!
//! Composes the notes backend from its stacks and prints the plan,
//! the deployment manifest, or the resolved outputs.

mod commands;
mod config;
mod output;
mod stacks;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    }

    commands::execute(cli)
}
