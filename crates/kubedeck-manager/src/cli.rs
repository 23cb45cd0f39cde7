use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line interface for the manager agent.
#[derive(Parser)]
#[command(name = "kdeck-manager")]
#[command(about = "Kubedeck cluster manager agent", long_about = None)]
pub struct Cli {
    /// Path to the agent configuration file (TOML or JSON).
    #[arg(short, long, default_value = "/etc/kubedeck/manager.toml")]
    pub config: PathBuf,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Agent subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Run the manager until interrupted.
    Run,
    /// Load the configuration, print a summary, and exit.
    CheckConfig,
}
