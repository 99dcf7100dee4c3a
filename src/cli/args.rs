//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    active::ActiveArgs,
    completions::CompletionsArgs,
    config::ConfigCommands,
    create::CreateArgs,
    discover::DiscoverArgs,
    list::ListArgs,
    remove::RemoveArgs,
    show::ShowArgs,
    update::UpdateArgs,
};

#[derive(Parser)]
#[command(name = "mdt")]
#[command(author, version, about = "Manage markdown-ticket projects from one shared registry")]
#[command(
    long_about = "Tracks markdown-ticket projects across three storage layouts - a \
central registry, per-project config files, and auto-discovered directories - and \
presents them as one consistent list."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a new project
    Create(CreateArgs),

    /// List all known projects
    List(ListArgs),

    /// Show one project's effective configuration
    Show(ShowArgs),

    /// Change a project's fields
    Update(UpdateArgs),

    /// Remove a project's registration and config
    Remove(RemoveArgs),

    /// Mark a project active
    Enable(ActiveArgs),

    /// Mark a project inactive
    Disable(ActiveArgs),

    /// Scan the configured search paths and report what they contain
    Discover(DiscoverArgs),

    /// View or edit the discovery configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table or key/value output
    #[default]
    Table,
    /// JSON (for programming)
    Json,
    /// Just ids, one per line
    Id,
}
