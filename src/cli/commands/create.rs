//! `mdt create` command - register a new project

use console::style;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::error::Result;
use crate::core::service::{CreateProject, ProjectService};

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Project directory
    pub path: String,

    /// Human-readable project name
    #[arg(long, short = 'n')]
    pub name: String,

    /// Ticket code, 2-5 letters (normalized to uppercase)
    #[arg(long, short = 'c')]
    pub code: String,

    /// Project description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Repository URL
    #[arg(long = "repo-url")]
    pub repository_url: Option<String>,

    /// Tickets directory, relative to the project root
    #[arg(long = "tickets-path")]
    pub tickets_path: Option<String>,

    /// Keep everything in the global registry; write nothing into the
    /// project directory
    #[arg(long = "global-only")]
    pub global_only: bool,
}

pub fn run(args: CreateArgs, global: &GlobalOpts) -> Result<()> {
    let service = ProjectService::open()?;

    let record = service.create(CreateProject {
        name: args.name,
        path: args.path,
        code: args.code,
        description: args.description,
        repository_url: args.repository_url,
        tickets_path: args.tickets_path,
        global_only: args.global_only,
    })?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&record).unwrap_or_default());
        }
        OutputFormat::Id => println!("{}", record.id),
        OutputFormat::Table => {
            println!(
                "{} Created project {} ({})",
                style("✓").green(),
                style(&record.code).cyan(),
                style(&record.id).dim()
            );
            if !global.quiet {
                println!(
                    "  {} {} storage at {}",
                    style("→").dim(),
                    record.strategy,
                    style(record.path.display()).dim()
                );
            }
        }
    }

    Ok(())
}
