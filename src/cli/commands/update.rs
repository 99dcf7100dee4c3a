//! `mdt update` command - change a project's fields

use console::style;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::error::{Error, Result, Violation};
use crate::core::service::{ProjectService, UpdatePatch};

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Project id, ticket code, or path
    pub project: String,

    /// New project name
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// New ticket code
    #[arg(long, short = 'c')]
    pub code: Option<String>,

    /// New description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// New repository URL
    #[arg(long = "repo-url")]
    pub repository_url: Option<String>,

    /// New tickets directory, relative to the project root
    #[arg(long = "tickets-path")]
    pub tickets_path: Option<String>,
}

pub fn run(args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let patch = UpdatePatch {
        name: args.name,
        code: args.code,
        description: args.description,
        repository_url: args.repository_url,
        tickets_path: args.tickets_path,
    };
    if patch.is_empty() {
        return Err(Error::validation(vec![Violation::new(
            "patch",
            "non-empty",
            "nothing to update: pass at least one field option",
        )]));
    }

    let service = ProjectService::open()?;
    let record = service.update(&args.project, patch)?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&record).unwrap_or_default());
        }
        OutputFormat::Id => println!("{}", record.id),
        OutputFormat::Table => {
            println!(
                "{} Updated project {} ({})",
                style("✓").green(),
                style(&record.code).cyan(),
                style(&record.id).dim()
            );
        }
    }

    Ok(())
}
