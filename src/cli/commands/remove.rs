//! `mdt remove` command - delete a project's registration and config

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::cli::GlobalOpts;
use crate::core::error::{Error, Result};
use crate::core::service::ProjectService;

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Project id, ticket code, or path
    pub project: String,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(args: RemoveArgs, global: &GlobalOpts) -> Result<()> {
    let service = ProjectService::open()?;
    let record = service.get(&args.project)?;

    if !args.yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Remove project {} ({})? Ticket files stay on disk.",
                record.code, record.id
            ))
            .default(false)
            .interact()
            .unwrap_or(false);
        if !confirmed {
            return Err(Error::Cancelled);
        }
    }

    service.delete(&record.id)?;

    if !global.quiet {
        println!(
            "{} Removed project {} ({})",
            style("✓").green(),
            style(&record.code).cyan(),
            style(&record.id).dim()
        );
    }

    Ok(())
}
