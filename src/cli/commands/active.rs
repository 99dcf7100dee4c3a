//! `mdt enable` / `mdt disable` commands

use console::style;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::error::Result;
use crate::core::service::ProjectService;

#[derive(clap::Args, Debug)]
pub struct ActiveArgs {
    /// Project id, ticket code, or path
    pub project: String,
}

pub fn run(args: ActiveArgs, active: bool, global: &GlobalOpts) -> Result<()> {
    let service = ProjectService::open()?;
    let record = service.set_active(&args.project, active)?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&record).unwrap_or_default());
        }
        OutputFormat::Id => println!("{}", record.id),
        OutputFormat::Table => {
            let verb = if active { "Enabled" } else { "Disabled" };
            println!(
                "{} {} project {} ({})",
                style("✓").green(),
                verb,
                style(&record.code).cyan(),
                style(&record.id).dim()
            );
        }
    }

    Ok(())
}
