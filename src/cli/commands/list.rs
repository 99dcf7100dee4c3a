//! `mdt list` command - list all known projects

use console::style;
use tabled::{builder::Builder, settings::Style};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::error::Result;
use crate::core::service::ProjectService;

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show only active projects
    #[arg(long)]
    pub active: bool,
}

pub fn run(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let service = ProjectService::open()?;
    let mut records = service.list()?;
    if args.active {
        records.retain(|r| r.active);
    }

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records).unwrap_or_default());
        }
        OutputFormat::Id => {
            for record in &records {
                println!("{}", record.id);
            }
        }
        OutputFormat::Table => {
            if records.is_empty() {
                println!("{}", style("No projects found.").dim());
                if !global.quiet {
                    println!(
                        "Use {} to register one.",
                        style("mdt create <path> --name <name> --code <code>").yellow()
                    );
                }
                return Ok(());
            }

            let mut builder = Builder::default();
            builder.push_record(["CODE", "NAME", "STRATEGY", "ACTIVE", "PATH"]);
            for record in &records {
                builder.push_record([
                    record.code.clone(),
                    record.name.clone(),
                    record.strategy.to_string(),
                    (if record.active { "yes" } else { "no" }).to_string(),
                    record.path.display().to_string(),
                ]);
            }
            println!("{}", builder.build().with(Style::blank()));

            if !global.quiet {
                println!();
                println!("{} project(s)", records.len());
            }
        }
    }

    Ok(())
}
