//! `mdt discover` command - scan search paths and report the result

use console::style;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::error::Result;
use crate::core::service::ProjectService;

#[derive(clap::Args, Debug)]
pub struct DiscoverArgs {}

pub fn run(_args: DiscoverArgs, global: &GlobalOpts) -> Result<()> {
    let service = ProjectService::open()?;
    let discovery = service.discovery_config();

    if discovery.search_paths.is_empty() {
        println!("{}", style("No search paths configured.").dim());
        println!(
            "Use {} to add one.",
            style("mdt config add-path <dir>").yellow()
        );
        return Ok(());
    }

    let found = service.discover_preview();

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&found).unwrap_or_default());
        }
        OutputFormat::Id => {
            for record in &found {
                println!("{}", record.id);
            }
        }
        OutputFormat::Table => {
            if found.is_empty() {
                println!("{}", style("No projects found in the search paths.").dim());
                return Ok(());
            }
            for record in &found {
                println!(
                    "{} {} ({}) at {}",
                    style("•").cyan(),
                    style(&record.code).cyan(),
                    record.name,
                    style(record.path.display()).dim()
                );
            }
            if !global.quiet {
                println!();
                println!("{} project(s) discovered", found.len());
                if !discovery.auto_discover {
                    println!(
                        "{}",
                        style("Auto-discovery is off; these will not appear in `mdt list`.")
                            .yellow()
                    );
                    println!(
                        "Enable it with {}.",
                        style("mdt config auto-discover true").yellow()
                    );
                }
            }
        }
    }

    Ok(())
}
