//! `mdt show` command - one project's effective configuration

use console::style;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::error::Result;
use crate::core::record::ProjectRecord;
use crate::core::service::ProjectService;

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Project id, ticket code, or path
    pub project: String,
}

pub fn run(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let service = ProjectService::open()?;
    let record = service.get(&args.project)?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&record).unwrap_or_default());
        }
        OutputFormat::Id => println!("{}", record.id),
        OutputFormat::Table => print_record(&record),
    }

    Ok(())
}

fn print_record(record: &ProjectRecord) {
    println!(
        "{} {}",
        style(&record.code).cyan().bold(),
        style(&record.name).bold()
    );
    println!();
    print_field("id", &record.id);
    print_field("path", &record.path.display().to_string());
    print_field("tickets", &record.tickets_path);
    print_field("strategy", &record.strategy.to_string());
    print_field("active", if record.active { "yes" } else { "no" });
    if let Some(description) = &record.description {
        print_field("description", description);
    }
    if let Some(url) = &record.repository_url {
        print_field("repository", url);
    }
    if !record.document.paths.is_empty() {
        print_field("documents", &record.document.paths.join(", "));
    }
}

fn print_field(key: &str, value: &str) {
    println!("  {:<12} {}", style(key).dim(), value);
}
