//! `mdt config` command - discovery configuration management

use clap::Subcommand;
use console::style;

use crate::cli::GlobalOpts;
use crate::core::error::Result;
use crate::core::service::ProjectService;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the current discovery configuration
    Show,

    /// Show paths to the global configuration files
    Path,

    /// Turn auto-discovery on or off
    AutoDiscover(AutoDiscoverArgs),

    /// Add a search path
    AddPath(PathArgs),

    /// Remove a search path
    RemovePath(PathArgs),
}

#[derive(clap::Args, Debug)]
pub struct AutoDiscoverArgs {
    /// true or false
    #[arg(action = clap::ArgAction::Set, value_parser = clap::value_parser!(bool))]
    pub enabled: bool,
}

#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Search path (tilde and relative paths accepted)
    pub path: String,
}

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    let mut service = ProjectService::open()?;

    match cmd {
        ConfigCommands::Show => {
            let discovery = service.discovery_config();
            println!("{}", style("Discovery configuration").bold());
            println!();
            println!(
                "  {:<14} {}",
                style("autoDiscover").dim(),
                discovery.auto_discover
            );
            if discovery.search_paths.is_empty() {
                println!("  {:<14} {}", style("searchPaths").dim(), style("(none)").dim());
            } else {
                for (i, path) in discovery.search_paths.iter().enumerate() {
                    let key = if i == 0 { "searchPaths" } else { "" };
                    println!("  {:<14} {}", style(key).dim(), path);
                }
            }
            Ok(())
        }

        ConfigCommands::Path => {
            let store = service.store();
            println!(
                "  {} {}",
                style("Config:").cyan(),
                store.discovery_config_path().display()
            );
            println!(
                "  {} {}",
                style("Registry:").cyan(),
                store.registry_dir().display()
            );
            Ok(())
        }

        ConfigCommands::AutoDiscover(args) => {
            let mut discovery = service.discovery_config().clone();
            discovery.auto_discover = args.enabled;
            service.set_discovery_config(discovery)?;
            if !global.quiet {
                println!(
                    "{} Auto-discovery {}",
                    style("✓").green(),
                    if args.enabled { "enabled" } else { "disabled" }
                );
            }
            Ok(())
        }

        ConfigCommands::AddPath(args) => {
            let mut discovery = service.discovery_config().clone();
            if discovery.search_paths.contains(&args.path) {
                println!(
                    "{} {} is already a search path",
                    style("!").yellow(),
                    style(&args.path).cyan()
                );
                return Ok(());
            }
            discovery.search_paths.push(args.path.clone());
            service.set_discovery_config(discovery)?;
            if !global.quiet {
                println!(
                    "{} Added search path {}",
                    style("✓").green(),
                    style(&args.path).cyan()
                );
            }
            Ok(())
        }

        ConfigCommands::RemovePath(args) => {
            let mut discovery = service.discovery_config().clone();
            let before = discovery.search_paths.len();
            discovery.search_paths.retain(|p| p != &args.path);
            if discovery.search_paths.len() == before {
                println!(
                    "{} {} is not a configured search path",
                    style("!").yellow(),
                    style(&args.path).cyan()
                );
                return Ok(());
            }
            service.set_discovery_config(discovery)?;
            if !global.quiet {
                println!(
                    "{} Removed search path {}",
                    style("✓").green(),
                    style(&args.path).cyan()
                );
            }
            Ok(())
        }
    }
}
