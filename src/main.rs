use clap::Parser;
use mdt::cli::{Cli, Commands, GlobalOpts};
use mdt::core::Error;
use tracing_subscriber::EnvFilter;

fn main() {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    // This is standard practice for CLI tools that output to stdout.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }

    let cli = Cli::parse();
    init_tracing(&cli.global);

    // Install miette's fancy error handler for beautiful diagnostics
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }));

    let code = match run(cli) {
        Ok(()) => 0,
        Err(Error::Cancelled) => {
            eprintln!("Aborted.");
            Error::Cancelled.exit_code()
        }
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<(), Error> {
    let global = cli.global.clone();

    match cli.command {
        Commands::Create(args) => mdt::cli::commands::create::run(args, &global),
        Commands::List(args) => mdt::cli::commands::list::run(args, &global),
        Commands::Show(args) => mdt::cli::commands::show::run(args, &global),
        Commands::Update(args) => mdt::cli::commands::update::run(args, &global),
        Commands::Remove(args) => mdt::cli::commands::remove::run(args, &global),
        Commands::Enable(args) => mdt::cli::commands::active::run(args, true, &global),
        Commands::Disable(args) => mdt::cli::commands::active::run(args, false, &global),
        Commands::Discover(args) => mdt::cli::commands::discover::run(args, &global),
        Commands::Config(cmd) => mdt::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => mdt::cli::commands::completions::run(args),
    }
}

fn init_tracing(global: &GlobalOpts) {
    let default_level = if global.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("MDT_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
