use clap::Parser;

use chorus::cli::args::{Cli, Commands};
use chorus::cli::commands;
use chorus::config::loader::load_config;
use chorus::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.global_opts.verbose);

    // Load configuration (file + defaults)
    let config = load_config(cli.global_opts.config.as_deref())?;
    let format = cli.global_opts.format.clone();

    // Dispatch to subcommand handler; the interactive loop is the default
    match cli.command {
        Some(Commands::Ask(args)) => {
            commands::ask(args, config, format).await?;
        }
        Some(Commands::Providers) => {
            commands::providers(config, format).await?;
        }
        Some(Commands::Init(args)) => {
            commands::init(args).await?;
        }
        Some(Commands::Config(args)) => {
            commands::config(args, config).await?;
        }
        Some(Commands::Repl) | None => {
            commands::repl(config, format).await?;
        }
    }

    Ok(())
}

fn init_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
