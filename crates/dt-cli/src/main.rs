use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dt_cli::commands::{
    adjust, adjustment, compute, constraints, delete, end, show, start, status,
};
use dt_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = std::io::stdout().lock();
    match command {
        Commands::Start(args) => start::run(&mut stdout, args, &config)?,
        Commands::End(args) => end::run(&mut stdout, args, &config)?,
        Commands::Adjust(args) => adjust::run(&mut stdout, args, &config)?,
        Commands::Compute(args) => compute::run(&mut stdout, args, &config)?,
        Commands::Timeout(args) => compute::timeout(&mut stdout, args, &config)?,
        Commands::Constraints(args) => constraints::run(&mut stdout, args, &config)?,
        Commands::Increase(args) => adjustment::increase(&mut stdout, args, &config)?,
        Commands::Decrease(args) => adjustment::decrease(&mut stdout, args, &config)?,
        Commands::Show(args) => show::run(&mut stdout, args, &config)?,
        Commands::Status => status::run(&mut stdout, &config)?,
        Commands::Delete(args) => delete::run(&mut stdout, args, &config)?,
    }

    Ok(())
}
