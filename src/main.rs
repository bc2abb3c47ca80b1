//! fxchain CLI - Effect Automation Scheduler
//!
//! Command-line interface for the fxchain scheduling engine.

use clap::Parser;
use env_logger::Env;
use log::debug;

use fxchain::cli::commands::{self, ScheduleArgs};
use fxchain::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    debug!("fxchain v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("fxchain v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Effects => commands::list_effects()?,
        Commands::Scale {
            effect,
            parameter,
            value,
        } => commands::scale(&effect, &parameter, value)?,
        Commands::Validate { score } => commands::validate(&score)?,
        Commands::Schedule {
            score,
            start_measure,
            bypass,
            mute,
            export,
            config,
            graph,
        } => {
            let args = ScheduleArgs {
                start_measure,
                bypass: &bypass,
                mute: &mute,
                export,
                config: config.as_deref(),
                graph,
            };
            commands::schedule(&score, &args)?
        }
    }
    Ok(())
}
