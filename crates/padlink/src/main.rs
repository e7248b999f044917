mod cli;
mod commands;
mod error;
mod output;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use padlink_config::{self as config, Config};
use padlink_core::Controller;

use crate::cli::{Cli, ColorMode, Command, GlobalOpts, OutputFormat};
use crate::commands::Paths;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(mut cli: Cli) -> Result<(), CliError> {
    // Completions never depend on the config file
    if let Command::Completions(args) = &cli.command {
        commands::completions(args.shell);
        return Ok(());
    }

    let config_path = cli.global.config.clone().unwrap_or_else(config::config_path);
    let cfg = match config::load_config_from(&config_path) {
        Ok(cfg) => cfg,
        // `config init --force` must be able to repair a broken file
        Err(e) if matches!(cli.command, Command::Config(_)) => {
            tracing::warn!(error = %e, "ignoring unreadable config");
            Config::default()
        }
        Err(e) => return Err(e.into()),
    };
    apply_config_defaults(&mut cli.global, &cfg);

    let mut manager_config = config::to_manager_config(&cfg);
    if let Some(ref path) = cli.global.state_file {
        manager_config.state_file = Some(path.clone());
    }
    let paths = Paths {
        config: config_path,
        state: manager_config.state_file.clone().unwrap_or_default(),
    };

    let global = &cli.global;
    match cli.command {
        // Settings and config only touch the config file
        Command::Config(args) => {
            commands::config_cmd::handle(args, global, &paths.config, &paths.state)
        }
        Command::Settings(args) => commands::settings::handle(args, global, &paths.config),

        Command::Shell => commands::shell::run(manager_config, global, &paths).await,

        // Everything else runs against a manager for the length of the call
        cmd => {
            tracing::debug!(command = ?cmd, "dispatching command");
            Controller::oneshot(manager_config, |controller| async move {
                Ok(commands::dispatch(cmd, &controller, global, &paths).await)
            })
            .await?
        }
    }
}

/// Fill `--output` / `--color` from the config file when not given.
fn apply_config_defaults(global: &mut GlobalOpts, cfg: &Config) {
    if global.output.is_none() {
        global.output = <OutputFormat as ValueEnum>::from_str(&cfg.defaults.output, true).ok();
    }
    if global.color.is_none() {
        global.color = <ColorMode as ValueEnum>::from_str(&cfg.defaults.color, true).ok();
    }
}
