//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod settings;
pub mod shell;
pub mod software;
pub mod status;
pub mod util;

use std::path::PathBuf;

use clap::CommandFactory;
use clap_complete::Shell;

use padlink_core::Controller;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

/// Resolved file locations for this invocation.
#[derive(Debug, Clone)]
pub struct Paths {
    pub config: PathBuf,
    pub state: PathBuf,
}

/// Dispatch a command against a running controller.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
    paths: &Paths,
) -> Result<(), CliError> {
    match cmd {
        Command::Software(args) => software::handle(controller, args, global).await,
        Command::Devices(args) => devices::handle(controller, args, global).await,
        Command::Status(args) => status::handle(controller, args, global).await,
        Command::Settings(args) => settings::handle(args, global, &paths.config),
        Command::Config(args) => config_cmd::handle(args, global, &paths.config, &paths.state),
        Command::Completions(args) => {
            completions(args.shell);
            Ok(())
        }
        Command::Shell => Err(CliError::InvalidState {
            message: "a shell session cannot be started from inside another".into(),
        }),
    }
}

/// Write completions for `shell` to stdout.
pub fn completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "padlink", &mut std::io::stdout());
}
