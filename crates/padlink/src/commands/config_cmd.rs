//! Config subcommand handlers.

use std::path::Path;

use padlink_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Format config for display, with the resolved state file filled in.
fn format_config(cfg: &Config, state_path: &Path) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    let d = &cfg.defaults;

    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "log_capacity = {}", d.log_capacity);
    let _ = writeln!(out, "connect_timeout_ms = {}", d.connect_timeout_ms);
    let _ = writeln!(out, "probe_timeout_ms = {}", d.probe_timeout_ms);
    let _ = writeln!(out, "low_battery_threshold = {}", d.low_battery_threshold);
    let _ = writeln!(out, "output = \"{}\"", d.output);
    let _ = writeln!(out, "color = \"{}\"", d.color);
    let _ = writeln!(out, "state_file = \"{}\"", state_path.display());
    let _ = writeln!(out);
    let _ = writeln!(out, "[app]");
    let _ = writeln!(out, "autostart = {}", cfg.app.autostart);
    let _ = write!(out, "theme = \"{}\"", cfg.app.theme);

    out
}

pub fn handle(
    args: ConfigArgs,
    global: &GlobalOpts,
    config_path: &Path,
    state_path: &Path,
) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let out = match global.format() {
                OutputFormat::Table => format!(
                    "config: {}\nstate:  {}",
                    config_path.display(),
                    state_path.display()
                ),
                _ => config_path.display().to_string(),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config_from(config_path)?;
            let out = output::render_single(
                &global.format(),
                &cfg,
                |c| format_config(c, state_path),
                |_| config_path.display().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            if config_path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: config_path.display().to_string(),
                });
            }
            config::save_config_to(&Config::default(), config_path)?;
            output::notice(
                &format!("Wrote default configuration to {}", config_path.display()),
                global.quiet,
            );
            Ok(())
        }
    }
}
