//! Settings view: stored preferences and the version check.

use std::path::Path;

use serde::Serialize;

use padlink_config::{self as config, AppSettings, Theme, VersionStatus};

use crate::cli::{GlobalOpts, SettingsArgs, SettingsCommand, ThemeArg, Toggle};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct SettingsView<'a> {
    version: &'a str,
    #[serde(flatten)]
    app: &'a AppSettings,
}

fn detail(view: &SettingsView<'_>) -> String {
    [
        format!("Version:   {}", view.version),
        format!("Autostart: {}", if view.app.autostart { "on" } else { "off" }),
        format!("Theme:     {}", view.app.theme),
    ]
    .join("\n")
}

impl From<ThemeArg> for Theme {
    fn from(theme: ThemeArg) -> Self {
        match theme {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::System => Theme::System,
        }
    }
}

fn version_detail(status: &VersionStatus) -> String {
    match status {
        VersionStatus::UpToDate { current } => format!("padlink {current} is up to date"),
        VersionStatus::UpdateAvailable { current, latest } => {
            format!("padlink {latest} is available (running {current})")
        }
        VersionStatus::Ahead { current, latest } => {
            format!("padlink {current} is newer than the latest release ({latest})")
        }
    }
}

/// Load, apply `change`, save, and return the new settings.
fn update(path: &Path, change: impl FnOnce(&mut AppSettings)) -> Result<AppSettings, CliError> {
    let mut cfg = config::load_config_from(path)?;
    change(&mut cfg.app);
    config::save_config_to(&cfg, path)?;
    Ok(cfg.app)
}

fn show(app: &AppSettings, global: &GlobalOpts) {
    let view = SettingsView {
        version: env!("CARGO_PKG_VERSION"),
        app,
    };
    let out = output::render_single(&global.format(), &view, detail, |v| v.app.theme.to_string());
    output::print_output(&out, global.quiet);
}

pub fn handle(args: SettingsArgs, global: &GlobalOpts, config_path: &Path) -> Result<(), CliError> {
    match args.command {
        SettingsCommand::Show => {
            let cfg = config::load_config_from(config_path)?;
            show(&cfg.app, global);
            Ok(())
        }

        SettingsCommand::Autostart { state } => {
            let app = update(config_path, |app| app.autostart = state == Toggle::On)?;
            show(&app, global);
            Ok(())
        }

        SettingsCommand::Theme { theme } => {
            let app = update(config_path, |app| app.theme = theme.into())?;
            show(&app, global);
            Ok(())
        }

        SettingsCommand::Version { latest } => {
            let current = env!("CARGO_PKG_VERSION");
            let Some(latest) = latest else {
                output::print_output(&format!("padlink {current}"), global.quiet);
                return Ok(());
            };
            let status = VersionStatus::check(current, &latest)?;
            let out = output::render_single(&global.format(), &status, version_detail, |s| {
                if s.update_available() { latest.clone() } else { current.to_owned() }
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
