//! Interactive session: one running manager, many commands.
//!
//! Connections made here stay up until the session ends, and the status
//! feed is echoed to stderr as it happens.

use std::io::{IsTerminal, Write};

use clap::Parser;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

use padlink_core::{Controller, ManagerConfig};

use crate::cli::{Command, GlobalOpts, ShellLine};
use crate::error::CliError;
use crate::output;

use super::Paths;

/// Start a manager, run commands from stdin until EOF or `exit`, then shut
/// down and persist.
pub async fn run(
    config: ManagerConfig,
    global: &GlobalOpts,
    paths: &Paths,
) -> Result<(), CliError> {
    let controller = Controller::new(config)?;
    controller.start().await?;
    let result = session(&controller, global, paths).await;
    let saved = controller.shutdown().await;
    result?;
    saved?;
    Ok(())
}

async fn session(
    controller: &Controller,
    global: &GlobalOpts,
    paths: &Paths,
) -> Result<(), CliError> {
    let interactive = std::io::stdin().is_terminal();
    let color = output::should_color(&global.color_mode());

    let mut feed = controller.log_events();
    let quiet = global.quiet;
    let echo = tokio::spawn(async move {
        while let Some(entry) = feed.next().await {
            if !quiet {
                eprintln!("{}", output::log_line(&entry, color));
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if interactive {
            eprint!("padlink> ");
            let _ = std::io::stderr().flush();
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        let words = match split_words(line) {
            Ok(words) => words,
            Err(reason) => {
                eprintln!("error: {reason}");
                continue;
            }
        };
        let parsed = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };
        if matches!(parsed.command, Command::Shell) {
            eprintln!("already in a shell session");
            continue;
        }

        tracing::debug!(command = ?parsed.command, "shell command");
        if let Err(err) = super::dispatch(parsed.command, controller, global, paths).await {
            eprintln!("{:?}", miette::Report::new(err));
        }
    }

    echo.abort();
    Ok(())
}

/// Split a command line into words. Single and double quotes group words,
/// and a backslash escapes the next character outside single quotes.
fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') | (Some('"'), '"') => quote = None,
            (Some('\''), _) => current.push(c),
            (_, '\\') => {
                let escaped = chars.next().ok_or("trailing backslash")?;
                current.push(escaped);
                in_word = true;
            }
            (Some(_), _) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, _) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err("unterminated quote".into());
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
