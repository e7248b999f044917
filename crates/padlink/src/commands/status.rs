//! Status feed and metrics handlers.

use std::time::Duration;

use futures::StreamExt;
use tabled::Tabled;

use padlink_core::{
    Command as CoreCommand, CommandResult, Controller, LogEntry, LogLevel, MetricsSnapshot,
};

use crate::cli::{GlobalOpts, LevelArg, OutputFormat, StatusArgs, StatusCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&LogEntry> for LogRow {
    fn from(e: &LogEntry) -> Self {
        Self {
            time: e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            level: e.level.to_string(),
            message: e.message.clone(),
        }
    }
}

impl From<LevelArg> for LogLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Info => LogLevel::Info,
            LevelArg::Success => LogLevel::Success,
            LevelArg::Warn => LogLevel::Warn,
            LevelArg::Error => LogLevel::Error,
        }
    }
}

fn metrics_detail(m: &MetricsSnapshot) -> String {
    [
        format!(
            "CPU:       {}",
            m.cpu_percent.map_or_else(|| "-".into(), |v| format!("{v:.1}%"))
        ),
        format!(
            "Memory:    {}",
            m.memory_bytes
                .map_or_else(|| "-".into(), |v| format!("{} MiB", v / (1024 * 1024)))
        ),
        format!(
            "Data rate: {}",
            m.data_rate_bps.map_or_else(|| "-".into(), |v| format!("{v} B/s"))
        ),
        format!(
            "Sampled:   {}",
            m.sampled_at.map_or_else(
                || "never".into(),
                |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
            )
        ),
    ]
    .join("\n")
}

fn print_entry(entry: &LogEntry, global: &GlobalOpts) {
    let format = global.format();
    let out = match format {
        OutputFormat::Table | OutputFormat::Plain => {
            output::log_line(entry, output::should_color(&global.color_mode()))
        }
        // One document per entry so a follower can parse line by line.
        _ => output::render_single(
            &OutputFormat::JsonCompact,
            entry,
            |_| String::new(),
            |_| String::new(),
        ),
    };
    output::print_output(&out, global.quiet);
}

pub async fn handle(
    controller: &Controller,
    args: StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        StatusCommand::Log { lines, level } => {
            let mut entries = controller.tail(lines).await?;
            if let Some(level) = level {
                let wanted = LogLevel::from(level);
                entries.retain(|e| e.level == wanted);
            }
            let out = output::render_list(
                &global.format(),
                &entries,
                |e| LogRow::from(e),
                |e| e.message.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        StatusCommand::Append { level, message } => {
            let result = controller
                .execute(CoreCommand::AppendLog {
                    level: level.into(),
                    message,
                })
                .await?;
            if let CommandResult::Log(entry) = result {
                print_entry(&entry, global);
            }
            Ok(())
        }

        StatusCommand::Metrics => {
            let metrics = controller.metrics();
            let out = output::render_single(&global.format(), &metrics, metrics_detail, |m| {
                m.cpu_percent.map(|v| format!("{v:.1}")).unwrap_or_default()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        StatusCommand::Follow { count, timeout } => {
            let mut events = controller.log_events();
            let limit = count.unwrap_or(usize::MAX);
            let deadline =
                timeout.map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));
            let mut seen = 0;
            while seen < limit {
                let next = async {
                    match deadline {
                        Some(at) => tokio::time::timeout_at(at, events.next()).await.ok().flatten(),
                        None => events.next().await,
                    }
                };
                tokio::select! {
                    entry = next => {
                        let Some(entry) = entry else { break };
                        print_entry(&entry, global);
                        seen += 1;
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            Ok(())
        }
    }
}
