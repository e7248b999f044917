//! Software connection command handlers.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Tabled;

use padlink_core::{
    AddEndpointRequest, Command as CoreCommand, CommandResult, Controller, LogLevel,
    ProbeOutcome, SoftwareEndpoint,
};

use crate::cli::{GlobalOpts, SoftwareArgs, SoftwareCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct EndpointRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Latency")]
    latency: String,
}

fn state_label(e: &SoftwareEndpoint) -> &'static str {
    if e.is_pending() {
        "connecting"
    } else if e.connected {
        "connected"
    } else {
        "disconnected"
    }
}

fn latency_label(e: &SoftwareEndpoint) -> String {
    e.latency_ms.map_or_else(|| "-".into(), |ms| format!("{ms}ms"))
}

impl From<&SoftwareEndpoint> for EndpointRow {
    fn from(e: &SoftwareEndpoint) -> Self {
        Self {
            id: e.id.to_string(),
            name: e.name.clone(),
            address: e.address().to_string(),
            state: state_label(e).into(),
            latency: latency_label(e),
        }
    }
}

fn detail(e: &SoftwareEndpoint) -> String {
    [
        format!("ID:       {}", e.id),
        format!("Name:     {}", e.name),
        format!("Address:  {}", e.address()),
        format!("State:    {}", state_label(e)),
        format!("Latency:  {}", latency_label(e)),
    ]
    .join("\n")
}

fn print_endpoint(endpoint: &SoftwareEndpoint, global: &GlobalOpts) {
    let out = output::render_single(&global.format(), endpoint, detail, |e| e.id.to_string());
    output::print_output(&out, global.quiet);
}

fn expect_endpoint(result: CommandResult) -> Result<SoftwareEndpoint, CliError> {
    match result {
        CommandResult::Endpoint(endpoint) => Ok(endpoint),
        other => Err(CliError::Internal(format!(
            "expected an endpoint, got {other:?}"
        ))),
    }
}

fn spinner(message: String, global: &GlobalOpts) -> Option<ProgressBar> {
    if global.quiet || !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(80));
    Some(pb)
}

/// The reason attached to the newest ERROR entry about `endpoint`.
async fn failure_reason(controller: &Controller, endpoint: &SoftwareEndpoint) -> String {
    let label = endpoint.label();
    controller
        .tail(20)
        .await
        .ok()
        .and_then(|entries| {
            entries
                .into_iter()
                .find(|e| e.level == LogLevel::Error && e.message.starts_with(&label))
        })
        .and_then(|e| {
            e.message
                .rsplit_once("failed: ")
                .map(|(_, reason)| reason.to_owned())
        })
        .unwrap_or_else(|| "connection was not established".into())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: SoftwareArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SoftwareCommand::List => {
            let snap = controller.endpoints_snapshot();
            let endpoints: Vec<SoftwareEndpoint> =
                snap.iter().map(|e| SoftwareEndpoint::clone(e)).collect();
            let out = output::render_list(
                &global.format(),
                &endpoints,
                |e| EndpointRow::from(e),
                |e| e.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SoftwareCommand::Add { name, host, port } => {
            let result = controller
                .execute(CoreCommand::AddEndpoint(AddEndpointRequest { name, host, port }))
                .await?;
            let endpoint = expect_endpoint(result)?;
            print_endpoint(&endpoint, global);
            Ok(())
        }

        SoftwareCommand::Connect { endpoint, no_wait } => {
            let id = util::resolve_endpoint_id(controller, &endpoint)?;
            let result = controller
                .execute(CoreCommand::Connect { id: id.clone() })
                .await?;
            let started = expect_endpoint(result)?;
            if no_wait || !started.is_pending() {
                print_endpoint(&started, global);
                return Ok(());
            }

            let progress = spinner(
                format!("Connecting to {} ({})", started.name, started.address()),
                global,
            );
            let grace = controller.config().connect_timeout + Duration::from_secs(1);
            let settled = controller.await_settled(&id, grace).await;
            if let Some(pb) = progress {
                pb.finish_and_clear();
            }

            let settled = settled?;
            if !settled.connected {
                return Err(CliError::ConnectionFailed {
                    operation: "connect".into(),
                    target: settled.address().to_string(),
                    reason: failure_reason(controller, &settled).await,
                });
            }
            print_endpoint(&settled, global);
            Ok(())
        }

        SoftwareCommand::Disconnect { endpoint } => {
            let id = util::resolve_endpoint_id(controller, &endpoint)?;
            let result = controller.execute(CoreCommand::Disconnect { id }).await?;
            print_endpoint(&expect_endpoint(result)?, global);
            Ok(())
        }

        SoftwareCommand::Test { host, port } => {
            let result = controller
                .execute(CoreCommand::TestConnection { host, port })
                .await?;
            let (address, outcome) = match result {
                CommandResult::Probe { address, outcome } => (address, outcome),
                other => {
                    return Err(CliError::Internal(format!(
                        "expected a probe result, got {other:?}"
                    )));
                }
            };
            let out = output::render_single(
                &global.format(),
                &outcome,
                |o| match o {
                    ProbeOutcome::Reachable { latency_ms } => {
                        format!("{address} is reachable ({latency_ms}ms)")
                    }
                    ProbeOutcome::Unreachable { reason } => {
                        format!("{address} is unreachable: {reason}")
                    }
                },
                |o| if o.is_reachable() { "reachable" } else { "unreachable" }.into(),
            );
            output::print_output(&out, global.quiet);
            match outcome {
                ProbeOutcome::Reachable { .. } => Ok(()),
                ProbeOutcome::Unreachable { reason } => Err(CliError::ConnectionFailed {
                    operation: "test".into(),
                    target: address.to_string(),
                    reason,
                }),
            }
        }

        SoftwareCommand::Remove { endpoint } => {
            let id = util::resolve_endpoint_id(controller, &endpoint)?;
            if !util::confirm(&format!("Remove software endpoint {endpoint}?"), global.yes)? {
                return Ok(());
            }
            let result = controller.execute(CoreCommand::RemoveEndpoint { id }).await?;
            let removed = expect_endpoint(result)?;
            output::notice(&format!("Removed {}", removed.label()), global.quiet);
            Ok(())
        }
    }
}
