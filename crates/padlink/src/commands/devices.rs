//! Device command handlers.

use tabled::Tabled;

use padlink_core::{
    Command as CoreCommand, CommandResult, Controller, Device, DeviceBackup, DeviceEvent,
    DeviceType, EntityId, PairDeviceRequest,
};

use crate::cli::{DeviceKind, DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    dtype: String,
    #[tabled(rename = "Firmware")]
    firmware: String,
    #[tabled(rename = "Battery")]
    battery: String,
}

fn battery_label(d: &Device) -> String {
    d.battery_percent
        .map_or_else(|| "mains".into(), |p| format!("{p}%"))
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        let name = if d.editing {
            format!("{} (editing)", d.name)
        } else {
            d.name.clone()
        };
        Self {
            id: d.id.to_string(),
            name,
            dtype: d.device_type.to_string(),
            firmware: if d.firmware_version.is_empty() {
                "-".into()
            } else {
                d.firmware_version.clone()
            },
            battery: battery_label(d),
        }
    }
}

fn detail(d: &Device) -> String {
    let mut lines = vec![
        format!("ID:       {}", d.id),
        format!("Name:     {}", d.name),
        format!("Type:     {}", d.device_type),
        format!(
            "Firmware: {}",
            if d.firmware_version.is_empty() {
                "-"
            } else {
                &d.firmware_version
            }
        ),
        format!("Battery:  {}", battery_label(d)),
        format!("Paired:   {}", d.registered_at.format("%Y-%m-%d %H:%M:%S UTC")),
    ];
    if d.editing {
        lines.push("Editing:  yes".into());
    }
    lines.join("\n")
}

fn print_device(device: &Device, global: &GlobalOpts) {
    let out = output::render_single(&global.format(), device, detail, |d| d.id.to_string());
    output::print_output(&out, global.quiet);
}

fn expect_device(result: CommandResult) -> Result<Device, CliError> {
    match result {
        CommandResult::Device(device) => Ok(device),
        other => Err(CliError::Internal(format!("expected a device, got {other:?}"))),
    }
}

impl From<DeviceKind> for DeviceType {
    fn from(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Gamepad => DeviceType::Gamepad,
            DeviceKind::Pedal => DeviceType::Pedal,
            DeviceKind::Keyboard => DeviceType::Keyboard,
            DeviceKind::Mixer => DeviceType::Mixer,
            DeviceKind::Other => DeviceType::Other,
        }
    }
}

fn parse_id(raw: &str) -> Result<EntityId, CliError> {
    raw.parse::<EntityId>().map_err(|e| CliError::Validation {
        field: "id".into(),
        reason: e.to_string(),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    controller: &Controller,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List => {
            let snap = controller.devices_snapshot();
            let devices: Vec<Device> = snap.iter().map(|d| Device::clone(d)).collect();
            let out = output::render_list(
                &global.format(),
                &devices,
                |d| DeviceRow::from(d),
                |d| d.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Show { device } => {
            let id = util::resolve_device_id(controller, &device)?;
            let found = controller
                .devices()
                .find(&id)
                .ok_or_else(|| CliError::not_found("device", &device))?;
            print_device(&found, global);
            Ok(())
        }

        DevicesCommand::Select { device } => {
            // An unknown id is not an error: it clears the selection.
            let id = util::resolve_device_id(controller, &device)
                .or_else(|_| parse_id(&device))?;
            match controller.execute(CoreCommand::SelectDevice { id }).await? {
                CommandResult::Selection(Some(selected)) => print_device(&selected, global),
                CommandResult::Selection(None) => {
                    output::notice("No device selected", global.quiet);
                }
                other => {
                    return Err(CliError::Internal(format!(
                        "expected a selection, got {other:?}"
                    )));
                }
            }
            Ok(())
        }

        DevicesCommand::Edit { device } => {
            let id = util::resolve_device_id(controller, &device)?;
            let result = controller.execute(CoreCommand::BeginRename { id }).await?;
            print_device(&expect_device(result)?, global);
            Ok(())
        }

        DevicesCommand::Rename { device, name } => {
            let id = util::resolve_device_id(controller, &device)?;
            let editing = controller.devices().find(&id).is_some_and(|d| d.editing);
            if !editing {
                controller
                    .execute(CoreCommand::BeginRename { id: id.clone() })
                    .await?;
            }
            let renamed = controller
                .execute(CoreCommand::CommitRename { id: id.clone(), name })
                .await;
            if renamed.is_err() && !editing {
                // Leave things as they were before this command.
                if let Err(e) = controller
                    .execute(CoreCommand::CancelRename { id: id.clone() })
                    .await
                {
                    tracing::warn!(%id, error = %e, "failed to leave rename mode");
                }
            }
            print_device(&expect_device(renamed?)?, global);
            Ok(())
        }

        DevicesCommand::CancelRename { device } => {
            let id = util::resolve_device_id(controller, &device)?;
            let result = controller.execute(CoreCommand::CancelRename { id }).await?;
            print_device(&expect_device(result)?, global);
            Ok(())
        }

        DevicesCommand::Pair {
            id,
            name,
            device_type,
            firmware,
            battery,
        } => {
            let id = id.as_deref().map(parse_id).transpose()?;
            let request = PairDeviceRequest {
                id,
                name,
                device_type: device_type.into(),
                firmware_version: firmware,
                battery_percent: battery,
            };
            let result = controller.execute(CoreCommand::PairDevice(request)).await?;
            print_device(&expect_device(result)?, global);
            Ok(())
        }

        DevicesCommand::Battery { device, percent } => {
            let id = util::resolve_device_id(controller, &device)?;
            let result = controller
                .execute(CoreCommand::DeviceEvent(DeviceEvent::BatteryUpdate { id, percent }))
                .await?;
            print_device(&expect_device(result)?, global);
            Ok(())
        }

        DevicesCommand::Firmware { device, version } => {
            let id = util::resolve_device_id(controller, &device)?;
            let result = controller
                .execute(CoreCommand::DeviceEvent(DeviceEvent::FirmwareUpdate { id, version }))
                .await?;
            print_device(&expect_device(result)?, global);
            Ok(())
        }

        DevicesCommand::Unregister { device } => {
            let id = util::resolve_device_id(controller, &device)?;
            if !util::confirm(&format!("Unregister device {device}?"), global.yes)? {
                return Ok(());
            }
            let result = controller
                .execute(CoreCommand::UnregisterDevice { id })
                .await?;
            let removed = expect_device(result)?;
            output::notice(&format!("{} unregistered", removed.label()), global.quiet);
            Ok(())
        }

        DevicesCommand::Calibrate { device } => {
            let id = util::resolve_device_id(controller, &device)?;
            controller
                .execute(CoreCommand::CalibrateDevice { id })
                .await?;
            output::notice("Calibration complete", global.quiet);
            Ok(())
        }

        DevicesCommand::Backup { device, file } => {
            let id = util::resolve_device_id(controller, &device)?;
            let backup = match controller.execute(CoreCommand::BackupDevice { id }).await? {
                CommandResult::Backup(backup) => backup,
                other => {
                    return Err(CliError::Internal(format!(
                        "expected a backup, got {other:?}"
                    )));
                }
            };
            let json = serde_json::to_string_pretty(&backup)?;
            match file {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    output::notice(
                        &format!("Backup written to {}", path.display()),
                        global.quiet,
                    );
                }
                None => output::print_output(&json, global.quiet),
            }
            Ok(())
        }

        DevicesCommand::Restore { device, file } => {
            let id = util::resolve_device_id(controller, &device)?;
            let backup: DeviceBackup = util::read_json_file(&file)?;
            if !util::confirm(
                &format!("Overwrite the settings of {device} from {}?", file.display()),
                global.yes,
            )? {
                return Ok(());
            }
            controller
                .execute(CoreCommand::RestoreDevice { id, backup })
                .await?;
            output::notice("Restore complete", global.quiet);
            Ok(())
        }
    }
}
