//! `vm` subcommands.

use std::io::Write;

use colored::{Color, Colorize};
use kitsh_proto::Uuid;
use kitsh_proto::vm::{Architecture, PowerAction, VirtualMachine, VncServer};
use url::Url;

use super::{HandlerContext, id_cell, metadata, parse_choice, parse_metadata, parse_uuid};
use crate::cli::VmAction;
use crate::output::{
    ResolvedOutputFormat, Table, write_coloured, write_json_lines, write_line, write_table,
};
use crate::rpc::MachineRegistry;
use crate::vnc::{self, AssetServer, VncError};
use crate::{AppError, IoStreams};

const COLUMNS: [&str; 3] = ["ID", "Architecture", "Memory size"];

pub(crate) fn run<W: Write, E: Write>(
    action: VmAction,
    context: &HandlerContext<'_>,
    io: &mut IoStreams<'_, W, E>,
) -> Result<(), AppError> {
    let machines = context.client.machines();
    match action {
        VmAction::List => {
            let listed = machines.list()?;
            render(&listed, context.format, io)
        }
        VmAction::Create { arch, memory, data } => {
            if memory == 0 {
                return Err(AppError::InvalidRamSize);
            }
            let arch: Architecture = parse_choice(&arch, |given, expected| {
                AppError::UnknownArchitecture { given, expected }
            })?;
            let data = parse_metadata(data.as_deref())?;
            let created = machines.create(arch, memory, data)?;
            render(&[created], context.format, io)
        }
        VmAction::Delete { id } => {
            let id = parse_uuid(&id)?;
            Ok(machines.delete(id)?)
        }
        VmAction::Status { id } => {
            let alive = machines.is_alive(parse_uuid(&id)?)?;
            status(alive, context.format, io)
        }
        VmAction::Images { id } => {
            let attached = machines.attached_images(parse_uuid(&id)?)?;
            match context.format {
                ResolvedOutputFormat::Json => attached
                    .iter()
                    .try_for_each(|image| write_line(io, image)),
                ResolvedOutputFormat::Human => {
                    let mut table = Table::new(&["Image ID"]);
                    for image in &attached {
                        table.push_row(vec![image.to_string()]);
                    }
                    write_table(io, &table)
                }
            }
        }
        VmAction::Attach { id, image } => {
            let (machine, image) = (parse_uuid(&id)?, parse_uuid(&image)?);
            Ok(machines.attach_image(machine, image)?)
        }
        VmAction::Detach { id, image } => {
            let (machine, image) = (parse_uuid(&id)?, parse_uuid(&image)?);
            Ok(machines.detach_image(machine, image)?)
        }
        VmAction::Power { id, action } => {
            let machine = parse_uuid(&id)?;
            let action: PowerAction = parse_choice(&action, |given, expected| {
                AppError::UnknownPowerAction { given, expected }
            })?;
            Ok(machines.send_power_action(machine, action)?)
        }
        VmAction::Metadata(args) => metadata::run(&machines, args, context.format, io),
        VmAction::Vnc { id, http_host } => {
            let id = parse_uuid(&id)?;
            viewer(&machines, id, &http_host, context, io)
        }
    }
}

fn render<W: Write, E: Write>(
    machines: &[VirtualMachine],
    format: ResolvedOutputFormat,
    io: &mut IoStreams<'_, W, E>,
) -> Result<(), AppError> {
    match format {
        ResolvedOutputFormat::Json => write_json_lines(io, machines),
        ResolvedOutputFormat::Human => {
            let mut table = Table::new(&COLUMNS);
            for machine in machines {
                table.push_row(vec![
                    id_cell(machine.id.as_ref()),
                    machine.arch.to_string(),
                    machine.memory_size.to_string(),
                ]);
            }
            write_table(io, &table)
        }
    }
}

fn status<W: Write, E: Write>(
    alive: bool,
    format: ResolvedOutputFormat,
    io: &mut IoStreams<'_, W, E>,
) -> Result<(), AppError> {
    if format == ResolvedOutputFormat::Json {
        return write_line(io, alive);
    }
    let (word, colour) = if alive {
        ("Running", Color::Green)
    } else {
        ("Stopped", Color::Red)
    };
    if io.stdout_is_terminal() {
        write_line(io, format_args!("Status: {}", word.color(colour)))
    } else {
        write_line(io, format_args!("Status: {word}"))
    }
}

/// Serves the noVNC viewer for `id` until the stop signal fires.
fn viewer<W: Write, E: Write>(
    machines: &MachineRegistry<'_>,
    id: Uuid,
    http_host: &str,
    context: &HandlerContext<'_>,
    io: &mut IoStreams<'_, W, E>,
) -> Result<(), AppError> {
    let target = context.config.target()?;
    let servers = machines.vnc_servers(id)?;
    let socket = VncServer::find_web_socket(&servers).ok_or(AppError::NoOpenWebSocket)?;
    let http_host = vnc::normalise_http_host(http_host);
    let url = vnc::viewer_url(&http_host, target.host(), socket.port)?;

    let server = AssetServer::start(&http_host, context.config.novnc_dir())?;
    tracing::debug!(
        target: "kitsh::vnc",
        address = %server.local_addr(),
        port = socket.port,
        "viewer started"
    );
    let outcome = announce(&url, context.format, io).and_then(|()| {
        context
            .stop
            .wait()
            .map_err(|error| AppError::Vnc(VncError::Stdin(error)))
    });
    server.shutdown()?;
    outcome
}

fn announce<W: Write, E: Write>(
    url: &Url,
    format: ResolvedOutputFormat,
    io: &mut IoStreams<'_, W, E>,
) -> Result<(), AppError> {
    match format {
        ResolvedOutputFormat::Json => write_line(io, url)?,
        ResolvedOutputFormat::Human => {
            write_coloured(io, &format!("A VNC viewer is running: {url}"), Color::Green)?;
            write_coloured(io, "Press 'Enter' to stop the HTTP server.", Color::Yellow)?;
        }
    }
    io.stdout.flush().map_err(AppError::Output)
}
