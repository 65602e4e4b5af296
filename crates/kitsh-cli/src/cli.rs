//! Command-line grammar of the shell.
//!
//! Global connection options are split off before these definitions see the
//! arguments; see the `config` module.

use std::iter;

use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::output::OutputFormat;

/// Operator shell for the kitsune virtualisation service.
///
/// Any command of the form `<registry>.<method> [json]` calls the named
/// remote method directly, for example `img.GetImages` or
/// `vm.IsAlive '{"id": {"value": "..."}}'`.
#[derive(Parser, Debug)]
#[command(
    name = "kitsh",
    version,
    disable_help_subcommand = true,
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Controls how results are rendered.
    #[arg(long, value_enum, default_value_t = OutputFormat::Auto, global = true)]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum CliCommand {
    /// Starts an interactive console.
    #[command(visible_aliases = ["c", "interactive", "shell"])]
    Console,
    /// Manages disk images.
    #[command(visible_aliases = ["img", "images", "i"])]
    Image {
        #[command(subcommand)]
        action: ImageAction,
    },
    /// Manages virtual machines.
    #[command(visible_aliases = ["vms", "v"])]
    Vm {
        #[command(subcommand)]
        action: VmAction,
    },
    /// `<registry>.<method> [json]` calls.
    #[command(external_subcommand)]
    Dynamic(Vec<String>),
}

#[derive(Subcommand, Debug)]
pub(crate) enum ImageAction {
    /// Lists every image.
    List,
    /// Creates an image.
    Create {
        /// Image format (raw, qcow2, vdi, vmdk or vhdx).
        #[arg(short, long)]
        format: String,
        /// Image size in bytes.
        #[arg(short, long)]
        size: u64,
        /// Metadata as a JSON object of strings.
        #[arg(long)]
        data: Option<String>,
    },
    /// Deletes an image.
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Shows or changes image metadata.
    Metadata(MetadataArgs),
}

#[derive(Subcommand, Debug)]
pub(crate) enum VmAction {
    /// Lists every virtual machine.
    List,
    /// Creates a virtual machine.
    Create {
        /// CPU architecture (x86_64, aarch64 or riscv64).
        #[arg(long)]
        arch: String,
        /// Memory size in bytes.
        #[arg(long)]
        memory: u64,
        /// Metadata as a JSON object of strings.
        #[arg(long)]
        data: Option<String>,
    },
    /// Deletes a virtual machine.
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Reports whether a virtual machine is running.
    Status {
        #[arg(long)]
        id: String,
    },
    /// Lists the images attached to a virtual machine.
    Images {
        #[arg(long)]
        id: String,
    },
    /// Attaches an image to a virtual machine.
    Attach {
        #[arg(long)]
        id: String,
        #[arg(long)]
        image: String,
    },
    /// Detaches an image from a virtual machine.
    Detach {
        #[arg(long)]
        id: String,
        #[arg(long)]
        image: String,
    },
    /// Sends a power action (start, shutdown, stop, reboot, pause, resume).
    Power {
        #[arg(long)]
        id: String,
        #[arg(long)]
        action: String,
    },
    /// Shows or changes virtual machine metadata.
    Metadata(MetadataArgs),
    /// Serves a browser VNC viewer for a virtual machine.
    Vnc {
        #[arg(long)]
        id: String,
        /// Address the viewer is served on; `:port` means localhost.
        #[arg(long, default_value = ":8080")]
        http_host: String,
    },
}

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub(crate) struct MetadataArgs {
    /// Resource whose metadata is shown.
    #[arg(long)]
    pub(crate) id: Option<String>,
    #[command(subcommand)]
    pub(crate) action: Option<MetadataAction>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum MetadataAction {
    /// Replaces the metadata.
    Set {
        #[arg(long)]
        id: String,
        /// Metadata as a JSON object of strings.
        #[arg(long)]
        data: String,
    },
    /// Removes all metadata.
    Clear {
        #[arg(long)]
        id: String,
    },
}

/// First-word completion candidates: static commands, their aliases and
/// the given `alias.Method` names.
pub(crate) fn completion_candidates(methods: Vec<String>) -> Vec<String> {
    let command = Cli::command();
    let mut names: Vec<String> = command
        .get_subcommands()
        .flat_map(|subcommand| iter::once(subcommand.get_name()).chain(subcommand.get_all_aliases()))
        .map(str::to_owned)
        .collect();
    names.extend(methods);
    names
}
