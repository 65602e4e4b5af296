//! Virtual machine registry messages.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};

use crate::common::reply;
use crate::{MetadataMap, ServiceError, Uuid};

/// Fully-qualified virtual machine registry service name.
pub const SERVICE: &str = "kitsune.proto.v1.VirtualMachineRegistryService";

/// Guest CPU architecture.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    VariantNames,
)]
#[strum(ascii_case_insensitive)]
pub enum Architecture {
    /// 64-bit x86.
    #[default]
    #[serde(rename = "X86_64")]
    #[strum(serialize = "X86_64")]
    X86_64,
    /// 64-bit ARM.
    #[serde(rename = "AARCH64")]
    #[strum(serialize = "AARCH64")]
    Aarch64,
    /// 64-bit RISC-V.
    #[serde(rename = "RISCV64")]
    #[strum(serialize = "RISCV64")]
    Riscv64,
}

/// Power state transition requested for a machine.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    VariantNames,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum PowerAction {
    /// Boots the machine.
    #[default]
    Start,
    /// Requests a guest shutdown.
    Shutdown,
    /// Stops the machine immediately.
    Stop,
    /// Restarts the machine.
    Reboot,
    /// Suspends execution.
    Pause,
    /// Resumes a paused machine.
    Resume,
}

/// A registered virtual machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualMachine {
    /// Machine identifier.
    pub id: Option<Uuid>,
    /// Guest architecture.
    pub arch: Architecture,
    /// Guest memory in bytes.
    pub memory_size: u64,
    /// Attached metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MetadataMap>,
}

/// Creates a virtual machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateVirtualMachineRequest {
    /// Guest architecture.
    pub arch: Architecture,
    /// Guest memory in bytes.
    pub memory_size: u64,
    /// Initial metadata.
    pub data: Option<MetadataMap>,
}

/// The created machine, or an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateVirtualMachineResponse {
    /// Created machine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine: Option<VirtualMachine>,
    /// Error when creation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

reply!(CreateVirtualMachineResponse => machine: Option<VirtualMachine>);

/// Deletes a virtual machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteVirtualMachineRequest {
    /// Machine identifier.
    pub id: Option<Uuid>,
}

/// Outcome of a machine deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteVirtualMachineResponse {
    /// Error when deletion failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

reply!(DeleteVirtualMachineResponse);

/// Asks whether a machine is running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsAliveRequest {
    /// Machine identifier.
    pub id: Option<Uuid>,
}

/// Liveness of a machine, or an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsAliveResponse {
    /// Whether the machine is running.
    pub alive: bool,
    /// Error when the lookup failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

reply!(IsAliveResponse => alive: bool);

/// Lists the images attached to a machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetAttachedImagesRequest {
    /// Machine identifier.
    pub id: Option<Uuid>,
}

/// Attached image identifiers, or an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetAttachedImagesResponse {
    /// Attached images.
    pub images: Vec<Uuid>,
    /// Error when the lookup failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

reply!(GetAttachedImagesResponse => images: Vec<Uuid>);

/// Attaches an image to a machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachImageRequest {
    /// Machine identifier.
    pub machine: Option<Uuid>,
    /// Image identifier.
    pub image: Option<Uuid>,
}

/// Outcome of an attach.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachImageResponse {
    /// Error when the attach failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

reply!(AttachImageResponse);

/// Detaches an image from a machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetachImageRequest {
    /// Machine identifier.
    pub machine: Option<Uuid>,
    /// Image identifier.
    pub image: Option<Uuid>,
}

/// Outcome of a detach.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetachImageResponse {
    /// Error when the detach failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

reply!(DetachImageResponse);

/// One listening socket of a VNC server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VncServerSocket {
    /// Listening port.
    pub port: u32,
    /// Whether the socket speaks WebSocket.
    pub is_web_socket: bool,
}

/// A VNC server exported by a machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VncServer {
    /// Listening sockets.
    pub sockets: Vec<VncServerSocket>,
}

impl VncServer {
    /// Finds the first WebSocket-capable socket across `servers`.
    #[must_use]
    pub fn find_web_socket(servers: &[Self]) -> Option<&VncServerSocket> {
        servers
            .iter()
            .flat_map(|server| server.sockets.iter())
            .find(|socket| socket.is_web_socket)
    }
}

/// Lists the VNC servers of a machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetVncServersRequest {
    /// Machine identifier.
    pub id: Option<Uuid>,
}

/// VNC servers, or an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetVncServersResponse {
    /// Exported servers.
    pub servers: Vec<VncServer>,
    /// Error when the lookup failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

reply!(GetVncServersResponse => servers: Vec<VncServer>);

/// Requests a power transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendPowerActionRequest {
    /// Machine identifier.
    pub machine: Option<Uuid>,
    /// Requested transition.
    pub action: PowerAction,
}

/// Outcome of a power transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendPowerActionResponse {
    /// Error when the transition was refused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

reply!(SendPowerActionResponse);
