//! Typed clients for the image and virtual machine registries.

use std::sync::Arc;

use kitsh_proto::image::{
    self, CreateImageRequest, CreateImageResponse, DeleteImageRequest, DeleteImageResponse, Image,
    ImageFormat,
};
use kitsh_proto::vm::{
    self, Architecture, AttachImageRequest, AttachImageResponse, CreateVirtualMachineRequest,
    CreateVirtualMachineResponse, DeleteVirtualMachineRequest, DeleteVirtualMachineResponse,
    DetachImageRequest, DetachImageResponse, GetAttachedImagesRequest, GetAttachedImagesResponse,
    GetVncServersRequest, GetVncServersResponse, IsAliveRequest, IsAliveResponse, PowerAction,
    SendPowerActionRequest, SendPowerActionResponse, VirtualMachine, VncServer,
};
use kitsh_proto::{
    Empty, GetMetadataRequest, GetMetadataResponse, MetadataMap, Reply, ServiceError,
    SetMetadataRequest, SetMetadataResponse, Uuid,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::{Route, RpcChannel};
use crate::transport::TransportError;

/// Failures of a typed registry call.
#[derive(Debug, Error)]
pub(crate) enum CallError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to encode {method} request: {source}")]
    Encode {
        method: &'static str,
        source: serde_json::Error,
    },
    #[error("failed to decode {method} response: {source}")]
    Decode {
        method: &'static str,
        source: serde_json::Error,
    },
    #[error("{0}")]
    Remote(ServiceError),
}

/// Entry point to the kitsune registries over one channel.
#[derive(Clone)]
pub(crate) struct KitsuneClient {
    channel: Arc<dyn RpcChannel>,
}

impl KitsuneClient {
    pub(crate) fn new(channel: Arc<dyn RpcChannel>) -> Self {
        Self { channel }
    }

    pub(crate) fn images(&self) -> ImageRegistry<'_> {
        ImageRegistry {
            channel: self.channel.as_ref(),
        }
    }

    pub(crate) fn machines(&self) -> MachineRegistry<'_> {
        MachineRegistry {
            channel: self.channel.as_ref(),
        }
    }
}

/// Registries that store free-form metadata per resource.
pub(crate) trait MetadataRegistry {
    fn get_metadata(&self, id: Uuid) -> Result<MetadataMap, CallError>;

    fn set_metadata(&self, id: Uuid, meta: MetadataMap) -> Result<(), CallError>;
}

pub(crate) struct ImageRegistry<'a> {
    channel: &'a dyn RpcChannel,
}

impl ImageRegistry<'_> {
    fn route(method: &'static str) -> Route {
        Route::new(image::SERVICE, method)
    }

    pub(crate) fn list(&self) -> Result<Vec<Image>, CallError> {
        stream(self.channel, Self::route("GetImages"), &Empty::default())
    }

    pub(crate) fn create(
        &self,
        format: ImageFormat,
        size: u64,
        data: MetadataMap,
    ) -> Result<Image, CallError> {
        let request = CreateImageRequest {
            format,
            size,
            data: Some(data),
        };
        let route = Self::route("CreateImage");
        let image = unary::<_, CreateImageResponse>(self.channel, route, &request)?;
        required(image, route, "image")
    }

    pub(crate) fn delete(&self, id: Uuid) -> Result<(), CallError> {
        let request = DeleteImageRequest { id: Some(id) };
        unary::<_, DeleteImageResponse>(self.channel, Self::route("DeleteImage"), &request)
            .map(|_| ())
    }
}

impl MetadataRegistry for ImageRegistry<'_> {
    fn get_metadata(&self, id: Uuid) -> Result<MetadataMap, CallError> {
        get_metadata(self.channel, Self::route("GetMetadata"), id)
    }

    fn set_metadata(&self, id: Uuid, meta: MetadataMap) -> Result<(), CallError> {
        set_metadata(self.channel, Self::route("SetMetadata"), id, meta)
    }
}

pub(crate) struct MachineRegistry<'a> {
    channel: &'a dyn RpcChannel,
}

impl MachineRegistry<'_> {
    fn route(method: &'static str) -> Route {
        Route::new(vm::SERVICE, method)
    }

    pub(crate) fn list(&self) -> Result<Vec<VirtualMachine>, CallError> {
        stream(
            self.channel,
            Self::route("GetVirtualMachines"),
            &Empty::default(),
        )
    }

    pub(crate) fn create(
        &self,
        arch: Architecture,
        memory_size: u64,
        data: MetadataMap,
    ) -> Result<VirtualMachine, CallError> {
        let request = CreateVirtualMachineRequest {
            arch,
            memory_size,
            data: Some(data),
        };
        let route = Self::route("CreateVirtualMachine");
        let machine = unary::<_, CreateVirtualMachineResponse>(self.channel, route, &request)?;
        required(machine, route, "machine")
    }

    pub(crate) fn delete(&self, id: Uuid) -> Result<(), CallError> {
        let request = DeleteVirtualMachineRequest { id: Some(id) };
        unary::<_, DeleteVirtualMachineResponse>(
            self.channel,
            Self::route("DeleteVirtualMachine"),
            &request,
        )
        .map(|_| ())
    }

    pub(crate) fn is_alive(&self, id: Uuid) -> Result<bool, CallError> {
        let request = IsAliveRequest { id: Some(id) };
        unary::<_, IsAliveResponse>(self.channel, Self::route("IsAlive"), &request)
    }

    pub(crate) fn attached_images(&self, id: Uuid) -> Result<Vec<Uuid>, CallError> {
        let request = GetAttachedImagesRequest { id: Some(id) };
        unary::<_, GetAttachedImagesResponse>(
            self.channel,
            Self::route("GetAttachedImages"),
            &request,
        )
    }

    pub(crate) fn attach_image(&self, machine: Uuid, image: Uuid) -> Result<(), CallError> {
        let request = AttachImageRequest {
            machine: Some(machine),
            image: Some(image),
        };
        unary::<_, AttachImageResponse>(self.channel, Self::route("AttachImage"), &request)
            .map(|_| ())
    }

    pub(crate) fn detach_image(&self, machine: Uuid, image: Uuid) -> Result<(), CallError> {
        let request = DetachImageRequest {
            machine: Some(machine),
            image: Some(image),
        };
        unary::<_, DetachImageResponse>(self.channel, Self::route("DetachImage"), &request)
            .map(|_| ())
    }

    pub(crate) fn vnc_servers(&self, id: Uuid) -> Result<Vec<VncServer>, CallError> {
        let request = GetVncServersRequest { id: Some(id) };
        unary::<_, GetVncServersResponse>(self.channel, Self::route("GetVNCServers"), &request)
    }

    pub(crate) fn send_power_action(
        &self,
        machine: Uuid,
        action: PowerAction,
    ) -> Result<(), CallError> {
        let request = SendPowerActionRequest {
            machine: Some(machine),
            action,
        };
        unary::<_, SendPowerActionResponse>(
            self.channel,
            Self::route("SendPowerAction"),
            &request,
        )
        .map(|_| ())
    }
}

impl MetadataRegistry for MachineRegistry<'_> {
    fn get_metadata(&self, id: Uuid) -> Result<MetadataMap, CallError> {
        get_metadata(self.channel, Self::route("GetMetadata"), id)
    }

    fn set_metadata(&self, id: Uuid, meta: MetadataMap) -> Result<(), CallError> {
        set_metadata(self.channel, Self::route("SetMetadata"), id, meta)
    }
}

fn get_metadata(channel: &dyn RpcChannel, route: Route, id: Uuid) -> Result<MetadataMap, CallError> {
    let request = GetMetadataRequest { id: Some(id) };
    let meta: Option<MetadataMap> = unary::<_, GetMetadataResponse>(channel, route, &request)?;
    Ok(meta.unwrap_or_default())
}

fn set_metadata(
    channel: &dyn RpcChannel,
    route: Route,
    id: Uuid,
    meta: MetadataMap,
) -> Result<(), CallError> {
    let request = SetMetadataRequest {
        id: Some(id),
        meta: Some(meta),
    };
    unary::<_, SetMetadataResponse>(channel, route, &request).map(|_| ())
}

/// A successful reply that omits the created resource is unreadable.
fn required<T>(payload: Option<T>, route: Route, field: &'static str) -> Result<T, CallError> {
    payload.ok_or_else(|| CallError::Decode {
        method: route.method,
        source: serde::de::Error::missing_field(field),
    })
}

fn unary<Req, Resp>(
    channel: &dyn RpcChannel,
    route: Route,
    request: &Req,
) -> Result<Resp::Payload, CallError>
where
    Req: Serialize,
    Resp: Reply,
{
    let encoded = serde_json::to_value(request).map_err(|source| CallError::Encode {
        method: route.method,
        source,
    })?;
    let response = channel.unary(route, encoded)?;
    let reply: Resp = serde_json::from_value(response).map_err(|source| CallError::Decode {
        method: route.method,
        source,
    })?;
    reply.into_result().map_err(CallError::Remote)
}

fn stream<Req, Item>(
    channel: &dyn RpcChannel,
    route: Route,
    request: &Req,
) -> Result<Vec<Item>, CallError>
where
    Req: Serialize,
    Item: DeserializeOwned,
{
    let encoded = serde_json::to_value(request).map_err(|source| CallError::Encode {
        method: route.method,
        source,
    })?;
    channel
        .server_stream(route, encoded)?
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).map_err(|source| CallError::Decode {
                method: route.method,
                source,
            })
        })
        .collect()
}
