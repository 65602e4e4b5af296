//! Catalog of the remote registries and their invocable methods.
//!
//! Each method is described by a [`MethodDescriptor`] built from its request
//! and response types. The descriptor carries a monomorphised invoker, so a
//! method resolved by name at runtime still decodes into, and out of, the
//! exact message types of the service contract.

use std::any::type_name;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use kitsh_proto::image::{
    CreateImageRequest, CreateImageResponse, DeleteImageRequest, DeleteImageResponse, Image,
};
use kitsh_proto::vm::{
    AttachImageRequest, AttachImageResponse, CreateVirtualMachineRequest,
    CreateVirtualMachineResponse, DeleteVirtualMachineRequest, DeleteVirtualMachineResponse,
    DetachImageRequest, DetachImageResponse, GetAttachedImagesRequest, GetAttachedImagesResponse,
    GetVncServersRequest, GetVncServersResponse, IsAliveRequest, IsAliveResponse,
    SendPowerActionRequest, SendPowerActionResponse, VirtualMachine,
};
use kitsh_proto::{
    Empty, GetMetadataRequest, GetMetadataResponse, Reply, SetMetadataRequest, SetMetadataResponse,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::dispatch::{DispatchError, InvocationResult, invoke_stream, invoke_unary};
use crate::rpc::{Route, RpcChannel};

/// Short names accepted for the remote registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum RegistryAlias {
    Image,
    VirtualMachine,
}

impl RegistryAlias {
    pub(crate) const ALL: [Self; 2] = [Self::Image, Self::VirtualMachine];

    pub(crate) fn parse(alias: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|known| known.as_str() == alias)
    }

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "img",
            Self::VirtualMachine => "vm",
        }
    }

    pub(crate) const fn service(self) -> &'static str {
        match self {
            Self::Image => kitsh_proto::image::SERVICE,
            Self::VirtualMachine => kitsh_proto::vm::SERVICE,
        }
    }
}

impl fmt::Display for RegistryAlias {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// How a method exchanges messages with the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallStyle {
    Unary,
    ServerStream,
}

pub(crate) type Invoker =
    fn(&dyn RpcChannel, Route, &str) -> Result<InvocationResult, DispatchError>;

/// Identity and message shapes of one remote operation.
#[derive(Clone, Copy)]
pub(crate) struct MethodDescriptor {
    pub(crate) registry: RegistryAlias,
    pub(crate) name: &'static str,
    pub(crate) request_shape: &'static str,
    pub(crate) response_shape: &'static str,
    pub(crate) style: CallStyle,
    invoker: Invoker,
}

impl MethodDescriptor {
    /// Describes a method answering with a single `Resp`.
    pub(crate) fn unary<Req, Resp>(registry: RegistryAlias, name: &'static str) -> Self
    where
        Req: DeserializeOwned + Serialize,
        Resp: Reply,
    {
        Self {
            registry,
            name,
            request_shape: shape_of::<Req>(),
            response_shape: shape_of::<Resp>(),
            style: CallStyle::Unary,
            invoker: invoke_unary::<Req, Resp>,
        }
    }

    /// Describes a method answering with a stream of `Item`.
    pub(crate) fn server_stream<Req, Item>(registry: RegistryAlias, name: &'static str) -> Self
    where
        Req: DeserializeOwned + Serialize,
        Item: DeserializeOwned + Serialize,
    {
        Self {
            registry,
            name,
            request_shape: shape_of::<Req>(),
            response_shape: shape_of::<Item>(),
            style: CallStyle::ServerStream,
            invoker: invoke_stream::<Req, Item>,
        }
    }

    pub(crate) const fn route(&self) -> Route {
        Route::new(self.registry.service(), self.name)
    }

    /// Decodes `payload` into the request shape and performs the call.
    pub(crate) fn invoke(
        &self,
        channel: &dyn RpcChannel,
        payload: &str,
    ) -> Result<InvocationResult, DispatchError> {
        tracing::debug!(
            target: "kitsh::dispatch",
            registry = %self.registry,
            method = self.name,
            request = self.request_shape,
            "invoking"
        );
        (self.invoker)(channel, self.route(), payload)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MethodDescriptor")
            .field("registry", &self.registry)
            .field("name", &self.name)
            .field("request_shape", &self.request_shape)
            .field("response_shape", &self.response_shape)
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

pub(crate) fn shape_of<T>() -> &'static str {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Every method exported by the kitsune registries.
pub(crate) fn standard_methods() -> Vec<MethodDescriptor> {
    use RegistryAlias::{Image as Img, VirtualMachine as Vm};

    vec![
        MethodDescriptor::server_stream::<Empty, Image>(Img, "GetImages"),
        MethodDescriptor::unary::<CreateImageRequest, CreateImageResponse>(Img, "CreateImage"),
        MethodDescriptor::unary::<DeleteImageRequest, DeleteImageResponse>(Img, "DeleteImage"),
        MethodDescriptor::unary::<GetMetadataRequest, GetMetadataResponse>(Img, "GetMetadata"),
        MethodDescriptor::unary::<SetMetadataRequest, SetMetadataResponse>(Img, "SetMetadata"),
        MethodDescriptor::server_stream::<Empty, VirtualMachine>(Vm, "GetVirtualMachines"),
        MethodDescriptor::unary::<CreateVirtualMachineRequest, CreateVirtualMachineResponse>(
            Vm,
            "CreateVirtualMachine",
        ),
        MethodDescriptor::unary::<DeleteVirtualMachineRequest, DeleteVirtualMachineResponse>(
            Vm,
            "DeleteVirtualMachine",
        ),
        MethodDescriptor::unary::<IsAliveRequest, IsAliveResponse>(Vm, "IsAlive"),
        MethodDescriptor::unary::<GetAttachedImagesRequest, GetAttachedImagesResponse>(
            Vm,
            "GetAttachedImages",
        ),
        MethodDescriptor::unary::<AttachImageRequest, AttachImageResponse>(Vm, "AttachImage"),
        MethodDescriptor::unary::<DetachImageRequest, DetachImageResponse>(Vm, "DetachImage"),
        MethodDescriptor::unary::<GetVncServersRequest, GetVncServersResponse>(
            Vm,
            "GetVNCServers",
        ),
        MethodDescriptor::unary::<SendPowerActionRequest, SendPowerActionResponse>(
            Vm,
            "SendPowerAction",
        ),
        MethodDescriptor::unary::<GetMetadataRequest, GetMetadataResponse>(Vm, "GetMetadata"),
        MethodDescriptor::unary::<SetMetadataRequest, SetMetadataResponse>(Vm, "SetMetadata"),
    ]
}

/// `alias.Method` names of every standard method, for completion.
pub(crate) fn standard_method_names() -> Vec<String> {
    standard_methods()
        .iter()
        .map(|method| format!("{}.{}", method.registry, method.name))
        .collect()
}

/// Registries bound to one live channel.
pub(crate) struct RegistryCatalog {
    channel: Arc<dyn RpcChannel>,
    registries: BTreeMap<RegistryAlias, BTreeMap<&'static str, MethodDescriptor>>,
}

impl RegistryCatalog {
    /// Builds the catalog of every standard method over `channel`.
    pub(crate) fn connect(channel: Arc<dyn RpcChannel>) -> Self {
        Self::with_methods(channel, standard_methods())
    }

    pub(crate) fn with_methods(
        channel: Arc<dyn RpcChannel>,
        methods: impl IntoIterator<Item = MethodDescriptor>,
    ) -> Self {
        let mut registries: BTreeMap<RegistryAlias, BTreeMap<&'static str, MethodDescriptor>> =
            BTreeMap::new();
        for method in methods {
            registries
                .entry(method.registry)
                .or_default()
                .insert(method.name, method);
        }
        Self {
            channel,
            registries,
        }
    }

    /// Looks up `alias.method`. Method names are case-sensitive.
    pub(crate) fn resolve(
        &self,
        alias: &str,
        method: &str,
    ) -> Result<&MethodDescriptor, DispatchError> {
        let registry = RegistryAlias::parse(alias)
            .ok_or_else(|| DispatchError::UnknownRegistry(alias.to_owned()))?;
        self.registries
            .get(&registry)
            .and_then(|methods| methods.get(method))
            .ok_or_else(|| DispatchError::UnknownMethod {
                registry,
                method: method.to_owned(),
            })
    }

    /// Lists every method as `alias.Method` without invoking anything.
    pub(crate) fn method_names(&self) -> Vec<String> {
        self.registries
            .iter()
            .flat_map(|(alias, methods)| {
                methods.keys().map(move |name| format!("{alias}.{name}"))
            })
            .collect()
    }

    pub(crate) fn channel(&self) -> &dyn RpcChannel {
        self.channel.as_ref()
    }
}
