//! Dynamic `<registry>.<method> [json]` dispatch.
//!
//! The dispatcher resolves a command name through the [`RegistryCatalog`],
//! decodes the JSON payload into the method's request type, performs the call
//! and re-encodes the typed response as a generic JSON value. Application
//! errors carried inside a successful response are kept apart from transport
//! failures so callers can render and exit differently.

use kitsh_proto::{Reply, ServiceError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::registry::{RegistryAlias, RegistryCatalog, shape_of};
use crate::rpc::{Route, RpcChannel};
use crate::transport::TransportError;

const EMPTY_PAYLOAD: &str = "{}";

/// Outcome of a call that reached the service.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InvocationResult {
    /// The decoded response with its error union stripped.
    Success(Value),
    /// An error reported by the service itself.
    Remote(ServiceError),
}

/// Failures that stop a dynamic command before it produces a result.
#[derive(Debug, Error)]
pub(crate) enum DispatchError {
    #[error("invalid syntax: expected <registry>.<method> [json], got '{0}'")]
    Syntax(String),
    #[error("unknown registry '{0}'; expected img or vm")]
    UnknownRegistry(String),
    #[error("unknown method '{method}' for the {registry} registry")]
    UnknownMethod {
        registry: RegistryAlias,
        method: String,
    },
    #[error("invalid {shape} payload: {source}")]
    MalformedPayload {
        shape: &'static str,
        source: serde_json::Error,
    },
    #[error("failed to decode {shape} response: {source}")]
    UnreadableResponse {
        shape: &'static str,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl DispatchError {
    /// Process exit status for this failure.
    pub(crate) const fn exit_status(&self) -> u8 {
        match self {
            Self::Transport(_) | Self::UnreadableResponse { .. } => 3,
            Self::Syntax(_)
            | Self::UnknownRegistry(_)
            | Self::UnknownMethod { .. }
            | Self::MalformedPayload { .. } => 1,
        }
    }
}

/// A command name and its optional JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawCommand {
    pub(crate) registry: String,
    pub(crate) method: String,
    pub(crate) payload: Option<String>,
}

impl RawCommand {
    /// Splits `tokens` into `<registry>.<method>` and a payload.
    ///
    /// Tokens after the command name are joined with single spaces. The
    /// console hands over the rest of its line as one token, so this only
    /// matters for one-shot invocations where the shell split the payload.
    pub(crate) fn from_tokens(tokens: &[String]) -> Result<Self, DispatchError> {
        let (command, rest) = tokens
            .split_first()
            .ok_or_else(|| DispatchError::Syntax(String::new()))?;
        let (registry, method) = command
            .split_once('.')
            .filter(|(registry, method)| !registry.is_empty() && !method.is_empty())
            .ok_or_else(|| DispatchError::Syntax(command.clone()))?;
        let payload = (!rest.is_empty()).then(|| rest.join(" "));
        Ok(Self {
            registry: registry.to_owned(),
            method: method.to_owned(),
            payload,
        })
    }
}

/// Resolves and invokes a parsed dynamic command.
pub(crate) fn dispatch(
    catalog: &RegistryCatalog,
    command: &RawCommand,
) -> Result<InvocationResult, DispatchError> {
    invoke(
        catalog,
        &command.registry,
        &command.method,
        command.payload.as_deref().unwrap_or_default(),
    )
}

/// Resolves `alias.method` and invokes it with `payload`.
///
/// An empty payload is treated as the empty object.
pub(crate) fn invoke(
    catalog: &RegistryCatalog,
    alias: &str,
    method: &str,
    payload: &str,
) -> Result<InvocationResult, DispatchError> {
    let descriptor = catalog.resolve(alias, method)?;
    let payload = if payload.trim().is_empty() {
        EMPTY_PAYLOAD
    } else {
        payload
    };
    descriptor.invoke(catalog.channel(), payload)
}

pub(crate) fn invoke_unary<Req, Resp>(
    channel: &dyn RpcChannel,
    route: Route,
    payload: &str,
) -> Result<InvocationResult, DispatchError>
where
    Req: DeserializeOwned + Serialize,
    Resp: Reply,
{
    let request = decode_request::<Req>(payload)?;
    let response = channel.unary(route, request)?;
    let reply: Resp =
        serde_json::from_value(response).map_err(|source| DispatchError::UnreadableResponse {
            shape: shape_of::<Resp>(),
            source,
        })?;
    match reply.into_result() {
        Ok(payload) => encode_response::<Resp, _>(&payload).map(InvocationResult::Success),
        Err(error) => Ok(InvocationResult::Remote(error)),
    }
}

pub(crate) fn invoke_stream<Req, Item>(
    channel: &dyn RpcChannel,
    route: Route,
    payload: &str,
) -> Result<InvocationResult, DispatchError>
where
    Req: DeserializeOwned + Serialize,
    Item: DeserializeOwned + Serialize,
{
    let request = decode_request::<Req>(payload)?;
    let items = channel
        .server_stream(route, request)?
        .into_iter()
        .map(serde_json::from_value::<Item>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| DispatchError::UnreadableResponse {
            shape: shape_of::<Item>(),
            source,
        })?;
    encode_response::<Item, _>(&items).map(InvocationResult::Success)
}

/// Decodes into a zero-valued `Req`, then re-encodes the typed value.
fn decode_request<Req>(payload: &str) -> Result<Value, DispatchError>
where
    Req: DeserializeOwned + Serialize,
{
    let malformed = |source| DispatchError::MalformedPayload {
        shape: shape_of::<Req>(),
        source,
    };
    let request: Req = serde_json::from_str(payload).map_err(malformed)?;
    serde_json::to_value(&request).map_err(malformed)
}

fn encode_response<Shape, T: Serialize>(value: &T) -> Result<Value, DispatchError> {
    serde_json::to_value(value).map_err(|source| DispatchError::UnreadableResponse {
        shape: shape_of::<Shape>(),
        source,
    })
}
