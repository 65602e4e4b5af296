//! Error types and exit statuses for the shell runtime.

use std::io;
use std::sync::Arc;

use kitsh_config::TargetError;
use kitsh_proto::{ServiceError, UuidError};
use thiserror::Error;

use crate::console::ConsoleError;
use crate::dispatch::DispatchError;
use crate::rpc::CallError;
use crate::telemetry::TelemetryError;
use crate::transport::TransportError;
use crate::vnc::VncError;

/// Exit status for a usage, validation or other local failure.
pub(crate) const EXIT_LOCAL: u8 = 1;
/// Exit status when the service answered with an application error.
pub(crate) const EXIT_REMOTE: u8 = 2;
/// Exit status when the call never completed.
pub(crate) const EXIT_TRANSPORT: u8 = 3;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("argument is not valid UTF-8: {0}")]
    InvalidArgument(String),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("no target configured; pass --target or set KITSUNE_TARGET")]
    MissingTarget,
    #[error(transparent)]
    InvalidTarget(TargetError),
    #[error("console commands cannot be nested")]
    RecursiveConsole,
    #[error(transparent)]
    Console(#[from] ConsoleError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("{0}")]
    Remote(ServiceError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to decode {method} response: {source}")]
    UnreadableResponse {
        method: &'static str,
        source: serde_json::Error,
    },
    #[error("failed to encode {method} request: {source}")]
    EncodeRequest {
        method: &'static str,
        source: serde_json::Error,
    },
    #[error("unknown image format '{given}'; expected one of {expected}")]
    UnknownFormat { given: String, expected: String },
    #[error("unknown architecture '{given}'; expected one of {expected}")]
    UnknownArchitecture { given: String, expected: String },
    #[error("unknown power action '{given}'; expected one of {expected}")]
    UnknownPowerAction { given: String, expected: String },
    #[error("image size must be greater than zero")]
    InvalidImageSize,
    #[error("memory size must be greater than zero")]
    InvalidRamSize,
    #[error(transparent)]
    InvalidId(#[from] UuidError),
    #[error("the --id option is required")]
    MissingId,
    #[error("metadata must be a JSON object of strings: {0}")]
    InvalidMetadata(serde_json::Error),
    #[error("no open websocket found")]
    NoOpenWebSocket,
    #[error(transparent)]
    Vnc(#[from] VncError),
    #[error("failed to write output: {0}")]
    Output(io::Error),
}

impl AppError {
    /// Process exit status for this failure.
    pub(crate) const fn exit_status(&self) -> u8 {
        match self {
            Self::Remote(_) => EXIT_REMOTE,
            Self::Transport(_) | Self::UnreadableResponse { .. } => EXIT_TRANSPORT,
            Self::Dispatch(error) => error.exit_status(),
            _ => EXIT_LOCAL,
        }
    }
}

impl From<CallError> for AppError {
    fn from(error: CallError) -> Self {
        match error {
            CallError::Transport(source) => Self::Transport(source),
            CallError::Encode { method, source } => Self::EncodeRequest { method, source },
            CallError::Decode { method, source } => Self::UnreadableResponse { method, source },
            CallError::Remote(error) => Self::Remote(error),
        }
    }
}

impl From<TargetError> for AppError {
    fn from(error: TargetError) -> Self {
        match error {
            TargetError::Missing => Self::MissingTarget,
            other => Self::InvalidTarget(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_statuses_follow_failure_origin() {
        assert_eq!(AppError::MissingTarget.exit_status(), EXIT_LOCAL);
        assert_eq!(
            AppError::Remote(ServiceError::new("NOT_FOUND", "gone")).exit_status(),
            EXIT_REMOTE
        );
        assert_eq!(
            AppError::Transport(TransportError::Closed).exit_status(),
            EXIT_TRANSPORT
        );
        assert_eq!(
            AppError::Dispatch(DispatchError::UnknownRegistry(String::from("x"))).exit_status(),
            EXIT_LOCAL
        );
        assert_eq!(
            AppError::Dispatch(DispatchError::Transport(TransportError::Closed)).exit_status(),
            EXIT_TRANSPORT
        );
    }

    #[test]
    fn remote_errors_render_type_and_message() {
        let error = AppError::from(CallError::Remote(ServiceError::new("NOT_FOUND", "gone")));
        assert_eq!(error.to_string(), "NOT_FOUND: gone");
    }

    #[test]
    fn missing_target_is_distinguished() {
        assert!(matches!(
            AppError::from(TargetError::Missing),
            AppError::MissingTarget
        ));
        assert!(matches!(
            AppError::from(TargetError::InvalidPort(String::from("h:0"))),
            AppError::InvalidTarget(_)
        ));
    }
}
