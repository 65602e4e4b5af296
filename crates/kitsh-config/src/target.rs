use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::defaults::DEFAULT_PORT;

/// Address of the kitsune service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Target {
    host: String,
    port: u16,
}

impl Target {
    /// Builds a target from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or IP literal. IPv6 literals keep their brackets.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host name suitable for TLS server name indication.
    #[must_use]
    pub fn server_name(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    /// TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` form accepted by socket address resolution.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Target {
    type Err = TargetError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TargetError::Missing);
        }
        if trimmed.contains("://") {
            return Err(TargetError::UnexpectedScheme(trimmed.to_owned()));
        }

        let url = Url::parse(&format!("tcp://{trimmed}")).map_err(|source| {
            TargetError::Invalid {
                input: trimmed.to_owned(),
                source,
            }
        })?;
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| TargetError::MissingHost(trimmed.to_owned()))?;
        if !url.path().is_empty() || url.query().is_some() || !url.username().is_empty() {
            return Err(TargetError::UnexpectedComponents(trimmed.to_owned()));
        }
        let port = url.port().unwrap_or(DEFAULT_PORT);
        if port == 0 {
            return Err(TargetError::InvalidPort(trimmed.to_owned()));
        }
        Ok(Self::new(host, port))
    }
}

/// Errors encountered while resolving a [`Target`].
#[derive(Debug, Error)]
pub enum TargetError {
    /// No target was configured.
    #[error("no target configured; pass --target or set KITSUNE_TARGET")]
    Missing,
    /// The value carried a URL scheme.
    #[error("target '{0}' must be host[:port] without a scheme")]
    UnexpectedScheme(String),
    /// The value did not parse as an authority.
    #[error("invalid target '{input}': {source}")]
    Invalid {
        /// Raw input.
        input: String,
        /// Underlying URL parser error.
        #[source]
        source: url::ParseError,
    },
    /// The host component was empty.
    #[error("missing host in target '{0}'")]
    MissingHost(String),
    /// The value carried a path, query, or credentials.
    #[error("target '{0}' must only contain host and port")]
    UnexpectedComponents(String),
    /// Port zero cannot be dialled.
    #[error("invalid port in target '{0}'")]
    InvalidPort(String),
}
