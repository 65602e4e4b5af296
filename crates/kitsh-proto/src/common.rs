use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Response messages that may carry an application-level error.
///
/// The service reports failures inside otherwise successful calls. A reply
/// resolves to either its payload or the embedded [`ServiceError`].
pub trait Reply: DeserializeOwned {
    /// The payload carried when no error is present.
    type Payload: Serialize;

    /// Splits the reply into its payload or the embedded error.
    ///
    /// # Errors
    ///
    /// Returns the embedded [`ServiceError`] when the service reported one.
    fn into_result(self) -> Result<Self::Payload, ServiceError>;
}

/// Declares a reply message whose union is `payload | error`.
macro_rules! reply {
    ($reply:ty => $field:ident: $payload:ty) => {
        impl $crate::Reply for $reply {
            type Payload = $payload;

            fn into_result(self) -> Result<Self::Payload, $crate::ServiceError> {
                match self.error {
                    Some(error) => Err(error),
                    None => Ok(self.$field),
                }
            }
        }
    };
    ($reply:ty) => {
        impl $crate::Reply for $reply {
            type Payload = $crate::Empty;

            fn into_result(self) -> Result<Self::Payload, $crate::ServiceError> {
                match self.error {
                    Some(error) => Err(error),
                    None => Ok($crate::Empty::default()),
                }
            }
        }
    };
}

pub(crate) use reply;

/// Application-level error reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceError {
    /// Error category, for example `NOT_FOUND`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable description.
    pub msg: String,
}

impl ServiceError {
    /// Builds an error from its parts.
    #[must_use]
    pub fn new(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            msg: msg.into(),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.kind, self.msg)
    }
}

/// Message with no fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Resource identifier in canonical hyphenated form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Uuid {
    /// Hyphenated lowercase identifier.
    pub value: String,
}

impl FromStr for Uuid {
    type Err = UuidError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let groups: Vec<&str> = trimmed.split('-').collect();
        let lengths: Vec<usize> = groups.iter().map(|group| group.len()).collect();
        let well_formed = lengths == [8, 4, 4, 4, 12]
            && groups
                .iter()
                .all(|group| group.chars().all(|c| c.is_ascii_hexdigit()));
        if !well_formed {
            return Err(UuidError(trimmed.to_owned()));
        }
        Ok(Self {
            value: trimmed.to_ascii_lowercase(),
        })
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.value)
    }
}

/// Raised when an identifier is not a hyphenated UUID.
#[derive(Debug, Error)]
#[error("invalid UUID '{0}'")]
pub struct UuidError(pub String);

/// Free-form string metadata attached to a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataMap {
    /// Metadata entries.
    pub data: BTreeMap<String, String>,
}

/// Requests the metadata of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetMetadataRequest {
    /// Resource identifier.
    pub id: Option<Uuid>,
}

/// Metadata of a resource, or an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetMetadataResponse {
    /// Metadata when the lookup succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetadataMap>,
    /// Error when the lookup failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

reply!(GetMetadataResponse => meta: Option<MetadataMap>);

/// Replaces the metadata of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetMetadataRequest {
    /// Resource identifier.
    pub id: Option<Uuid>,
    /// New metadata.
    pub meta: Option<MetadataMap>,
}

/// Outcome of a metadata update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetMetadataResponse {
    /// Error when the update failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

reply!(SetMetadataResponse);
