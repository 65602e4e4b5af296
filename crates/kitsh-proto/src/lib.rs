//! Message types for the kitsune registry services.
//!
//! The types mirror the service contract field for field. Every message
//! deserialises with missing fields set to their zero value, so an empty JSON
//! object decodes into the zero-valued message. Responses follow the service's
//! error-union convention: either the payload field or an `error` field is
//! populated, and [`Reply::into_result`] separates the two.

mod common;
pub mod image;
pub mod vm;

pub use common::{
    Empty, GetMetadataRequest, GetMetadataResponse, MetadataMap, Reply, ServiceError,
    SetMetadataRequest, SetMetadataResponse, Uuid, UuidError,
};

/// Protocol package shared by every kitsune service.
pub const PACKAGE: &str = "kitsune.proto.v1";
