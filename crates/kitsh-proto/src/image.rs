//! Image registry messages.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};

use crate::common::reply;
use crate::{MetadataMap, ServiceError, Uuid};

/// Fully-qualified image registry service name.
pub const SERVICE: &str = "kitsune.proto.v1.ImageRegistryService";

/// On-disk image format.
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
pub enum ImageFormat {
    /// Raw disk image.
    #[default]
    Raw,
    /// QEMU copy-on-write v2.
    Qcow2,
    /// VirtualBox disk image.
    Vdi,
    /// VMware disk image.
    Vmdk,
    /// Hyper-V disk image.
    Vhdx,
}

/// How an image is presented to a guest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    /// Block device.
    #[default]
    Disk,
    /// Optical drive.
    Cdrom,
}

/// A registered disk image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Image {
    /// Image identifier.
    pub id: Option<Uuid>,
    /// Storage format.
    pub format: ImageFormat,
    /// Size in bytes.
    pub size: u64,
    /// Whether guests may write to the image.
    pub read_only: bool,
    /// Presentation to guests.
    pub media_type: MediaType,
    /// Attached metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MetadataMap>,
}

/// Creates a new image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateImageRequest {
    /// Storage format.
    pub format: ImageFormat,
    /// Size in bytes.
    pub size: u64,
    /// Initial metadata.
    pub data: Option<MetadataMap>,
}

/// The created image, or an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateImageResponse {
    /// Created image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    /// Error when creation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

reply!(CreateImageResponse => image: Option<Image>);

/// Deletes an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteImageRequest {
    /// Image identifier.
    pub id: Option<Uuid>,
}

/// Outcome of an image deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteImageResponse {
    /// Error when deletion failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

reply!(DeleteImageResponse);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reply;

    #[test]
    fn empty_object_decodes_to_zero_request() {
        let request: CreateImageRequest = serde_json::from_str("{}").expect("request decodes");
        assert_eq!(request, CreateImageRequest::default());
        assert_eq!(request.format, ImageFormat::Raw);
    }

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("qcow2".parse::<ImageFormat>().ok(), Some(ImageFormat::Qcow2));
        assert!("floppy".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn create_reply_strips_union() {
        let reply: CreateImageResponse =
            serde_json::from_str(r#"{"image":{"size":1024,"format":"VDI"}}"#)
                .expect("reply decodes");
        let image = reply
            .into_result()
            .expect("no error")
            .expect("image present");
        assert_eq!(image.size, 1024);
        assert_eq!(image.format, ImageFormat::Vdi);
    }
}
