//! Manage images stored in the service for use within templates.

use std::path::Path;

use serde::Deserialize;

use crate::environment::Environment;
use crate::error::{Error, Operation, Result};
use crate::response::ResponseStatus;

pub(crate) const LIST_IMAGES_PATH: &str = "listImages";
pub(crate) const UPLOAD_IMAGE_PATH: &str = "uploadImage";
pub(crate) const GET_IMAGE_PATH: &str = "getImage";
pub(crate) const DELETE_IMAGE_PATH: &str = "deleteImage";

/// Metadata for one stored image.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetails {
    pub name: String,
    #[serde(default)]
    pub last_modified_millis: Option<i64>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

/// List the stored images.
#[derive(Debug, Clone, Default)]
pub struct ListImagesRequest {
    /// Per-request environment override.
    pub environment: Option<Environment>,
}

/// Upload an image to the store.
#[derive(Debug, Clone, Default)]
pub struct UploadImageRequest {
    pub content: Vec<u8>,
    pub file_name: String,
    /// Stored name override; defaults to `file_name`.
    pub image_name: Option<String>,
    pub environment: Option<Environment>,
}

impl UploadImageRequest {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            content,
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    /// Read the image from a file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, content))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.file_name.trim().is_empty() {
            return Err(Error::Validation {
                operation: Operation::Image,
                message: "no image file name specified".to_string(),
            });
        }
        if self.content.is_empty() {
            return Err(Error::Validation {
                operation: Operation::Image,
                message: "image file content is empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Download one stored image (or a zip of several).
#[derive(Debug, Clone, Default)]
pub struct GetImageRequest {
    /// Names of the images to fetch; at least one is required.
    pub image_names: Vec<String>,
    pub environment: Option<Environment>,
}

impl GetImageRequest {
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            image_names: vec![image_name.into()],
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_names(&self.image_names)
    }

    pub(crate) fn fields(&self) -> Vec<(String, String)> {
        name_fields(&self.image_names)
    }
}

/// Delete one or more stored images.
#[derive(Debug, Clone, Default)]
pub struct DeleteImageRequest {
    pub image_names: Vec<String>,
    pub environment: Option<Environment>,
}

impl DeleteImageRequest {
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            image_names: vec![image_name.into()],
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_names(&self.image_names)
    }

    pub(crate) fn fields(&self) -> Vec<(String, String)> {
        name_fields(&self.image_names)
    }
}

/// Response payload for `listImages`.
#[derive(Debug)]
pub struct ListImagesResponse {
    pub status: ResponseStatus,
    pub images: Vec<ImageDetails>,
}

impl ListImagesResponse {
    pub fn succeeded(&self) -> bool {
        self.status.succeeded()
    }
}

/// Response payload for `uploadImage`.
#[derive(Debug)]
pub struct UploadImageResponse {
    pub status: ResponseStatus,
    pub details: Option<ImageDetails>,
}

impl UploadImageResponse {
    pub fn succeeded(&self) -> bool {
        self.status.succeeded()
    }
}

fn validate_names(names: &[String]) -> Result<()> {
    if names.is_empty() || names.iter().all(|n| n.trim().is_empty()) {
        return Err(Error::Validation {
            operation: Operation::Image,
            message: "at least one image name is required".to_string(),
        });
    }
    Ok(())
}

fn name_fields(names: &[String]) -> Vec<(String, String)> {
    names
        .iter()
        .map(|n| ("imageName".to_string(), n.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_details_deserializes() {
        let details: ImageDetails = serde_json::from_str(
            r#"{"name": "logo.png", "lastModifiedMillis": 1561000000000, "sizeBytes": 2048}"#,
        )
        .unwrap();
        assert_eq!(details.name, "logo.png");
        assert_eq!(details.size_bytes, Some(2048));
    }

    #[test]
    fn test_upload_validation() {
        assert!(UploadImageRequest::new("", b"png".to_vec()).validate().is_err());
        assert!(UploadImageRequest::new("logo.png", Vec::new()).validate().is_err());
        assert!(UploadImageRequest::new("logo.png", b"png".to_vec()).validate().is_ok());
    }

    #[test]
    fn test_get_requires_a_name() {
        assert!(GetImageRequest::default().validate().is_err());
        assert!(GetImageRequest::new("logo.png").validate().is_ok());
    }

    #[test]
    fn test_delete_fields_repeat_name() {
        let req = DeleteImageRequest {
            image_names: vec!["a.png".to_string(), "b.png".to_string()],
            ..Default::default()
        };
        assert_eq!(req.fields().len(), 2);
        assert_eq!(req.fields()[1], ("imageName".to_string(), "b.png".to_string()));
    }
}
