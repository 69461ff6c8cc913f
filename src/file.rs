//! File storage operations: list, store, fetch, delete and rename files
//! held in the service's file store.

use std::path::Path;

use serde::Deserialize;

use crate::environment::Environment;
use crate::error::{Error, Operation, Result};
use crate::response::ResponseStatus;

pub(crate) const LIST_FILES_PATH: &str = "listFiles";
pub(crate) const PUT_FILE_PATH: &str = "putFile";
pub(crate) const GET_FILE_PATH: &str = "getFile";
pub(crate) const DELETE_FILE_PATH: &str = "deleteFile";
pub(crate) const RENAME_FILES_PATH: &str = "renameFiles";

/// Metadata for one stored file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileDetails {
    pub name: String,
    #[serde(default)]
    pub last_modified_millis: Option<i64>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub meta_data: Option<String>,
}

/// List stored files, optionally below a starting folder.
#[derive(Debug, Clone, Default)]
pub struct ListFilesRequest {
    /// Starting folder; all files are listed when unset.
    pub folder: Option<String>,
    /// Include items within sub-folders.
    pub include_sub_folders: bool,
    /// Include per-file metadata in the results.
    pub include_meta_data: bool,
    pub environment: Option<Environment>,
}

impl ListFilesRequest {
    pub(crate) fn fields(&self) -> Vec<(String, String)> {
        let mut fields = Vec::new();
        if let Some(folder) = &self.folder {
            fields.push(("folder".to_string(), folder.clone()));
        }
        if self.include_sub_folders {
            fields.push(("includeSubFolders".to_string(), "true".to_string()));
        }
        if self.include_meta_data {
            fields.push(("includeMetaData".to_string(), "true".to_string()));
        }
        fields
    }
}

/// Store a file.
#[derive(Debug, Clone, Default)]
pub struct PutFileRequest {
    pub content: Vec<u8>,
    /// Name under which the file is stored, folders included.
    pub file_name: String,
    /// Content type recorded with the file.
    pub content_type: Option<String>,
    /// Free-form metadata recorded with the file.
    pub meta_data: Option<String>,
    pub environment: Option<Environment>,
}

impl PutFileRequest {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            content,
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    /// Read the file content from disk, storing it under its own name.
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
                operation: Operation::File,
                message: "no file name specified".to_string(),
            });
        }
        if self.content.is_empty() {
            return Err(Error::Validation {
                operation: Operation::File,
                message: "file content is empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Fetch one stored file.
#[derive(Debug, Clone, Default)]
pub struct GetFileRequest {
    pub file_name: String,
    pub environment: Option<Environment>,
}

impl GetFileRequest {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_path(&self.file_name, "no file name specified")
    }

    pub(crate) fn fields(&self) -> Vec<(String, String)> {
        vec![("fileName".to_string(), self.file_name.clone())]
    }
}

/// Delete a stored file, or a whole folder.
#[derive(Debug, Clone, Default)]
pub struct DeleteFileRequest {
    /// Path of the file or folder to delete.
    pub path: String,
    pub environment: Option<Environment>,
}

impl DeleteFileRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_path(&self.path, "no path specified")
    }

    pub(crate) fn fields(&self) -> Vec<(String, String)> {
        vec![("path".to_string(), self.path.clone())]
    }
}

/// Rename a stored file or folder.
#[derive(Debug, Clone, Default)]
pub struct RenameFilesRequest {
    pub from_path: String,
    pub to_path: String,
    pub environment: Option<Environment>,
}

impl RenameFilesRequest {
    pub fn new(from_path: impl Into<String>, to_path: impl Into<String>) -> Self {
        Self {
            from_path: from_path.into(),
            to_path: to_path.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_path(&self.from_path, "no source path specified")?;
        validate_path(&self.to_path, "no destination path specified")
    }

    pub(crate) fn fields(&self) -> Vec<(String, String)> {
        vec![
            ("fromPath".to_string(), self.from_path.clone()),
            ("toPath".to_string(), self.to_path.clone()),
        ]
    }
}

/// Response payload for `listFiles`.
#[derive(Debug)]
pub struct ListFilesResponse {
    pub status: ResponseStatus,
    pub files: Vec<FileDetails>,
}

impl ListFilesResponse {
    pub fn succeeded(&self) -> bool {
        self.status.succeeded()
    }
}

fn validate_path(path: &str, message: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(Error::Validation {
            operation: Operation::File,
            message: message.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_fields_defaults_to_empty() {
        assert!(ListFilesRequest::default().fields().is_empty());
    }

    #[test]
    fn test_list_fields_with_options() {
        let req = ListFilesRequest {
            folder: Some("invoices".to_string()),
            include_sub_folders: true,
            include_meta_data: true,
            ..Default::default()
        };
        let fields = req.fields();
        assert!(fields.contains(&("folder".to_string(), "invoices".to_string())));
        assert!(fields.contains(&("includeSubFolders".to_string(), "true".to_string())));
        assert!(fields.contains(&("includeMetaData".to_string(), "true".to_string())));
    }

    #[test]
    fn test_put_file_validation() {
        assert!(PutFileRequest::new("", b"pdf".to_vec()).validate().is_err());
        assert!(PutFileRequest::new("a.pdf", Vec::new()).validate().is_err());
        assert!(PutFileRequest::new("a.pdf", b"pdf".to_vec()).validate().is_ok());
    }

    #[test]
    fn test_rename_requires_both_paths() {
        assert!(RenameFilesRequest::new("", "b.pdf").validate().is_err());
        assert!(RenameFilesRequest::new("a.pdf", "").validate().is_err());
        assert!(RenameFilesRequest::new("a.pdf", "b.pdf").validate().is_ok());
    }

    #[test]
    fn test_file_details_with_meta_data() {
        let details: FileDetails = serde_json::from_str(
            r#"{"name": "invoices/inv-1.pdf", "sizeBytes": 9000, "metaData": "customer=17"}"#,
        )
        .unwrap();
        assert_eq!(details.name, "invoices/inv-1.pdf");
        assert_eq!(details.meta_data.as_deref(), Some("customer=17"));
    }
}
