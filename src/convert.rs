//! Convert a document between formats without a template.

use std::path::Path;

use crate::environment::Environment;
use crate::error::{Error, Operation, Result};

pub(crate) const CONVERT_PATH: &str = "convert";

/// Convert an uploaded document; the `output_name` extension selects the
/// target format.
#[derive(Debug, Clone, Default)]
pub struct ConvertRequest {
    /// Source document content.
    pub content: Vec<u8>,
    /// File name of the source document.
    pub file_name: String,
    /// Name of the converted document; its extension selects the format.
    pub output_name: String,
    pub environment: Option<Environment>,
}

impl ConvertRequest {
    pub fn new(
        file_name: impl Into<String>,
        content: Vec<u8>,
        output_name: impl Into<String>,
    ) -> Self {
        Self {
            content,
            file_name: file_name.into(),
            output_name: output_name.into(),
            ..Self::default()
        }
    }

    /// Read the source document from disk.
    pub fn from_path(path: impl AsRef<Path>, output_name: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, content, output_name))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.file_name.trim().is_empty() {
            return Err(Error::Validation {
                operation: Operation::Convert,
                message: "no source file name specified".to_string(),
            });
        }
        if self.content.is_empty() {
            return Err(Error::Validation {
                operation: Operation::Convert,
                message: "source file content is empty".to_string(),
            });
        }
        if self.output_name.trim().is_empty() {
            return Err(Error::Validation {
                operation: Operation::Convert,
                message: "no output name specified".to_string(),
            });
        }
        Ok(())
    }
}
