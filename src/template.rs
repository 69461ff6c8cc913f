//! Manage templates stored in the service: list, upload, download, delete,
//! and inspect structure and sample data.

use std::path::Path;

use serde::Deserialize;

use crate::environment::Environment;
use crate::error::{Error, Operation, Result};
use crate::response::ResponseStatus;

pub(crate) const LIST_TEMPLATES_PATH: &str = "listTemplates";
pub(crate) const UPLOAD_TEMPLATE_PATH: &str = "uploadTemplate";
pub(crate) const GET_TEMPLATE_PATH: &str = "getTemplate";
pub(crate) const DELETE_TEMPLATE_PATH: &str = "deleteTemplate";
pub(crate) const GET_TEMPLATE_DETAILS_PATH: &str = "getTemplateDetails";
pub(crate) const GET_TEMPLATE_STRUCTURE_PATH: &str = "getTemplateStructure";
pub(crate) const GET_SAMPLE_DATA_PATH: &str = "getSampleData";

/// Metadata for one stored template, as reported by the service.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDetails {
    pub name: String,
    #[serde(default)]
    pub last_modified_millis: Option<i64>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "templateDevMode")]
    pub dev_mode: Option<bool>,
    #[serde(default, rename = "templateHasErrors")]
    pub has_errors: Option<bool>,
}

/// List the stored templates.
#[derive(Debug, Clone, Default)]
pub struct ListTemplatesRequest {
    /// Per-request environment override.
    pub environment: Option<Environment>,
}

/// Upload a template file to the store.
#[derive(Debug, Clone, Default)]
pub struct UploadTemplateRequest {
    /// Template file content.
    pub content: Vec<u8>,
    /// File name of the template, also its default stored name.
    pub file_name: String,
    /// Stored name override; defaults to `file_name`.
    pub template_name: Option<String>,
    /// Upload in dev mode so templates with errors are still accepted.
    pub dev_mode: Option<bool>,
    /// Per-request environment override.
    pub environment: Option<Environment>,
}

impl UploadTemplateRequest {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            content,
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    /// Read the template from a file on disk.
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
                operation: Operation::Template,
                message: "no template file name specified".to_string(),
            });
        }
        if self.content.is_empty() {
            return Err(Error::Validation {
                operation: Operation::Template,
                message: "template file content is empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Download one stored template (or a zip of several).
#[derive(Debug, Clone, Default)]
pub struct GetTemplateRequest {
    /// Names of the templates to fetch; at least one is required.
    pub template_names: Vec<String>,
    pub environment: Option<Environment>,
}

impl GetTemplateRequest {
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_names: vec![template_name.into()],
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_names(&self.template_names)
    }

    pub(crate) fn fields(&self) -> Vec<(String, String)> {
        name_fields(&self.template_names)
    }
}

/// Delete one or more stored templates.
#[derive(Debug, Clone, Default)]
pub struct DeleteTemplateRequest {
    /// Names of the templates to delete; at least one is required.
    pub template_names: Vec<String>,
    pub environment: Option<Environment>,
}

impl DeleteTemplateRequest {
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_names: vec![template_name.into()],
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_names(&self.template_names)
    }

    pub(crate) fn fields(&self) -> Vec<(String, String)> {
        name_fields(&self.template_names)
    }
}

/// Fetch the stored metadata of a single template.
#[derive(Debug, Clone, Default)]
pub struct GetTemplateDetailsRequest {
    pub template_name: String,
    pub environment: Option<Environment>,
}

impl GetTemplateDetailsRequest {
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_name(&self.template_name)
    }

    pub(crate) fn fields(&self) -> Vec<(String, String)> {
        vec![("templateName".to_string(), self.template_name.clone())]
    }
}

/// Fetch the field/section structure of a template as JSON.
#[derive(Debug, Clone, Default)]
pub struct GetTemplateStructureRequest {
    pub template_name: String,
    pub environment: Option<Environment>,
}

impl GetTemplateStructureRequest {
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_name(&self.template_name)
    }

    pub(crate) fn fields(&self) -> Vec<(String, String)> {
        vec![("templateName".to_string(), self.template_name.clone())]
    }
}

/// Requested representation of generated sample data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SampleDataFormat {
    #[default]
    Json,
    Xml,
}

/// Generate sample data matching a template's fields.
#[derive(Debug, Clone, Default)]
pub struct GetSampleDataRequest {
    pub template_name: String,
    pub format: SampleDataFormat,
    pub environment: Option<Environment>,
}

impl GetSampleDataRequest {
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_name(&self.template_name)
    }

    pub(crate) fn fields(&self) -> Vec<(String, String)> {
        let format = match self.format {
            SampleDataFormat::Json => "json",
            SampleDataFormat::Xml => "xml",
        };
        vec![
            ("templateName".to_string(), self.template_name.clone()),
            ("format".to_string(), format.to_string()),
        ]
    }
}

/// Sample data in the representation that was requested.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    Json(serde_json::Value),
    Xml(String),
}

/// Response payload for `listTemplates`.
#[derive(Debug)]
pub struct ListTemplatesResponse {
    pub status: ResponseStatus,
    pub templates: Vec<TemplateDetails>,
}

impl ListTemplatesResponse {
    pub fn succeeded(&self) -> bool {
        self.status.succeeded()
    }
}

/// Response payload for `uploadTemplate`.
#[derive(Debug)]
pub struct UploadTemplateResponse {
    pub status: ResponseStatus,
    /// Stored details of the uploaded template, when reported.
    pub details: Option<TemplateDetails>,
}

impl UploadTemplateResponse {
    pub fn succeeded(&self) -> bool {
        self.status.succeeded()
    }
}

/// Response payload for `getTemplateDetails`.
#[derive(Debug)]
pub struct TemplateDetailsResponse {
    pub status: ResponseStatus,
    pub details: Option<TemplateDetails>,
}

impl TemplateDetailsResponse {
    pub fn succeeded(&self) -> bool {
        self.status.succeeded()
    }
}

/// Response payload for `getTemplateStructure`.
#[derive(Debug)]
pub struct TemplateStructureResponse {
    pub status: ResponseStatus,
    pub structure: Option<serde_json::Value>,
}

impl TemplateStructureResponse {
    pub fn succeeded(&self) -> bool {
        self.status.succeeded()
    }
}

/// Response payload for `getSampleData`.
#[derive(Debug)]
pub struct SampleDataResponse {
    pub status: ResponseStatus,
    pub data: Option<SampleData>,
}

impl SampleDataResponse {
    pub fn succeeded(&self) -> bool {
        self.status.succeeded()
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            operation: Operation::Template,
            message: "no template name specified".to_string(),
        });
    }
    Ok(())
}

fn validate_names(names: &[String]) -> Result<()> {
    if names.is_empty() || names.iter().all(|n| n.trim().is_empty()) {
        return Err(Error::Validation {
            operation: Operation::Template,
            message: "at least one template name is required".to_string(),
        });
    }
    Ok(())
}

fn name_fields(names: &[String]) -> Vec<(String, String)> {
    names
        .iter()
        .map(|n| ("templateName".to_string(), n.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_details_deserializes_wire_names() {
        let details: TemplateDetails = serde_json::from_str(
            r#"{
                "name": "welcome.docx",
                "lastModifiedMillis": 1561090800000,
                "sizeBytes": 11223,
                "templateDevMode": false,
                "templateHasErrors": false
            }"#,
        )
        .unwrap();
        assert_eq!(details.name, "welcome.docx");
        assert_eq!(details.last_modified_millis, Some(1561090800000));
        assert_eq!(details.size_bytes, Some(11223));
        assert_eq!(details.dev_mode, Some(false));
    }

    #[test]
    fn test_template_details_tolerates_missing_fields() {
        let details: TemplateDetails =
            serde_json::from_str(r#"{"name": "bare.docx"}"#).unwrap();
        assert_eq!(details.name, "bare.docx");
        assert!(details.size_bytes.is_none());
    }

    #[test]
    fn test_upload_requires_file_name_and_content() {
        let req = UploadTemplateRequest::new("", b"data".to_vec());
        assert!(req.validate().is_err());

        let req = UploadTemplateRequest::new("welcome.docx", Vec::new());
        assert!(req.validate().is_err());

        let req = UploadTemplateRequest::new("welcome.docx", b"data".to_vec());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_upload_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("welcome.docx");
        std::fs::write(&path, b"template bytes").unwrap();

        let req = UploadTemplateRequest::from_path(&path).unwrap();
        assert_eq!(req.file_name, "welcome.docx");
        assert_eq!(req.content, b"template bytes");
    }

    #[test]
    fn test_get_and_delete_require_at_least_one_name() {
        let req = GetTemplateRequest::default();
        assert!(matches!(
            req.validate(),
            Err(Error::Validation {
                operation: Operation::Template,
                ..
            })
        ));

        let req = DeleteTemplateRequest {
            template_names: vec!["  ".to_string()],
            ..Default::default()
        };
        assert!(req.validate().is_err());

        let req = DeleteTemplateRequest::new("old.docx");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_multiple_names_repeat_the_field() {
        let req = GetTemplateRequest {
            template_names: vec!["a.docx".to_string(), "b.docx".to_string()],
            ..Default::default()
        };
        let fields = req.fields();
        assert_eq!(
            fields,
            vec![
                ("templateName".to_string(), "a.docx".to_string()),
                ("templateName".to_string(), "b.docx".to_string()),
            ]
        );
    }

    #[test]
    fn test_sample_data_format_field() {
        let req = GetSampleDataRequest::new("welcome.docx");
        assert!(req.fields().contains(&("format".to_string(), "json".to_string())));

        let req = GetSampleDataRequest {
            format: SampleDataFormat::Xml,
            ..GetSampleDataRequest::new("welcome.docx")
        };
        assert!(req.fields().contains(&("format".to_string(), "xml".to_string())));
    }
}
