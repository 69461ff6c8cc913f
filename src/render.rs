//! Render a stored template into a document.

use reqwest::header::HeaderMap;

use crate::environment::Environment;
use crate::error::{Error, Operation, Result};
use crate::response::ResponseStatus;

pub(crate) const RENDER_PATH: &str = "render";

/// The data payload merged into the template by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderData {
    Json(serde_json::Value),
    Xml(String),
}

impl RenderData {
    fn to_wire(&self) -> String {
        match self {
            RenderData::Json(value) => value.to_string(),
            RenderData::Xml(xml) => xml.clone(),
        }
    }
}

/// Parameters for a render call.
///
/// `template_name` and `output_name` are mandatory; everything else is
/// optional with service-side defaults. The output format is taken from the
/// `output_name` extension unless `output_format` overrides it.
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    /// Name (or path) of the stored template to render.
    pub template_name: String,
    /// Name of the produced document; its extension selects the format.
    pub output_name: String,
    /// Explicit output format, overriding the `output_name` extension.
    pub output_format: Option<String>,
    /// Data merged into the template.
    pub data: Option<RenderData>,
    /// Render in dev mode, producing a document even when the template has
    /// errors.
    pub dev_mode: Option<bool>,
    /// Caller-chosen identifier echoed back in the response.
    pub request_id: Option<String>,
    /// Per-request environment override.
    pub environment: Option<Environment>,
}

impl RenderRequest {
    /// A render request with the mandatory fields set.
    pub fn new(template_name: impl Into<String>, output_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            output_name: output_name.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.template_name.trim().is_empty() {
            return Err(Error::Validation {
                operation: Operation::Render,
                message: "no template name specified".to_string(),
            });
        }
        if self.output_name.trim().is_empty() {
            return Err(Error::Validation {
                operation: Operation::Render,
                message: "no output name specified".to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("templateName".to_string(), self.template_name.clone()),
            ("outputName".to_string(), self.output_name.clone()),
        ];
        if let Some(format) = &self.output_format {
            fields.push(("outputFormat".to_string(), format.clone()));
        }
        if let Some(data) = &self.data {
            fields.push(("data".to_string(), data.to_wire()));
        }
        if let Some(dev_mode) = self.dev_mode {
            fields.push(("devMode".to_string(), dev_mode.to_string()));
        }
        if let Some(request_id) = &self.request_id {
            fields.push(("requestId".to_string(), request_id.clone()));
        }
        fields
    }
}

/// Result of a render call.
#[derive(Debug)]
pub struct RenderResponse {
    pub status: ResponseStatus,
    /// Bytes streamed into the destination on success.
    pub bytes_written: u64,
    /// The request identifier echoed by the server, if one was sent.
    pub request_id: Option<String>,
    /// Number of pages rendered; 0 when the server did not report it.
    pub pages_rendered: u32,
}

impl RenderResponse {
    pub fn succeeded(&self) -> bool {
        self.status.succeeded()
    }

    pub(crate) fn from_document(
        status: ResponseStatus,
        headers: &HeaderMap,
        bytes_written: u64,
    ) -> Self {
        Self {
            status,
            bytes_written,
            request_id: header_str(headers, "requestId"),
            pages_rendered: header_str(headers, "pagesRendered")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        }
    }

    pub(crate) fn from_failure(status: ResponseStatus) -> Self {
        Self {
            status,
            bytes_written: 0,
            request_id: None,
            pages_rendered: 0,
        }
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}
