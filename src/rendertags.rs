//! Fetch render statistics for tagged renders.

use serde::Deserialize;

use crate::environment::Environment;
use crate::error::{Error, Operation, Result};
use crate::response::ResponseStatus;

pub(crate) const GET_RENDER_TAGS_PATH: &str = "getRenderTags";

/// Query render statistics for one or more tags.
///
/// Tags are the values passed as `tags` on earlier render calls; the service
/// aggregates page and document counts per month.
#[derive(Debug, Clone, Default)]
pub struct GetRenderTagsRequest {
    /// Tags to report on; at least one is required.
    pub tags: Vec<String>,
    /// Year of the first period; defaults to the current year.
    pub year: Option<i32>,
    /// Month (1-12) of the first period; defaults to the current month.
    pub month: Option<u32>,
    /// How many months to report, counting backwards.
    pub n_months: Option<u32>,
    pub environment: Option<Environment>,
}

impl GetRenderTagsRequest {
    pub fn new(tags: Vec<String>) -> Self {
        Self {
            tags,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.tags.is_empty() || self.tags.iter().all(|t| t.trim().is_empty()) {
            return Err(Error::Validation {
                operation: Operation::RenderTags,
                message: "at least one tag is required".to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn fields(&self) -> Vec<(String, String)> {
        // Tags travel as a single semicolon-separated field.
        let mut fields = vec![("tags".to_string(), self.tags.join(";"))];
        if let Some(year) = self.year {
            fields.push(("year".to_string(), year.to_string()));
        }
        if let Some(month) = self.month {
            fields.push(("month".to_string(), month.to_string()));
        }
        if let Some(n_months) = self.n_months {
            fields.push(("nMonths".to_string(), n_months.to_string()));
        }
        fields
    }
}

/// Counts for one tag within one period.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenderTagStats {
    pub name: String,
    #[serde(default)]
    pub count_pages: u64,
    #[serde(default)]
    pub count_documents: u64,
}

/// Statistics for one month.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenderTagPeriod {
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub tags: Vec<RenderTagStats>,
}

/// Response payload for `getRenderTags`.
#[derive(Debug)]
pub struct RenderTagsResponse {
    pub status: ResponseStatus,
    pub periods: Vec<RenderTagPeriod>,
}

impl RenderTagsResponse {
    pub fn succeeded(&self) -> bool {
        self.status.succeeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_tags() {
        assert!(GetRenderTagsRequest::default().validate().is_err());
        assert!(GetRenderTagsRequest::new(vec!["invoice".to_string()]).validate().is_ok());
    }

    #[test]
    fn test_tags_join_with_semicolons() {
        let req = GetRenderTagsRequest::new(vec!["invoice".to_string(), "eu".to_string()]);
        assert!(req.fields().contains(&("tags".to_string(), "invoice;eu".to_string())));
    }

    #[test]
    fn test_period_fields_are_optional() {
        let req = GetRenderTagsRequest {
            year: Some(2026),
            month: Some(8),
            n_months: Some(6),
            ..GetRenderTagsRequest::new(vec!["invoice".to_string()])
        };
        let fields = req.fields();
        assert!(fields.contains(&("year".to_string(), "2026".to_string())));
        assert!(fields.contains(&("month".to_string(), "8".to_string())));
        assert!(fields.contains(&("nMonths".to_string(), "6".to_string())));
    }

    #[test]
    fn test_period_deserializes() {
        let period: RenderTagPeriod = serde_json::from_str(
            r#"{
                "year": 2026,
                "month": 7,
                "tags": [{"name": "invoice", "countPages": 120, "countDocuments": 40}]
            }"#,
        )
        .unwrap();
        assert_eq!(period.tags.len(), 1);
        assert_eq!(period.tags[0].count_pages, 120);
    }
}
