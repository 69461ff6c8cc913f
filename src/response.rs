//! Common response status shared by every operation.

use reqwest::StatusCode;

/// Terminal outcome of one service call.
///
/// Built exactly once from the final HTTP round trip and immutable after
/// that; retries re-attempt the same pending request rather than producing
/// intermediate states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseStatus {
    http_status: u16,
    short_msg: Option<String>,
    long_msg: Option<String>,
    succeeded: bool,
}

impl ResponseStatus {
    /// A successful outcome with no server diagnostics.
    pub(crate) fn success(status: StatusCode) -> Self {
        Self {
            http_status: status.as_u16(),
            short_msg: None,
            long_msg: None,
            succeeded: true,
        }
    }

    /// Classify a response from its status and (possibly empty) body.
    ///
    /// `succeeded` is true iff the status is 2xx and the body does not carry
    /// an application-level failure (`"succeeded": false` in a JSON object).
    pub(crate) fn from_body(status: StatusCode, body: &[u8]) -> Self {
        let (short_msg, long_msg, app_failure) = extract_messages(body);
        Self {
            http_status: status.as_u16(),
            short_msg,
            long_msg,
            succeeded: status.is_success() && !app_failure,
        }
    }

    /// The HTTP status code of the final attempt.
    pub fn http_status(&self) -> u16 {
        self.http_status
    }

    /// Short diagnostic message reported by the server, if any.
    pub fn short_msg(&self) -> Option<&str> {
        self.short_msg.as_deref()
    }

    /// Longer diagnostic message reported by the server, if any.
    pub fn long_msg(&self) -> Option<&str> {
        self.long_msg.as_deref()
    }

    /// Whether the operation succeeded.
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }
}

/// Result of an operation that streams a stored artifact to a caller-chosen
/// destination.
#[derive(Debug)]
pub struct DownloadResponse {
    pub status: ResponseStatus,
    /// Bytes streamed into the destination; 0 on failure.
    pub bytes_written: u64,
}

impl DownloadResponse {
    pub fn succeeded(&self) -> bool {
        self.status.succeeded()
    }
}

/// Pull `shortMsg`/`longMsg` out of a JSON error body, falling back to the
/// raw text for non-JSON payloads. The third element reports whether the
/// payload itself declared the operation failed.
fn extract_messages(body: &[u8]) -> (Option<String>, Option<String>, bool) {
    if body.is_empty() {
        return (None, None, false);
    }

    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Some(obj) = value.as_object() {
            let short = obj.get("shortMsg").and_then(|v| v.as_str()).map(String::from);
            let long = obj.get("longMsg").and_then(|v| v.as_str()).map(String::from);
            let app_failure = obj.get("succeeded").and_then(|v| v.as_bool()) == Some(false);
            return (short, long, app_failure);
        }
        return (None, None, false);
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        (None, None, false)
    } else {
        (Some(text), None, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_status() {
        let status = ResponseStatus::success(StatusCode::OK);
        assert!(status.succeeded());
        assert_eq!(status.http_status(), 200);
        assert!(status.short_msg().is_none());
    }

    #[test]
    fn test_from_body_not_found() {
        let status = ResponseStatus::from_body(
            StatusCode::NOT_FOUND,
            br#"{"shortMsg":"not found","longMsg":"template missing.docx is unknown"}"#,
        );
        assert!(!status.succeeded());
        assert_eq!(status.http_status(), 404);
        assert_eq!(status.short_msg(), Some("not found"));
        assert_eq!(status.long_msg(), Some("template missing.docx is unknown"));
    }

    #[test]
    fn test_from_body_application_failure_on_2xx() {
        let status = ResponseStatus::from_body(
            StatusCode::OK,
            br#"{"succeeded":false,"shortMsg":"render failed"}"#,
        );
        assert!(!status.succeeded());
        assert_eq!(status.http_status(), 200);
        assert_eq!(status.short_msg(), Some("render failed"));
    }

    #[test]
    fn test_from_body_2xx_without_failure() {
        let status = ResponseStatus::from_body(StatusCode::OK, br#"{"templateList":[]}"#);
        assert!(status.succeeded());
    }

    #[test]
    fn test_from_body_non_json() {
        let status = ResponseStatus::from_body(StatusCode::BAD_GATEWAY, b"upstream unavailable\n");
        assert!(!status.succeeded());
        assert_eq!(status.short_msg(), Some("upstream unavailable"));
        assert!(status.long_msg().is_none());
    }

    #[test]
    fn test_from_body_empty() {
        let status = ResponseStatus::from_body(StatusCode::INTERNAL_SERVER_ERROR, b"");
        assert!(!status.succeeded());
        assert!(status.short_msg().is_none());
    }
}
