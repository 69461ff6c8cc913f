//! Retry classification for service round trips.

use reqwest::StatusCode;

/// How a completed HTTP round trip is treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    /// Worth another attempt: the server failed, not the request.
    Retryable,
    /// Final, success or not. Client errors (4xx) never improve on retry.
    Terminal,
}

/// Classifies a status: 5xx is retryable, everything else is terminal.
///
/// Network-level failures (no status at all) are handled separately by the
/// retry loop and are always retryable.
pub(crate) fn classify_status(status: StatusCode) -> Disposition {
    if status.is_server_error() {
        Disposition::Retryable
    } else {
        Disposition::Terminal
    }
}

/// Outcome of a single attempt inside the retry loop.
pub(crate) enum AttemptOutcome<T> {
    /// Done, success or failure; return to the caller as-is.
    Terminal(T),
    /// A local (non-network) error that retrying cannot fix, such as a
    /// destination write failure. Propagates immediately.
    Fatal(crate::error::Error),
    /// Try again if attempts remain.
    Retry(RetryCause<T>),
}

/// Why an attempt is being retried. Carried so that after exhaustion the
/// last failed reply can be returned as a value, while a transport failure
/// propagates as an error.
pub(crate) enum RetryCause<T> {
    /// The server answered with a retryable (5xx) status.
    Failed(T),
    /// The request never completed at the network level.
    Transport(reqwest::Error),
}

impl<T> RetryCause<T> {
    pub(crate) fn describe(&self) -> String {
        match self {
            RetryCause::Failed(_) => "server failure".to_string(),
            RetryCause::Transport(err) => format!("transport failure: {}", err),
        }
    }
}
