//! Unified error type for all SDK operations.

/// Result alias used throughout the SDK.
pub type Result<T> = std::result::Result<T, Error>;

/// The service operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Render,
    Template,
    Image,
    File,
    Convert,
    RenderTags,
}

impl Operation {
    /// Human-readable operation name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Render => "render",
            Operation::Template => "template",
            Operation::Image => "image",
            Operation::File => "file",
            Operation::Convert => "convert",
            Operation::RenderTags => "render tags",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised by the SDK.
///
/// Business failures reported by the service (a 4xx status or a payload
/// carrying `succeeded: false`) are not errors; they come back as responses
/// with `succeeded() == false`. This type covers everything that prevents a
/// usable response from existing at all.
#[derive(Debug)]
pub enum Error {
    /// No usable environment: missing base URL or a required access key.
    Configuration(String),
    /// A mandatory request field was missing; raised before any network I/O.
    Validation {
        operation: Operation,
        message: String,
    },
    /// Network-level failure that persisted after all retry attempts.
    Transport {
        operation: Operation,
        source: reqwest::Error,
    },
    /// Failure writing a downloaded payload to its destination.
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Configuration(msg) => {
                write!(f, "Environment configuration error: {}", msg)
            }
            Error::Validation { operation, message } => {
                write!(f, "Invalid {} request: {}", operation, message)
            }
            Error::Transport { operation, source } => {
                write!(f, "Network failure during {} request: {}", operation, source)
            }
            Error::Io(err) => {
                write!(f, "Failed to write output: {}", err)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport { source, .. } => Some(source),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
