use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Message reported to callers for navigation timeouts
pub const NAVIGATION_TIMEOUT_MESSAGE: &str = "Navigation timeout - site took too long to load";

/// Failure raised by the capture pipeline, tagged with the stage that failed
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("URL is required")]
    MissingUrl,

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Page setup failed: {0}")]
    PageSetup(String),

    #[error("Navigation timeout after {0:?}")]
    NavigationTimeout(Duration),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Script evaluation failed: {0}")]
    ScriptFailed(String),

    #[error("Screenshot capture failed: {0}")]
    CaptureFailed(String),
}

impl CaptureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaptureError::MissingUrl | CaptureError::InvalidUrl(_) => ErrorKind::InvalidInput,
            CaptureError::NavigationTimeout(_) => ErrorKind::NavigationTimeout,
            CaptureError::LaunchFailed(_)
            | CaptureError::PageSetup(_)
            | CaptureError::NavigationFailed(_)
            | CaptureError::ScriptFailed(_)
            | CaptureError::CaptureFailed(_) => ErrorKind::Internal,
        }
    }

    /// Whether a caller could reasonably try the same request again
    pub fn is_retryable(&self) -> bool {
        matches!(self, CaptureError::NavigationTimeout(_))
    }
}

/// Outward error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ErrorKind {
    /// Missing or malformed destination, rejected before any browser work
    InvalidInput,
    /// Destination did not reach DOM-parsed state in time
    NavigationTimeout,
    /// Anything else: launch, page setup, capture
    Internal,
}

impl ErrorKind {
    /// HTTP status a transport layer should report for this kind
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::InvalidInput => 400,
            ErrorKind::NavigationTimeout => 408,
            ErrorKind::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NavigationTimeout => "navigation_timeout",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ClassifiedError {
    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    /// Classify an error that only exists as text
    ///
    /// Used for failures that come from outside the pipeline; pipeline
    /// errors are classified by variant via [`classify`].
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.to_lowercase().contains("timeout") {
            Self {
                kind: ErrorKind::NavigationTimeout,
                message: NAVIGATION_TIMEOUT_MESSAGE.to_string(),
            }
        } else if message.contains("Invalid URL") || message.contains("URL is required") {
            Self {
                kind: ErrorKind::InvalidInput,
                message,
            }
        } else {
            Self {
                kind: ErrorKind::Internal,
                message,
            }
        }
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.status_code(), self.message)
    }
}

impl std::error::Error for ClassifiedError {}

pub fn classify(error: &CaptureError) -> ClassifiedError {
    let kind = error.kind();
    let message = match kind {
        ErrorKind::NavigationTimeout => NAVIGATION_TIMEOUT_MESSAGE.to_string(),
        _ => error.to_string(),
    };
    ClassifiedError { kind, message }
}

impl From<CaptureError> for ClassifiedError {
    fn from(error: CaptureError) -> Self {
        classify(&error)
    }
}
