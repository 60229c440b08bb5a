use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable failure codes surfaced by browser primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidUrl,
    NavigationTimeout,
    NetworkError,
    ElementNotFound,
    ElementNotVisible,
    ElementNotEditable,
    ElementNotClickable,
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidUrl => "INVALID_URL",
            ErrorCode::NavigationTimeout => "NAVIGATION_TIMEOUT",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::ElementNotFound => "ELEMENT_NOT_FOUND",
            ErrorCode::ElementNotVisible => "ELEMENT_NOT_VISIBLE",
            ErrorCode::ElementNotEditable => "ELEMENT_NOT_EDITABLE",
            ErrorCode::ElementNotClickable => "ELEMENT_NOT_CLICKABLE",
            ErrorCode::Internal => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failure of a browser primitive.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
}

impl ToolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    /// True for the element-level failures (missing, hidden, disabled).
    pub fn is_element_failure(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ElementNotFound
                | ErrorCode::ElementNotVisible
                | ErrorCode::ElementNotEditable
                | ErrorCode::ElementNotClickable
        )
    }
}

/// Outcome of a successful navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    pub current_url: String,
    /// HTTP status of the main document when the driver can observe it.
    pub status_code: Option<u16>,
    pub title: Option<String>,
}

/// The narrow browser-control contract the extraction agent depends on.
///
/// One value is one browser session; callers own it exclusively for the
/// duration of a run.
#[async_trait]
pub trait BrowserCapabilities: Send {
    /// Load `url` in the session's page.
    async fn navigate(&mut self, url: &str) -> Result<Navigation, ToolError>;

    /// Click the first element matching `selector`.
    async fn click(&mut self, selector: &str) -> Result<(), ToolError>;

    /// Replace the value of the first element matching `selector`.
    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), ToolError>;

    /// Document markup after script execution.
    async fn rendered_markup(&mut self) -> Result<String, ToolError>;

    /// Release the underlying browser resources.
    async fn close(&mut self) -> Result<(), ToolError> {
        Ok(())
    }
}
