use thiserror::Error;

/// Errors raised anywhere in the relay.
///
/// Only [`RelayError::MalformedRequest`] is ever shown to an HTTP client. Once a
/// preview stream has been opened every other variant is logged and the response
/// degrades to default metadata.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The request path does not carry an item identifier
    #[error("Invalid URL format")]
    MalformedRequest,

    /// Every retrieval strategy failed for the target
    #[error("metadata acquisition failed for {0}")]
    Acquisition(String),

    /// The response stream no longer accepts bytes
    #[error("response stream closed by peer")]
    StreamWrite,

    /// The webhook endpoint rejected or never received the notification
    #[error("notification failed: {0}")]
    Notification(String),

    /// The rendering backend could not produce markup
    #[error("render failed: {0}")]
    Render(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
