/// Result alias that carries the custom [`AttractorError`] type.
pub type Result<T> = std::result::Result<T, AttractorError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum AttractorError {
    /// A play request or configuration value was rejected before any work
    /// was scheduled.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// A collaborator the engine cannot run without was never supplied.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
    /// Free-form message for conditions that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration or recording (de)serialisation failure.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl AttractorError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn invalid<T: Into<String>>(reason: T) -> Self {
        Self::InvalidRequest(reason.into())
    }
}

impl From<&str> for AttractorError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for AttractorError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
