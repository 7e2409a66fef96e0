use digitbot_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The platform answered with a non-success status.
    #[error("LINE API {operation} failed ({status}): {body}")]
    Api {
        operation: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("message content too large: {size} bytes (limit {limit})")]
    ContentTooLarge { size: usize, limit: usize },

    #[error("invalid webhook payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

digitbot_common::impl_context!();
