use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("model file not found: {}", path.display())]
    ModelNotFound { path: PathBuf },

    #[error("failed to load model {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    #[error("inference failed: {message}")]
    Inference { message: String },

    #[error("unexpected model output: {message}")]
    Output { message: String },
}

impl Error {
    #[must_use]
    pub fn inference(message: impl std::fmt::Display) -> Self {
        Self::Inference {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn output(message: impl std::fmt::Display) -> Self {
        Self::Output {
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
