/// Why an image message could not be turned into a prediction.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to download image: {0}")]
    Fetch(#[source] digitbot_line::Error),

    #[error("failed to preprocess image: {0}")]
    Preprocess(#[from] digitbot_media::Error),

    #[error("classification failed: {0}")]
    Classify(#[from] digitbot_classifier::Error),

    /// The blocking worker panicked or was cancelled.
    #[error("inference task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
