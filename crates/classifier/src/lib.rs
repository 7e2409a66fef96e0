//! Digit classification.
//!
//! [`Classifier`] is the seam between the webhook pipeline and the inference
//! runtime; [`OnnxClassifier`] runs the exported CNN with ONNX Runtime.

pub mod error;
pub mod onnx;
pub mod scores;

pub use {
    error::{Error, Result},
    onnx::OnnxClassifier,
};

use {digitbot_common::Prediction, digitbot_media::ImageTensor};

/// Maps a preprocessed image to a digit prediction.
///
/// Implementations hold read-only model state and may be shared across
/// requests.
pub trait Classifier: Send + Sync {
    fn classify(&self, tensor: &ImageTensor) -> Result<Prediction>;

    /// Short description for logs and the health endpoint.
    fn describe(&self) -> String;
}
