//! ONNX Runtime backend.
//!
//! The Keras digit model is exported to ONNX (`tf2onnx`) and keeps its NHWC
//! input `(N, 28, 28, 1)` and softmax output `(N, 10)`.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Instant,
};

use {
    ndarray::ArrayViewD,
    ort::{
        session::{Session, builder::GraphOptimizationLevel},
        value::Tensor,
    },
    tracing::{debug, info},
};

use {
    digitbot_common::Prediction, digitbot_config::ModelConfig, digitbot_media::ImageTensor,
};

use crate::{
    Classifier,
    error::{Error, Result},
    scores::to_prediction,
};

/// Classifier backed by an ONNX Runtime session.
pub struct OnnxClassifier {
    /// `Session::run` needs `&mut`; the session itself is never reconfigured.
    session: Mutex<Session>,
    path: PathBuf,
    input_name: String,
    output_name: String,
}

impl OnnxClassifier {
    /// Load the model once at startup.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let path = config.path.as_path();
        if !path.is_file() {
            return Err(Error::ModelNotFound {
                path: path.to_path_buf(),
            });
        }

        let mut builder = Session::builder()
            .map_err(|e| load_error(path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_error(path, e))?;
        if config.intra_threads > 0 {
            builder = builder
                .with_intra_threads(config.intra_threads)
                .map_err(|e| load_error(path, e))?;
        }
        let session = builder
            .commit_from_file(path)
            .map_err(|e| load_error(path, e))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.to_string())
            .ok_or_else(|| load_error(path, "model declares no inputs"))?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.to_string())
            .ok_or_else(|| load_error(path, "model declares no outputs"))?;

        info!(
            path = %path.display(),
            input = %input_name,
            output = %output_name,
            "digit model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            path: path.to_path_buf(),
            input_name,
            output_name,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, tensor: &ImageTensor) -> Result<Prediction> {
        let started = Instant::now();
        let input = Tensor::from_array(tensor.as_array().clone()).map_err(Error::inference)?;

        let raw: Vec<f32> = {
            let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
            let outputs = session
                .run(ort::inputs![input])
                .map_err(Error::inference)?;
            let scores: ArrayViewD<f32> = outputs[0]
                .try_extract_array()
                .map_err(Error::inference)?;
            scores.iter().copied().collect()
        };

        let prediction = to_prediction(&raw)?;
        debug!(
            digit = prediction.digit,
            confidence = prediction.confidence,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "inference complete"
        );
        Ok(prediction)
    }

    fn describe(&self) -> String {
        let file = self
            .path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());
        format!("onnx:{file} ({} -> {})", self.input_name, self.output_name)
    }
}

fn load_error(path: &Path, message: impl Display) -> Error {
    Error::Load {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}
