//! `digitbot predict`: run local image files through the same preprocessing
//! and model the webhook uses.

use std::path::{Path, PathBuf};

use {anyhow::Result, clap::Args};

use {
    digitbot_classifier::{Classifier, OnnxClassifier},
    digitbot_common::Prediction,
    digitbot_config::PreprocessConfig,
};

use crate::Cli;

#[derive(Args)]
pub struct PredictArgs {
    /// Image files to classify.
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Print one JSON object per image, including all class probabilities.
    #[arg(long)]
    pub json: bool,
}

pub async fn handle_predict(cli: &Cli, args: &PredictArgs) -> Result<()> {
    let config = cli.load_config()?.config;
    let model = config.model.clone();
    let classifier = tokio::task::spawn_blocking(move || OnnxClassifier::load(&model)).await??;

    let mut failures = 0usize;
    for path in &args.images {
        match classify_file(&classifier, path, &config.preprocess) {
            Ok(prediction) if args.json => {
                println!("{}", serde_json::json!({
                    "path": path.display().to_string(),
                    "digit": prediction.digit,
                    "confidence": prediction.confidence,
                    "probabilities": prediction.probabilities,
                }));
            },
            Ok(prediction) => println!("{}", format_line(path, &prediction)),
            Err(e) => {
                failures += 1;
                eprintln!("{}: error: {e:#}", path.display());
            },
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} image(s) failed", args.images.len());
    }
    Ok(())
}

fn classify_file(
    classifier: &dyn Classifier,
    path: &Path,
    options: &PreprocessConfig,
) -> Result<Prediction> {
    let data = std::fs::read(path)?;
    let tensor = digitbot_media::preprocess(&data, options)?;
    Ok(classifier.classify(&tensor)?)
}

fn format_line(path: &Path, prediction: &Prediction) -> String {
    format!(
        "{}: {} ({:.1}%)",
        path.display(),
        prediction.digit,
        prediction.confidence * 100.0
    )
}
