/// Config schema types (server, LINE channel, model, preprocessing, replies).
use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitbotConfig {
    pub server: ServerConfig,
    pub line: LineConfig,
    pub model: ModelConfig,
    pub preprocess: PreprocessConfig,
    pub replies: RepliesConfig,
}

/// Webhook server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "0.0.0.0" so the platform can reach it.
    pub bind: String,
    /// Port to listen on. Defaults to 5000.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 5000,
        }
    }
}

/// LINE Messaging API channel credentials and endpoints.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Long-lived channel access token used as bearer auth.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_redacted"
    )]
    pub channel_access_token: Option<Secret<String>>,

    /// Channel secret used to verify `X-Line-Signature`.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_redacted"
    )]
    pub channel_secret: Option<Secret<String>>,

    /// Base URL of the messaging API (replies).
    pub api_base: String,

    /// Base URL of the data API (message content).
    pub data_api_base: String,

    /// Largest message content accepted for download, in bytes.
    pub max_content_bytes: usize,

    /// Timeout for each platform HTTP request, in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineConfig")
            .field(
                "channel_access_token",
                &self.channel_access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "channel_secret",
                &self.channel_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base", &self.api_base)
            .field("data_api_base", &self.data_api_base)
            .field("max_content_bytes", &self.max_content_bytes)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_access_token: None,
            channel_secret: None,
            api_base: "https://api.line.me".into(),
            data_api_base: "https://api-data.line.me".into(),
            max_content_bytes: 10 * 1024 * 1024,
            timeout_secs: 30,
        }
    }
}

impl LineConfig {
    /// Both credentials are present and non-empty.
    pub fn has_credentials(&self) -> bool {
        let present = |s: &Option<Secret<String>>| {
            s.as_ref()
                .is_some_and(|s| !s.expose_secret().trim().is_empty())
        };
        present(&self.channel_access_token) && present(&self.channel_secret)
    }
}

/// Exported digit model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX model file.
    pub path: PathBuf,
    /// Intra-op threads for the inference runtime. `0` lets the runtime decide.
    pub intra_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/digit_recognizer.onnx"),
            intra_threads: 1,
        }
    }
}

/// Resampling filter used when shrinking images to the model input size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    /// Bicubic.
    #[default]
    CatmullRom,
    Gaussian,
    Lanczos3,
}

/// Image preprocessing options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub filter: ResizeFilter,
    /// Map each normalized pixel `v` to `1 - v` (dark ink on light paper).
    pub invert: bool,
}

/// Reply texts sent back to users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepliesConfig {
    /// Reply to any text message.
    pub text_prompt: String,
    /// Reply with the prediction. `{digit}` and `{confidence}` are substituted.
    pub result: String,
    /// Reply when the image could not be fetched, decoded or classified.
    pub failure: String,
}

impl Default for RepliesConfig {
    fn default() -> Self {
        Self {
            text_prompt: "請傳送一張手寫數字圖片！".into(),
            result: "辨識結果：{digit}".into(),
            failure: "圖片處理失敗，請再試一次。".into(),
        }
    }
}

impl RepliesConfig {
    /// Render the result template for a digit and a whole-percent confidence.
    pub fn render_result(&self, digit: u8, confidence_percent: u32) -> String {
        self.result
            .replace("{digit}", &digit.to_string())
            .replace("{confidence}", &format!("{confidence_percent}%"))
    }
}

fn serialize_redacted<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(_) => serializer.serialize_some("[REDACTED]"),
        None => serializer.serialize_none(),
    }
}
