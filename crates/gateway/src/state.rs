use std::sync::Arc;

use secrecy::Secret;

use {
    digitbot_classifier::Classifier,
    digitbot_config::{PreprocessConfig, RepliesConfig},
    digitbot_line::MessagingApi,
};

/// Everything a request handler needs. Built once at startup and shared
/// read-only across requests.
pub struct GatewayState {
    pub version: String,
    /// Key for `X-Line-Signature` verification.
    pub channel_secret: Secret<String>,
    pub messaging: Arc<dyn MessagingApi>,
    pub classifier: Arc<dyn Classifier>,
    pub preprocess: PreprocessConfig,
    pub replies: RepliesConfig,
}

impl GatewayState {
    pub fn new(
        channel_secret: Secret<String>,
        messaging: Arc<dyn MessagingApi>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            channel_secret,
            messaging,
            classifier,
            preprocess: PreprocessConfig::default(),
            replies: RepliesConfig::default(),
        }
    }

    #[must_use]
    pub fn with_preprocess(mut self, preprocess: PreprocessConfig) -> Self {
        self.preprocess = preprocess;
        self
    }

    #[must_use]
    pub fn with_replies(mut self, replies: RepliesConfig) -> Self {
        self.replies = replies;
        self
    }
}
