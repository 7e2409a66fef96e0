use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::Serialize,
    tracing::{debug, warn},
};

use digitbot_config::LineConfig;

use crate::{
    error::{Context, Error, Result},
    event::ImageMessage,
};

/// Longest text the platform accepts in one text message, in characters.
pub const MAX_TEXT_CHARS: usize = 5000;

/// Where the bytes of an image message live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Uploaded to the platform; fetched from the data API by message ID.
    Line { message_id: String },
    /// Sent by a provider that hosts the original elsewhere.
    External { url: String },
}

impl ImageSource {
    pub fn from_message(message: &ImageMessage) -> Self {
        match &message.content_provider {
            Some(provider) if provider.provider_type == "external" => {
                match &provider.original_content_url {
                    Some(url) => Self::External { url: url.clone() },
                    None => Self::Line {
                        message_id: message.id.clone(),
                    },
                }
            },
            _ => Self::Line {
                message_id: message.id.clone(),
            },
        }
    }
}

/// Platform operations the webhook pipeline needs.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// Download the raw bytes of an image message.
    async fn get_message_content(&self, source: &ImageSource) -> Result<Vec<u8>>;

    /// Answer an event with a single text message. A reply token can be used
    /// once.
    async fn reply_text(&self, reply_token: &str, text: &str) -> Result<()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [TextMessageBody<'a>; 1],
}

#[derive(Serialize)]
struct TextMessageBody<'a> {
    #[serde(rename = "type")]
    message_type: &'static str,
    text: &'a str,
}

/// HTTP client for the LINE Messaging API.
pub struct LineClient {
    http: reqwest::Client,
    access_token: Secret<String>,
    api_base: String,
    data_api_base: String,
    max_content_bytes: usize,
}

impl LineClient {
    pub fn new(config: &LineConfig) -> Result<Self> {
        let access_token = config
            .channel_access_token
            .clone()
            .filter(|t| !t.expose_secret().is_empty())
            .context("LINE channel access token is not configured")?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("digitbot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            access_token,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            data_api_base: config.data_api_base.trim_end_matches('/').to_string(),
            max_content_bytes: config.max_content_bytes,
        })
    }

    fn content_url(&self, source: &ImageSource) -> String {
        match source {
            ImageSource::Line { message_id } => format!(
                "{}/v2/bot/message/{}/content",
                self.data_api_base,
                urlencoding::encode(message_id)
            ),
            ImageSource::External { url } => url.clone(),
        }
    }

    async fn read_limited(&self, mut resp: reqwest::Response) -> Result<Vec<u8>> {
        let limit = self.max_content_bytes;
        if let Some(len) = resp.content_length()
            && len as usize > limit
        {
            return Err(Error::ContentTooLarge {
                size: len as usize,
                limit,
            });
        }

        let mut data = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            if data.len() + chunk.len() > limit {
                return Err(Error::ContentTooLarge {
                    size: data.len() + chunk.len(),
                    limit,
                });
            }
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }
}

#[async_trait]
impl MessagingApi for LineClient {
    async fn get_message_content(&self, source: &ImageSource) -> Result<Vec<u8>> {
        let url = self.content_url(source);
        let request = match source {
            // Externally hosted content is public and must not see our token.
            ImageSource::External { .. } => self.http.get(&url),
            ImageSource::Line { .. } => self
                .http
                .get(&url)
                .bearer_auth(self.access_token.expose_secret()),
        };

        let resp = request.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                operation: "get content",
                status,
                body,
            });
        }

        let data = self.read_limited(resp).await?;
        debug!(?source, bytes = data.len(), "downloaded message content");
        Ok(data)
    }

    async fn reply_text(&self, reply_token: &str, text: &str) -> Result<()> {
        let text = truncate_chars(text, MAX_TEXT_CHARS);
        let body = ReplyRequest {
            reply_token,
            messages: [TextMessageBody {
                message_type: "text",
                text,
            }],
        };

        let resp = self
            .http
            .post(format!("{}/v2/bot/message/reply", self.api_base))
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, "reply rejected by LINE");
            return Err(Error::Api {
                operation: "reply",
                status,
                body,
            });
        }
        Ok(())
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
