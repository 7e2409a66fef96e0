//! Webhook payload types.
//!
//! Only the parts the bot acts on are modelled. Unknown event and message
//! types deserialize to `Other` so new platform features never break parsing.

use serde::Deserialize;

/// Body of a webhook request.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Bot user ID that received the events.
    #[serde(default)]
    pub destination: Option<String>,
    /// May be empty: the console's "Verify" button sends no events.
    #[serde(default)]
    pub events: Vec<Event>,
}

impl WebhookPayload {
    pub fn from_slice(body: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    Message(MessageEvent),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    /// Absent for events received in standby mode.
    pub reply_token: Option<String>,
    pub message: Message,
    pub source: Option<Source>,
    /// `active` or `standby`.
    pub mode: Option<String>,
    pub webhook_event_id: Option<String>,
    pub delivery_context: Option<DeliveryContext>,
    pub timestamp: Option<i64>,
}

impl MessageEvent {
    pub fn is_redelivery(&self) -> bool {
        self.delivery_context
            .as_ref()
            .is_some_and(|c| c.is_redelivery)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Text(TextMessage),
    Image(ImageMessage),
    #[serde(other)]
    Other,
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextMessage {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMessage {
    pub id: String,
    pub content_provider: Option<ContentProvider>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentProvider {
    /// `line` or `external`.
    #[serde(rename = "type")]
    pub provider_type: String,
    pub original_content_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// `user`, `group` or `room`.
    #[serde(rename = "type")]
    pub source_type: String,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub room_id: Option<String>,
}

impl Source {
    /// The conversation the event came from.
    pub fn chat_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or(self.room_id.as_deref())
            .or(self.user_id.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryContext {
    #[serde(default)]
    pub is_redelivery: bool,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE_EVENT: &str = r#"{
        "destination": "Uxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
        "events": [{
            "type": "message",
            "message": {
                "type": "image",
                "id": "354718705033693859",
                "quoteToken": "q3Plxr4AgKd...",
                "contentProvider": {"type": "line"},
                "imageSet": {"id": "E005D41A7288F41B6", "index": 1, "total": 2}
            },
            "timestamp": 1627356924513,
            "source": {"type": "user", "userId": "U4af4980629"},
            "webhookEventId": "01FZ74A0TDDPYRVKNK77XKC3ZR",
            "deliveryContext": {"isRedelivery": false},
            "replyToken": "7840b71058e24a5d91f9b5726c7512c9",
            "mode": "active"
        }]
    }"#;

    #[test]
    fn parses_image_message_event() {
        let payload = WebhookPayload::from_slice(IMAGE_EVENT.as_bytes()).unwrap();
        assert_eq!(payload.events.len(), 1);
        let Event::Message(event) = &payload.events[0] else {
            panic!("expected message event");
        };
        assert_eq!(
            event.reply_token.as_deref(),
            Some("7840b71058e24a5d91f9b5726c7512c9")
        );
        assert!(!event.is_redelivery());
        assert_eq!(event.source.as_ref().unwrap().chat_id(), Some("U4af4980629"));
        let Message::Image(image) = &event.message else {
            panic!("expected image message");
        };
        assert_eq!(image.id, "354718705033693859");
        assert_eq!(
            image.content_provider.as_ref().unwrap().provider_type,
            "line"
        );
    }

    #[test]
    fn parses_text_message_event() {
        let body = r#"{"events":[{"type":"message","replyToken":"r","mode":"active",
            "source":{"type":"group","groupId":"C1","userId":"U1"},
            "message":{"type":"text","id":"1","text":"hello"}}]}"#;
        let payload = WebhookPayload::from_slice(body.as_bytes()).unwrap();
        let Event::Message(event) = &payload.events[0] else {
            panic!("expected message event");
        };
        assert_eq!(event.source.as_ref().unwrap().chat_id(), Some("C1"));
        assert!(matches!(&event.message, Message::Text(t) if t.text == "hello"));
    }

    #[test]
    fn unknown_types_are_other() {
        let body = r#"{"events":[
            {"type":"follow","replyToken":"r","source":{"type":"user","userId":"U"}},
            {"type":"message","replyToken":"r","message":{"type":"sticker","id":"2","packageId":"1","stickerId":"1"}}
        ]}"#;
        let payload = WebhookPayload::from_slice(body.as_bytes()).unwrap();
        assert!(matches!(payload.events[0], Event::Other));
        let Event::Message(event) = &payload.events[1] else {
            panic!("expected message event");
        };
        assert_eq!(event.message.kind(), "other");
    }

    #[test]
    fn verification_request_has_no_events() {
        let payload = WebhookPayload::from_slice(br#"{"destination":"U0","events":[]}"#).unwrap();
        assert!(payload.events.is_empty());
    }

    #[test]
    fn standby_event_has_no_reply_token() {
        let body = r#"{"events":[{"type":"message","mode":"standby",
            "message":{"type":"text","id":"1","text":"hi"}}]}"#;
        let payload = WebhookPayload::from_slice(body.as_bytes()).unwrap();
        let Event::Message(event) = &payload.events[0] else {
            panic!("expected message event");
        };
        assert!(event.reply_token.is_none());
        assert_eq!(event.mode.as_deref(), Some("standby"));
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(WebhookPayload::from_slice(b"not json").is_err());
        assert!(WebhookPayload::from_slice(br#"{"events":[{"type":"message"}]}"#).is_err());
    }
}
