//! Integration tests for the webhook endpoint, with the LINE API and the model
//! replaced by in-process fakes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    io::Cursor,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait,
    image::{DynamicImage, GrayImage, ImageFormat, Luma},
    secrecy::Secret,
    tokio::net::TcpListener,
};

use {
    digitbot_classifier::Classifier,
    digitbot_common::{DIGIT_CLASSES, Prediction},
    digitbot_config::RepliesConfig,
    digitbot_gateway::{GatewayState, build_gateway_app},
    digitbot_line::{ImageSource, MessagingApi, signature::compute_signature},
    digitbot_media::ImageTensor,
};

const SECRET: &str = "test-channel-secret";

/// Serves canned image bytes and records every reply.
#[derive(Default)]
struct FakeLine {
    content: Option<Vec<u8>>,
    fetched: Mutex<Vec<ImageSource>>,
    replies: Mutex<Vec<(String, String)>>,
}

impl FakeLine {
    fn replies(&self) -> Vec<(String, String)> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingApi for FakeLine {
    async fn get_message_content(&self, source: &ImageSource) -> digitbot_line::Result<Vec<u8>> {
        self.fetched.lock().unwrap().push(source.clone());
        self.content
            .clone()
            .ok_or_else(|| digitbot_line::Error::message("content unavailable"))
    }

    async fn reply_text(&self, reply_token: &str, text: &str) -> digitbot_line::Result<()> {
        self.replies
            .lock()
            .unwrap()
            .push((reply_token.to_string(), text.to_string()));
        Ok(())
    }
}

/// Always answers `digit` and counts how often it ran.
struct FixedClassifier {
    digit: u8,
    calls: AtomicUsize,
}

impl FixedClassifier {
    fn new(digit: u8) -> Self {
        Self {
            digit,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for FixedClassifier {
    fn classify(&self, tensor: &ImageTensor) -> digitbot_classifier::Result<Prediction> {
        assert_eq!(tensor.shape(), [1, 28, 28, 1]);
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut probabilities = [0.0; DIGIT_CLASSES];
        probabilities[self.digit as usize] = 1.0;
        Ok(Prediction::from_probabilities(probabilities).unwrap())
    }

    fn describe(&self) -> String {
        "fixed".into()
    }
}

struct TestServer {
    addr: SocketAddr,
    line: Arc<FakeLine>,
    classifier: Arc<FixedClassifier>,
    replies: RepliesConfig,
}

async fn start_server(line: FakeLine) -> TestServer {
    let line = Arc::new(line);
    let classifier = Arc::new(FixedClassifier::new(7));
    let replies = RepliesConfig {
        result: "digit {digit} ({confidence})".into(),
        ..Default::default()
    };
    let state = GatewayState::new(
        Secret::new(SECRET.into()),
        Arc::clone(&line) as Arc<dyn MessagingApi>,
        Arc::clone(&classifier) as Arc<dyn Classifier>,
    )
    .with_replies(replies.clone());
    let app = build_gateway_app(Arc::new(state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        addr,
        line,
        classifier,
        replies,
    }
}

fn png_bytes() -> Vec<u8> {
    let img = GrayImage::from_fn(64, 64, |x, _| Luma([if x > 32 { 255 } else { 0 }]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn payload(message: &str, reply_token: Option<&str>) -> String {
    let token = reply_token
        .map(|t| format!(r#""replyToken": "{t}","#))
        .unwrap_or_default();
    format!(
        r#"{{
            "destination": "Ubot",
            "events": [{{
                "type": "message",
                {token}
                "mode": "active",
                "timestamp": 1462629479859,
                "webhookEventId": "01FZ74A0TDDPYRVKNK77XKC3ZR",
                "deliveryContext": {{"isRedelivery": false}},
                "source": {{"type": "user", "userId": "U4af4980629"}},
                "message": {message}
            }}]
        }}"#
    )
}

fn image_payload(reply_token: &str) -> String {
    payload(
        r#"{"type": "image", "id": "325708", "contentProvider": {"type": "line"}}"#,
        Some(reply_token),
    )
}

fn text_payload(reply_token: &str) -> String {
    payload(
        r#"{"type": "text", "id": "444573", "text": "7?"}"#,
        Some(reply_token),
    )
}

async fn post_signed(addr: SocketAddr, body: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/callback"))
        .header("X-Line-Signature", compute_signature(body.as_bytes(), SECRET))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let server = start_server(FakeLine {
        content: Some(png_bytes()),
        ..Default::default()
    })
    .await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/callback", server.addr))
        .body(image_payload("rt"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(server.classifier.calls(), 0);
    assert!(server.line.replies().is_empty());
}

#[tokio::test]
async fn invalid_signature_is_rejected() {
    let server = start_server(FakeLine {
        content: Some(png_bytes()),
        ..Default::default()
    })
    .await;

    let body = image_payload("rt");
    let resp = reqwest::Client::new()
        .post(format!("http://{}/callback", server.addr))
        .header(
            "X-Line-Signature",
            compute_signature(body.as_bytes(), "some-other-secret"),
        )
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(server.classifier.calls(), 0);
    assert!(server.line.fetched.lock().unwrap().is_empty());
    assert!(server.line.replies().is_empty());
}

#[tokio::test]
async fn tampered_body_is_rejected() {
    let server = start_server(FakeLine::default()).await;

    let signature = compute_signature(text_payload("rt").as_bytes(), SECRET);
    let resp = reqwest::Client::new()
        .post(format!("http://{}/callback", server.addr))
        .header("X-Line-Signature", signature)
        .body(text_payload("rt-other"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert!(server.line.replies().is_empty());
}

#[tokio::test]
async fn text_message_gets_prompt() {
    let server = start_server(FakeLine::default()).await;

    let resp = post_signed(server.addr, &text_payload("rt-text")).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
    assert_eq!(server.line.replies(), vec![(
        "rt-text".to_string(),
        server.replies.text_prompt.clone()
    )]);
    assert_eq!(server.classifier.calls(), 0);
}

#[tokio::test]
async fn image_message_gets_digit() {
    let server = start_server(FakeLine {
        content: Some(png_bytes()),
        ..Default::default()
    })
    .await;

    let resp = post_signed(server.addr, &image_payload("rt-image")).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(server.classifier.calls(), 1);
    assert_eq!(server.line.fetched.lock().unwrap().as_slice(), &[
        ImageSource::Line {
            message_id: "325708".into()
        }
    ]);
    assert_eq!(server.line.replies(), vec![(
        "rt-image".to_string(),
        "digit 7 (100%)".to_string()
    )]);
}

#[tokio::test]
async fn undecodable_image_gets_failure_reply() {
    let server = start_server(FakeLine {
        content: Some(b"definitely not an image".to_vec()),
        ..Default::default()
    })
    .await;

    let resp = post_signed(server.addr, &image_payload("rt-bad")).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
    assert_eq!(server.classifier.calls(), 0);
    assert_eq!(server.line.replies(), vec![(
        "rt-bad".to_string(),
        server.replies.failure.clone()
    )]);
}

#[tokio::test]
async fn download_failure_gets_failure_reply() {
    let server = start_server(FakeLine::default()).await;

    let resp = post_signed(server.addr, &image_payload("rt-404")).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(server.line.replies(), vec![(
        "rt-404".to_string(),
        server.replies.failure.clone()
    )]);
}

#[tokio::test]
async fn external_image_is_fetched_from_provider_url() {
    let server = start_server(FakeLine {
        content: Some(png_bytes()),
        ..Default::default()
    })
    .await;

    let body = payload(
        r#"{"type": "image", "id": "1", "contentProvider": {
            "type": "external",
            "originalContentUrl": "https://cdn.example.com/seven.png",
            "previewImageUrl": "https://cdn.example.com/seven-small.png"
        }}"#,
        Some("rt-ext"),
    );
    let resp = post_signed(server.addr, &body).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(server.line.fetched.lock().unwrap().as_slice(), &[
        ImageSource::External {
            url: "https://cdn.example.com/seven.png".into()
        }
    ]);
    assert_eq!(server.line.replies().len(), 1);
}

#[tokio::test]
async fn event_without_reply_token_is_skipped() {
    let server = start_server(FakeLine {
        content: Some(png_bytes()),
        ..Default::default()
    })
    .await;

    let body = payload(r#"{"type": "image", "id": "2"}"#, None);
    let resp = post_signed(server.addr, &body).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(server.classifier.calls(), 0);
    assert!(server.line.replies().is_empty());
}

#[tokio::test]
async fn empty_event_list_is_acknowledged() {
    let server = start_server(FakeLine::default()).await;

    let resp = post_signed(server.addr, r#"{"destination":"Ubot","events":[]}"#).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
    assert!(server.line.replies().is_empty());
}

#[tokio::test]
async fn malformed_body_with_valid_signature_is_rejected() {
    let server = start_server(FakeLine::default()).await;

    let resp = post_signed(server.addr, "{not json").await;
    assert_eq!(resp.status(), 400);
    assert!(server.line.replies().is_empty());
}

#[tokio::test]
async fn events_are_answered_in_order() {
    let server = start_server(FakeLine {
        content: Some(png_bytes()),
        ..Default::default()
    })
    .await;

    let body = r#"{"events": [
            {"type": "message", "replyToken": "first",
             "message": {"type": "text", "id": "1", "text": "hi"}},
            {"type": "unfollow", "source": {"type": "user", "userId": "U1"}},
            {"type": "message", "replyToken": "second",
             "message": {"type": "image", "id": "2"}}
        ]}"#;
    let resp = post_signed(server.addr, body).await;
    assert_eq!(resp.status(), 200);
    let tokens: Vec<String> = server.line.replies().into_iter().map(|(t, _)| t).collect();
    assert_eq!(tokens, vec!["first", "second"]);
}

#[tokio::test]
async fn health_reports_model() {
    let server = start_server(FakeLine::default()).await;

    let resp = reqwest::get(format!("http://{}/health", server.addr))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"], "fixed");
    assert!(body["version"].is_string());
}
