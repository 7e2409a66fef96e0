//! Per-event processing: pick a reply for one webhook event and send it.

use std::{sync::Arc, time::Instant};

use tracing::{debug, info, warn};

use {
    digitbot_common::Prediction,
    digitbot_line::{Event, ImageSource, Message, MessageEvent},
};

use crate::{error::PipelineError, state::GatewayState};

/// What the bot said (or didn't) in response to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Nothing to answer: non-message event, unsupported message type, or no
    /// reply token.
    Ignored { reason: &'static str },
    Prompted,
    Predicted { digit: u8, confidence: f32 },
    /// The image could not be classified and the user was told so.
    Failed,
    /// A reply was due but the platform did not accept it.
    ReplyFailed,
}

/// Handle one webhook event to completion. Never fails: every error is
/// either answered with the failure text or logged.
pub async fn handle_event(state: &GatewayState, event: Event) -> EventOutcome {
    let Event::Message(event) = event else {
        debug!("ignoring non-message event");
        return EventOutcome::Ignored {
            reason: "not a message event",
        };
    };

    let Some(reply_token) = event.reply_token.clone().filter(|t| !t.is_empty()) else {
        info!(
            kind = event.message.kind(),
            mode = event.mode.as_deref().unwrap_or("unknown"),
            "message event has no reply token, skipping"
        );
        return EventOutcome::Ignored {
            reason: "no reply token",
        };
    };

    if event.is_redelivery() {
        debug!(event_id = ?event.webhook_event_id, "processing redelivered event");
    }
    let chat_id = event
        .source
        .as_ref()
        .and_then(|s| s.chat_id())
        .unwrap_or("unknown");

    match &event.message {
        Message::Text(_) => {
            debug!(chat_id, "text message, sending prompt");
            let text = state.replies.text_prompt.clone();
            send_reply(state, &reply_token, &text, EventOutcome::Prompted).await
        },
        Message::Image(image) => {
            let source = ImageSource::from_message(image);
            info!(chat_id, message_id = %image.id, "image message received");
            answer_image(state, &event, &reply_token, &source).await
        },
        Message::Other => {
            debug!(chat_id, "unsupported message type, ignoring");
            EventOutcome::Ignored {
                reason: "unsupported message type",
            }
        },
    }
}

async fn answer_image(
    state: &GatewayState,
    event: &MessageEvent,
    reply_token: &str,
    source: &ImageSource,
) -> EventOutcome {
    let started = Instant::now();
    match recognize(state, source).await {
        Ok(prediction) => {
            info!(
                digit = prediction.digit,
                confidence = prediction.confidence,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "digit recognized"
            );
            let text = state
                .replies
                .render_result(prediction.digit, prediction.confidence_percent());
            send_reply(state, reply_token, &text, EventOutcome::Predicted {
                digit: prediction.digit,
                confidence: prediction.confidence,
            })
            .await
        },
        Err(e) => {
            warn!(
                error = %e,
                event_id = ?event.webhook_event_id,
                "image processing failed"
            );
            let text = state.replies.failure.clone();
            send_reply(state, reply_token, &text, EventOutcome::Failed).await
        },
    }
}

/// Download, preprocess and classify one image.
///
/// Decoding and inference are CPU-bound and run on the blocking pool.
pub async fn recognize(
    state: &GatewayState,
    source: &ImageSource,
) -> Result<Prediction, PipelineError> {
    let data = state
        .messaging
        .get_message_content(source)
        .await
        .map_err(PipelineError::Fetch)?;

    let classifier = Arc::clone(&state.classifier);
    let options = state.preprocess.clone();
    tokio::task::spawn_blocking(move || -> Result<Prediction, PipelineError> {
        let tensor = digitbot_media::preprocess(&data, &options)?;
        Ok(classifier.classify(&tensor)?)
    })
    .await?
}

async fn send_reply(
    state: &GatewayState,
    reply_token: &str,
    text: &str,
    outcome: EventOutcome,
) -> EventOutcome {
    match state.messaging.reply_text(reply_token, text).await {
        Ok(()) => outcome,
        Err(e) => {
            // The reply token is single-use, so there is no second attempt.
            warn!(error = %e, ?outcome, "failed to send reply");
            EventOutcome::ReplyFailed
        },
    }
}
