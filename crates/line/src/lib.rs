//! LINE Messaging API channel support.
//!
//! Webhook payload types, `X-Line-Signature` verification, and an HTTP client
//! for downloading message content and sending replies.

pub mod client;
pub mod error;
pub mod event;
pub mod signature;

pub use {
    client::{ImageSource, LineClient, MessagingApi},
    error::{Error, Result},
    event::{Event, Message, MessageEvent, WebhookPayload},
    signature::{SIGNATURE_HEADER, verify_signature},
};
