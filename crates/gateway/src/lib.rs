//! HTTP gateway: receives LINE webhooks and answers image messages with the
//! recognized digit.
//!
//! `POST /callback` verifies the signature, then runs each event through
//! [`pipeline::handle_event`]. `GET /health` reports the loaded model.

pub mod callback;
pub mod error;
pub mod pipeline;
pub mod server;
pub mod state;

pub use {
    server::{build_gateway_app, start_gateway},
    state::GatewayState,
};
