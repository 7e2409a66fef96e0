//! Shared types and error helpers used across the digitbot crates.

pub mod error;
pub mod types;

pub use {
    error::FromMessage,
    types::{DIGIT_CLASSES, Prediction},
};
