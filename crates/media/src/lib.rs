//! Image preprocessing: turn a received photo into the model's input tensor.

pub mod error;
pub mod preprocess;

pub use {
    error::{Error, Result},
    preprocess::{INPUT_SHAPE, INPUT_SIZE, ImageTensor, preprocess},
};
