//! Image → model input conversion.
//!
//! Mirrors the preprocessing the digit model was trained with: grayscale,
//! exact 28×28 resize (aspect ratio is not preserved), scale to `[0, 1]`,
//! NHWC layout with a batch of one.

use std::io::Cursor;

use {
    image::{GenericImageView, ImageReader, imageops::FilterType},
    ndarray::Array4,
    tracing::debug,
};

use digitbot_config::{PreprocessConfig, ResizeFilter};

use crate::error::{Context, Error, Result};

/// Width and height of the model input, in pixels.
pub const INPUT_SIZE: u32 = 28;

/// Model input layout: batch, height, width, channel.
pub const INPUT_SHAPE: [usize; 4] = [1, INPUT_SIZE as usize, INPUT_SIZE as usize, 1];

/// A normalized `(1, 28, 28, 1)` single-channel tensor with values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor(Array4<f32>);

impl ImageTensor {
    /// Wrap an existing array, checking shape and value range.
    pub fn from_array(array: Array4<f32>) -> Result<Self> {
        if array.shape() != INPUT_SHAPE {
            return Err(Error::invalid_input(format!(
                "expected tensor shape {INPUT_SHAPE:?}, got {:?}",
                array.shape()
            )));
        }
        if let Some(v) = array.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(Error::invalid_input(format!(
                "tensor value {v} outside [0, 1]"
            )));
        }
        Ok(Self(array))
    }

    /// An all-black input.
    pub fn zeros() -> Self {
        Self(Array4::zeros(INPUT_SHAPE))
    }

    pub fn shape(&self) -> [usize; 4] {
        let s = self.0.shape();
        [s[0], s[1], s[2], s[3]]
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.0
    }

    pub fn into_array(self) -> Array4<f32> {
        self.0
    }
}

/// Decode `data` and convert it to the model input tensor.
///
/// Fails when `data` is empty or not a decodable image in one of the enabled
/// formats (JPEG, PNG, WebP, GIF, BMP).
pub fn preprocess(data: &[u8], options: &PreprocessConfig) -> Result<ImageTensor> {
    if data.is_empty() {
        return Err(Error::invalid_input("image data is empty"));
    }

    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("failed to guess image format")?
        .decode()?;

    let (width, height) = img.dimensions();
    debug!(width, height, color = ?img.color(), "decoded image");

    let gray = img.to_luma8();
    let resized = image::imageops::resize(
        &gray,
        INPUT_SIZE,
        INPUT_SIZE,
        filter_type(options.filter),
    );

    let invert = options.invert;
    let tensor = Array4::from_shape_fn(INPUT_SHAPE, |(_, y, x, _)| {
        let v = f32::from(resized.get_pixel(x as u32, y as u32).0[0]) / 255.0;
        if invert { 1.0 - v } else { v }
    });
    Ok(ImageTensor(tensor))
}

fn filter_type(filter: ResizeFilter) -> FilterType {
    match filter {
        ResizeFilter::Nearest => FilterType::Nearest,
        ResizeFilter::Triangle => FilterType::Triangle,
        ResizeFilter::CatmullRom => FilterType::CatmullRom,
        ResizeFilter::Gaussian => FilterType::Gaussian,
        ResizeFilter::Lanczos3 => FilterType::Lanczos3,
    }
}
