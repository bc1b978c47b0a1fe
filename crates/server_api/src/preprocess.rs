//! Image normalization applied before classification: scale the longer side
//! to the model edge, center the result on a white square canvas, and
//! flatten to `[0, 1]` floats.

use image::{imageops, imageops::FilterType, DynamicImage, GenericImageView, Rgb, RgbImage};

pub const MODEL_INPUT_SIZE: u32 = 100;
const CHANNELS: usize = 3;

/// HWC tensor with an implicit batch dimension of one.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl ModelInput {
    pub fn from_rgb(image: &RgbImage) -> Self {
        let data = image
            .as_raw()
            .iter()
            .map(|&channel| channel as f32 / 255.0)
            .collect();
        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            data,
        }
    }

    pub fn shape(&self) -> [usize; 4] {
        [1, self.height, self.width, CHANNELS]
    }

    pub fn expected_len(&self) -> usize {
        self.width * self.height * CHANNELS
    }
}

/// Resizes `image` so its longer side equals `max_dimension` (the shorter side
/// is truncated, never below one pixel) and pastes it centered onto a white
/// canvas of `target` size.
pub fn resize_and_pad(image: &DynamicImage, max_dimension: u32, target: (u32, u32)) -> RgbImage {
    let (width, height) = image.dimensions();
    let aspect_ratio = f64::from(width) / f64::from(height.max(1));

    // Side lengths truncate from double precision.
    let (new_width, new_height) = if width >= height {
        (max_dimension, (f64::from(max_dimension) / aspect_ratio) as u32)
    } else {
        ((f64::from(max_dimension) * aspect_ratio) as u32, max_dimension)
    };
    let (new_width, new_height) = (new_width.max(1), new_height.max(1));

    let resized = image
        .resize_exact(new_width, new_height, FilterType::Lanczos3)
        .to_rgb8();

    let mut canvas = RgbImage::from_pixel(target.0, target.1, Rgb([255, 255, 255]));
    let x = (i64::from(target.0) - i64::from(new_width)).div_euclid(2);
    let y = (i64::from(target.1) - i64::from(new_height)).div_euclid(2);
    imageops::overlay(&mut canvas, &resized, x, y);
    canvas
}

pub fn model_input_for(image: &DynamicImage) -> ModelInput {
    let padded = resize_and_pad(
        image,
        MODEL_INPUT_SIZE,
        (MODEL_INPUT_SIZE, MODEL_INPUT_SIZE),
    );
    ModelInput::from_rgb(&padded)
}
