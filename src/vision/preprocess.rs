// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Image decoding and conversion to the model input tensor

use base64::{engine::general_purpose, Engine as _};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

use crate::{Result, TurathError};

/// Colour channels fed to the model
pub const CHANNELS: usize = 3;

/// Dense f32 tensor in NHWC layout
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl Tensor {
    /// `[batch, height, width, channels]`
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Nested `[height][width][channel]` view of one batch entry
    pub fn instance(&self, batch: usize) -> Option<Vec<Vec<[f32; CHANNELS]>>> {
        let [n, h, w, _] = self.shape;
        if batch >= n {
            return None;
        }
        let offset = batch * h * w * CHANNELS;
        let rows = (0..h)
            .map(|y| {
                (0..w)
                    .map(|x| {
                        let i = offset + (y * w + x) * CHANNELS;
                        [self.data[i], self.data[i + 1], self.data[i + 2]]
                    })
                    .collect()
            })
            .collect();
        Some(rows)
    }
}

/// Decode a picker payload, accepting an optional `data:` URL prefix
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let payload = match text.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => text,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(general_purpose::STANDARD.decode(cleaned)?)
}

/// Decode an encoded image (JPEG, PNG, ...)
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(TurathError::Inference("empty image payload".to_string()));
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Stretch to `size`×`size` with bilinear filtering, scale to [0, 1] and
/// add a batch dimension of one.
pub fn to_tensor(img: &DynamicImage, size: u32) -> Tensor {
    let (width, height) = img.dimensions();
    let resized = image::imageops::resize(&img.to_rgb8(), size, size, FilterType::Triangle);
    debug!("Resized image {}x{} to {}x{}", width, height, size, size);

    let data = resized
        .as_raw()
        .iter()
        .map(|&v| f32::from(v) / 255.0)
        .collect();

    Tensor {
        shape: [1, size as usize, size as usize, CHANNELS],
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, colour: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(colour));
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_tensor_shape_and_range() {
        let img = decode_image(&png_bytes(640, 480, [255, 0, 51])).unwrap();
        let tensor = to_tensor(&img, 224);

        assert_eq!(tensor.shape(), [1, 224, 224, 3]);
        assert_eq!(tensor.data().len(), 224 * 224 * 3);
        assert!(tensor.data().iter().all(|v| (0.0..=1.0).contains(v)));

        let first = &tensor.data()[..3];
        assert!((first[0] - 1.0).abs() < 0.005);
        assert!(first[1].abs() < 0.005);
        assert!((first[2] - 0.2).abs() < 0.005);
    }

    #[test]
    fn test_small_images_are_upscaled() {
        let img = decode_image(&png_bytes(8, 8, [10, 20, 30])).unwrap();
        assert_eq!(to_tensor(&img, 224).shape(), [1, 224, 224, 3]);
    }

    #[test]
    fn test_instance_view() {
        let img = decode_image(&png_bytes(4, 4, [0, 255, 0])).unwrap();
        let tensor = to_tensor(&img, 2);
        let rows = tensor.instance(0).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], [0.0, 1.0, 0.0]);
        assert!(tensor.instance(1).is_none());
    }

    #[test]
    fn test_base64_with_and_without_data_url() {
        let bytes = png_bytes(2, 2, [1, 2, 3]);
        let plain = general_purpose::STANDARD.encode(&bytes);
        let url = format!("data:image/png;base64,{}", plain);

        assert_eq!(decode_base64(&plain).unwrap(), bytes);
        assert_eq!(decode_base64(&url).unwrap(), bytes);
        assert!(decode_base64("not base64!").is_err());
    }

    #[test]
    fn test_garbage_is_an_image_error() {
        assert!(matches!(decode_image(b"definitely not an image"), Err(TurathError::Image(_))));
        assert!(matches!(decode_image(&[]), Err(TurathError::Inference(_))));
    }
}
