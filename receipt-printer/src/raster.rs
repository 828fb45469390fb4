//! Image to raster node conversion
//!
//! Produces the payload an `image` node expects: a 1-bit bitmap, rows packed
//! MSB-first, preceded by the little-endian `xL xH yL yH` dot dimensions the
//! printer reads right after the raster header.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, GenericImageView, RgbaImage};
use tracing::{info, instrument};

use crate::error::{ConfigurationError, PrintError, PrintResult};
use crate::node::CommandNode;

/// Widest raster most 80mm heads accept
pub const DEFAULT_MAX_WIDTH: u32 = 384;

/// Load an image file and build an `image` node from it
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn image_node(path: impl AsRef<Path>, max_width: u32) -> PrintResult<CommandNode> {
    let img = image::open(path.as_ref()).map_err(|e| PrintError::Image(e.to_string()))?;
    info!(dimensions = ?img.dimensions(), "image opened");
    node_from_image(&img, max_width)
}

/// Build an `image` node from a decoded image
///
/// Fails when either dimension, after scaling, does not fit the 16-bit
/// dimension prefix.
pub fn node_from_image(img: &DynamicImage, max_width: u32) -> PrintResult<CommandNode> {
    let (w, h) = img.dimensions();
    let img = if w > max_width {
        let new_h = ((h as f64) * (max_width as f64) / (w as f64)).max(1.0) as u32;
        img.resize_exact(max_width, new_h, image::imageops::FilterType::Nearest)
    } else {
        img.clone()
    };

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let x = dimension("width", width)?;
    let y = dimension("height", height)?;

    let mut payload = Vec::new();
    payload.extend_from_slice(&x.to_le_bytes());
    payload.extend_from_slice(&y.to_le_bytes());
    payload.extend_from_slice(&pack_raster(&rgba));

    Ok(CommandNode::new("image")
        .param("width", width.to_string())
        .param("height", height.to_string())
        .payload(STANDARD.encode(payload)))
}

fn dimension(key: &str, dots: u32) -> Result<u16, ConfigurationError> {
    u16::try_from(dots).map_err(|_| ConfigurationError::number(key, &dots.to_string()))
}

/// Threshold to one bit per pixel; dark opaque pixels print
pub fn pack_raster(rgba: &RgbaImage) -> Vec<u8> {
    let (width, height) = rgba.dimensions();
    let row_bytes = width.div_ceil(8);
    let mut data = Vec::with_capacity((row_bytes * height) as usize);

    for y in 0..height {
        for x_byte in 0..row_bytes {
            let mut byte = 0u8;
            for bit in 0..8 {
                let x = x_byte * 8 + bit;
                if x >= width {
                    break;
                }
                let pixel = rgba.get_pixel(x, y);
                if pixel[3] < 128 {
                    // transparent prints as paper
                    continue;
                }
                let luma = 0.299 * f32::from(pixel[0])
                    + 0.587 * f32::from(pixel[1])
                    + 0.114 * f32::from(pixel[2]);
                if luma < 128.0 {
                    byte |= 1 << (7 - bit);
                }
            }
            data.push(byte);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_pack_black_row() {
        let img = RgbaImage::from_pixel(8, 1, Rgba([0, 0, 0, 255]));
        assert_eq!(pack_raster(&img), vec![0xFF]);
    }

    #[test]
    fn test_pack_partial_byte_and_transparency() {
        let mut img = RgbaImage::from_pixel(10, 1, Rgba([255, 255, 255, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        img.put_pixel(9, 0, Rgba([10, 10, 10, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 0]));
        assert_eq!(pack_raster(&img), vec![0x80, 0x40]);
    }

    #[test]
    fn test_node_from_image_scales_down() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            32,
            4,
            Rgba([0, 0, 0, 255]),
        ));
        let node = node_from_image(&img, 16).unwrap();
        assert_eq!(node.name, "image");
        assert_eq!(node.params["width"], "16");
        assert_eq!(node.params["height"], "2");

        let payload = STANDARD.decode(&node.payload).unwrap();
        assert_eq!(&payload[..4], &[16, 0, 2, 0]);
        assert_eq!(&payload[4..], &[0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_node_from_image_rejects_oversized_dimensions() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            70_000,
            1,
            Rgba([0, 0, 0, 255]),
        ));
        let err = node_from_image(&img, 70_000).unwrap_err();
        assert_eq!(
            err.as_config(),
            Some(&ConfigurationError::InvalidNumber {
                key: "width".to_string(),
                value: "70000".to_string(),
            })
        );
    }

    #[test]
    fn test_node_from_image_widest_prefix() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            u32::from(u16::MAX),
            1,
            Rgba([255, 255, 255, 255]),
        ));
        let node = node_from_image(&img, u32::from(u16::MAX)).unwrap();
        let payload = STANDARD.decode(&node.payload).unwrap();
        assert_eq!(&payload[..4], &[0xFF, 0xFF, 1, 0]);
    }
}
