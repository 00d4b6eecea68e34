//! JPEG decoding and resizing of episode images.

use crate::common::*;

/// Decodes compressed camera images into fixed-size RGB images.
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    width: u32,
    height: u32,
    filter: FilterType,
}

impl ImageProcessor {
    /// Build a new image processor.
    ///
    /// * `width` - The outcome image width in pixels.
    /// * `height` - The outcome image height in pixels.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        ensure!(width > 0, "width must be positive");
        ensure!(height > 0, "height must be positive");

        Ok(Self {
            width,
            height,
            filter: FilterType::Triangle,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Decode a JPEG buffer, convert it to RGB order and resize it to the
    /// target resolution with bilinear interpolation.
    pub fn process(&self, jpeg: &[u8]) -> Result<RgbImage> {
        let Self {
            width,
            height,
            filter,
        } = *self;

        let image = image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg)
            .context("failed to decode JPEG image")?
            .into_rgb8();

        if image.dimensions() == (width, height) {
            return Ok(image);
        }
        Ok(image::imageops::resize(&image, width, height, filter))
    }
}
