//! Normalization of raw observation images.

use crate::common::*;

/// A raw image as sent by a dataset loader or an inference client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageArray {
    U8(ArrayD<u8>),
    F32(ArrayD<f32>),
}

impl From<ArrayD<u8>> for ImageArray {
    fn from(from: ArrayD<u8>) -> Self {
        Self::U8(from)
    }
}

impl From<ArrayD<f32>> for ImageArray {
    fn from(from: ArrayD<f32>) -> Self {
        Self::F32(from)
    }
}

/// Convert an image to channel-last bytes.
///
/// Float pixels are multiplied by 255 and truncated toward zero, saturating
/// at the byte range. An image with 3 dimensions and 3 leading channels is
/// treated as channel-first and transposed to (H, W, C).
pub fn parse_image(image: ImageArray) -> ArrayD<u8> {
    let image = match image {
        ImageArray::U8(image) => image,
        ImageArray::F32(image) => image.mapv(|value| (value * 255.0) as u8),
    };

    if image.ndim() == 3 && image.shape()[0] == 3 {
        image
            .permuted_axes(IxDyn(&[1, 2, 0]))
            .as_standard_layout()
            .into_owned()
    } else {
        image
    }
}
