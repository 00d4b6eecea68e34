use anyhow::Result;
use collab_dataset::{EpisodeData, EpisodeDataInit, EpisodeReader};
use image::{codecs::jpeg::JpegEncoder, Rgb, RgbImage};
use ndarray::{Array, IxDyn};
use rand::prelude::*;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

/// Serves synthetic episodes keyed by the episode file path.
#[derive(Debug, Default)]
pub struct MemoryReader {
    pub episodes: HashMap<PathBuf, usize>,
}

impl MemoryReader {
    /// Lay out empty `ep*/episode.h5` files and remember their lengths.
    pub fn create(root: &Path, lengths: &[usize]) -> Result<Self> {
        let mut episodes = HashMap::new();
        for (index, &len) in lengths.iter().enumerate() {
            let dir = root.join(format!("ep{:06}", index));
            fs::create_dir_all(&dir)?;
            let path = dir.join("episode.h5");
            fs::write(&path, b"")?;
            episodes.insert(path, len);
        }
        Ok(Self { episodes })
    }
}

impl EpisodeReader for MemoryReader {
    fn read_episode(&self, path: &Path) -> Result<EpisodeData> {
        let len = *self
            .episodes
            .get(path)
            .ok_or_else(|| anyhow::format_err!("unknown episode {}", path.display()))?;
        synthetic_episode(len, 64, 48)
    }
}

pub fn encode_jpeg(image: &RgbImage) -> Vec<u8> {
    let mut buf = vec![];
    JpegEncoder::new_with_quality(&mut buf, 90)
        .encode_image(image)
        .unwrap();
    buf
}

pub fn synthetic_episode(len: usize, width: u32, height: u32) -> Result<EpisodeData> {
    let mut rng = StdRng::seed_from_u64(len as u64);
    let mut jpeg = |channel: usize| {
        let mut color = [0u8; 3];
        color[channel] = rng.gen_range(128..=255);
        encode_jpeg(&RgbImage::from_pixel(width, height, Rgb(color)))
    };
    let mount_images: Vec<_> = (0..len).map(|_| jpeg(0)).collect();
    let gripper_images: Vec<_> = (0..len).map(|_| jpeg(2)).collect();

    EpisodeDataInit {
        timestamps: Array::range(0.0, len as f64, 1.0) * 0.05,
        current_pose: Array::from_shape_fn((len, 7), |(r, c)| (r * 7 + c) as f32 * 0.01),
        desired_pose: Array::from_shape_fn((len, 7), |(r, c)| (r * 7 + c) as f32 * 0.02),
        gripper_actual: Array::from_shape_fn(IxDyn(&[len]), |ix| ix[0] as f32),
        gripper_commanded: Array::from_shape_fn(IxDyn(&[len, 1]), |ix| ix[0] as f32 + 1.0),
        gripper_images,
        mount_images,
        labels: vec!["robot_turn".to_string(); len],
    }
    .build()
}
