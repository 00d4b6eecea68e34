//! Conversion configuration format.

use anyhow::Result;
use collab_dataset::{
    convert::{DEFAULT_IMAGE_WRITER_THREADS, DEFAULT_ROBOT_TYPE},
    PushOptions,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The converter configuration. Missing fields take the default values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The dataset identifier, also the sub-directory under the output root.
    pub repo_name: String,
    pub fps: usize,
    pub downsample_factor: usize,
    /// The [width, height] of emitted images.
    pub image_size: [u32; 2],
    pub default_task: String,
    pub robot_type: String,
    pub image_writer_threads: usize,
    /// Defaults to `$HF_LEROBOT_HOME`.
    pub output_root: Option<PathBuf>,
    pub push_to_hub: bool,
    pub hub: PushOptions,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo_name: "local/collab".to_string(),
            fps: 10,
            downsample_factor: 2,
            image_size: [224, 224],
            default_task: "perform the collaborative task".to_string(),
            robot_type: DEFAULT_ROBOT_TYPE.to_string(),
            image_writer_threads: DEFAULT_IMAGE_WRITER_THREADS,
            output_root: None,
            push_to_hub: false,
            hub: PushOptions::default(),
        }
    }
}
