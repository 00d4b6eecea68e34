//! Conversion of Collab (xArm) episode recordings into LeRobot datasets.

mod common;
pub mod convert;
pub mod episode;
pub mod frame;
#[cfg(feature = "hdf5")]
pub mod h5;
pub mod hub;
pub mod image_writer;
pub mod processor;
pub mod schema;
pub mod stats;
pub mod writer;

pub use convert::{ConvertInit, ConvertSummary};
pub use episode::{discover_episodes, EpisodeData, EpisodeDataInit, EpisodeReader};
pub use frame::{frame_indices, EpisodeFrames, Frame};
#[cfg(feature = "hdf5")]
pub use h5::Hdf5EpisodeReader;
pub use hub::{push_to_hub, HubClient, PushOptions, UploadFile, UploadMode};
pub use processor::ImageProcessor;
pub use stats::{FeatureStats, RunningStats, StatsValues};
pub use writer::{lerobot_home, LeRobotDataset, LeRobotDatasetInit, LeRobotDatasetMetadata};
