//! The episode-to-dataset conversion run.

use crate::{
    common::*,
    episode::{discover_episodes, EpisodeReader},
    frame::EpisodeFrames,
    processor::ImageProcessor,
    schema::collab_features,
    writer::{LeRobotDataset, LeRobotDatasetInit},
};

pub const DEFAULT_ROBOT_TYPE: &str = "xarm6";
pub const DEFAULT_IMAGE_WRITER_THREADS: usize = 10;

/// Conversion options.
#[derive(Debug, Clone)]
pub struct ConvertInit {
    /// The directory containing `ep*/episode.h5` files.
    pub episodes_dir: PathBuf,
    /// The dataset directory. It is removed first if it exists.
    pub output_dir: PathBuf,
    pub fps: usize,
    /// Take every n-th step of the raw episodes.
    pub downsample_factor: usize,
    /// The (width, height) of emitted images.
    pub image_size: (u32, u32),
    /// The task description attached to every frame.
    pub default_task: String,
    pub robot_type: String,
    pub image_writer_threads: usize,
}

/// What a conversion run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSummary {
    pub output_dir: PathBuf,
    pub num_episodes: usize,
    pub num_frames: usize,
}

impl ConvertInit {
    pub fn run<R>(self, reader: R) -> Result<ConvertSummary>
    where
        R: EpisodeReader,
    {
        let Self {
            episodes_dir,
            output_dir,
            fps,
            downsample_factor,
            image_size: (width, height),
            default_task,
            robot_type,
            image_writer_threads,
        } = self;

        let stride = NonZeroUsize::new(downsample_factor)
            .ok_or_else(|| format_err!("downsample_factor must be positive"))?;
        let processor = ImageProcessor::new(width, height)?;

        let episode_paths = discover_episodes(&episodes_dir)?;
        info!(
            "Found {} episodes in {}",
            episode_paths.len(),
            episodes_dir.display()
        );

        if output_dir.exists() {
            warn!("removing existing dataset {}", output_dir.display());
            fs::remove_dir_all(&output_dir).with_context(|| {
                format!("failed to remove existing dataset {}", output_dir.display())
            })?;
        }

        let mut dataset = LeRobotDatasetInit {
            root: output_dir.clone(),
            robot_type,
            fps,
            features: collab_features(width, height),
            image_writer_threads: Some(image_writer_threads),
        }
        .create()?;

        for path in &episode_paths {
            info!("Processing {}...", path.display());
            convert_episode(&mut dataset, &reader, path, stride, &processor, &default_task)
                .with_context(|| format!("failed to convert episode {}", path.display()))?;
        }

        let summary = ConvertSummary {
            output_dir,
            num_episodes: dataset.num_episodes(),
            num_frames: dataset.num_frames(),
        };
        info!("Dataset saved to {}", summary.output_dir.display());
        info!("Total episodes: {}", summary.num_episodes);

        Ok(summary)
    }
}

fn convert_episode<R>(
    dataset: &mut LeRobotDataset,
    reader: &R,
    path: &Path,
    stride: NonZeroUsize,
    processor: &ImageProcessor,
    task: &str,
) -> Result<()>
where
    R: EpisodeReader,
{
    let episode = reader.read_episode(path)?;
    let frames = EpisodeFrames::new(&episode, stride, processor, task)?;

    for frame in frames {
        dataset.add_frame(frame?)?;
    }
    dataset.save_episode()?;
    Ok(())
}
