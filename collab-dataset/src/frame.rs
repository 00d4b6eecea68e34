//! Downsampling episodes into dataset frames.

use crate::{
    common::*,
    episode::EpisodeData,
    processor::ImageProcessor,
    schema::{ACTION_DIM, GRIPPER_IMAGE_KEY, MOUNT_IMAGE_KEY, STATE_DIM},
};
use std::{iter::StepBy, ops::Range};

/// One sampled timestep of an episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub mount_image: RgbImage,
    pub gripper_image: RgbImage,
    pub state: [f32; STATE_DIM],
    pub actions: [f32; ACTION_DIM],
    pub task: String,
}

impl Frame {
    /// The image fields paired with their feature names.
    pub fn images(&self) -> [(&'static str, &RgbImage); 2] {
        [
            (MOUNT_IMAGE_KEY, &self.mount_image),
            (GRIPPER_IMAGE_KEY, &self.gripper_image),
        ]
    }
}

/// The timestep indices `0, stride, 2 * stride, ...` below `len`.
pub fn frame_indices(len: usize, stride: NonZeroUsize) -> StepBy<Range<usize>> {
    (0..len).step_by(stride.get())
}

/// Iterates over the downsampled frames of an episode.
#[derive(Debug)]
pub struct EpisodeFrames<'a> {
    episode: &'a EpisodeData,
    processor: &'a ImageProcessor,
    task: &'a str,
    states: Array2<f32>,
    actions: Array2<f32>,
    indices: StepBy<Range<usize>>,
}

impl<'a> EpisodeFrames<'a> {
    pub fn new(
        episode: &'a EpisodeData,
        stride: NonZeroUsize,
        processor: &'a ImageProcessor,
        task: &'a str,
    ) -> Result<Self> {
        let states = episode.states()?;
        let actions = episode.actions()?;
        ensure!(
            states.ncols() == STATE_DIM,
            "expect state width {}, but found {}",
            STATE_DIM,
            states.ncols()
        );
        ensure!(
            actions.ncols() == ACTION_DIM,
            "expect action width {}, but found {}",
            ACTION_DIM,
            actions.ncols()
        );

        Ok(Self {
            episode,
            processor,
            task,
            states,
            actions,
            indices: frame_indices(episode.len(), stride),
        })
    }

    fn frame_at(&self, index: usize) -> Result<Frame> {
        let Self {
            episode, processor, ..
        } = *self;

        let mount_image = episode
            .mount_image(index)
            .ok_or_else(|| format_err!("missing mount image at step {}", index))?;
        let gripper_image = episode
            .gripper_image(index)
            .ok_or_else(|| format_err!("missing gripper image at step {}", index))?;

        let mount_image = processor
            .process(mount_image)
            .with_context(|| format!("failed to load mount image at step {}", index))?;
        let gripper_image = processor
            .process(gripper_image)
            .with_context(|| format!("failed to load gripper image at step {}", index))?;

        Ok(Frame {
            mount_image,
            gripper_image,
            state: to_fixed(self.states.row(index))?,
            actions: to_fixed(self.actions.row(index))?,
            task: self.task.to_owned(),
        })
    }
}

impl<'a> Iterator for EpisodeFrames<'a> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.indices.next()?;
        Some(self.frame_at(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

fn to_fixed<const N: usize>(row: ArrayView1<f32>) -> Result<[f32; N]> {
    row.to_vec()
        .try_into()
        .map_err(|vec: Vec<f32>| format_err!("expect {} elements, but found {}", N, vec.len()))
}
