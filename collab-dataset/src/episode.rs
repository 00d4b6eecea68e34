//! Recorded episodes and their discovery on disk.

use crate::{common::*, schema::POSE_DIM};

/// The file name of the array store inside each episode directory.
pub const EPISODE_FILE_NAME: &str = "episode.h5";

/// The reader that loads an episode array store into memory.
pub trait EpisodeReader {
    fn read_episode(&self, path: &Path) -> Result<EpisodeData>;
}

impl<R> EpisodeReader for &R
where
    R: EpisodeReader + ?Sized,
{
    fn read_episode(&self, path: &Path) -> Result<EpisodeData> {
        (**self).read_episode(path)
    }
}

/// List `<root>/ep*/episode.h5` files in sorted order.
///
/// It fails if no episode is found.
pub fn discover_episodes(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    let pattern = root.join("ep*").join(EPISODE_FILE_NAME);
    let pattern = pattern
        .to_str()
        .ok_or_else(|| format_err!("non-unicode path '{}'", root.display()))?;

    let mut paths: Vec<PathBuf> = glob::glob(pattern)?
        .map(|result| result.map_err(Error::from))
        .filter_ok(|path| path.is_file())
        .try_collect()?;
    paths.sort();

    ensure!(!paths.is_empty(), "No episodes found in {}", root.display());
    Ok(paths)
}

/// The raw arrays of an episode as they come out of the array store.
///
/// The gripper channels may be stored either as flat vectors or single
/// columns.
#[derive(Debug, Clone)]
pub struct EpisodeDataInit {
    pub timestamps: Array1<f64>,
    pub current_pose: Array2<f32>,
    pub desired_pose: Array2<f32>,
    pub gripper_actual: ArrayD<f32>,
    pub gripper_commanded: ArrayD<f32>,
    pub gripper_images: Vec<Vec<u8>>,
    pub mount_images: Vec<Vec<u8>>,
    pub labels: Vec<String>,
}

impl EpisodeDataInit {
    pub fn build(self) -> Result<EpisodeData> {
        let Self {
            timestamps,
            current_pose,
            desired_pose,
            gripper_actual,
            gripper_commanded,
            gripper_images,
            mount_images,
            labels,
        } = self;

        let gripper_actual = into_column(gripper_actual, "gripper_actual_position")?;
        let gripper_commanded = into_column(gripper_commanded, "gripper_commanded_position")?;

        ensure!(
            current_pose.ncols() == POSE_DIM,
            "expect robot_current_pose to have {} columns, but found {}",
            POSE_DIM,
            current_pose.ncols()
        );
        ensure!(
            desired_pose.ncols() == POSE_DIM,
            "expect robot_desired_pose to have {} columns, but found {}",
            POSE_DIM,
            desired_pose.ncols()
        );

        let len = timestamps.len();
        let lengths = [
            ("robot_current_pose", current_pose.nrows()),
            ("robot_desired_pose", desired_pose.nrows()),
            ("gripper_actual_position", gripper_actual.nrows()),
            ("gripper_commanded_position", gripper_commanded.nrows()),
            ("gripper_image_rgb_compressed", gripper_images.len()),
            ("mount_image_rgb_compressed", mount_images.len()),
            ("state", labels.len()),
        ];
        for (name, field_len) in lengths {
            ensure!(
                field_len == len,
                "field '{}' has {} entries, but timestamps has {}",
                name,
                field_len,
                len
            );
        }

        Ok(EpisodeData {
            timestamps,
            current_pose,
            desired_pose,
            gripper_actual,
            gripper_commanded,
            gripper_images,
            mount_images,
            labels,
        })
    }
}

/// An episode whose fields share the same leading time dimension.
#[derive(Debug, Clone)]
pub struct EpisodeData {
    timestamps: Array1<f64>,
    current_pose: Array2<f32>,
    desired_pose: Array2<f32>,
    gripper_actual: Array2<f32>,
    gripper_commanded: Array2<f32>,
    gripper_images: Vec<Vec<u8>>,
    mount_images: Vec<Vec<u8>>,
    labels: Vec<String>,
}

impl EpisodeData {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &Array1<f64> {
        &self.timestamps
    }

    /// The per-step turn-taking labels.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn gripper_image(&self, index: usize) -> Option<&[u8]> {
        self.gripper_images.get(index).map(Vec::as_slice)
    }

    pub fn mount_image(&self, index: usize) -> Option<&[u8]> {
        self.mount_images.get(index).map(Vec::as_slice)
    }

    /// Current pose and gripper reading, N × 8.
    pub fn states(&self) -> Result<Array2<f32>> {
        let states = concatenate(
            Axis(1),
            &[self.current_pose.view(), self.gripper_actual.view()],
        )?;
        Ok(states)
    }

    /// Desired pose and gripper command, N × 8.
    pub fn actions(&self) -> Result<Array2<f32>> {
        let actions = concatenate(
            Axis(1),
            &[self.desired_pose.view(), self.gripper_commanded.view()],
        )?;
        Ok(actions)
    }
}

fn into_column(array: ArrayD<f32>, name: &str) -> Result<Array2<f32>> {
    let shape = array.shape().to_vec();
    match *shape.as_slice() {
        [len] => Ok(array.into_shape((len, 1))?),
        [_, 1] => Ok(array.into_dimensionality::<Ix2>()?),
        _ => bail!(
            "expect field '{}' to have shape (N,) or (N, 1), but found {:?}",
            name,
            shape
        ),
    }
}
