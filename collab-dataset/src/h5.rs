//! The HDF5 episode store.

use crate::{
    common::*,
    episode::{EpisodeData, EpisodeDataInit, EpisodeReader},
};
use hdf5::{
    types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenArray, VarLenAscii, VarLenUnicode},
    Dataset, H5Type,
};
use ndarray::IxDyn;

/// The name of the per-step label field.
pub const LABELS_FIELD: &str = "state";

/// The longest fixed-length label in bytes that is kept intact.
const MAX_LABEL_LEN: usize = 256;

/// Reads `episode.h5` files written by the Collab recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hdf5EpisodeReader;

impl EpisodeReader for Hdf5EpisodeReader {
    fn read_episode(&self, path: &Path) -> Result<EpisodeData> {
        let file = hdf5::File::open(path)
            .with_context(|| format!("failed to open episode file {}", path.display()))?;
        let dataset = |name: &str| -> Result<Dataset> {
            file.dataset(name).with_context(|| {
                format!("missing field '{}' in {}", name, path.display())
            })
        };

        let timestamps: Array1<f64> = read_array::<f64>(&dataset("timestamps")?)?
            .into_dimensionality()
            .context("timestamps must be one-dimensional")?;

        // labels are not converted, so a broken label field is not fatal
        let labels = match dataset(LABELS_FIELD).and_then(|dataset| read_strings(&dataset)) {
            Ok(labels) => labels,
            Err(err) => {
                warn!("ignore labels of {}: {:#}", path.display(), err);
                vec![String::new(); timestamps.len()]
            }
        };

        let init = EpisodeDataInit {
            timestamps,
            current_pose: read_array::<f32>(&dataset("robot_current_pose")?)?
                .into_dimensionality()
                .context("robot_current_pose must be two-dimensional")?,
            desired_pose: read_array::<f32>(&dataset("robot_desired_pose")?)?
                .into_dimensionality()
                .context("robot_desired_pose must be two-dimensional")?,
            gripper_actual: read_array::<f32>(&dataset("gripper_actual_position")?)?,
            gripper_commanded: read_array::<f32>(&dataset("gripper_commanded_position")?)?,
            gripper_images: read_blobs(&dataset("gripper_image_rgb_compressed")?)?,
            mount_images: read_blobs(&dataset("mount_image_rgb_compressed")?)?,
            labels,
        };

        init.build()
            .with_context(|| format!("invalid episode file {}", path.display()))
    }
}

/// Reads a numeric field, converting the stored element type to `T`.
fn read_array<T>(dataset: &Dataset) -> Result<ArrayD<T>>
where
    T: H5Type,
{
    let shape = dataset.shape();
    let data: Vec<T> = dataset
        .read_raw()
        .with_context(|| format!("failed to read field '{}'", dataset.name()))?;
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
}

fn read_blobs(dataset: &Dataset) -> Result<Vec<Vec<u8>>> {
    let blobs: Vec<VarLenArray<u8>> = dataset
        .read_raw()
        .with_context(|| format!("failed to read field '{}'", dataset.name()))?;
    Ok(blobs.iter().map(|blob| blob.as_slice().to_vec()).collect())
}

/// Reads variable or fixed length strings of either encoding.
fn read_strings(dataset: &Dataset) -> Result<Vec<String>> {
    let descriptor = dataset.dtype()?.to_descriptor()?;

    let texts: Vec<String> = match descriptor {
        TypeDescriptor::VarLenUnicode => dataset
            .read_raw::<VarLenUnicode>()?
            .iter()
            .map(|text| text.as_str().to_owned())
            .collect(),
        TypeDescriptor::VarLenAscii => dataset
            .read_raw::<VarLenAscii>()?
            .iter()
            .map(|text| text.as_str().to_owned())
            .collect(),
        TypeDescriptor::FixedAscii(len) => {
            ensure!(len <= MAX_LABEL_LEN, "labels longer than {} bytes", MAX_LABEL_LEN);
            dataset
                .read_raw::<FixedAscii<MAX_LABEL_LEN>>()?
                .iter()
                .map(|text| text.as_str().to_owned())
                .collect()
        }
        TypeDescriptor::FixedUnicode(len) => {
            ensure!(len <= MAX_LABEL_LEN, "labels longer than {} bytes", MAX_LABEL_LEN);
            dataset
                .read_raw::<FixedUnicode<MAX_LABEL_LEN>>()?
                .iter()
                .map(|text| text.as_str().to_owned())
                .collect()
        }
        descriptor => bail!(
            "field '{}' has non-string type {:?}",
            dataset.name(),
            descriptor
        ),
    };

    Ok(texts)
}
