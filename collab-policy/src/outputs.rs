//! Mapping from model outputs back to Collab actions.

use crate::common::*;

/// The native action width of the Collab dataset.
pub const ACTION_DIM: usize = 8;

/// The model response. Fields other than `actions` are discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutputs {
    pub actions: ArrayD<f32>,
}

/// Actions in the native width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollabActions {
    pub actions: ArrayD<f32>,
}

/// Drop the padded trailing action columns.
pub fn collab_outputs(data: ModelOutputs, action_dim: usize) -> Result<CollabActions> {
    let ModelOutputs { actions } = data;
    ensure!(
        actions.ndim() >= 2,
        "expect actions with at least 2 dimensions, but found shape {:?}",
        actions.shape()
    );

    let axis = Axis(actions.ndim() - 1);
    let width = actions.len_of(axis).min(action_dim);
    if width < action_dim {
        debug!(
            "actions have {} columns, fewer than the native width {}",
            width, action_dim
        );
    }
    let actions = actions.slice_axis(axis, Slice::from(..width)).to_owned();

    Ok(CollabActions { actions })
}
