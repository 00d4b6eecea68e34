//! Per-field schema of the emitted dataset.

use crate::common::*;

/// Number of elements of a pose vector, xyz position followed by a quaternion.
pub const POSE_DIM: usize = 7;
/// Width of the state vector, the current pose followed by the gripper reading.
pub const STATE_DIM: usize = POSE_DIM + 1;
/// Width of the action vector, the desired pose followed by the gripper command.
pub const ACTION_DIM: usize = POSE_DIM + 1;

pub const MOUNT_IMAGE_KEY: &str = "mount_image";
pub const GRIPPER_IMAGE_KEY: &str = "gripper_image";
pub const STATE_KEY: &str = "state";
pub const ACTIONS_KEY: &str = "actions";

/// The image features in the order they are stored in a frame.
pub const IMAGE_KEYS: [&str; 2] = [MOUNT_IMAGE_KEY, GRIPPER_IMAGE_KEY];

/// The element type of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    Video,
    Image,
    Bool,
    Float32,
    Float64,
    Int64,
    String,
}

/// The declaration of a single dataset field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub dtype: DType,
    pub shape: Vec<usize>,
    pub names: Option<Vec<String>>,
}

impl Feature {
    pub fn new(dtype: DType, shape: impl Into<Vec<usize>>) -> Self {
        Self {
            dtype,
            shape: shape.into(),
            names: None,
        }
    }

    pub fn with_names<S>(mut self, names: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<String>,
    {
        self.names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Builds an RGB image feature of `height` × `width` × 3.
    pub fn image(width: u32, height: u32) -> Self {
        Self::new(DType::Image, [height as usize, width as usize, 3]).with_names([
            "height", "width", "channel",
        ])
    }

    /// Returns the (width, height) of an image feature.
    pub fn image_size(&self) -> Option<(u32, u32)> {
        match (self.dtype, self.shape.as_slice()) {
            (DType::Image | DType::Video, &[height, width, 3]) => {
                Some((width as u32, height as u32))
            }
            _ => None,
        }
    }
}

/// The user-facing features written by the episode converter.
pub fn collab_features(width: u32, height: u32) -> IndexMap<String, Feature> {
    let mut features = IndexMap::new();
    features.insert(MOUNT_IMAGE_KEY.to_string(), Feature::image(width, height));
    features.insert(GRIPPER_IMAGE_KEY.to_string(), Feature::image(width, height));
    features.insert(
        STATE_KEY.to_string(),
        Feature::new(DType::Float32, [STATE_DIM]).with_names([STATE_KEY]),
    );
    features.insert(
        ACTIONS_KEY.to_string(),
        Feature::new(DType::Float32, [ACTION_DIM]).with_names([ACTIONS_KEY]),
    );
    features
}

/// The bookkeeping features appended to every dataset.
pub fn default_features() -> IndexMap<String, Feature> {
    [
        ("timestamp", DType::Float32),
        ("frame_index", DType::Int64),
        ("episode_index", DType::Int64),
        ("index", DType::Int64),
        ("task_index", DType::Int64),
    ]
    .into_iter()
    .map(|(name, dtype)| (name.to_string(), Feature::new(dtype, [1])))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collab_features_test() {
        let features = collab_features(320, 240);
        let keys: Vec<_> = features.keys().map(String::as_str).collect();
        assert_eq!(keys, ["mount_image", "gripper_image", "state", "actions"]);

        let mount = &features[MOUNT_IMAGE_KEY];
        assert_eq!(mount.shape, [240, 320, 3]);
        assert_eq!(mount.image_size(), Some((320, 240)));
        assert_eq!(features[STATE_KEY].shape, [8]);
        assert_eq!(features[ACTIONS_KEY].shape, [8]);
        assert_eq!(features[STATE_KEY].image_size(), None);
    }

    #[test]
    fn feature_json_test() -> Result<()> {
        let text = serde_json::to_string(&Feature::image(224, 224))?;
        assert_eq!(
            text,
            r#"{"dtype":"image","shape":[224,224,3],"names":["height","width","channel"]}"#
        );

        let feature: Feature = serde_json::from_str(r#"{"dtype":"int64","shape":[1],"names":null}"#)?;
        assert_eq!(feature, Feature::new(DType::Int64, [1]));
        Ok(())
    }
}
