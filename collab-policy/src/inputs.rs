//! Mapping from Collab observations to model inputs.

use crate::{
    common::*,
    image::{parse_image, ImageArray},
    model_type::ModelType,
};

pub const BASE_IMAGE_KEY: &str = "base_0_rgb";
pub const LEFT_WRIST_IMAGE_KEY: &str = "left_wrist_0_rgb";
pub const RIGHT_WRIST_IMAGE_KEY: &str = "right_wrist_0_rgb";

/// An observation in the dataset/client naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollabObservation {
    #[serde(rename = "observation/state")]
    pub state: ArrayD<f32>,
    #[serde(rename = "observation/mount_image")]
    pub mount_image: ImageArray,
    #[serde(rename = "observation/gripper_image")]
    pub gripper_image: ImageArray,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<ArrayD<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// An observation in the model naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInputs {
    pub state: ArrayD<f32>,
    pub image: IndexMap<String, ArrayD<u8>>,
    pub image_mask: IndexMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<ArrayD<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// Rename the observation fields and fill the image slots the model expects.
///
/// The right wrist slot has no camera in the source data. It holds a zero
/// image shaped like the mount image.
pub fn collab_inputs(data: CollabObservation, model_type: ModelType) -> ModelInputs {
    let CollabObservation {
        state,
        mount_image,
        gripper_image,
        actions,
        prompt,
    } = data;

    let base_image = parse_image(mount_image);
    let wrist_image = parse_image(gripper_image);
    let padding_image = ArrayD::zeros(base_image.raw_dim());

    let image: IndexMap<_, _> = [
        (BASE_IMAGE_KEY.to_string(), base_image),
        (LEFT_WRIST_IMAGE_KEY.to_string(), wrist_image),
        (RIGHT_WRIST_IMAGE_KEY.to_string(), padding_image),
    ]
    .into_iter()
    .collect();
    let image_mask: IndexMap<_, _> = [
        (BASE_IMAGE_KEY.to_string(), true),
        (LEFT_WRIST_IMAGE_KEY.to_string(), true),
        (
            RIGHT_WRIST_IMAGE_KEY.to_string(),
            model_type.padding_image_mask(),
        ),
    ]
    .into_iter()
    .collect();

    ModelInputs {
        state,
        image,
        image_mask,
        actions,
        prompt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn observation() -> CollabObservation {
        CollabObservation {
            state: Array::from_shape_fn(IxDyn(&[8]), |ix| ix[0] as f32),
            mount_image: Array::from_elem(IxDyn(&[3, 4, 6]), 0.5f32).into(),
            gripper_image: Array::from_elem(IxDyn(&[4, 6, 3]), 9u8).into(),
            actions: None,
            prompt: None,
        }
    }

    #[test]
    fn image_slots_test() {
        let inputs = collab_inputs(observation(), ModelType::Pi0);

        let keys: Vec<_> = inputs.image.keys().map(String::as_str).collect();
        assert_eq!(keys, [BASE_IMAGE_KEY, LEFT_WRIST_IMAGE_KEY, RIGHT_WRIST_IMAGE_KEY]);

        let base = &inputs.image[BASE_IMAGE_KEY];
        assert_eq!(base.shape(), [4, 6, 3]);
        assert!(base.iter().all(|&value| value == 127));

        let wrist = &inputs.image[LEFT_WRIST_IMAGE_KEY];
        assert!(wrist.iter().all(|&value| value == 9));

        let padding = &inputs.image[RIGHT_WRIST_IMAGE_KEY];
        assert_eq!(padding.shape(), base.shape());
        assert!(padding.iter().all(|&value| value == 0));

        assert_eq!(inputs.state, observation().state);
    }

    #[test]
    fn image_mask_test() {
        for (model_type, expect) in [
            (ModelType::Pi0, false),
            (ModelType::Pi0Fast, true),
            (ModelType::Pi05, false),
        ] {
            let inputs = collab_inputs(observation(), model_type);
            assert!(inputs.image_mask[BASE_IMAGE_KEY]);
            assert!(inputs.image_mask[LEFT_WRIST_IMAGE_KEY]);
            assert_eq!(inputs.image_mask[RIGHT_WRIST_IMAGE_KEY], expect);
        }
    }

    #[test]
    fn optional_fields_test() -> Result<()> {
        let inputs = collab_inputs(observation(), ModelType::Pi0);
        assert_eq!(inputs.actions, None);
        assert_eq!(inputs.prompt, None);

        let json = serde_json::to_value(&inputs)?;
        assert!(json.get("actions").is_none());
        assert!(json.get("prompt").is_none());

        let actions = Array::from_elem(IxDyn(&[10, 8]), 0.25f32);
        let data = CollabObservation {
            actions: Some(actions.clone()),
            prompt: Some("hand over the cup".to_string()),
            ..observation()
        };
        let inputs = collab_inputs(data, ModelType::Pi0);
        assert_eq!(inputs.actions, Some(actions));
        assert_eq!(inputs.prompt.as_deref(), Some("hand over the cup"));
        Ok(())
    }

    #[test]
    fn deserialize_observation_test() -> Result<()> {
        let data: CollabObservation = serde_json::from_value(serde_json::json!({
            "observation/state": { "v": 1, "dim": [2], "data": [0.5, 1.5] },
            "observation/mount_image": { "v": 1, "dim": [1, 1, 3], "data": [1, 2, 3] },
            "observation/gripper_image": { "v": 1, "dim": [1, 1, 3], "data": [0.0, 0.5, 1.0] },
            "prompt": "pick up the object",
        }))?;

        assert!(matches!(data.mount_image, ImageArray::U8(_)));
        assert!(matches!(data.gripper_image, ImageArray::F32(_)));
        assert_eq!(data.actions, None);

        let inputs = collab_inputs(data, ModelType::Pi0Fast);
        assert_eq!(
            inputs.image[LEFT_WRIST_IMAGE_KEY].as_slice(),
            Some(&[0u8, 127, 255][..])
        );
        assert_eq!(inputs.prompt.as_deref(), Some("pick up the object"));
        Ok(())
    }
}
