use crate::{common::*, inputs::CollabObservation};
use ndarray::Array;
use rand::prelude::*;

pub const EXAMPLE_IMAGE_SIZE: usize = 224;
pub const EXAMPLE_STATE_DIM: usize = 8;
pub const EXAMPLE_PROMPT: &str = "pick up the object";

/// Create a random observation to smoke test a policy.
pub fn make_collab_example<R>(rng: &mut R) -> CollabObservation
where
    R: Rng + ?Sized,
{
    let state = Array::from_shape_fn(IxDyn(&[EXAMPLE_STATE_DIM]), |_| rng.gen::<f32>());
    let mount_image = random_image(rng);
    let gripper_image = random_image(rng);

    CollabObservation {
        state,
        mount_image: mount_image.into(),
        gripper_image: gripper_image.into(),
        actions: None,
        prompt: Some(EXAMPLE_PROMPT.to_string()),
    }
}

fn random_image<R>(rng: &mut R) -> ArrayD<u8>
where
    R: Rng + ?Sized,
{
    Array::from_shape_fn(
        IxDyn(&[EXAMPLE_IMAGE_SIZE, EXAMPLE_IMAGE_SIZE, 3]),
        |_| rng.gen::<u8>(),
    )
}
