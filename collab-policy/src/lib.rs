//! Input and output mappings between Collab observations and pi0-family policies.

mod common;
pub mod example;
pub mod image;
pub mod inputs;
pub mod model_type;
pub mod outputs;

pub use example::make_collab_example;
pub use image::{parse_image, ImageArray};
pub use inputs::{collab_inputs, CollabObservation, ModelInputs};
pub use model_type::ModelType;
pub use outputs::{collab_outputs, CollabActions, ModelOutputs, ACTION_DIM};
