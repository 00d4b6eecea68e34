use crate::common::*;

/// The policy model variant that consumes the inputs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelType {
    Pi0,
    Pi0Fast,
    Pi05,
}

impl ModelType {
    /// The presence mask assigned to placeholder image slots.
    ///
    /// The FAST variant does not mask out padding images.
    pub fn padding_image_mask(&self) -> bool {
        matches!(self, Self::Pi0Fast)
    }
}
