pub use anyhow::{ensure, Result};
pub use indexmap::IndexMap;
pub use log::debug;
pub use ndarray::{ArrayD, Axis, IxDyn, Slice};
pub use serde::{Deserialize, Serialize};
pub use strum::{AsRefStr, Display, EnumString};
