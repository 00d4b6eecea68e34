pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use image::{imageops::FilterType, ImageFormat, RgbImage};
pub use indexmap::{IndexMap, IndexSet};
pub use itertools::Itertools as _;
pub use log::{debug, error, info, warn};
pub use ndarray::{concatenate, Array1, Array2, ArrayD, ArrayView1, Axis, Ix2};
pub use serde::{de::DeserializeOwned, Deserialize, Serialize};
pub use std::{
    env,
    fs::{self, File, OpenOptions},
    io::{BufReader, BufWriter, Write as _},
    iter, mem,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
    thread::{self, JoinHandle},
};

