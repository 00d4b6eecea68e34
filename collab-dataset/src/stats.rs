//! Per-episode feature statistics of `meta/episodes_stats.jsonl`.

use crate::common::*;

/// Statistic values of a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatsValues {
    /// One value per vector element.
    Vector(Vec<f64>),
    /// One value per image channel, shaped (C, 1, 1).
    Channels(Vec<[[f64; 1]; 1]>),
}

impl StatsValues {
    /// The values in element or channel order.
    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            Self::Vector(values) => values.clone(),
            Self::Channels(values) => values.iter().map(|&[[value]]| value).collect(),
        }
    }
}

/// The statistics of a feature over the frames of an episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub min: StatsValues,
    pub max: StatsValues,
    pub mean: StatsValues,
    pub std: StatsValues,
    pub count: Vec<usize>,
}

/// Accumulates element-wise statistics frame by frame.
///
/// Image pixels are scaled to [0, 1] and reduced per channel.
#[derive(Debug, Clone)]
pub struct RunningStats {
    is_image: bool,
    count: usize,
    observations: usize,
    min: Vec<f64>,
    max: Vec<f64>,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl RunningStats {
    pub fn vector(dim: usize) -> Self {
        Self {
            is_image: false,
            count: 0,
            observations: 0,
            min: vec![f64::INFINITY; dim],
            max: vec![f64::NEG_INFINITY; dim],
            sum: vec![0.0; dim],
            sum_sq: vec![0.0; dim],
        }
    }

    pub fn image() -> Self {
        Self {
            is_image: true,
            ..Self::vector(3)
        }
    }

    /// The number of accumulated frames.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn push(&mut self, values: &[f64]) -> Result<()> {
        ensure!(!self.is_image, "expect an image for image statistics");
        ensure!(
            values.len() == self.sum.len(),
            "expect {} values, but found {}",
            self.sum.len(),
            values.len()
        );
        self.update(values);
        self.count += 1;
        Ok(())
    }

    pub fn push_image(&mut self, image: &RgbImage) -> Result<()> {
        ensure!(self.is_image, "expect a vector for vector statistics");
        for pixel in image.pixels() {
            let values = pixel.0.map(|value| value as f64 / 255.0);
            self.update(&values);
        }
        self.count += 1;
        Ok(())
    }

    fn update(&mut self, values: &[f64]) {
        for (nth, &value) in values.iter().enumerate() {
            self.min[nth] = self.min[nth].min(value);
            self.max[nth] = self.max[nth].max(value);
            self.sum[nth] += value;
            self.sum_sq[nth] += value * value;
        }
        self.observations += 1;
    }

    /// Population statistics of the accumulated frames.
    pub fn finish(&self) -> Result<FeatureStats> {
        ensure!(self.observations > 0, "no values were accumulated");

        let n = self.observations as f64;
        let mean: Vec<f64> = self.sum.iter().map(|sum| sum / n).collect();
        let std: Vec<f64> = self
            .sum_sq
            .iter()
            .zip(&mean)
            .map(|(sum_sq, mean)| (sum_sq / n - mean * mean).max(0.0).sqrt())
            .collect();

        let values = |values: Vec<f64>| {
            if self.is_image {
                StatsValues::Channels(values.into_iter().map(|value| [[value]]).collect())
            } else {
                StatsValues::Vector(values)
            }
        };

        Ok(FeatureStats {
            min: values(self.min.clone()),
            max: values(self.max.clone()),
            mean: values(mean),
            std: values(std),
            count: vec![self.count],
        })
    }
}
