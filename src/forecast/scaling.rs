//! Min-max scaling into `[0, 1]`.

use crate::error::{RainfallError, Result};

/// Scaling parameters captured from a fitting slice, kept to invert forecasts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    /// Captures min and max of `data`.
    ///
    /// Fails with [`RainfallError::DegenerateSeries`] when every value is the
    /// same, and with [`RainfallError::InsufficientData`] on empty input.
    pub fn fit(data: &[f64]) -> Result<Self> {
        if data.is_empty() {
            return Err(RainfallError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let min = data.iter().copied().fold(f64::INFINITY, f64::min);
        let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if (max - min).abs() < f64::EPSILON * max.abs().max(1.0) {
            return Err(RainfallError::DegenerateSeries { value: min });
        }

        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn transform(&self, data: &[f64]) -> Vec<f64> {
        let range = self.max - self.min;
        data.iter().map(|x| (x - self.min) / range).collect()
    }

    /// Maps scaled values back to millimetres. Values outside `[0, 1]` map
    /// outside `[min, max]`; nothing is clamped.
    pub fn inverse_transform(&self, data: &[f64]) -> Vec<f64> {
        let range = self.max - self.min;
        data.iter().map(|x| x * range + self.min).collect()
    }
}
