//! Bounded angle sampling and summary statistics.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sink::{SinkError, StatisticsSink};

/// Samples collected per sampling session.
pub const SAMPLE_QUOTA: usize = 50;

/// Mean and population standard deviation of a completed sample window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub mean: f64,
    pub std_dev: f64,
    pub count: usize,
}

impl Statistics {
    /// Population statistics (divisor `n`) of `samples`; `None` when empty.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
        Some(Self {
            mean,
            std_dev: var.sqrt(),
            count: samples.len(),
        })
    }
}

impl fmt::Display for Statistics {
    /// The statistics log line: `mean: <mean>  std dev: <std>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mean: {}  std dev: {}", self.mean, self.std_dev)
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum StatisticsError {
    #[error("sample window incomplete ({have}/{need})")]
    Incomplete { have: usize, need: usize },
}

/// Append-only, fixed-capacity sequence of angle samples (degrees).
#[derive(Clone, Debug)]
pub struct SampleCollector {
    samples: Vec<f64>,
    capacity: usize,
}

impl Default for SampleCollector {
    fn default() -> Self {
        Self::with_capacity(SAMPLE_QUOTA)
    }
}

impl SampleCollector {
    /// Collector that completes after `capacity` samples.
    ///
    /// # Panics
    /// If `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "sample capacity must be positive");
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one angle. Ignored once the window is full; returns whether
    /// the sample was kept.
    pub fn record(&mut self, angle_degrees: f64) -> bool {
        if self.is_complete() {
            return false;
        }
        self.samples.push(angle_degrees);
        true
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.samples.len() == self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Statistics over the full window.
    pub fn compute_statistics(&self) -> Result<Statistics, StatisticsError> {
        if !self.is_complete() {
            return Err(StatisticsError::Incomplete {
                have: self.samples.len(),
                need: self.capacity,
            });
        }
        // A complete window is never empty.
        Statistics::from_samples(&self.samples).ok_or(StatisticsError::Incomplete {
            have: 0,
            need: self.capacity,
        })
    }

    /// Compute the statistics and hand them to `sink`, consuming the window.
    pub fn finish(self, sink: &mut dyn StatisticsSink) -> Result<Statistics, FinishError> {
        let stats = self.compute_statistics()?;
        sink.persist(&stats)?;
        Ok(stats)
    }
}

/// Failure while finishing a sample window.
#[derive(thiserror::Error, Debug)]
pub enum FinishError {
    #[error(transparent)]
    Statistics(#[from] StatisticsError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}
