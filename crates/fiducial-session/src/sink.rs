//! Destinations for completed statistics.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::stats::Statistics;

/// Default statistics log file.
pub const DEFAULT_STATS_LOG: &str = "testData.txt";

/// Receives the statistics of each completed sample window.
pub trait StatisticsSink {
    fn persist(&mut self, stats: &Statistics) -> Result<(), SinkError>;
}

#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("cannot open statistics log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write statistics log {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Append-only text log, one `mean: X  std dev: Y` line per window.
///
/// The file is opened and closed on every write.
#[derive(Clone, Debug)]
pub struct StatisticsLog {
    path: PathBuf,
}

impl StatisticsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for StatisticsLog {
    fn default() -> Self {
        Self::new(DEFAULT_STATS_LOG)
    }
}

impl StatisticsSink for StatisticsLog {
    fn persist(&mut self, stats: &Statistics) -> Result<(), SinkError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| SinkError::Open {
                path: self.path.clone(),
                source,
            })?;
        writeln!(file, "{stats}")
            .and_then(|()| file.flush())
            .map_err(|source| SinkError::Write {
                path: self.path.clone(),
                source,
            })?;
        log::info!("appended statistics to {}", self.path.display());
        Ok(())
    }
}

/// Keeps statistics in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub records: Vec<Statistics>,
}

impl StatisticsSink for MemorySink {
    fn persist(&mut self, stats: &Statistics) -> Result<(), SinkError> {
        self.records.push(*stats);
        Ok(())
    }
}
