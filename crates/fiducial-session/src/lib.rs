//! Interactive fiducial session.
//!
//! A menu drives three operations against a vision backend: printing a
//! marker, watching markers live, and watching while sampling one rotation
//! angle per marker until a fixed window fills. The window's mean and
//! population standard deviation are appended to a text log.
//!
//! The backend is abstracted by the traits in [`capability`]; this crate
//! holds no vision code of its own.
//!
//! ## Quickstart
//!
//! ```ignore
//! use fiducial_session::{Session, SessionConfig, SessionController};
//!
//! let config = SessionConfig::load_or_default("fiducial.json")?;
//! let session = Session::new(config, backend)?;
//! let stdin = std::io::stdin();
//! SessionController::new(session).run(stdin.lock(), &mut std::io::stdout())?;
//! ```

pub mod capability;
mod config;
mod detection;
mod error;
mod menu;
mod session;
mod sink;
mod stats;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, SessionConfig, DEFAULT_CONFIG_PATH};
pub use detection::{DetectionLoop, DetectionSummary, LoopOutcome, LoopSettings};
pub use error::{SessionError, VisionError};
pub use menu::{parse_choice, MenuExit, OperationMode, Operations, SessionController};
pub use session::Session;
pub use sink::{MemorySink, SinkError, StatisticsLog, StatisticsSink, DEFAULT_STATS_LOG};
pub use stats::{FinishError, SampleCollector, Statistics, StatisticsError, SAMPLE_QUOTA};
