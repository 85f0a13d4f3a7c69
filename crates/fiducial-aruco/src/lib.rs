//! ArUco marker definitions.
//!
//! This crate focuses on:
//! - the catalogue of predefined dictionaries a vision backend provides,
//! - detector tuning parameters (with OpenCV's parameter-file spelling),
//! - describing a printable marker and rasterizing it from a local code table.
//!
//! It does **not** detect markers; that is the vision backend's job.

mod dictionary;
mod marker;
mod params;

pub use dictionary::{CodeTable, DictionaryError, PredefinedDictionary};
pub use marker::{render_code, MarkerSpec, MarkerSpecError, MAX_SIDE_PIXELS};
pub use params::{CornerRefinement, DetectorParams, DetectorParamsError};
