//! Marker dictionaries.
//!
//! [`PredefinedDictionary`] names the dictionaries a vision backend ships
//! with (OpenCV numbering). [`CodeTable`] is a dictionary whose codes are
//! known locally, loaded from JSON, and can be rasterized without a backend.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Dictionaries predefined by OpenCV, in OpenCV's numbering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PredefinedDictionary {
    Dict4x4_50,
    Dict4x4_100,
    Dict4x4_250,
    Dict4x4_1000,
    Dict5x5_50,
    Dict5x5_100,
    Dict5x5_250,
    Dict5x5_1000,
    Dict6x6_50,
    Dict6x6_100,
    Dict6x6_250,
    Dict6x6_1000,
    Dict7x7_50,
    Dict7x7_100,
    Dict7x7_250,
    Dict7x7_1000,
    ArucoOriginal,
    AprilTag16h5,
    AprilTag25h9,
    AprilTag36h10,
    AprilTag36h11,
}

struct Entry {
    dict: PredefinedDictionary,
    name: &'static str,
    marker_size: usize,
    marker_count: usize,
}

use PredefinedDictionary as P;

#[rustfmt::skip]
const CATALOGUE: [Entry; 21] = [
    Entry { dict: P::Dict4x4_50, name: "DICT_4X4_50", marker_size: 4, marker_count: 50 },
    Entry { dict: P::Dict4x4_100, name: "DICT_4X4_100", marker_size: 4, marker_count: 100 },
    Entry { dict: P::Dict4x4_250, name: "DICT_4X4_250", marker_size: 4, marker_count: 250 },
    Entry { dict: P::Dict4x4_1000, name: "DICT_4X4_1000", marker_size: 4, marker_count: 1000 },
    Entry { dict: P::Dict5x5_50, name: "DICT_5X5_50", marker_size: 5, marker_count: 50 },
    Entry { dict: P::Dict5x5_100, name: "DICT_5X5_100", marker_size: 5, marker_count: 100 },
    Entry { dict: P::Dict5x5_250, name: "DICT_5X5_250", marker_size: 5, marker_count: 250 },
    Entry { dict: P::Dict5x5_1000, name: "DICT_5X5_1000", marker_size: 5, marker_count: 1000 },
    Entry { dict: P::Dict6x6_50, name: "DICT_6X6_50", marker_size: 6, marker_count: 50 },
    Entry { dict: P::Dict6x6_100, name: "DICT_6X6_100", marker_size: 6, marker_count: 100 },
    Entry { dict: P::Dict6x6_250, name: "DICT_6X6_250", marker_size: 6, marker_count: 250 },
    Entry { dict: P::Dict6x6_1000, name: "DICT_6X6_1000", marker_size: 6, marker_count: 1000 },
    Entry { dict: P::Dict7x7_50, name: "DICT_7X7_50", marker_size: 7, marker_count: 50 },
    Entry { dict: P::Dict7x7_100, name: "DICT_7X7_100", marker_size: 7, marker_count: 100 },
    Entry { dict: P::Dict7x7_250, name: "DICT_7X7_250", marker_size: 7, marker_count: 250 },
    Entry { dict: P::Dict7x7_1000, name: "DICT_7X7_1000", marker_size: 7, marker_count: 1000 },
    Entry { dict: P::ArucoOriginal, name: "DICT_ARUCO_ORIGINAL", marker_size: 5, marker_count: 1024 },
    Entry { dict: P::AprilTag16h5, name: "DICT_APRILTAG_16h5", marker_size: 4, marker_count: 30 },
    Entry { dict: P::AprilTag25h9, name: "DICT_APRILTAG_25h9", marker_size: 5, marker_count: 35 },
    Entry { dict: P::AprilTag36h10, name: "DICT_APRILTAG_36h10", marker_size: 6, marker_count: 2320 },
    Entry { dict: P::AprilTag36h11, name: "DICT_APRILTAG_36h11", marker_size: 6, marker_count: 587 },
];

#[derive(thiserror::Error, Debug)]
pub enum DictionaryError {
    #[error("unknown dictionary id {0} (expected 0..=20)")]
    UnknownId(i64),
    #[error("unknown dictionary name `{0}`")]
    UnknownName(String),
    #[error("failed to read dictionary file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse dictionary file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dictionary `{name}` has no codes")]
    Empty { name: String },
    #[error("marker_size {0} needs more than 64 bits")]
    TooManyBits(usize),
    #[error("code for marker {id} has bits beyond the {bits}-bit payload")]
    StrayBits { id: usize, bits: usize },
}

impl PredefinedDictionary {
    /// `DICT_6X6_250`, id 10.
    pub const DEFAULT: Self = Self::Dict6x6_250;

    pub fn all() -> impl Iterator<Item = Self> {
        CATALOGUE.iter().map(|e| e.dict)
    }

    fn entry(self) -> &'static Entry {
        &CATALOGUE[self.id() as usize]
    }

    /// OpenCV numeric identifier.
    #[inline]
    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn from_id(id: i64) -> Result<Self, DictionaryError> {
        usize::try_from(id)
            .ok()
            .and_then(|i| CATALOGUE.get(i))
            .map(|e| e.dict)
            .ok_or(DictionaryError::UnknownId(id))
    }

    /// OpenCV constant name, e.g. `DICT_6X6_250`.
    pub fn name(self) -> &'static str {
        self.entry().name
    }

    /// Inner bits per marker side.
    pub fn marker_size(self) -> usize {
        self.entry().marker_size
    }

    /// Number of markers (valid ids are `0..marker_count`).
    pub fn marker_count(self) -> usize {
        self.entry().marker_count
    }
}

impl Default for PredefinedDictionary {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for PredefinedDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PredefinedDictionary {
    type Err = DictionaryError;

    /// Accepts `DICT_6X6_250`, `6X6_250` or `dict_6x6_250` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        let wanted = wanted.strip_prefix("DICT_").unwrap_or(&wanted);
        CATALOGUE
            .iter()
            .find(|e| e.name[5..].eq_ignore_ascii_case(wanted))
            .map(|e| e.dict)
            .ok_or_else(|| DictionaryError::UnknownName(s.to_owned()))
    }
}

impl Serialize for PredefinedDictionary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DictionaryRepr {
    Id(i64),
    Name(String),
}

impl<'de> Deserialize<'de> for PredefinedDictionary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parsed = match DictionaryRepr::deserialize(deserializer)? {
            DictionaryRepr::Id(id) => Self::from_id(id),
            DictionaryRepr::Name(name) => name.parse(),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

/// A dictionary with locally known codes.
///
/// One `u64` per marker id, encoding the inner `marker_size × marker_size`
/// bits in row-major order, least significant bit first, **black = 1**.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTable {
    pub name: String,
    pub marker_size: usize,
    #[serde(default)]
    pub max_correction_bits: u8,
    pub codes: Vec<u64>,
}

impl CodeTable {
    /// Validate and build a code table.
    pub fn new(
        name: impl Into<String>,
        marker_size: usize,
        max_correction_bits: u8,
        codes: Vec<u64>,
    ) -> Result<Self, DictionaryError> {
        let table = Self {
            name: name.into(),
            marker_size,
            max_correction_bits,
            codes,
        };
        table.validate()?;
        Ok(table)
    }

    /// Load a JSON code table (`{"name", "marker_size", "max_correction_bits", "codes"}`).
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let raw = fs::read_to_string(path)?;
        let table: Self = serde_json::from_str(&raw)?;
        table.validate()?;
        Ok(table)
    }

    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn code(&self, id: usize) -> Option<u64> {
        self.codes.get(id).copied()
    }

    fn validate(&self) -> Result<(), DictionaryError> {
        let bits = self.bit_count();
        if bits > 64 {
            return Err(DictionaryError::TooManyBits(self.marker_size));
        }
        if self.codes.is_empty() {
            return Err(DictionaryError::Empty {
                name: self.name.clone(),
            });
        }
        if bits < 64 {
            let mask = !((1u64 << bits) - 1);
            if let Some(id) = self.codes.iter().position(|c| c & mask != 0) {
                return Err(DictionaryError::StrayBits { id, bits });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn catalogue_is_indexed_by_opencv_id() {
        for (i, dict) in PredefinedDictionary::all().enumerate() {
            assert_eq!(dict.id() as usize, i);
            assert_eq!(PredefinedDictionary::from_id(i as i64).unwrap(), dict);
        }
        assert_eq!(PredefinedDictionary::DEFAULT.id(), 10);
        assert_eq!(PredefinedDictionary::DEFAULT.name(), "DICT_6X6_250");
        assert!(PredefinedDictionary::from_id(21).is_err());
        assert!(PredefinedDictionary::from_id(-1).is_err());
    }

    #[test]
    fn parses_names_loosely() {
        assert_eq!(
            "dict_4x4_50".parse::<PredefinedDictionary>().unwrap(),
            PredefinedDictionary::Dict4x4_50
        );
        assert_eq!(
            "APRILTAG_36h11".parse::<PredefinedDictionary>().unwrap(),
            PredefinedDictionary::AprilTag36h11
        );
        assert!("DICT_9X9_1".parse::<PredefinedDictionary>().is_err());
    }

    #[test]
    fn deserializes_from_name_or_id() {
        let by_name: PredefinedDictionary = serde_json::from_str("\"DICT_5X5_100\"").unwrap();
        let by_id: PredefinedDictionary = serde_json::from_str("5").unwrap();
        assert_eq!(by_name, by_id);
        assert_eq!(serde_json::to_string(&by_id).unwrap(), "\"DICT_5X5_100\"");
        assert!(serde_json::from_str::<PredefinedDictionary>("99").is_err());
    }

    #[test]
    fn code_table_rejects_stray_bits() {
        let err = CodeTable::new("tiny", 2, 0, vec![0b1010, 0b1_0000]).unwrap_err();
        assert!(matches!(err, DictionaryError::StrayBits { id: 1, bits: 4 }));
        assert!(CodeTable::new("empty", 4, 0, vec![]).is_err());
        assert!(CodeTable::new("huge", 9, 0, vec![1]).is_err());
    }

    #[test]
    fn loads_code_table_json() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{"name":"DICT_TEST","marker_size":4,"max_correction_bits":1,"codes":[181,50118]}}"#
        )
        .expect("write");

        let table = CodeTable::load_json(file.path()).expect("load");
        assert_eq!(table.len(), 2);
        assert_eq!(table.bit_count(), 16);
        assert_eq!(table.code(1), Some(50118));
        assert_eq!(table.code(2), None);
    }
}
