//! Reader for YAML written by OpenCV's `FileStorage`.
//!
//! OpenCV emits a non-standard `%YAML:1.0` directive and tags matrices with
//! `!!opencv-matrix`. Both are stripped before handing the text to
//! `serde_yaml`; everything else is plain YAML.

use serde::de::DeserializeOwned;
use serde::Deserialize;

const MATRIX_TAGS: [&str; 2] = ["!!opencv-matrix", "!!opencv-nd-matrix"];

/// Remove the OpenCV-specific directive line and matrix tags.
pub fn strip_opencv_yaml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for line in raw.lines() {
        if line.trim_start().starts_with("%YAML") {
            continue;
        }
        let mut line = line.to_owned();
        for tag in MATRIX_TAGS {
            line = line.replace(tag, "");
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Deserialize an OpenCV `FileStorage` YAML document.
pub fn from_opencv_yaml<T: DeserializeOwned>(raw: &str) -> Result<T, serde_yaml::Error> {
    serde_yaml::from_str(&strip_opencv_yaml(raw))
}

/// A matrix as it may appear in a YAML parameter file.
///
/// Accepts OpenCV's `{rows, cols, dt, data}` node, a list of rows, or a
/// flat list (treated as a single row).
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum MatrixNode {
    OpenCv {
        rows: usize,
        cols: usize,
        #[serde(default)]
        dt: Option<String>,
        data: Vec<f64>,
    },
    Rows(Vec<Vec<f64>>),
    Flat(Vec<f64>),
}

/// Shape mismatch inside a [`MatrixNode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("matrix declares {rows}x{cols} but holds {len} values")]
pub struct MatrixShapeError {
    pub rows: usize,
    pub cols: usize,
    pub len: usize,
}

impl MatrixNode {
    /// Flatten into `(rows, cols, row-major data)`.
    pub fn into_parts(self) -> Result<(usize, usize, Vec<f64>), MatrixShapeError> {
        match self {
            MatrixNode::OpenCv { rows, cols, data, .. } => {
                if rows.checked_mul(cols) != Some(data.len()) {
                    return Err(MatrixShapeError {
                        rows,
                        cols,
                        len: data.len(),
                    });
                }
                Ok((rows, cols, data))
            }
            MatrixNode::Rows(rows) => {
                let n_rows = rows.len();
                let n_cols = rows.first().map_or(0, Vec::len);
                let data: Vec<f64> = rows.into_iter().flatten().collect();
                if n_rows.checked_mul(n_cols) != Some(data.len()) {
                    return Err(MatrixShapeError {
                        rows: n_rows,
                        cols: n_cols,
                        len: data.len(),
                    });
                }
                Ok((n_rows, n_cols, data))
            }
            MatrixNode::Flat(data) => Ok((1, data.len(), data)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Doc {
        m: MatrixNode,
        width: u32,
    }

    const OPENCV_DOC: &str = "%YAML:1.0\n---\nwidth: 640\nm: !!opencv-matrix\n   rows: 2\n   cols: 2\n   dt: d\n   data: [ 1., 2.5e+00, 3, 4. ]\n";

    #[test]
    fn parses_opencv_filestorage_matrix() {
        let doc: Doc = from_opencv_yaml(OPENCV_DOC).expect("parse");
        assert_eq!(doc.width, 640);
        let (rows, cols, data) = doc.m.into_parts().expect("shape");
        assert_eq!((rows, cols), (2, 2));
        assert_eq!(data, vec![1.0, 2.5, 3.0, 4.0]);
    }

    #[test]
    fn nested_rows_must_be_rectangular() {
        let doc: Doc = from_opencv_yaml("width: 1\nm: [[1, 2], [3]]\n").expect("parse");
        let err = doc.m.into_parts().unwrap_err();
        assert_eq!(
            err,
            MatrixShapeError {
                rows: 2,
                cols: 2,
                len: 3
            }
        );
    }

    #[test]
    fn declared_shape_is_checked() {
        let raw = "width: 1\nm:\n  rows: 3\n  cols: 3\n  data: [1, 2]\n";
        let doc: Doc = from_opencv_yaml(raw).expect("parse");
        assert!(doc.m.into_parts().is_err());
    }

    #[test]
    fn oversized_shape_is_a_shape_error() {
        let raw = format!("width: 1\nm:\n  rows: {}\n  cols: 2\n  data: [1, 2]\n", usize::MAX);
        let doc: Doc = from_opencv_yaml(&raw).expect("parse");
        let err = doc.m.into_parts().unwrap_err();
        assert_eq!(err.rows, usize::MAX);
        assert_eq!(err.len, 2);
    }
}
