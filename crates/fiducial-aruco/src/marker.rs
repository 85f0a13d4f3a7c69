//! Printable marker description and rasterization.

use fiducial_core::GrayImage;
use serde::{Deserialize, Serialize};

use crate::dictionary::{CodeTable, PredefinedDictionary};

/// Which marker to print and how large.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSpec {
    pub dictionary: PredefinedDictionary,
    pub marker_id: i32,
    /// Side length of the output image, in pixels.
    pub side_pixels: u32,
    /// Black border width, in marker cells.
    pub border_bits: u32,
}

impl Default for MarkerSpec {
    fn default() -> Self {
        Self {
            dictionary: PredefinedDictionary::DEFAULT,
            marker_id: 23,
            side_pixels: 600,
            border_bits: 1,
        }
    }
}

/// Largest marker image side, in pixels.
pub const MAX_SIDE_PIXELS: u32 = 16_384;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MarkerSpecError {
    #[error("marker id {id} out of range for {dictionary} ({count} markers)")]
    IdOutOfRange {
        id: i32,
        dictionary: String,
        count: usize,
    },
    #[error("border_bits must be >= 1")]
    NoBorder,
    #[error("{side} px is too small for {cells} cells")]
    TooSmall { side: u32, cells: usize },
    #[error("{side} px exceeds the {max} px limit")]
    TooLarge { side: u32, max: u32 },
}

impl MarkerSpec {
    /// Marker cells per side, border included.
    #[inline]
    pub fn cells_per_side(&self, marker_size: usize) -> usize {
        marker_size + 2 * self.border_bits as usize
    }

    /// Validate against a predefined dictionary.
    pub fn validate(&self) -> Result<(), MarkerSpecError> {
        self.check(
            self.dictionary.name(),
            self.dictionary.marker_size(),
            self.dictionary.marker_count(),
        )
    }

    fn check(&self, name: &str, marker_size: usize, count: usize) -> Result<(), MarkerSpecError> {
        if usize::try_from(self.marker_id).map_or(true, |id| id >= count) {
            return Err(MarkerSpecError::IdOutOfRange {
                id: self.marker_id,
                dictionary: name.to_owned(),
                count,
            });
        }
        if self.border_bits == 0 {
            return Err(MarkerSpecError::NoBorder);
        }
        if self.side_pixels > MAX_SIDE_PIXELS {
            return Err(MarkerSpecError::TooLarge {
                side: self.side_pixels,
                max: MAX_SIDE_PIXELS,
            });
        }
        let cells = self.cells_per_side(marker_size);
        if (self.side_pixels as usize) < cells {
            return Err(MarkerSpecError::TooSmall {
                side: self.side_pixels,
                cells,
            });
        }
        Ok(())
    }

    /// Rasterize this marker from a code table.
    ///
    /// `self.dictionary` is ignored; ids index into `table`.
    pub fn render(&self, table: &CodeTable) -> Result<GrayImage, MarkerSpecError> {
        self.check(&table.name, table.marker_size, table.len())?;
        // Range-checked above.
        let code = table.codes[self.marker_id as usize];
        Ok(render_code(
            code,
            table.marker_size,
            self.border_bits as usize,
            self.side_pixels as usize,
        ))
    }
}

/// Draw one marker code as a square image, black = bit set.
///
/// Cells are mapped to pixels by integer division, so `side` need not be a
/// multiple of the cell count.
pub fn render_code(code: u64, marker_size: usize, border: usize, side: usize) -> GrayImage {
    let cells = marker_size + 2 * border;
    let mut img = GrayImage::filled(side, side, 255);
    if cells == 0 || side == 0 {
        return img;
    }

    let inner = border..border + marker_size;
    for y in 0..side {
        let cy = y * cells / side;
        for x in 0..side {
            let cx = x * cells / side;
            let black = if inner.contains(&cx) && inner.contains(&cy) {
                let idx = (cy - border) * marker_size + (cx - border);
                (code >> idx) & 1 == 1
            } else {
                true
            };
            if black {
                img.data[y * side + x] = 0;
            }
        }
    }
    img
}
