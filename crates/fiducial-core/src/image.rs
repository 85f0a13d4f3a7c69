use std::path::Path;

/// Owned 8-bit grayscale image, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

/// Errors raised when writing images to disk.
#[derive(thiserror::Error, Debug)]
pub enum ImageWriteError {
    #[error("image buffer length {got} does not match {width}x{height}")]
    BadBuffer {
        width: usize,
        height: usize,
        got: usize,
    },
    #[error("image dimensions {width}x{height} exceed u32")]
    TooLarge { width: usize, height: usize },
    #[error(transparent)]
    Encode(#[from] ::image::ImageError),
}

impl GrayImage {
    /// Image filled with a single intensity.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Convert into an `image::GrayImage`.
    pub fn to_luma8(&self) -> Result<::image::GrayImage, ImageWriteError> {
        let (w, h) = self.dims_u32()?;
        ::image::GrayImage::from_raw(w, h, self.data.clone()).ok_or(ImageWriteError::BadBuffer {
            width: self.width,
            height: self.height,
            got: self.data.len(),
        })
    }

    /// Write the image; the format follows the path extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ImageWriteError> {
        self.to_luma8()?.save(path)?;
        Ok(())
    }

    fn dims_u32(&self) -> Result<(u32, u32), ImageWriteError> {
        let too_large = || ImageWriteError::TooLarge {
            width: self.width,
            height: self.height,
        };
        let w = u32::try_from(self.width).map_err(|_| too_large())?;
        let h = u32::try_from(self.height).map_err(|_| too_large())?;
        Ok((w, h))
    }
}
