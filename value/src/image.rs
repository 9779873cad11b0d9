//! Image payloads.

use std::fmt;

/// Pixel storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::Display, strum::AsRefStr)]
pub enum ImageFormat {
    Rgba8,
    Rgb8,
    L8,
    Bc1,
    Bc3,
}

impl ImageFormat {
    /// Bytes per pixel for uncompressed formats, `None` for block-compressed ones.
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            Self::Rgba8 => Some(4),
            Self::Rgb8 => Some(3),
            Self::L8 => Some(1),
            Self::Bc1 | Self::Bc3 => None,
        }
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageSize {
    pub width: u16,
    pub height: u16,
}

impl ImageSize {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A concrete image: dimensions, format, mip count and raw pixel bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Image {
    pub size: ImageSize,
    pub format: ImageFormat,
    pub lods: u8,
    pub data: Vec<u8>,
}

impl Image {
    /// Single-LOD image filled with one colour.
    ///
    /// Block-compressed formats are filled as if they were `Rgba8`; the
    /// bytes only matter for identity here, not for decoding.
    pub fn plain(size: ImageSize, format: ImageFormat, rgba: [u8; 4]) -> Self {
        let bpp = format.bytes_per_pixel().unwrap_or(4);
        let mut data = Vec::with_capacity(size.pixels() as usize * bpp);
        for _ in 0..size.pixels() {
            data.extend_from_slice(&rgba[..bpp]);
        }
        Self { size, format, lods: 1, data }
    }
}
