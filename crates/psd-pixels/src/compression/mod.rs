//! Channel compression schemes.
//!
//! | Code | Scheme | Unit |
//! |------|--------|------|
//! | 0 | [`Compression::Uncompressed`] | row |
//! | 1 | [`Compression::Rle`] (PackBits) | row, with a per-row length table |
//! | 2 | [`Compression::Zip`] | whole plane |
//! | 3 | [`Compression::ZipWithPrediction`] | whole plane |
//!
//! Compression happens on bytes already in file byte order; endianness and
//! CMYK inversion are handled by the pixel assembler and the plane writer.

pub mod rle;
pub mod zip;

use psd_core::{Error, PixelFormat, Result};

pub use zip::PlaneShape;

/// Compression scheme of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum Compression {
    /// Raw bytes.
    Uncompressed = 0,
    /// PackBits, one packet stream per row.
    #[default]
    Rle = 1,
    /// zlib over the whole plane.
    Zip = 2,
    /// zlib over the whole plane after horizontal delta coding.
    ZipWithPrediction = 3,
}

impl Compression {
    /// Code stored in the file.
    #[inline]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Whether the scheme compresses whole planes rather than rows.
    #[inline]
    pub const fn is_zip(self) -> bool {
        matches!(self, Self::Zip | Self::ZipWithPrediction)
    }
}

impl TryFrom<u16> for Compression {
    type Error = Error;

    fn try_from(code: u16) -> Result<Self> {
        match code {
            0 => Ok(Self::Uncompressed),
            1 => Ok(Self::Rle),
            2 => Ok(Self::Zip),
            3 => Ok(Self::ZipWithPrediction),
            other => Err(Error::UnknownCompression(other)),
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uncompressed => write!(f, "raw"),
            Self::Rle => write!(f, "RLE"),
            Self::Zip => write!(f, "ZIP"),
            Self::ZipWithPrediction => write!(f, "ZIP with prediction"),
        }
    }
}

/// Plane shape of a pixel format, for the ZIP predictor.
#[inline]
pub fn plane_shape(format: &PixelFormat) -> PlaneShape {
    PlaneShape {
        width: format.width as usize,
        depth: format.sample_width.bits(),
        byte_order: format.byte_order,
    }
}

/// Decodes one row of a row-based channel to `row_bytes` bytes.
///
/// Whole-plane schemes cannot be decoded one row at a time and fail with a
/// format error.
pub fn decompress_row(compressed: &[u8], compression: Compression, row_bytes: usize) -> Result<Vec<u8>> {
    match compression {
        Compression::Uncompressed => {
            if compressed.len() != row_bytes {
                return Err(Error::length_mismatch("raw row", row_bytes, compressed.len()));
            }
            Ok(compressed.to_vec())
        }
        Compression::Rle => rle::decompress(compressed, row_bytes),
        scheme => Err(Error::format(format!("{scheme} channel cannot be decoded row by row"))),
    }
}

/// Decodes a whole ZIP or raw plane of `format` to exactly
/// `format.channel_plane_bytes()` bytes.
///
/// RLE planes are decoded row by row by the caller, who owns the row table.
pub fn decompress_plane(compressed: &[u8], compression: Compression, format: &PixelFormat) -> Result<Vec<u8>> {
    let expected = format.channel_plane_bytes();
    match compression {
        Compression::Uncompressed => {
            if compressed.len() < expected {
                return Err(Error::length_mismatch("raw plane", expected, compressed.len()));
            }
            Ok(compressed[..expected].to_vec())
        }
        Compression::Rle => Err(Error::format("RLE plane needs its row length table")),
        scheme => zip::decompress(compressed, expected, scheme, plane_shape(format)),
    }
}

/// Compresses a whole plane with a ZIP scheme.
///
/// An empty result is reported as a write failure; zlib never produces one
/// for valid input.
pub fn compress_plane(plane: &[u8], compression: Compression, format: &PixelFormat, level: u8) -> Result<Vec<u8>> {
    if !compression.is_zip() {
        return Err(Error::invalid_channels(format!("{compression} is not a whole-plane scheme")));
    }
    let compressed = zip::compress(plane, compression, plane_shape(format), level)?;
    if compressed.is_empty() {
        return Err(Error::write_failure("compressor produced no data"));
    }
    Ok(compressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use psd_core::{ColorMode, SampleWidth};

    #[test]
    fn test_codes() {
        for compression in [
            Compression::Uncompressed,
            Compression::Rle,
            Compression::Zip,
            Compression::ZipWithPrediction,
        ] {
            assert_eq!(Compression::try_from(compression.code()).unwrap(), compression);
        }
        assert!(matches!(Compression::try_from(4), Err(Error::UnknownCompression(4))));
        assert!(Compression::Zip.is_zip());
        assert!(!Compression::Rle.is_zip());
    }

    #[test]
    fn test_row_schemes() {
        assert_eq!(decompress_row(&[1, 2, 3], Compression::Uncompressed, 3).unwrap(), [1, 2, 3]);
        assert!(decompress_row(&[1, 2], Compression::Uncompressed, 3).unwrap_err().is_format_error());
        assert_eq!(decompress_row(&[0xFE, 4], Compression::Rle, 3).unwrap(), [4, 4, 4]);
        assert!(decompress_row(&[], Compression::Zip, 3).unwrap_err().is_format_error());
    }

    #[test]
    fn test_plane_schemes() {
        let format = PixelFormat::new(ColorMode::Grayscale, SampleWidth::Two, 3, 2);
        let plane: Vec<u8> = (0..12).collect();

        for compression in [Compression::Zip, Compression::ZipWithPrediction] {
            let compressed = compress_plane(&plane, compression, &format, zip::DEFAULT_LEVEL).unwrap();
            assert_eq!(decompress_plane(&compressed, compression, &format).unwrap(), plane);
        }

        assert_eq!(decompress_plane(&plane, Compression::Uncompressed, &format).unwrap(), plane);
        assert!(decompress_plane(&plane[..11], Compression::Uncompressed, &format).is_err());
        assert!(compress_plane(&plane, Compression::Rle, &format, 6).is_err());
    }
}
