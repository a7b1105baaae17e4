//! Error types for PSD channel codec operations.
//!
//! # Overview
//!
//! The [`Error`] enum covers every failure mode of a channel read or write.
//! Failures fall into three families:
//!
//! - **Format errors**: the file does not match what its headers declare
//!   (length mismatches, unknown compression codes, unsupported color modes
//!   or depths, truncated/malformed streams). See [`Error::is_format_error`].
//! - **Write failures**: short writes, empty compressor output, lengths that
//!   do not fit their field. See [`Error::is_write_failure`].
//! - **Caller errors**: channel records or layouts that contradict the
//!   requested pixel format ([`Error::InvalidChannels`]).
//!
//! A channel missing from a decoded row, or a column beyond a channel's
//! buffer, is *not* an error: readers substitute the unit value instead.
//!
//! # Usage
//!
//! ```rust
//! use psd_core::{Error, Result};
//!
//! fn check_row(expected: usize, actual: usize) -> Result<()> {
//!     if expected != actual {
//!         return Err(Error::length_mismatch("RLE row", expected, actual));
//!     }
//!     Ok(())
//! }
//!
//! let err = check_row(16, 12).unwrap_err();
//! assert!(err.is_format_error());
//! ```
//!
//! # Dependencies
//!
//! - [`thiserror`] - For derive macro error implementation

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding or encoding PSD channel data.
#[derive(Debug, Error)]
pub enum Error {
    /// Decompressed data does not have the size the headers promise.
    ///
    /// Raised for RLE rows (`width * sample width`) and for whole ZIP
    /// planes (`width * height * sample width`). Never truncated or padded.
    #[error("{context}: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// What was being decoded
        context: String,
        /// Byte count required by the pixel format
        expected: usize,
        /// Byte count actually produced
        actual: usize,
    },

    /// Compression code outside the four known schemes.
    #[error("unsupported compression mode: {0}")]
    UnknownCompression(u16),

    /// Color mode this codec cannot assemble (bitmap, indexed, duotone, ...).
    #[error("unsupported color mode: {0}")]
    UnsupportedColorMode(u16),

    /// Bit depth other than 8, 16 or 32.
    #[error("unsupported bit depth: {0}")]
    UnsupportedDepth(u16),

    /// Truncated or malformed channel data.
    #[error("format incorrect: {0}")]
    FormatIncorrect(String),

    /// Encoding could not be written out completely.
    #[error("failed to write image data: {0}")]
    WriteFailure(String),

    /// Channel records or pixel layout contradict the pixel format.
    #[error("invalid channel configuration: {0}")]
    InvalidChannels(String),

    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates an [`Error::LengthMismatch`] error.
    #[inline]
    pub fn length_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::LengthMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Creates an [`Error::FormatIncorrect`] error.
    #[inline]
    pub fn format(msg: impl Into<String>) -> Self {
        Self::FormatIncorrect(msg.into())
    }

    /// Creates an [`Error::WriteFailure`] error.
    #[inline]
    pub fn write_failure(msg: impl Into<String>) -> Self {
        Self::WriteFailure(msg.into())
    }

    /// Creates an [`Error::InvalidChannels`] error.
    #[inline]
    pub fn invalid_channels(msg: impl Into<String>) -> Self {
        Self::InvalidChannels(msg.into())
    }

    /// Maps a read-side I/O error.
    ///
    /// Running out of data while a header promised more is a format problem,
    /// everything else stays an I/O error.
    pub fn from_read(err: std::io::Error, context: &str) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::FormatIncorrect(format!("{context}: unexpected end of data"))
        } else {
            Self::Io(err)
        }
    }

    /// Maps a write-side I/O error to [`Error::WriteFailure`].
    pub fn from_write(err: std::io::Error, context: &str) -> Self {
        Self::WriteFailure(format!("{context}: {err}"))
    }

    /// Returns `true` if the file contents are at fault.
    #[inline]
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::LengthMismatch { .. }
                | Self::UnknownCompression(_)
                | Self::UnsupportedColorMode(_)
                | Self::UnsupportedDepth(_)
                | Self::FormatIncorrect(_)
        )
    }

    /// Returns `true` if encoded data could not be written.
    #[inline]
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Self::WriteFailure(_))
    }

    /// Returns `true` if this is a stream I/O error.
    #[inline]
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch() {
        let err = Error::length_mismatch("RLE row 3", 16, 15);
        let msg = err.to_string();
        assert!(msg.contains("RLE row 3"));
        assert!(msg.contains("16"));
        assert!(msg.contains("15"));
        assert!(err.is_format_error());
        assert!(!err.is_write_failure());
    }

    #[test]
    fn test_format_family() {
        assert!(Error::UnknownCompression(7).is_format_error());
        assert!(Error::UnsupportedColorMode(2).is_format_error());
        assert!(Error::UnsupportedDepth(1).is_format_error());
        assert!(Error::format("bad").is_format_error());
        assert!(!Error::invalid_channels("bad").is_format_error());
    }

    #[test]
    fn test_read_eof_is_format_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err = Error::from_read(io_err, "channel 0");
        assert!(err.is_format_error());
        assert!(err.to_string().contains("channel 0"));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(Error::from_read(io_err, "channel 0").is_io_error());
    }

    #[test]
    fn test_write_failure() {
        let io_err = std::io::Error::new(std::io::ErrorKind::WriteZero, "short");
        let err = Error::from_write(io_err, "RLE row");
        assert!(err.is_write_failure());
        assert!(err.to_string().contains("RLE row"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.is_io_error());
    }
}
