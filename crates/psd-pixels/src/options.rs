//! Options for writing channel planes.

use psd_core::FileVersion;

use crate::compression::Compression;
use crate::compression::zip::DEFAULT_LEVEL;

/// Options for [`ChannelPlaneWriter`](crate::ChannelPlaneWriter).
///
/// # Example
///
/// ```rust
/// use psd_core::FileVersion;
/// use psd_pixels::{Compression, WriteOptions};
///
/// let options = WriteOptions::new()
///     .with_compression(Compression::Zip)
///     .with_alpha_first(true)
///     .with_version(FileVersion::Psb);
/// assert!(options.write_compression_type);
/// assert_eq!(options.zip_level, 6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WriteOptions {
    /// Scheme for every channel. Default: RLE.
    pub compression: Compression,
    /// Emit the alpha plane before the color planes (layer records) instead
    /// of after them (composite image data). Default: false.
    pub alpha_first: bool,
    /// Prefix each channel with its 2-byte compression code. Default: true.
    pub write_compression_type: bool,
    /// Width of RLE row lengths and size fields. Default: PSD.
    pub version: FileVersion,
    /// zlib level for ZIP schemes, 0 to 10. Default: 6.
    pub zip_level: u8,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Rle,
            alpha_first: false,
            write_compression_type: true,
            version: FileVersion::Psd,
            zip_level: DEFAULT_LEVEL,
        }
    }
}

impl WriteOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression scheme.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Sets whether alpha comes first.
    pub fn with_alpha_first(mut self, alpha_first: bool) -> Self {
        self.alpha_first = alpha_first;
        self
    }

    /// Sets whether each channel starts with its compression code.
    pub fn with_compression_type(mut self, write: bool) -> Self {
        self.write_compression_type = write;
        self
    }

    /// Sets the file version.
    pub fn with_version(mut self, version: FileVersion) -> Self {
        self.version = version;
        self
    }

    /// Sets the zlib level, clamped to 10.
    pub fn with_zip_level(mut self, level: u8) -> Self {
        self.zip_level = level.min(10);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = WriteOptions::default();
        assert_eq!(options.compression, Compression::Rle);
        assert!(!options.alpha_first);
        assert!(options.write_compression_type);
        assert_eq!(options.version, FileVersion::Psd);
        assert_eq!(options.zip_level, 6);
    }

    #[test]
    fn test_zip_level_clamped() {
        assert_eq!(WriteOptions::new().with_zip_level(42).zip_level, 10);
    }
}
