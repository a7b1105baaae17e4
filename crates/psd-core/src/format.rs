//! Pixel format descriptors for PSD/PSB channel data.
//!
//! # Types
//!
//! - [`ColorMode`] - Color model of the layer or composite image
//! - [`SampleWidth`] - Bytes per channel sample (1, 2 or 4)
//! - [`SampleKind`] - Numeric interpretation of a sample (U8, U16, U32, F32)
//! - [`ByteOrder`] - Endianness of samples and length fields in the file
//! - [`FileVersion`] - PSD or PSB, selects length field widths
//! - [`PixelFormat`] - Everything a single read/write call needs to know
//!
//! # Usage
//!
//! ```rust
//! use psd_core::{ByteOrder, ColorMode, PixelFormat, SampleKind, SampleWidth};
//!
//! let format = PixelFormat::new(ColorMode::Cmyk, SampleWidth::Four, 64, 32);
//! assert_eq!(format.sample_kind(), SampleKind::F32);
//! assert_eq!(format.pixel_size(), 20); // CMYK + alpha, 4 bytes each
//! assert_eq!(format.byte_order, ByteOrder::BigEndian);
//! ```

use crate::error::{Error, Result};

/// Color model of a channel set.
///
/// Determines how many color channels a pixel has and how they are
/// assembled. `AlphaMask` covers single-channel planes such as layer masks
/// and transparency-only sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorMode {
    /// Single gray channel plus alpha.
    Grayscale,
    /// Red, green, blue plus alpha.
    Rgb,
    /// Cyan, magenta, yellow, black plus alpha. Stored inverted in files.
    Cmyk,
    /// CIE L*a*b* plus alpha.
    Lab,
    /// One opacity channel, decoded to 8-bit.
    AlphaMask,
}

impl ColorMode {
    /// Maps the color mode field of a PSD file header.
    ///
    /// Only the modes this codec can assemble are accepted; bitmap, indexed,
    /// multichannel and duotone documents fail with
    /// [`Error::UnsupportedColorMode`].
    ///
    /// ```rust
    /// use psd_core::ColorMode;
    ///
    /// assert_eq!(ColorMode::from_psd_mode(3).unwrap(), ColorMode::Rgb);
    /// assert!(ColorMode::from_psd_mode(2).is_err()); // indexed
    /// ```
    pub fn from_psd_mode(mode: u16) -> Result<Self> {
        match mode {
            1 => Ok(Self::Grayscale),
            3 => Ok(Self::Rgb),
            4 => Ok(Self::Cmyk),
            9 => Ok(Self::Lab),
            other => Err(Error::UnsupportedColorMode(other)),
        }
    }

    /// Number of color (non-alpha) channels.
    #[inline]
    pub const fn color_channels(&self) -> usize {
        match self {
            Self::Grayscale | Self::AlphaMask => 1,
            Self::Rgb | Self::Lab => 3,
            Self::Cmyk => 4,
        }
    }

    /// Whether interleaved pixels carry an alpha slot.
    #[inline]
    pub const fn has_alpha(&self) -> bool {
        !matches!(self, Self::AlphaMask)
    }

    /// Total number of interleaved slots per pixel.
    #[inline]
    pub const fn channel_count(&self) -> usize {
        if self.has_alpha() {
            self.color_channels() + 1
        } else {
            1
        }
    }

    /// Whether color channels are stored inverted on disk.
    #[inline]
    pub const fn is_inverted(&self) -> bool {
        matches!(self, Self::Cmyk)
    }
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grayscale => write!(f, "Grayscale"),
            Self::Rgb => write!(f, "RGB"),
            Self::Cmyk => write!(f, "CMYK"),
            Self::Lab => write!(f, "Lab"),
            Self::AlphaMask => write!(f, "Alpha"),
        }
    }
}

/// Bytes per channel sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleWidth {
    /// 8-bit samples.
    #[default]
    One,
    /// 16-bit samples.
    Two,
    /// 32-bit samples (float for color, integer for gray).
    Four,
}

impl SampleWidth {
    /// Maps the depth field of a PSD file header (8, 16 or 32).
    ///
    /// ```rust
    /// use psd_core::SampleWidth;
    ///
    /// assert_eq!(SampleWidth::from_bit_depth(16).unwrap(), SampleWidth::Two);
    /// assert!(SampleWidth::from_bit_depth(1).is_err());
    /// ```
    pub fn from_bit_depth(depth: u16) -> Result<Self> {
        match depth {
            8 => Ok(Self::One),
            16 => Ok(Self::Two),
            32 => Ok(Self::Four),
            other => Err(Error::UnsupportedDepth(other)),
        }
    }

    /// Bytes per sample.
    #[inline]
    pub const fn bytes(&self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
        }
    }

    /// Bits per sample.
    #[inline]
    pub const fn bits(&self) -> u32 {
        self.bytes() as u32 * 8
    }
}

impl std::fmt::Display for SampleWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Numeric interpretation of a sample.
///
/// The same width means different things in different color models:
/// 32-bit gray is an unsigned integer while every other 32-bit model
/// stores IEEE floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    /// 8-bit unsigned integer, unit 255.
    U8,
    /// 16-bit unsigned integer, unit 65535.
    U16,
    /// 32-bit unsigned integer, unit `u32::MAX`.
    U32,
    /// 32-bit float, unit 1.0.
    F32,
}

impl SampleKind {
    /// Picks the numeric kind for a color model and width.
    #[inline]
    pub const fn for_format(mode: ColorMode, width: SampleWidth) -> Self {
        match (width, mode) {
            (SampleWidth::One, _) => Self::U8,
            (SampleWidth::Two, _) => Self::U16,
            (SampleWidth::Four, ColorMode::Grayscale) => Self::U32,
            (SampleWidth::Four, _) => Self::F32,
        }
    }
}

/// Byte order of samples and length fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ByteOrder {
    /// Big-endian. What Photoshop writes.
    #[default]
    BigEndian,
    /// Little-endian, written by some PSB producers.
    LittleEndian,
}

/// Container flavor.
///
/// | Field | PSD | PSB |
/// |-------|-----|-----|
/// | RLE row length | 16-bit | 32-bit |
/// | Channel data size | 32-bit | 64-bit |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileVersion {
    /// Photoshop document (version 1).
    #[default]
    Psd,
    /// Large document format (version 2).
    Psb,
}

impl FileVersion {
    /// Maps the version field of the file header.
    pub fn from_header(version: u16) -> Result<Self> {
        match version {
            1 => Ok(Self::Psd),
            2 => Ok(Self::Psb),
            other => Err(Error::format(format!("unknown file version {other}"))),
        }
    }

    /// Bytes of one RLE row length entry.
    #[inline]
    pub const fn rle_length_size(&self) -> usize {
        match self {
            Self::Psd => 2,
            Self::Psb => 4,
        }
    }

    /// Bytes of a whole-channel size field.
    #[inline]
    pub const fn size_field_size(&self) -> usize {
        match self {
            Self::Psd => 4,
            Self::Psb => 8,
        }
    }
}

/// Immutable parameters of one channel read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PixelFormat {
    /// Color model.
    pub color_mode: ColorMode,
    /// Bytes per sample.
    pub sample_width: SampleWidth,
    /// File byte order.
    pub byte_order: ByteOrder,
    /// Width of the channel rectangle in pixels.
    pub width: u32,
    /// Height of the channel rectangle in pixels.
    pub height: u32,
}

impl PixelFormat {
    /// Creates a big-endian format.
    #[inline]
    pub const fn new(color_mode: ColorMode, sample_width: SampleWidth, width: u32, height: u32) -> Self {
        Self {
            color_mode,
            sample_width,
            byte_order: ByteOrder::BigEndian,
            width,
            height,
        }
    }

    /// Returns a copy with a different byte order.
    #[inline]
    pub const fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Numeric kind of each sample.
    #[inline]
    pub const fn sample_kind(&self) -> SampleKind {
        SampleKind::for_format(self.color_mode, self.sample_width)
    }

    /// Bytes of one interleaved pixel in memory.
    ///
    /// Alpha masks always decode to one opacity byte.
    #[inline]
    pub const fn pixel_size(&self) -> usize {
        match self.color_mode {
            ColorMode::AlphaMask => 1,
            mode => mode.channel_count() * self.sample_width.bytes(),
        }
    }

    /// Bytes of one channel row as stored (uncompressed) in the file.
    #[inline]
    pub const fn channel_row_bytes(&self) -> usize {
        self.width as usize * self.sample_width.bytes()
    }

    /// Bytes of one whole channel plane as stored (uncompressed).
    #[inline]
    pub const fn channel_plane_bytes(&self) -> usize {
        self.channel_row_bytes() * self.height as usize
    }

    /// Number of pixels.
    #[inline]
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Returns `true` if the rectangle has zero area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}x{} ({:?})",
            self.color_mode, self.sample_width, self.width, self.height, self.byte_order
        )
    }
}
