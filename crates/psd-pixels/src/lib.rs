//! # psd-pixels
//!
//! Per-channel pixel codec for PSD and PSB layer and composite image data.
//!
//! PSD keeps every channel in its own plane, compressed on its own, in the
//! file byte order, with CMYK stored inverted. This crate turns such planes
//! into interleaved host-order pixels and back:
//!
//! - [`ChannelPlaneReader`] - compressed channel streams to interleaved rows
//! - [`ChannelPlaneWriter`] - interleaved rows to compressed channel streams,
//!   with backpatched size and RLE length fields
//! - [`compression`] - Uncompressed, RLE (PackBits), ZIP, ZIP with prediction
//! - [`assemble`] - per color model pixel assembly
//! - [`endian`] - sample byte order conversion
//!
//! # Reading a layer
//!
//! ```rust,ignore
//! use psd_pixels::{ChannelInfo, ChannelPlaneReader, PixelBuffer};
//! use psd_pixels::prelude::*;
//!
//! let format = PixelFormat::new(ColorMode::Rgb, SampleWidth::One, width, height);
//! let mut infos = layer_channels
//!     .iter()
//!     .map(|ch| ChannelInfo::read_block_header(&mut file, ch.id, ch.offset, ch.length, height, version, format.byte_order))
//!     .collect::<Result<Vec<_>>>()?;
//!
//! let mut pixels = PixelBuffer::for_format(&format);
//! ChannelPlaneReader::new(format).read(&mut file, &mut infos, &mut pixels)?;
//! ```
//!
//! # Writing a layer
//!
//! ```rust,ignore
//! use psd_pixels::{ChannelPlaneWriter, WriteOptions, WritingInfo};
//! use psd_pixels::compression::Compression;
//!
//! let writer = ChannelPlaneWriter::new(format)
//!     .with_options(WriteOptions::new().with_compression(Compression::ZipWithPrediction));
//! let sizes = writer.write(&mut file, &pixels, &infos)?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod assemble;
pub mod buffer;
pub mod channel;
pub mod compression;
pub mod endian;
pub mod options;
pub mod reader;
pub mod writer;

pub use buffer::{PixelBuffer, PixelSink, PixelSource, Region, RegionMut};
pub use channel::{ChannelByteMap, ChannelInfo, WritingInfo};
pub use compression::Compression;
pub use options::WriteOptions;
pub use reader::{ChannelPlaneReader, read_channels};
pub use writer::{ChannelPlaneWriter, write_channels};

pub use psd_core::{Error, Result};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        ChannelInfo, ChannelPlaneReader, ChannelPlaneWriter, Compression, PixelBuffer,
        PixelSink, PixelSource, WriteOptions, WritingInfo,
    };
    pub use psd_core::prelude::*;
}

#[doc(hidden)]
pub mod __private {
    pub use byteorder::{BigEndian, LittleEndian};
    pub use psd_core::{ByteOrder, SampleKind};
}
