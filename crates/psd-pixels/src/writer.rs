//! Interleaved pixels to channel planes.
//!
//! The writer splits the source into one plane per channel in PSD order,
//! converts samples to the file byte order (inverting CMYK color planes on
//! the way), compresses each plane and appends it to the stream. Sizes that
//! are only known afterwards are backpatched:
//!
//! - the RLE row length table, reserved in front of the rows or at an
//!   external offset given by [`WritingInfo::rle_block_offset`]
//! - the channel size field at [`WritingInfo::size_field_offset`], holding
//!   the number of bytes written for the channel from the compression code
//!   on
//!
//! Field widths follow [`psd_core::FileVersion`]: 2/4 bytes for PSD, 4/8 for PSB.

use std::io::{Seek, SeekFrom, Write};

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use psd_core::{
    ALPHA_CHANNEL, ByteOrder, ChannelId, ColorMode, Error, PixelFormat, PixelLayout, Result,
};
use tracing::{debug, trace};

use crate::buffer::PixelSource;
use crate::channel::WritingInfo;
use crate::compression::{self, Compression, rle};
use crate::endian::{Sample, host_plane_to_file};
use crate::options::WriteOptions;

/// Encodes interleaved pixels into compressed channel planes.
///
/// # Example
///
/// ```rust
/// use std::io::Cursor;
/// use psd_core::{ColorMode, PixelFormat, SampleWidth};
/// use psd_pixels::{ChannelPlaneWriter, Compression, PixelBuffer, WriteOptions, WritingInfo};
///
/// let format = PixelFormat::new(ColorMode::Grayscale, SampleWidth::One, 2, 1);
/// let pixels = PixelBuffer::from_vec(2, 1, 2, vec![0x10, 0xFF, 0x20, 0x80]).unwrap();
///
/// let writer = ChannelPlaneWriter::new(format)
///     .with_options(WriteOptions::new().with_compression(Compression::Uncompressed));
/// let mut file = Cursor::new(Vec::new());
/// let sizes = writer
///     .write(&mut file, &pixels, &[WritingInfo::new(0), WritingInfo::new(-1)])
///     .unwrap();
///
/// assert_eq!(sizes, [4, 4]);
/// assert_eq!(file.into_inner(), [0, 0, 0x10, 0x20, 0, 0, 0xFF, 0x80]);
/// ```
#[derive(Debug, Clone)]
pub struct ChannelPlaneWriter {
    format: PixelFormat,
    layout: PixelLayout,
    options: WriteOptions,
}

impl ChannelPlaneWriter {
    /// Creates a writer with default options and layout.
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            layout: PixelLayout::for_mode(format.color_mode),
            options: WriteOptions::default(),
        }
    }

    /// Sets the write options.
    pub fn with_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    /// Reads source pixels with a different channel order.
    pub fn with_layout(mut self, layout: PixelLayout) -> Result<Self> {
        if layout.mode() != self.format.color_mode {
            return Err(Error::invalid_channels(format!(
                "{} layout cannot be used for a {} write",
                layout.mode(),
                self.format.color_mode
            )));
        }
        self.layout = layout;
        Ok(self)
    }

    /// Format being encoded.
    #[inline]
    pub fn format(&self) -> &PixelFormat {
        &self.format
    }

    /// Active options.
    #[inline]
    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Writes one plane per entry of `infos` at the stream position.
    ///
    /// `infos` lists the channels in write order: alpha first when
    /// `alpha_first` is set, otherwise color channels then alpha. Leaving the
    /// trailing alpha entry out skips the alpha plane. Returns the bytes
    /// written per channel, counted the same way as the size fields.
    pub fn write<W, S>(&self, writer: &mut W, source: &S, infos: &[WritingInfo]) -> Result<Vec<u64>>
    where
        W: Write + Seek,
        S: PixelSource + ?Sized,
    {
        if self.format.is_empty() {
            debug!(format = %self.format, "empty channel rectangle, nothing to write");
            return Ok(Vec::new());
        }
        self.check_source(source)?;

        let planes = self.split_planes(source, infos)?;
        self.check_infos(&planes, infos)?;

        debug!(
            format = %self.format,
            compression = %self.options.compression,
            channels = infos.len(),
            "writing channel planes"
        );

        let mut sizes = Vec::with_capacity(infos.len());
        for (info, (_, plane)) in infos.iter().zip(&planes) {
            sizes.push(self.write_channel(writer, info, plane)?);
        }
        Ok(sizes)
    }

    fn check_source<S: PixelSource + ?Sized>(&self, source: &S) -> Result<()> {
        let format = &self.format;
        if source.width() != format.width
            || source.height() != format.height
            || source.pixel_size() != format.pixel_size()
        {
            return Err(Error::invalid_channels(format!(
                "source is {}x{} with {}-byte pixels, {format} needs {}-byte pixels",
                source.width(),
                source.height(),
                source.pixel_size(),
                format.pixel_size()
            )));
        }
        Ok(())
    }

    /// Planes in write order, samples already in file form.
    fn split_planes<S: PixelSource + ?Sized>(
        &self,
        source: &S,
        infos: &[WritingInfo],
    ) -> Result<Vec<(ChannelId, Vec<u8>)>> {
        let mode = self.format.color_mode;
        if mode == ColorMode::AlphaMask {
            let [info] = infos else {
                return Err(Error::invalid_channels(format!(
                    "alpha mask write needs exactly one channel, got {}",
                    infos.len()
                )));
            };
            return Ok(vec![(info.channel_id, self.widen_opacity(source))]);
        }

        let mut ids: Vec<ChannelId> = (0..mode.color_channels() as ChannelId).collect();
        if self.options.alpha_first {
            ids.insert(0, ALPHA_CHANNEL);
        } else {
            ids.push(ALPHA_CHANNEL);
        }

        let kind = self.format.sample_kind();
        let order = self.format.byte_order;
        let mut planes = Vec::with_capacity(ids.len());
        for id in ids {
            let slot = self
                .layout
                .slot_of(id)
                .ok_or_else(|| Error::invalid_channels(format!("layout has no slot for channel {id}")))?;
            let mut plane = self.split_plane(source, slot);
            let invert = mode.is_inverted() && id >= 0;
            crate::sample_dispatch!(kind, order, |T, B| host_plane_to_file::<T, B>(&mut plane, invert));
            planes.push((id, plane));
        }
        Ok(planes)
    }

    fn split_plane<S: PixelSource + ?Sized>(&self, source: &S, slot: usize) -> Vec<u8> {
        let width = self.format.sample_width.bytes();
        let pixel_size = self.format.pixel_size();
        let offset = slot * width;

        let mut plane = Vec::with_capacity(self.format.channel_plane_bytes());
        for y in 0..self.format.height {
            for pixel in source.row(y).chunks_exact(pixel_size) {
                plane.extend_from_slice(&pixel[offset..offset + width]);
            }
        }
        plane
    }

    /// Alpha mask sources hold 8-bit opacities; widen them to the file depth.
    fn widen_opacity<S: PixelSource + ?Sized>(&self, source: &S) -> Vec<u8> {
        let mut plane = vec![0u8; self.format.channel_plane_bytes()];
        crate::sample_dispatch!(self.format.sample_kind(), self.format.byte_order, |T, B| {
            let samples = (0..self.format.height).flat_map(move |y| source.row(y).iter().copied());
            for (raw, opacity) in plane.chunks_exact_mut(T::WIDTH).zip(samples) {
                T::from_opacity(opacity).write::<B>(raw);
            }
        });
        plane
    }

    fn check_infos(&self, planes: &[(ChannelId, Vec<u8>)], infos: &[WritingInfo]) -> Result<()> {
        if infos.len() > planes.len() {
            return Err(Error::invalid_channels(format!(
                "{} channels requested, the source has {}",
                infos.len(),
                planes.len()
            )));
        }
        if self.format.color_mode == ColorMode::AlphaMask {
            return Ok(());
        }

        if self.options.alpha_first {
            if infos.first().map(|info| info.channel_id) != Some(ALPHA_CHANNEL) {
                return Err(Error::invalid_channels("alpha-first write must start with channel -1"));
            }
        } else if infos.len() + 1 != planes.len()
            && infos.last().map(|info| info.channel_id) != Some(ALPHA_CHANNEL)
        {
            return Err(Error::invalid_channels(
                "alpha-last write must list every color channel and end with channel -1 or omit it",
            ));
        }

        for (info, (id, _)) in infos.iter().zip(planes) {
            if info.channel_id != *id {
                return Err(Error::invalid_channels(format!(
                    "channel {} listed where channel {id} is written",
                    info.channel_id
                )));
            }
        }
        Ok(())
    }

    fn write_channel<W: Write + Seek>(&self, writer: &mut W, info: &WritingInfo, plane: &[u8]) -> Result<u64> {
        let order = self.format.byte_order;
        let compression = self.options.compression;
        let start = position(writer)?;

        if self.options.write_compression_type {
            write_length(writer, compression.code() as u64, 2, order)?;
        }

        match compression {
            Compression::Rle => self.write_rle(writer, info, plane)?,
            Compression::Uncompressed => write_bytes(writer, plane)?,
            scheme => {
                let compressed =
                    compression::compress_plane(plane, scheme, &self.format, self.options.zip_level)?;
                write_bytes(writer, &compressed)?;
            }
        }

        let end = position(writer)?;
        let size = end - start;
        if let Some(offset) = info.size_field_offset {
            let field = self.options.version.size_field_size();
            patch(writer, offset, end, |w| write_length(w, size, field, order))?;
        }

        debug!(channel_id = info.channel_id, %compression, size, "wrote channel");
        Ok(size)
    }

    fn write_rle<W: Write + Seek>(&self, writer: &mut W, info: &WritingInfo, plane: &[u8]) -> Result<()> {
        let order = self.format.byte_order;
        let field = self.options.version.rle_length_size();
        let rows = self.format.height as usize;

        let table_offset = match info.rle_block_offset {
            Some(offset) => offset,
            None => {
                let offset = position(writer)?;
                write_bytes(writer, &vec![0u8; rows * field])?;
                offset
            }
        };

        let mut lengths = Vec::with_capacity(rows);
        for row in plane.chunks_exact(self.format.channel_row_bytes()) {
            let compressed = rle::compress(row);
            write_bytes(writer, &compressed)?;
            lengths.push(compressed.len() as u64);
        }
        trace!(channel_id = info.channel_id, table_offset, rows, "patching RLE row lengths");

        let end = position(writer)?;
        patch(writer, table_offset, end, |w| {
            lengths
                .iter()
                .try_for_each(|&len| write_length(w, len, field, order))
        })
    }
}

/// Encodes `source` with `options` and the default layout of `format`.
pub fn write_channels<W, S>(
    writer: &mut W,
    format: PixelFormat,
    options: WriteOptions,
    source: &S,
    infos: &[WritingInfo],
) -> Result<Vec<u64>>
where
    W: Write + Seek,
    S: PixelSource + ?Sized,
{
    ChannelPlaneWriter::new(format).with_options(options).write(writer, source, infos)
}

fn position<W: Seek>(writer: &mut W) -> Result<u64> {
    writer
        .stream_position()
        .map_err(|e| Error::from_write(e, "querying stream position"))
}

fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<()> {
    writer
        .write_all(bytes)
        .map_err(|e| Error::from_write(e, "writing channel data"))
}

/// Seeks to `offset`, runs `fill`, then returns to `resume`.
fn patch<W, F>(writer: &mut W, offset: u64, resume: u64, fill: F) -> Result<()>
where
    W: Write + Seek,
    F: FnOnce(&mut W) -> Result<()>,
{
    writer
        .seek(SeekFrom::Start(offset))
        .map_err(|e| Error::from_write(e, "seeking to length field"))?;
    fill(writer)?;
    writer
        .seek(SeekFrom::Start(resume))
        .map_err(|e| Error::from_write(e, "seeking back after length field"))?;
    Ok(())
}

/// Writes `value` as a `size`-byte unsigned integer (2, 4 or 8).
fn write_length<W: Write>(writer: &mut W, value: u64, size: usize, order: ByteOrder) -> Result<()> {
    let too_large = || Error::write_failure(format!("length {value} does not fit a {size}-byte field"));
    let result = match (size, order) {
        (2, ByteOrder::BigEndian) => writer.write_u16::<BigEndian>(u16::try_from(value).map_err(|_| too_large())?),
        (2, ByteOrder::LittleEndian) => {
            writer.write_u16::<LittleEndian>(u16::try_from(value).map_err(|_| too_large())?)
        }
        (4, ByteOrder::BigEndian) => writer.write_u32::<BigEndian>(u32::try_from(value).map_err(|_| too_large())?),
        (4, ByteOrder::LittleEndian) => {
            writer.write_u32::<LittleEndian>(u32::try_from(value).map_err(|_| too_large())?)
        }
        (_, ByteOrder::BigEndian) => writer.write_u64::<BigEndian>(value),
        (_, ByteOrder::LittleEndian) => writer.write_u64::<LittleEndian>(value),
    };
    result.map_err(|e| Error::from_write(e, "writing length field"))
}
