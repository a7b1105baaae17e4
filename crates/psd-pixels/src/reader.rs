//! Channel planes to interleaved pixels.
//!
//! Two traversal modes, chosen by the first participating channel:
//!
//! - **Rows**: for each row every channel decodes one scanline (raw or RLE)
//!   at its own cursor, then the row's pixels are assembled.
//! - **Plane**: when the first channel is ZIP coded, every channel is
//!   decoded whole up front (each by its own scheme) and pixels are
//!   assembled with a linear column index.
//!
//! Layer mask channels (id below -1) do not take part in color reads. An
//! alpha mask read takes exactly one channel, whatever its id.

use std::io::{Read, Seek, SeekFrom};

use psd_core::{ColorMode, Error, PixelFormat, PixelLayout, Result, is_mask_channel};
use tracing::{debug, trace};

use crate::assemble::{PixelFn, pixel_fn};
use crate::buffer::PixelSink;
use crate::channel::{ChannelByteMap, ChannelInfo};
use crate::compression::{self, Compression, rle};

/// Decodes the channels of one layer or composite into a [`PixelSink`].
///
/// # Example
///
/// ```rust
/// use std::io::Cursor;
/// use psd_core::{ColorMode, PixelFormat, SampleWidth};
/// use psd_pixels::{ChannelInfo, ChannelPlaneReader, Compression, PixelBuffer};
///
/// // 2x1 gray plane, raw, no alpha channel in the file
/// let mut file = Cursor::new(vec![0x10u8, 0x20]);
/// let mut infos = vec![ChannelInfo::new(0, Compression::Uncompressed, 0, 2)];
///
/// let format = PixelFormat::new(ColorMode::Grayscale, SampleWidth::One, 2, 1);
/// let mut pixels = PixelBuffer::for_format(&format);
/// ChannelPlaneReader::new(format).read(&mut file, &mut infos, &mut pixels).unwrap();
/// assert_eq!(pixels.as_bytes(), &[0x10, 0xFF, 0x20, 0xFF]);
/// ```
#[derive(Debug, Clone)]
pub struct ChannelPlaneReader {
    format: PixelFormat,
    layout: PixelLayout,
    pixel_fn: PixelFn,
}

impl ChannelPlaneReader {
    /// Creates a reader with the default layout of the format's color model.
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            layout: PixelLayout::for_mode(format.color_mode),
            pixel_fn: pixel_fn(format.color_mode, format.sample_kind(), format.byte_order),
        }
    }

    /// Uses a different channel order inside each pixel.
    pub fn with_layout(mut self, layout: PixelLayout) -> Result<Self> {
        if layout.mode() != self.format.color_mode {
            return Err(Error::invalid_channels(format!(
                "{} layout cannot be used for a {} read",
                layout.mode(),
                self.format.color_mode
            )));
        }
        self.layout = layout;
        Ok(self)
    }

    /// Format being decoded.
    #[inline]
    pub fn format(&self) -> &PixelFormat {
        &self.format
    }

    /// Pixel layout of the output.
    #[inline]
    pub fn layout(&self) -> &PixelLayout {
        &self.layout
    }

    /// Decodes `channels` into `sink`.
    ///
    /// Each channel's `channel_offset` is advanced past what was consumed.
    /// The stream is left where it was on entry, whether or not decoding
    /// succeeds. On failure rows already written to the sink stay written.
    pub fn read<R, S>(&self, reader: &mut R, channels: &mut [ChannelInfo], sink: &mut S) -> Result<()>
    where
        R: Read + Seek,
        S: PixelSink + ?Sized,
    {
        if self.format.is_empty() {
            debug!(format = %self.format, "empty channel rectangle, nothing to read");
            return Ok(());
        }
        self.check_sink(sink)?;

        let plan = self.plan(channels)?;
        let start = reader.stream_position()?;

        debug!(
            format = %self.format,
            channels = plan.len(),
            "reading channel planes"
        );

        let result = match plan.first() {
            Some(&(_, first)) if first.is_zip() => self.read_planes(reader, channels, &plan, sink),
            _ => self.read_rows(reader, channels, &plan, sink),
        };

        reader.seek(SeekFrom::Start(start))?;
        result
    }

    fn check_sink<S: PixelSink + ?Sized>(&self, sink: &S) -> Result<()> {
        let format = &self.format;
        if sink.width() != format.width
            || sink.height() != format.height
            || sink.pixel_size() != format.pixel_size()
        {
            return Err(Error::invalid_channels(format!(
                "sink is {}x{} with {}-byte pixels, {format} needs {}-byte pixels",
                sink.width(),
                sink.height(),
                sink.pixel_size(),
                format.pixel_size()
            )));
        }
        Ok(())
    }

    /// Participating channels by index, with their validated compression.
    fn plan(&self, channels: &[ChannelInfo]) -> Result<Vec<(usize, Compression)>> {
        let mode = self.format.color_mode;
        if mode == ColorMode::AlphaMask && channels.len() != 1 {
            return Err(Error::invalid_channels(format!(
                "alpha mask read needs exactly one channel, got {}",
                channels.len()
            )));
        }

        let mut plan = Vec::with_capacity(channels.len());
        for (index, info) in channels.iter().enumerate() {
            if mode != ColorMode::AlphaMask && is_mask_channel(info.channel_id) {
                trace!(channel_id = info.channel_id, "skipping layer mask channel");
                continue;
            }
            plan.push((index, info.compression()?));
        }
        Ok(plan)
    }

    fn read_rows<R, S>(
        &self,
        reader: &mut R,
        channels: &mut [ChannelInfo],
        plan: &[(usize, Compression)],
        sink: &mut S,
    ) -> Result<()>
    where
        R: Read + Seek,
        S: PixelSink + ?Sized,
    {
        if let Some(&(index, compression)) = plan.iter().find(|(_, c)| c.is_zip()) {
            return Err(Error::format(format!(
                "channel {} is {compression} coded inside a row-coded block",
                channels[index].channel_id
            )));
        }

        let row_bytes = self.format.channel_row_bytes();
        let pixel_size = self.format.pixel_size();
        let mut map = ChannelByteMap::new();

        for y in 0..self.format.height {
            map.clear();
            for &(index, compression) in plan {
                let info = &mut channels[index];
                let len = match compression {
                    Compression::Rle => info.rle_row_length(y as usize)?,
                    _ => row_bytes,
                };
                let stored = info.read_at_cursor(reader, len)?;
                map.insert(info.channel_id, compression::decompress_row(&stored, compression, row_bytes)?);
            }

            let row = sink.row_mut(y);
            for (x, pixel) in row.chunks_exact_mut(pixel_size).enumerate() {
                (self.pixel_fn)(&map, self.layout.slots(), x, pixel);
            }
        }
        Ok(())
    }

    fn read_planes<R, S>(
        &self,
        reader: &mut R,
        channels: &mut [ChannelInfo],
        plan: &[(usize, Compression)],
        sink: &mut S,
    ) -> Result<()>
    where
        R: Read + Seek,
        S: PixelSink + ?Sized,
    {
        let mut map = ChannelByteMap::new();
        for &(index, compression) in plan {
            let info = &mut channels[index];
            let plane = self.read_whole_plane(reader, info, compression)?;
            trace!(channel_id = info.channel_id, %compression, bytes = plane.len(), "decoded plane");
            map.insert(info.channel_id, plane);
        }

        let width = self.format.width as usize;
        let pixel_size = self.format.pixel_size();
        for y in 0..self.format.height {
            let row = sink.row_mut(y);
            let base = y as usize * width;
            for (x, pixel) in row.chunks_exact_mut(pixel_size).enumerate() {
                (self.pixel_fn)(&map, self.layout.slots(), base + x, pixel);
            }
        }
        Ok(())
    }

    fn read_whole_plane<R: Read + Seek>(
        &self,
        reader: &mut R,
        info: &mut ChannelInfo,
        compression: Compression,
    ) -> Result<Vec<u8>> {
        let format = &self.format;
        match compression {
            Compression::Rle => {
                let row_bytes = format.channel_row_bytes();
                let mut plane = Vec::with_capacity(format.channel_plane_bytes());
                for y in 0..format.height as usize {
                    let len = info.rle_row_length(y)?;
                    let stored = info.read_at_cursor(reader, len)?;
                    plane.extend(rle::decompress(&stored, row_bytes)?);
                }
                Ok(plane)
            }
            Compression::Uncompressed => {
                let stored = info.read_at_cursor(reader, format.channel_plane_bytes())?;
                compression::decompress_plane(&stored, compression, format)
            }
            scheme => {
                let remaining = info.data_end().saturating_sub(info.channel_offset);
                let len = usize::try_from(remaining)
                    .map_err(|_| Error::format(format!("channel {} is too large", info.channel_id)))?;
                let stored = info.read_at_cursor(reader, len)?;
                compression::decompress_plane(&stored, scheme, format)
            }
        }
    }
}

/// Decodes `channels` with the default layout of `format`.
pub fn read_channels<R, S>(
    reader: &mut R,
    format: PixelFormat,
    channels: &mut [ChannelInfo],
    sink: &mut S,
) -> Result<()>
where
    R: Read + Seek,
    S: PixelSink + ?Sized,
{
    ChannelPlaneReader::new(format).read(reader, channels, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PixelBuffer;
    use psd_core::SampleWidth;
    use std::io::Cursor;

    fn gray(width: u32, height: u32) -> PixelFormat {
        PixelFormat::new(ColorMode::Grayscale, SampleWidth::One, width, height)
    }

    #[test]
    fn test_empty_rect_does_no_io() {
        let format = gray(0, 5);
        let mut cursor = Cursor::new(Vec::new());
        let mut infos = vec![ChannelInfo::new(0, Compression::Rle, 100, 100)];
        let mut sink = PixelBuffer::for_format(&format);
        ChannelPlaneReader::new(format).read(&mut cursor, &mut infos, &mut sink).unwrap();
        assert_eq!(infos[0].channel_offset, 100);
    }

    #[test]
    fn test_rle_rows_with_alpha() {
        // gray rows [5,5] and [1,2]; alpha rows [9,9] twice
        let mut data = vec![0xFFu8, 5, 0x01, 1, 2];
        data.extend([0xFF, 9, 0xFF, 9]);
        let mut cursor = Cursor::new(data);
        cursor.set_position(3);

        let mut infos = vec![
            ChannelInfo::new(-1, Compression::Rle, 5, 4).with_rle_row_lengths(vec![2, 2]),
            ChannelInfo::new(0, Compression::Rle, 0, 5).with_rle_row_lengths(vec![2, 3]),
        ];
        let format = gray(2, 2);
        let mut sink = PixelBuffer::for_format(&format);
        read_channels(&mut cursor, format, &mut infos, &mut sink).unwrap();

        assert_eq!(sink.as_bytes(), &[5, 9, 5, 9, 1, 9, 2, 9]);
        assert_eq!(infos[0].channel_offset, 9);
        assert_eq!(infos[1].channel_offset, 5);
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn test_mask_channels_skipped() {
        let mut cursor = Cursor::new(vec![7u8, 8]);
        let mut infos = vec![
            ChannelInfo::new(0, Compression::Uncompressed, 0, 1),
            ChannelInfo::new(-2, Compression::Uncompressed, 1, 1),
        ];
        let format = gray(1, 1);
        let mut sink = PixelBuffer::for_format(&format);
        read_channels(&mut cursor, format, &mut infos, &mut sink).unwrap();
        assert_eq!(sink.as_bytes(), &[7, 255]);
        assert_eq!(infos[1].channel_offset, 1);
    }

    #[test]
    fn test_alpha_mask_needs_one_channel() {
        let format = PixelFormat::new(ColorMode::AlphaMask, SampleWidth::One, 1, 1);
        let mut cursor = Cursor::new(vec![1u8, 2]);
        let mut infos = vec![
            ChannelInfo::new(-2, Compression::Uncompressed, 0, 1),
            ChannelInfo::new(-3, Compression::Uncompressed, 1, 1),
        ];
        let mut sink = PixelBuffer::for_format(&format);
        let err = read_channels(&mut cursor, format, &mut infos, &mut sink).unwrap_err();
        assert!(matches!(err, Error::InvalidChannels(_)));

        let mut infos = vec![ChannelInfo::new(-3, Compression::Uncompressed, 1, 1)];
        read_channels(&mut cursor, format, &mut infos, &mut sink).unwrap();
        assert_eq!(sink.as_bytes(), &[2]);
    }

    #[test]
    fn test_zip_channel_in_row_block() {
        let format = gray(1, 1);
        let mut cursor = Cursor::new(vec![0u8; 8]);
        let mut infos = vec![
            ChannelInfo::new(0, Compression::Uncompressed, 0, 1),
            ChannelInfo::new(-1, Compression::Zip, 1, 7),
        ];
        let mut sink = PixelBuffer::for_format(&format);
        let err = read_channels(&mut cursor, format, &mut infos, &mut sink).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_unknown_compression() {
        let format = gray(1, 1);
        let mut cursor = Cursor::new(vec![0u8; 2]);
        let mut info = ChannelInfo::new(0, Compression::Uncompressed, 0, 1);
        info.compression_type = 9;
        let mut sink = PixelBuffer::for_format(&format);
        let err = read_channels(&mut cursor, format, &mut [info], &mut sink).unwrap_err();
        assert!(matches!(err, Error::UnknownCompression(9)));
        assert!(err.is_format_error());
    }

    #[test]
    fn test_sink_mismatch() {
        let format = gray(2, 2);
        let mut cursor = Cursor::new(vec![0u8; 4]);
        let mut infos = vec![ChannelInfo::new(0, Compression::Uncompressed, 0, 4)];
        let mut sink = PixelBuffer::new(2, 2, 1);
        let err = read_channels(&mut cursor, format, &mut infos, &mut sink).unwrap_err();
        assert!(matches!(err, Error::InvalidChannels(_)));
    }

    #[test]
    fn test_layout_mode_checked() {
        let reader = ChannelPlaneReader::new(gray(1, 1));
        assert!(reader.clone().with_layout(PixelLayout::bgra()).is_err());
        let reader = reader
            .with_layout(PixelLayout::new(ColorMode::Grayscale, &[-1, 0]).unwrap())
            .unwrap();
        assert_eq!(reader.layout().slots(), &[-1, 0]);
    }
}
