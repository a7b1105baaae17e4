//! Channel records shared by the reader and the writer.
//!
//! - [`ChannelInfo`] - where one channel's compressed data lives and how far
//!   the reader got through it
//! - [`ChannelByteMap`] - decompressed bytes of one unit of work (a row, or
//!   a whole plane for ZIP blocks), keyed by channel id
//! - [`WritingInfo`] - where the writer should backpatch a channel's sizes

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use psd_core::{ByteOrder, ChannelId, Error, FileVersion, PixelFormat, Result};
use smallvec::SmallVec;
use tracing::trace;

use crate::compression::Compression;

/// Size of the compression code in front of channel data.
pub const COMPRESSION_CODE_SIZE: u64 = 2;

/// Location and read state of one channel's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Channel id (`>= 0` color, `-1` alpha, `< -1` masks).
    pub channel_id: ChannelId,
    /// Raw compression code, validated when the channel is read.
    pub compression_type: u16,
    /// Stream offset of the first data byte (after any block header).
    pub data_start: u64,
    /// Number of data bytes.
    pub data_length: u64,
    /// Compressed byte count of every row, for RLE channels.
    pub rle_row_lengths: Vec<u32>,
    /// Read cursor; starts at `data_start`.
    pub channel_offset: u64,
}

impl ChannelInfo {
    /// Creates a record for data already positioned past its header.
    pub fn new(channel_id: ChannelId, compression: Compression, data_start: u64, data_length: u64) -> Self {
        Self {
            channel_id,
            compression_type: compression.code(),
            data_start,
            data_length,
            rle_row_lengths: Vec::new(),
            channel_offset: data_start,
        }
    }

    /// Sets the RLE row length table.
    pub fn with_rle_row_lengths(mut self, lengths: Vec<u32>) -> Self {
        self.rle_row_lengths = lengths;
        self
    }

    /// Decodes the stored compression code.
    #[inline]
    pub fn compression(&self) -> Result<Compression> {
        Compression::try_from(self.compression_type)
    }

    /// Stream offset one past the last data byte.
    #[inline]
    pub fn data_end(&self) -> u64 {
        self.data_start.saturating_add(self.data_length)
    }

    /// Moves the read cursor back to the first data byte.
    #[inline]
    pub fn rewind(&mut self) {
        self.channel_offset = self.data_start;
    }

    /// Parses a layer channel data block.
    ///
    /// The block at `block_start` spans `block_length` bytes and begins with
    /// the 2-byte compression code; RLE blocks follow it with `rows` row
    /// lengths (2 bytes each in PSD, 4 in PSB). The returned record points
    /// past that header.
    pub fn read_block_header<R: Read + Seek>(
        reader: &mut R,
        channel_id: ChannelId,
        block_start: u64,
        block_length: u64,
        rows: u32,
        version: FileVersion,
        order: ByteOrder,
    ) -> Result<Self> {
        reader.seek(SeekFrom::Start(block_start))?;
        let code = read_u16(reader, order).map_err(|e| Error::from_read(e, "channel compression code"))?;
        let compression = Compression::try_from(code)?;

        let mut header_len = COMPRESSION_CODE_SIZE;
        let mut rle_row_lengths = Vec::new();
        if compression == Compression::Rle {
            rle_row_lengths = read_row_lengths(reader, rows as usize, version, order)?;
            header_len += rows as u64 * version.rle_length_size() as u64;
        }

        if block_length < header_len {
            return Err(Error::format(format!(
                "channel {channel_id} block of {block_length} bytes cannot hold its {header_len}-byte header"
            )));
        }

        trace!(channel_id, %compression, header_len, "parsed channel block header");
        Ok(Self::new(channel_id, compression, block_start + header_len, block_length - header_len)
            .with_rle_row_lengths(rle_row_lengths))
    }

    /// Parses the composite image data section.
    ///
    /// The section holds one compression code for all channels, then for RLE
    /// one row length table per channel (channel after channel), then the
    /// channel planes back to back. `channel_ids` lists the planes in file
    /// order. Whole-plane ZIP is not used for composite data and is
    /// rejected.
    pub fn read_image_data<R: Read + Seek>(
        reader: &mut R,
        section_start: u64,
        format: &PixelFormat,
        channel_ids: &[ChannelId],
        version: FileVersion,
    ) -> Result<Vec<Self>> {
        reader.seek(SeekFrom::Start(section_start))?;
        let order = format.byte_order;
        let code = read_u16(reader, order).map_err(|e| Error::from_read(e, "image data compression code"))?;
        let compression = Compression::try_from(code)?;
        let rows = format.height as usize;

        match compression {
            Compression::Uncompressed => {
                let plane = format.channel_plane_bytes() as u64;
                let data_start = section_start + COMPRESSION_CODE_SIZE;
                Ok(channel_ids
                    .iter()
                    .enumerate()
                    .map(|(i, &id)| Self::new(id, compression, data_start + i as u64 * plane, plane))
                    .collect())
            }
            Compression::Rle => {
                let mut tables = Vec::with_capacity(channel_ids.len());
                for _ in channel_ids {
                    tables.push(read_row_lengths(reader, rows, version, order)?);
                }

                let mut data_start = section_start
                    + COMPRESSION_CODE_SIZE
                    + (channel_ids.len() * rows * version.rle_length_size()) as u64;
                let mut infos = Vec::with_capacity(channel_ids.len());
                for (&id, table) in channel_ids.iter().zip(tables) {
                    let length: u64 = table.iter().map(|&len| len as u64).sum();
                    infos.push(Self::new(id, compression, data_start, length).with_rle_row_lengths(table));
                    data_start += length;
                }
                Ok(infos)
            }
            scheme => Err(Error::format(format!("{scheme} is not valid for composite image data"))),
        }
    }

    /// Reads `len` bytes at the cursor and advances it.
    pub(crate) fn read_at_cursor<R: Read + Seek>(&mut self, reader: &mut R, len: usize) -> Result<Vec<u8>> {
        let end = self.channel_offset.saturating_add(len as u64);
        if end > self.data_end() {
            return Err(Error::format(format!(
                "channel {} needs {} bytes past its {}-byte block",
                self.channel_id,
                end - self.data_end(),
                self.data_length
            )));
        }

        reader.seek(SeekFrom::Start(self.channel_offset))?;
        let mut bytes = vec![0u8; len];
        reader
            .read_exact(&mut bytes)
            .map_err(|e| Error::from_read(e, "channel data"))?;
        self.channel_offset = end;
        Ok(bytes)
    }

    /// Compressed length of `row`, from the RLE table.
    pub(crate) fn rle_row_length(&self, row: usize) -> Result<usize> {
        self.rle_row_lengths
            .get(row)
            .map(|&len| len as usize)
            .ok_or_else(|| {
                Error::format(format!(
                    "channel {} has no RLE length for row {row} ({} rows in table)",
                    self.channel_id,
                    self.rle_row_lengths.len()
                ))
            })
    }
}

fn read_u16<R: Read>(reader: &mut R, order: ByteOrder) -> std::io::Result<u16> {
    match order {
        ByteOrder::BigEndian => reader.read_u16::<BigEndian>(),
        ByteOrder::LittleEndian => reader.read_u16::<LittleEndian>(),
    }
}

fn read_u32<R: Read>(reader: &mut R, order: ByteOrder) -> std::io::Result<u32> {
    match order {
        ByteOrder::BigEndian => reader.read_u32::<BigEndian>(),
        ByteOrder::LittleEndian => reader.read_u32::<LittleEndian>(),
    }
}

fn read_row_lengths<R: Read>(
    reader: &mut R,
    rows: usize,
    version: FileVersion,
    order: ByteOrder,
) -> Result<Vec<u32>> {
    let mut lengths = Vec::with_capacity(rows);
    for _ in 0..rows {
        let len = match version {
            FileVersion::Psd => read_u16(reader, order).map(u32::from),
            FileVersion::Psb => read_u32(reader, order),
        }
        .map_err(|e| Error::from_read(e, "RLE row length table"))?;
        lengths.push(len);
    }
    Ok(lengths)
}

/// Decompressed bytes per channel for one unit of work.
///
/// Layers rarely have more than six channels (four CMYK, alpha, a mask), so
/// the map lives on the stack and lookups are linear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelByteMap {
    entries: SmallVec<[(ChannelId, Vec<u8>); 6]>,
}

impl ChannelByteMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `bytes` for `id`, replacing earlier bytes for the same id.
    pub fn insert(&mut self, id: ChannelId, bytes: Vec<u8>) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = bytes,
            None => self.entries.push((id, bytes)),
        }
    }

    /// Bytes of `id`.
    #[inline]
    pub fn get(&self, id: ChannelId) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, bytes)| bytes.as_slice())
    }

    /// First inserted entry.
    #[inline]
    pub fn first(&self) -> Option<(ChannelId, &[u8])> {
        self.entries.first().map(|(id, bytes)| (*id, bytes.as_slice()))
    }

    /// Channel ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Number of channels.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no channel was inserted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all entries, keeping the allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Where to backpatch the sizes of one written channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WritingInfo {
    /// Channel id the entry stands for.
    pub channel_id: ChannelId,
    /// Offset of the channel's data length field.
    pub size_field_offset: Option<u64>,
    /// Offset of an externally reserved RLE row length table.
    ///
    /// Without one the table is reserved inline, in front of the rows.
    pub rle_block_offset: Option<u64>,
}

impl WritingInfo {
    /// Creates an entry with nothing to backpatch.
    pub const fn new(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            size_field_offset: None,
            rle_block_offset: None,
        }
    }

    /// Backpatch the channel size at `offset`.
    pub const fn with_size_field(mut self, offset: u64) -> Self {
        self.size_field_offset = Some(offset);
        self
    }

    /// Write the RLE row length table at `offset` instead of inline.
    pub const fn with_rle_block(mut self, offset: u64) -> Self {
        self.rle_block_offset = Some(offset);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psd_core::{ColorMode, SampleWidth};
    use std::io::Cursor;

    #[test]
    fn test_byte_map() {
        let mut map = ChannelByteMap::new();
        assert!(map.is_empty());
        map.insert(0, vec![1, 2]);
        map.insert(-1, vec![3]);
        map.insert(0, vec![4]);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(0), Some(&[4u8][..]));
        assert_eq!(map.get(1), None);
        assert_eq!(map.first(), Some((0, &[4u8][..])));
        assert_eq!(map.ids().collect::<Vec<_>>(), [0, -1]);

        map.clear();
        assert!(map.is_empty());
    }

    #[test]
    fn test_read_rle_block_header() {
        // 10 padding bytes, then code 1 and two row lengths, then 5 data bytes
        let mut data = vec![0u8; 10];
        data.extend([0x00, 0x01, 0x00, 0x02, 0x00, 0x03]);
        data.extend([0xFF, 7, 0x01, 1, 2]);
        let mut cursor = Cursor::new(data);

        let info =
            ChannelInfo::read_block_header(&mut cursor, -1, 10, 11, 2, FileVersion::Psd, ByteOrder::BigEndian)
                .unwrap();
        assert_eq!(info.channel_id, -1);
        assert_eq!(info.compression().unwrap(), Compression::Rle);
        assert_eq!(info.rle_row_lengths, [2, 3]);
        assert_eq!(info.data_start, 16);
        assert_eq!(info.data_length, 5);
        assert_eq!(info.channel_offset, 16);
    }

    #[test]
    fn test_read_psb_block_header() {
        let mut data = vec![0x01u8, 0x00];
        data.extend(9u32.to_le_bytes());
        data.extend([0u8; 9]);
        let mut cursor = Cursor::new(data);

        let info =
            ChannelInfo::read_block_header(&mut cursor, 0, 0, 15, 1, FileVersion::Psb, ByteOrder::LittleEndian)
                .unwrap();
        assert_eq!(info.rle_row_lengths, [9]);
        assert_eq!(info.data_start, 6);
        assert_eq!(info.data_length, 9);
    }

    #[test]
    fn test_block_header_errors() {
        let mut cursor = Cursor::new(vec![0x00u8, 0x07]);
        let err =
            ChannelInfo::read_block_header(&mut cursor, 0, 0, 2, 1, FileVersion::Psd, ByteOrder::BigEndian)
                .unwrap_err();
        assert!(matches!(err, Error::UnknownCompression(7)));

        // table cut short
        let mut cursor = Cursor::new(vec![0x00u8, 0x01, 0x00]);
        let err =
            ChannelInfo::read_block_header(&mut cursor, 0, 0, 3, 1, FileVersion::Psd, ByteOrder::BigEndian)
                .unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_read_image_data_rle() {
        let format = PixelFormat::new(ColorMode::Grayscale, SampleWidth::One, 2, 2);
        let mut data = vec![0x00u8, 0x01];
        // gray table, alpha table
        data.extend([0x00, 0x02, 0x00, 0x03, 0x00, 0x02, 0x00, 0x02]);
        data.extend([0xFF, 1, 0x01, 2, 3, 0xFF, 9, 0xFF, 8]);
        let mut cursor = Cursor::new(data);

        let infos =
            ChannelInfo::read_image_data(&mut cursor, 0, &format, &[0, -1], FileVersion::Psd).unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].data_start, 10);
        assert_eq!(infos[0].data_length, 5);
        assert_eq!(infos[1].data_start, 15);
        assert_eq!(infos[1].data_length, 4);
        assert_eq!(infos[1].rle_row_lengths, [2, 2]);
    }

    #[test]
    fn test_read_image_data_raw_and_zip() {
        let format = PixelFormat::new(ColorMode::Rgb, SampleWidth::Two, 3, 1);
        let mut cursor = Cursor::new(vec![0x00u8, 0x00]);
        let infos =
            ChannelInfo::read_image_data(&mut cursor, 0, &format, &[0, 1, 2], FileVersion::Psd).unwrap();
        assert_eq!(
            infos.iter().map(|i| i.data_start).collect::<Vec<_>>(),
            [2, 8, 14]
        );
        assert!(infos.iter().all(|i| i.data_length == 6));

        let mut cursor = Cursor::new(vec![0x00u8, 0x02]);
        let err = ChannelInfo::read_image_data(&mut cursor, 0, &format, &[0], FileVersion::Psd).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_cursor_stays_inside_block() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3, 4]);
        let mut info = ChannelInfo::new(0, Compression::Uncompressed, 1, 2);
        assert_eq!(info.read_at_cursor(&mut cursor, 2).unwrap(), [2, 3]);
        assert_eq!(info.channel_offset, 3);
        assert!(info.read_at_cursor(&mut cursor, 1).unwrap_err().is_format_error());

        info.rewind();
        assert_eq!(info.channel_offset, 1);
        assert!(info.rle_row_length(0).unwrap_err().is_format_error());
    }

    #[test]
    fn test_writing_info_builder() {
        let info = WritingInfo::new(-1).with_size_field(8).with_rle_block(32);
        assert_eq!(info.channel_id, -1);
        assert_eq!(info.size_field_offset, Some(8));
        assert_eq!(info.rle_block_offset, Some(32));
    }
}
