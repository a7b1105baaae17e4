//! Whole-plane zlib compression, optionally with horizontal prediction.
//!
//! Prediction replaces each sample by its difference to the sample on its
//! left, restarting on every row:
//!
//! - 8-bit: byte deltas
//! - 16-bit: 16-bit sample deltas, in file byte order
//! - 32-bit: each row is split into four byte planes (most significant
//!   first), then byte deltas run across the whole row

use psd_core::{ByteOrder, Error, Result};

use super::Compression;
use crate::endian::sample_from_file;
use crate::endian::sample_to_file;

/// Default zlib level for written planes.
pub const DEFAULT_LEVEL: u8 = 6;

/// Shape of a plane, needed to undo or apply prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneShape {
    /// Samples per row.
    pub width: usize,
    /// Bits per sample (8, 16 or 32).
    pub depth: u32,
    /// Byte order of the samples.
    pub byte_order: ByteOrder,
}

impl PlaneShape {
    /// Bytes per row.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.width * (self.depth as usize / 8)
    }
}

/// Inflates a whole plane and checks it has exactly `expected_size` bytes.
///
/// For [`Compression::ZipWithPrediction`] the deltas are undone before
/// returning; [`Compression::Zip`] returns the inflated bytes as they are.
pub fn decompress(
    compressed: &[u8],
    expected_size: usize,
    compression: Compression,
    shape: PlaneShape,
) -> Result<Vec<u8>> {
    // one extra byte of headroom so oversized planes report their size
    let options = zune_inflate::DeflateOptions::default()
        .set_limit(expected_size + 1)
        .set_size_hint(expected_size);
    let mut decoder = zune_inflate::DeflateDecoder::new_with_options(compressed, options);
    let mut decompressed = decoder
        .decode_zlib()
        .map_err(|err| Error::format(format!("zlib-compressed data malformed: {err:?}")))?;

    if decompressed.len() != expected_size {
        return Err(Error::length_mismatch(
            "ZIP plane",
            expected_size,
            decompressed.len(),
        ));
    }

    if compression == Compression::ZipWithPrediction {
        undo_prediction(&mut decompressed, shape)?;
    }

    Ok(decompressed)
}

/// Deflates a whole plane, applying prediction first if requested.
pub fn compress(
    plane: &[u8],
    compression: Compression,
    shape: PlaneShape,
    level: u8,
) -> Result<Vec<u8>> {
    if compression == Compression::ZipWithPrediction {
        let mut predicted = plane.to_vec();
        apply_prediction(&mut predicted, shape)?;
        Ok(miniz_oxide::deflate::compress_to_vec_zlib(&predicted, level))
    } else {
        Ok(miniz_oxide::deflate::compress_to_vec_zlib(plane, level))
    }
}

/// Turns per-row deltas back into samples, in place.
pub fn undo_prediction(data: &mut [u8], shape: PlaneShape) -> Result<()> {
    for row in rows_mut(data, shape)? {
        match shape.depth {
            8 => {
                for i in 1..row.len() {
                    row[i] = row[i].wrapping_add(row[i - 1]);
                }
            }
            16 => {
                let mut previous = 0u16;
                for raw in row.chunks_exact_mut(2) {
                    let value = sample_from_file::<u16>(raw, shape.byte_order).wrapping_add(previous);
                    sample_to_file(value, shape.byte_order, raw);
                    previous = value;
                }
            }
            _ => {
                for i in 1..row.len() {
                    row[i] = row[i].wrapping_add(row[i - 1]);
                }
                let planes = row.to_vec();
                interleave_byte_planes(&planes, row, shape);
            }
        }
    }
    Ok(())
}

/// Replaces samples by per-row deltas, in place.
pub fn apply_prediction(data: &mut [u8], shape: PlaneShape) -> Result<()> {
    for row in rows_mut(data, shape)? {
        match shape.depth {
            8 => {
                for i in (1..row.len()).rev() {
                    row[i] = row[i].wrapping_sub(row[i - 1]);
                }
            }
            16 => {
                let mut previous = 0u16;
                for raw in row.chunks_exact_mut(2) {
                    let value = sample_from_file::<u16>(raw, shape.byte_order);
                    sample_to_file(value.wrapping_sub(previous), shape.byte_order, raw);
                    previous = value;
                }
            }
            _ => {
                let samples = row.to_vec();
                separate_byte_planes(&samples, row, shape);
                for i in (1..row.len()).rev() {
                    row[i] = row[i].wrapping_sub(row[i - 1]);
                }
            }
        }
    }
    Ok(())
}

fn rows_mut(data: &mut [u8], shape: PlaneShape) -> Result<std::slice::ChunksExactMut<'_, u8>> {
    if !matches!(shape.depth, 8 | 16 | 32) {
        return Err(Error::UnsupportedDepth(shape.depth as u16));
    }
    let row_bytes = shape.row_bytes();
    if row_bytes == 0 || data.len() % row_bytes != 0 {
        return Err(Error::format(format!(
            "{} bytes do not form whole rows of {row_bytes} bytes",
            data.len()
        )));
    }
    Ok(data.chunks_exact_mut(row_bytes))
}

/// Byte `k` of a file-order sample sits at significance rank `rank(k)`.
#[inline]
fn significance(byte: usize, order: ByteOrder) -> usize {
    match order {
        ByteOrder::BigEndian => byte,
        ByteOrder::LittleEndian => 3 - byte,
    }
}

fn separate_byte_planes(samples: &[u8], planes: &mut [u8], shape: PlaneShape) {
    let width = shape.width;
    for (i, sample) in samples.chunks_exact(4).enumerate() {
        for (byte, &value) in sample.iter().enumerate() {
            planes[significance(byte, shape.byte_order) * width + i] = value;
        }
    }
}

fn interleave_byte_planes(planes: &[u8], samples: &mut [u8], shape: PlaneShape) {
    let width = shape.width;
    for (i, sample) in samples.chunks_exact_mut(4).enumerate() {
        for (byte, value) in sample.iter_mut().enumerate() {
            *value = planes[significance(byte, shape.byte_order) * width + i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(width: usize, depth: u32) -> PlaneShape {
        PlaneShape {
            width,
            depth,
            byte_order: ByteOrder::BigEndian,
        }
    }

    #[test]
    fn test_8bit_prediction() {
        let mut data = vec![10, 12, 11, 11, 5, 5, 6, 4];
        apply_prediction(&mut data, shape(4, 8)).unwrap();
        assert_eq!(data, [10, 2, 255, 0, 5, 0, 1, 254]);
        undo_prediction(&mut data, shape(4, 8)).unwrap();
        assert_eq!(data, [10, 12, 11, 11, 5, 5, 6, 4]);
    }

    #[test]
    fn test_16bit_prediction_uses_samples() {
        // 0x00FF, 0x0100 big-endian: the delta is 1, not a byte difference
        let mut data = vec![0x00, 0xFF, 0x01, 0x00];
        apply_prediction(&mut data, shape(2, 16)).unwrap();
        assert_eq!(data, [0x00, 0xFF, 0x00, 0x01]);
        undo_prediction(&mut data, shape(2, 16)).unwrap();
        assert_eq!(data, [0x00, 0xFF, 0x01, 0x00]);
    }

    #[test]
    fn test_32bit_prediction_splits_byte_planes() {
        let mut data = vec![0x01, 0x02, 0x03, 0x04, 0x01, 0x02, 0x03, 0x05];
        apply_prediction(&mut data, shape(2, 32)).unwrap();
        // planes: [01 01][02 02][03 03][04 05], then deltas across the row
        assert_eq!(data, [0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0x01, 0x01]);
        undo_prediction(&mut data, shape(2, 32)).unwrap();
        assert_eq!(data, [0x01, 0x02, 0x03, 0x04, 0x01, 0x02, 0x03, 0x05]);
    }

    #[test]
    fn test_32bit_little_endian_planes() {
        let le = PlaneShape {
            width: 1,
            depth: 32,
            byte_order: ByteOrder::LittleEndian,
        };
        let mut data = 0x0A0B0C0Du32.to_le_bytes().to_vec();
        apply_prediction(&mut data, le).unwrap();
        // most significant plane first: 0A, then deltas 0B-0A, 0C-0B, 0D-0C
        assert_eq!(data, [0x0A, 0x01, 0x01, 0x01]);
        undo_prediction(&mut data, le).unwrap();
        assert_eq!(data, 0x0A0B0C0Du32.to_le_bytes());
    }

    #[test]
    fn roundtrip_zip_plane() {
        let data: Vec<u8> = (0..10000).map(|i| (i % 256) as u8).collect();
        let compressed = compress(&data, Compression::Zip, shape(100, 8), DEFAULT_LEVEL).unwrap();
        let decompressed = decompress(&compressed, data.len(), Compression::Zip, shape(100, 8)).unwrap();
        assert_eq!(data, decompressed);
    }

    #[test]
    fn roundtrip_zip_with_prediction() {
        let data: Vec<u8> = (0..64u16).flat_map(|i| (i * 1000).to_be_bytes()).collect();
        let compressed = compress(&data, Compression::ZipWithPrediction, shape(8, 16), 9).unwrap();
        let decompressed =
            decompress(&compressed, data.len(), Compression::ZipWithPrediction, shape(8, 16)).unwrap();
        assert_eq!(data, decompressed);
    }

    #[test]
    fn test_plane_size_mismatch() {
        let data = vec![1u8; 15];
        let compressed = compress(&data, Compression::Zip, shape(4, 8), DEFAULT_LEVEL).unwrap();
        let err = decompress(&compressed, 16, Compression::Zip, shape(4, 8)).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 16,
                actual: 15,
                ..
            }
        ));
    }

    #[test]
    fn test_oversized_plane_is_format_error() {
        let data = vec![1u8; 64];
        let compressed = compress(&data, Compression::Zip, shape(4, 8), DEFAULT_LEVEL).unwrap();
        let err = decompress(&compressed, 16, Compression::Zip, shape(4, 8)).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_garbage_is_format_error() {
        let err = decompress(&[1, 2, 3, 4], 4, Compression::Zip, shape(4, 8)).unwrap_err();
        assert!(err.is_format_error());
    }
}
