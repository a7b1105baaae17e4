//! PackBits run-length coding, one scanline at a time.
//!
//! Each packet starts with a signed header byte `n`:
//!
//! | Header | Meaning |
//! |--------|---------|
//! | `0..=127` | copy the next `n + 1` bytes literally |
//! | `-127..=-1` | repeat the next byte `1 - n` times |
//! | `-128` | no-op |

use psd_core::{Error, Result};
use tracing::trace;

const MIN_RUN_LENGTH: usize = 3;
const MAX_RUN_LENGTH: usize = 128;
const MAX_LITERAL_LENGTH: usize = 128;

/// Decodes one PackBits scanline to exactly `expected_size` bytes.
///
/// Every packet in `compressed` is decoded. Output of any other length is a
/// [`Error::LengthMismatch`]; the row is never padded or cut to fit. Trailing
/// no-op headers produce nothing, so rows padded with `0x80` still decode.
pub fn decompress(compressed: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut remaining = compressed;
    let mut decompressed = Vec::with_capacity(expected_size);

    while !remaining.is_empty() {
        let header = take_1(&mut remaining)? as i8;

        if header >= 0 {
            let values = take_n(&mut remaining, header as usize + 1)?;
            decompressed.extend_from_slice(values);
        } else if header == i8::MIN {
            trace!("RLE no-op packet");
        } else {
            let value = take_1(&mut remaining)?;
            let count = 1 - header as isize;
            decompressed.resize(decompressed.len() + count as usize, value);
        }
    }

    if decompressed.len() != expected_size {
        return Err(Error::length_mismatch(
            "RLE scanline",
            expected_size,
            decompressed.len(),
        ));
    }

    Ok(decompressed)
}

/// Encodes one scanline with PackBits.
///
/// Runs of three or more equal bytes become repeat packets, everything else
/// is grouped into literal packets of up to 128 bytes. The output is fully
/// determined by the input.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut compressed = Vec::with_capacity(data.len() + data.len() / MAX_LITERAL_LENGTH + 1);
    let mut pos = 0;

    while pos < data.len() {
        let run = run_length(data, pos);

        if run >= MIN_RUN_LENGTH {
            compressed.push((1 - run as isize) as i8 as u8);
            compressed.push(data[pos]);
            pos += run;
        } else {
            let start = pos;
            while pos < data.len()
                && pos - start < MAX_LITERAL_LENGTH
                && (pos == start || run_length(data, pos) < MIN_RUN_LENGTH)
            {
                pos += 1;
            }

            compressed.push((pos - start - 1) as u8);
            compressed.extend_from_slice(&data[start..pos]);
        }
    }

    compressed
}

/// Upper bound of [`compress`] output for `len` input bytes.
pub const fn max_compressed_len(len: usize) -> usize {
    len + len.div_ceil(MAX_LITERAL_LENGTH)
}

fn run_length(data: &[u8], start: usize) -> usize {
    let value = data[start];
    data[start..]
        .iter()
        .take(MAX_RUN_LENGTH)
        .take_while(|&&byte| byte == value)
        .count()
}

fn take_1(slice: &mut &[u8]) -> Result<u8> {
    if let Some((&first, rest)) = slice.split_first() {
        *slice = rest;
        Ok(first)
    } else {
        Err(Error::format("RLE data ends inside a packet"))
    }
}

fn take_n<'s>(slice: &mut &'s [u8], n: usize) -> Result<&'s [u8]> {
    if n <= slice.len() {
        let (front, back) = slice.split_at(n);
        *slice = back;
        Ok(front)
    } else {
        Err(Error::format("RLE literal packet runs past the end of the data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_packets() {
        // literal of 3, repeat 0xAA x4, no-op, literal of 1
        let compressed = [0x02, 1, 2, 3, 0xFD, 0xAA, 0x80, 0x00, 9];
        let row = decompress(&compressed, 8).unwrap();
        assert_eq!(row, [1, 2, 3, 0xAA, 0xAA, 0xAA, 0xAA, 9]);
    }

    #[test]
    fn test_encode_known_packets() {
        assert_eq!(compress(&[0, 64, 128, 192]), [3, 0, 64, 128, 192]);
        assert_eq!(compress(&[7, 7, 7, 7]), [0xFD, 7]);
        assert_eq!(compress(&[1, 2, 5, 5, 5]), [1, 1, 2, 0xFE, 5]);
    }

    #[test]
    fn test_short_row_is_an_error() {
        let err = decompress(&[0xFD, 1], 5).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 5,
                actual: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_long_row_is_an_error() {
        // repeat packet overshoots the row
        let err = decompress(&[0xF9, 1], 5).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 5,
                actual: 8,
                ..
            }
        ));
    }

    #[test]
    fn test_packets_after_full_row_are_an_error() {
        let err = decompress(&[0xFD, 1, 0xFD, 2], 4).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 4,
                actual: 8,
                ..
            }
        ));
        assert!(err.is_format_error());
    }

    #[test]
    fn test_truncated_packet() {
        assert!(decompress(&[0x05, 1, 2], 6).unwrap_err().is_format_error());
        assert!(decompress(&[0xFD], 4).unwrap_err().is_format_error());
    }

    #[test]
    fn test_trailing_padding_ignored() {
        let row = decompress(&[0xFD, 3, 0x80], 4).unwrap();
        assert_eq!(row, [3; 4]);
    }

    #[test]
    fn roundtrip_long_runs_and_literals() {
        let mut data: Vec<u8> = vec![9; 300];
        data.extend((0..=255u8).cycle().take(700));
        data.extend([1, 1, 2, 2, 3, 3, 3]);
        let compressed = compress(&data);
        assert!(compressed.len() <= max_compressed_len(data.len()));
        assert_eq!(decompress(&compressed, data.len()).unwrap(), data);
    }

    #[test]
    fn roundtrip_empty() {
        assert!(compress(&[]).is_empty());
        assert!(decompress(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn test_all_same_compresses_well() {
        let data = vec![7u8; 200];
        let compressed = compress(&data);
        assert_eq!(compressed, [0x81, 7, 0xB9, 7]);
    }
}
