//! Sample byte order conversion.
//!
//! PSD samples are stored in the file byte order (big-endian unless a PSB
//! producer says otherwise) while interleaved pixels live in host order.
//! [`Sample`] converts one raw sample of a given numeric kind without
//! changing its range; floats are swapped through their bit pattern.
//!
//! The byte order is a type parameter ([`byteorder::BigEndian`] /
//! [`byteorder::LittleEndian`]) so that hot loops are monomorphized per plane
//! and never branch per sample. [`sample_dispatch!`] turns the runtime
//! `(SampleKind, ByteOrder)` pair into those type parameters once.
//!
//! # Example
//!
//! ```rust
//! use psd_core::ByteOrder;
//! use psd_pixels::endian::{sample_from_file, Sample};
//!
//! let stored = [0x12, 0x34];
//! assert_eq!(sample_from_file::<u16>(&stored, ByteOrder::BigEndian), 0x1234);
//! assert_eq!(sample_from_file::<u16>(&stored, ByteOrder::LittleEndian), 0x3412);
//! assert_eq!(<u16 as Sample>::UNIT, 0xFFFF);
//! ```

use byteorder::{BigEndian, LittleEndian, NativeEndian};
use psd_core::{ByteOrder, SampleKind};

/// One channel sample of a specific numeric kind.
pub trait Sample: bytemuck::Pod + PartialEq + std::fmt::Debug {
    /// Numeric kind this type stands for.
    const KIND: SampleKind;
    /// Stored size in bytes.
    const WIDTH: usize;
    /// Value representing 100%.
    const UNIT: Self;

    /// Reads a sample stored in byte order `B` from the front of `bytes`.
    fn read<B: byteorder::ByteOrder>(bytes: &[u8]) -> Self;

    /// Writes the sample in byte order `B` to the front of `out`.
    fn write<B: byteorder::ByteOrder>(self, out: &mut [u8]);

    /// `UNIT - self`, the PSD CMYK storage transform.
    fn invert(self) -> Self;

    /// Truncates to an 8-bit opacity.
    fn to_opacity(self) -> u8;

    /// Widens an 8-bit opacity; `to_opacity` undoes it exactly.
    fn from_opacity(opacity: u8) -> Self;
}

impl Sample for u8 {
    const KIND: SampleKind = SampleKind::U8;
    const WIDTH: usize = 1;
    const UNIT: Self = u8::MAX;

    #[inline]
    fn read<B: byteorder::ByteOrder>(bytes: &[u8]) -> Self {
        bytes[0]
    }

    #[inline]
    fn write<B: byteorder::ByteOrder>(self, out: &mut [u8]) {
        out[0] = self;
    }

    #[inline]
    fn invert(self) -> Self {
        Self::UNIT - self
    }

    #[inline]
    fn to_opacity(self) -> u8 {
        self
    }

    #[inline]
    fn from_opacity(opacity: u8) -> Self {
        opacity
    }
}

impl Sample for u16 {
    const KIND: SampleKind = SampleKind::U16;
    const WIDTH: usize = 2;
    const UNIT: Self = u16::MAX;

    #[inline]
    fn read<B: byteorder::ByteOrder>(bytes: &[u8]) -> Self {
        B::read_u16(bytes)
    }

    #[inline]
    fn write<B: byteorder::ByteOrder>(self, out: &mut [u8]) {
        B::write_u16(out, self)
    }

    #[inline]
    fn invert(self) -> Self {
        Self::UNIT - self
    }

    #[inline]
    fn to_opacity(self) -> u8 {
        (self >> 8) as u8
    }

    #[inline]
    fn from_opacity(opacity: u8) -> Self {
        opacity as u16 * 0x0101
    }
}

impl Sample for u32 {
    const KIND: SampleKind = SampleKind::U32;
    const WIDTH: usize = 4;
    const UNIT: Self = u32::MAX;

    #[inline]
    fn read<B: byteorder::ByteOrder>(bytes: &[u8]) -> Self {
        B::read_u32(bytes)
    }

    #[inline]
    fn write<B: byteorder::ByteOrder>(self, out: &mut [u8]) {
        B::write_u32(out, self)
    }

    #[inline]
    fn invert(self) -> Self {
        Self::UNIT - self
    }

    #[inline]
    fn to_opacity(self) -> u8 {
        (self >> 24) as u8
    }

    #[inline]
    fn from_opacity(opacity: u8) -> Self {
        opacity as u32 * 0x0101_0101
    }
}

impl Sample for f32 {
    const KIND: SampleKind = SampleKind::F32;
    const WIDTH: usize = 4;
    const UNIT: Self = 1.0;

    #[inline]
    fn read<B: byteorder::ByteOrder>(bytes: &[u8]) -> Self {
        B::read_f32(bytes)
    }

    #[inline]
    fn write<B: byteorder::ByteOrder>(self, out: &mut [u8]) {
        B::write_f32(out, self)
    }

    #[inline]
    fn invert(self) -> Self {
        Self::UNIT - self
    }

    #[inline]
    fn to_opacity(self) -> u8 {
        // `as` saturates and maps NaN to 0
        (self * 255.0).round() as u8
    }

    #[inline]
    fn from_opacity(opacity: u8) -> Self {
        opacity as f32 / 255.0
    }
}

/// Converts one stored sample to host form, resolving the byte order at runtime.
///
/// Convenient for single values; plane loops should use [`Sample::read`]
/// under [`sample_dispatch!`] instead.
#[inline]
pub fn sample_from_file<S: Sample>(bytes: &[u8], order: ByteOrder) -> S {
    match order {
        ByteOrder::BigEndian => S::read::<BigEndian>(bytes),
        ByteOrder::LittleEndian => S::read::<LittleEndian>(bytes),
    }
}

/// Converts one host sample to its stored form.
#[inline]
pub fn sample_to_file<S: Sample>(value: S, order: ByteOrder, out: &mut [u8]) {
    match order {
        ByteOrder::BigEndian => value.write::<BigEndian>(out),
        ByteOrder::LittleEndian => value.write::<LittleEndian>(out),
    }
}

/// Rewrites a plane of host-order samples into file order `B`, in place.
///
/// With `invert` every sample becomes `UNIT - sample` on the way.
pub fn host_plane_to_file<S: Sample, B: byteorder::ByteOrder>(plane: &mut [u8], invert: bool) {
    for raw in plane.chunks_exact_mut(S::WIDTH) {
        let mut value = S::read::<NativeEndian>(raw);
        if invert {
            value = value.invert();
        }
        value.write::<B>(raw);
    }
}

/// Resolves a runtime `(SampleKind, ByteOrder)` pair into a sample type and
/// a [`byteorder::ByteOrder`] marker type, then evaluates `$body` with both
/// bound as type aliases.
///
/// ```rust
/// use psd_core::{ByteOrder, SampleKind};
/// use psd_pixels::endian::{host_plane_to_file, Sample};
/// use psd_pixels::sample_dispatch;
///
/// let mut plane = 0x0102u16.to_ne_bytes().to_vec();
/// sample_dispatch!(SampleKind::U16, ByteOrder::BigEndian, |S, B| {
///     host_plane_to_file::<S, B>(&mut plane, false)
/// });
/// assert_eq!(plane, [0x01, 0x02]);
/// ```
#[macro_export]
macro_rules! sample_dispatch {
    ($kind:expr, $order:expr, |$s:ident, $b:ident| $body:expr) => {{
        match ($kind, $order) {
            ($crate::__private::SampleKind::U8, $crate::__private::ByteOrder::BigEndian) => {
                type $s = u8;
                type $b = $crate::__private::BigEndian;
                $body
            }
            ($crate::__private::SampleKind::U8, $crate::__private::ByteOrder::LittleEndian) => {
                type $s = u8;
                type $b = $crate::__private::LittleEndian;
                $body
            }
            ($crate::__private::SampleKind::U16, $crate::__private::ByteOrder::BigEndian) => {
                type $s = u16;
                type $b = $crate::__private::BigEndian;
                $body
            }
            ($crate::__private::SampleKind::U16, $crate::__private::ByteOrder::LittleEndian) => {
                type $s = u16;
                type $b = $crate::__private::LittleEndian;
                $body
            }
            ($crate::__private::SampleKind::U32, $crate::__private::ByteOrder::BigEndian) => {
                type $s = u32;
                type $b = $crate::__private::BigEndian;
                $body
            }
            ($crate::__private::SampleKind::U32, $crate::__private::ByteOrder::LittleEndian) => {
                type $s = u32;
                type $b = $crate::__private::LittleEndian;
                $body
            }
            ($crate::__private::SampleKind::F32, $crate::__private::ByteOrder::BigEndian) => {
                type $s = f32;
                type $b = $crate::__private::BigEndian;
                $body
            }
            ($crate::__private::SampleKind::F32, $crate::__private::ByteOrder::LittleEndian) => {
                type $s = f32;
                type $b = $crate::__private::LittleEndian;
                $body
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8_is_identity() {
        assert_eq!(sample_from_file::<u8>(&[0xAB], ByteOrder::BigEndian), 0xAB);
        assert_eq!(sample_from_file::<u8>(&[0xAB], ByteOrder::LittleEndian), 0xAB);
    }

    #[test]
    fn test_u32_byte_order() {
        let stored = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(sample_from_file::<u32>(&stored, ByteOrder::BigEndian), 0x0102_0304);
        assert_eq!(sample_from_file::<u32>(&stored, ByteOrder::LittleEndian), 0x0403_0201);
    }

    #[test]
    fn test_f32_swaps_bit_pattern() {
        let stored = 0.75f32.to_be_bytes();
        assert_eq!(sample_from_file::<f32>(&stored, ByteOrder::BigEndian), 0.75);

        let mut out = [0u8; 4];
        sample_to_file(-2.5f32, ByteOrder::LittleEndian, &mut out);
        assert_eq!(out, (-2.5f32).to_le_bytes());
    }

    #[test]
    fn test_invert() {
        assert_eq!(0u8.invert(), 255);
        assert_eq!(0x1000u16.invert(), 0xEFFF);
        assert_eq!(u32::MAX.invert(), 0);
        assert_eq!(0.25f32.invert(), 0.75);
    }

    #[test]
    fn test_opacity_truncation() {
        assert_eq!(0xFF00u16.to_opacity(), 0xFF);
        assert_eq!(0x00FFu16.to_opacity(), 0x00);
        assert_eq!(1.0f32.to_opacity(), 255);
        assert_eq!(0.0f32.to_opacity(), 0);
        assert_eq!(0.5f32.to_opacity(), 128);
        assert_eq!(2.0f32.to_opacity(), 255);
        assert_eq!((-1.0f32).to_opacity(), 0);
        assert_eq!(f32::NAN.to_opacity(), 0);
    }

    #[test]
    fn test_opacity_widening_is_exact() {
        for opacity in 0..=255u8 {
            assert_eq!(u16::from_opacity(opacity).to_opacity(), opacity);
            assert_eq!(u32::from_opacity(opacity).to_opacity(), opacity);
            assert_eq!(f32::from_opacity(opacity).to_opacity(), opacity);
        }
        assert_eq!(u16::from_opacity(255), u16::MAX);
        assert_eq!(f32::from_opacity(255), 1.0);
    }

    #[test]
    fn test_host_plane_to_file() {
        let mut plane = Vec::new();
        plane.extend_from_slice(&0x0102u16.to_ne_bytes());
        plane.extend_from_slice(&0xFFFFu16.to_ne_bytes());
        host_plane_to_file::<u16, BigEndian>(&mut plane, true);
        assert_eq!(plane, [0xFE, 0xFD, 0x00, 0x00]);
    }

    #[test]
    fn test_dispatch_binds_types() {
        let width = sample_dispatch!(SampleKind::F32, ByteOrder::LittleEndian, |S, B| {
            let mut out = [0u8; 4];
            <S as Sample>::UNIT.write::<B>(&mut out);
            assert_eq!(out, 1.0f32.to_le_bytes());
            <S as Sample>::WIDTH
        });
        assert_eq!(width, 4);
    }
}
