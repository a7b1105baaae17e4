//! Pixel assembly: gathering one sample per channel into an interleaved pixel.
//!
//! Each color model has its own assembler, monomorphized per sample type and
//! file byte order. [`pixel_fn`] picks the right one once per plane, so the
//! per-pixel loop is a plain function pointer call.
//!
//! A channel that is missing from the map, or shorter than the requested
//! column, reads as the unit value (fully opaque alpha, full color). PSD
//! layers without a transparency channel rely on this.

use psd_core::{ByteOrder, ChannelId, ColorMode, SampleKind};
use tracing::trace;

use crate::channel::ChannelByteMap;
use crate::endian::Sample;

/// Assembles the pixel at `column` of the map into `out`.
///
/// `slots` names the channel id written to each sample slot of `out`.
pub type PixelFn = fn(map: &ChannelByteMap, slots: &[ChannelId], column: usize, out: &mut [u8]);

/// Reads the stored sample of `id` at `column`, or the unit value.
#[inline]
pub fn read_channel_value<S: Sample, B: byteorder::ByteOrder>(
    map: &ChannelByteMap,
    id: ChannelId,
    column: usize,
) -> S {
    let start = column * S::WIDTH;
    match map.get(id).and_then(|bytes| bytes.get(start..start + S::WIDTH)) {
        Some(raw) => S::read::<B>(raw),
        None => {
            trace!(channel_id = id, column, "channel value missing, using unit value");
            S::UNIT
        }
    }
}

#[inline]
fn store<S: Sample>(value: S, slot: usize, out: &mut [u8]) {
    let start = slot * S::WIDTH;
    out[start..start + S::WIDTH].copy_from_slice(bytemuck::bytes_of(&value));
}

#[inline]
fn copy_slots<S: Sample, B: byteorder::ByteOrder>(
    map: &ChannelByteMap,
    slots: &[ChannelId],
    column: usize,
    out: &mut [u8],
) {
    for (slot, &id) in slots.iter().enumerate() {
        store(read_channel_value::<S, B>(map, id, column), slot, out);
    }
}

/// Gray and alpha.
pub fn read_gray_pixel<S: Sample, B: byteorder::ByteOrder>(
    map: &ChannelByteMap,
    slots: &[ChannelId],
    column: usize,
    out: &mut [u8],
) {
    copy_slots::<S, B>(map, slots, column, out);
}

/// Red, green, blue and alpha, placed by the layout.
pub fn read_rgb_pixel<S: Sample, B: byteorder::ByteOrder>(
    map: &ChannelByteMap,
    slots: &[ChannelId],
    column: usize,
    out: &mut [u8],
) {
    copy_slots::<S, B>(map, slots, column, out);
}

/// L, a, b and alpha, stored verbatim.
pub fn read_lab_pixel<S: Sample, B: byteorder::ByteOrder>(
    map: &ChannelByteMap,
    slots: &[ChannelId],
    column: usize,
    out: &mut [u8],
) {
    copy_slots::<S, B>(map, slots, column, out);
}

/// Cyan, magenta, yellow, black and alpha.
///
/// Color channels are stored as `UNIT - value` and flipped back here; alpha
/// is stored as is.
pub fn read_cmyk_pixel<S: Sample, B: byteorder::ByteOrder>(
    map: &ChannelByteMap,
    slots: &[ChannelId],
    column: usize,
    out: &mut [u8],
) {
    for (slot, &id) in slots.iter().enumerate() {
        let value = read_channel_value::<S, B>(map, id, column);
        store(if id >= 0 { value.invert() } else { value }, slot, out);
    }
}

/// Single mask channel, reduced to an 8-bit opacity in `out[0]`.
///
/// Whatever channel the map holds is used; the caller guarantees there is
/// exactly one.
pub fn read_alpha_mask_pixel<S: Sample, B: byteorder::ByteOrder>(
    map: &ChannelByteMap,
    _slots: &[ChannelId],
    column: usize,
    out: &mut [u8],
) {
    let value = match map.first() {
        Some((id, _)) => read_channel_value::<S, B>(map, id, column),
        None => S::UNIT,
    };
    out[0] = value.to_opacity();
}

/// Selects the assembler for a color model, sample kind and file byte order.
pub fn pixel_fn(mode: ColorMode, kind: SampleKind, order: ByteOrder) -> PixelFn {
    crate::sample_dispatch!(kind, order, |S, B| match mode {
        ColorMode::Grayscale => read_gray_pixel::<S, B> as PixelFn,
        ColorMode::Rgb => read_rgb_pixel::<S, B> as PixelFn,
        ColorMode::Cmyk => read_cmyk_pixel::<S, B> as PixelFn,
        ColorMode::Lab => read_lab_pixel::<S, B> as PixelFn,
        ColorMode::AlphaMask => read_alpha_mask_pixel::<S, B> as PixelFn,
    })
}
