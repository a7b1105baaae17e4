//! Channel identifiers and interleaved pixel layouts.
//!
//! PSD stores every channel as its own plane, tagged with a signed id:
//!
//! | Id | Meaning |
//! |----|---------|
//! | `>= 0` | Color channel in model order (RGB: 0=R, 1=G, 2=B) |
//! | `-1` | Transparency (alpha) |
//! | `-2` | User supplied layer mask |
//! | `-3` | Real user supplied layer mask |
//!
//! A [`PixelLayout`] says which channel id lands in which slot of an
//! interleaved in-memory pixel. The default layout is the PSD order followed
//! by alpha (RGBA for RGB documents); consumers with blue-first pixel
//! structs use [`PixelLayout::bgra`].

use crate::error::{Error, Result};
use crate::format::ColorMode;

/// Signed PSD channel identifier.
pub type ChannelId = i16;

/// Channel id of the transparency channel.
pub const ALPHA_CHANNEL: ChannelId = -1;

/// Channel id of the user supplied layer mask.
pub const USER_MASK_CHANNEL: ChannelId = -2;

/// Channel id of the real user supplied layer mask.
pub const REAL_USER_MASK_CHANNEL: ChannelId = -3;

/// Returns `true` for layer mask ids (below alpha).
#[inline]
pub const fn is_mask_channel(id: ChannelId) -> bool {
    id < ALPHA_CHANNEL
}

/// Order of channel ids inside one interleaved pixel.
///
/// # Example
///
/// ```rust
/// use psd_core::{ColorMode, PixelLayout};
///
/// let rgba = PixelLayout::for_mode(ColorMode::Rgb);
/// assert_eq!(rgba.slots(), &[0, 1, 2, -1]);
///
/// let bgra = PixelLayout::bgra();
/// assert_eq!(bgra.slot_of(0), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PixelLayout {
    mode: ColorMode,
    slots: Vec<ChannelId>,
}

impl PixelLayout {
    /// Default layout: color channels in PSD order, then alpha.
    pub fn for_mode(mode: ColorMode) -> Self {
        let mut slots: Vec<ChannelId> = (0..mode.color_channels() as ChannelId).collect();
        if mode.has_alpha() {
            slots.push(ALPHA_CHANNEL);
        }
        Self { mode, slots }
    }

    /// Blue, green, red, alpha layout for RGB.
    pub fn bgra() -> Self {
        Self {
            mode: ColorMode::Rgb,
            slots: vec![2, 1, 0, ALPHA_CHANNEL],
        }
    }

    /// Creates a custom layout.
    ///
    /// `slots` must be a permutation of the model's channel ids
    /// (`0..color_channels` plus `-1` when the model has alpha).
    pub fn new(mode: ColorMode, slots: &[ChannelId]) -> Result<Self> {
        let mut expected = Self::for_mode(mode).slots;
        let mut given = slots.to_vec();
        expected.sort_unstable();
        given.sort_unstable();
        if expected != given {
            return Err(Error::invalid_channels(format!(
                "layout {slots:?} is not a permutation of {expected:?} for {mode}"
            )));
        }
        Ok(Self {
            mode,
            slots: slots.to_vec(),
        })
    }

    /// Color model this layout belongs to.
    #[inline]
    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Channel id per interleaved slot.
    #[inline]
    pub fn slots(&self) -> &[ChannelId] {
        &self.slots
    }

    /// Slot index holding `id`, if any.
    pub fn slot_of(&self, id: ChannelId) -> Option<usize> {
        self.slots.iter().position(|&slot| slot == id)
    }

    /// Slot index of the alpha channel.
    #[inline]
    pub fn alpha_slot(&self) -> Option<usize> {
        self.slot_of(ALPHA_CHANNEL)
    }
}
