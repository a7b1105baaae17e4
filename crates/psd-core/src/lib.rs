//! # psd-core
//!
//! Core types shared by the PSD/PSB channel codec crates.
//!
//! - [`ColorMode`], [`SampleWidth`], [`SampleKind`], [`ByteOrder`],
//!   [`FileVersion`], [`PixelFormat`] - What a channel read/write operates on
//! - [`ChannelId`], [`PixelLayout`] - How PSD channels map onto interleaved pixels
//! - [`Rect`] - Signed layer bounds
//! - [`Error`], [`Result`] - Failure taxonomy
//!
//! ## Crate Structure
//!
//! ```text
//! psd-core (this crate)
//!    ^
//!    |
//!    +-- psd-pixels (channel compression, pixel assembly, plane reader/writer)
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` - Enable serialization for format and layout types

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod channel;
pub mod error;
pub mod format;
pub mod rect;

// Re-exports for convenience
pub use channel::*;
pub use error::*;
pub use format::*;
pub use rect::*;

/// Prelude module for convenient imports.
///
/// ```
/// use psd_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::channel::{ALPHA_CHANNEL, ChannelId, PixelLayout};
    pub use crate::error::{Error, Result};
    pub use crate::format::{
        ByteOrder, ColorMode, FileVersion, PixelFormat, SampleKind, SampleWidth,
    };
    pub use crate::rect::Rect;
}
