//! Interleaved pixel storage seen through row cursors.
//!
//! The reader writes decoded rows into a [`PixelSink`] and the writer pulls
//! rows from a [`PixelSource`]. [`PixelBuffer`] implements both; its
//! [`region_mut`](PixelBuffer::region_mut) and [`region`](PixelBuffer::region)
//! views let a layer be decoded straight into, or encoded from, its
//! position on a larger canvas.
//!
//! Samples are in host byte order. A pixel is `pixel_size` bytes, the row
//! stride of a buffer is `width * pixel_size`.

use psd_core::{Error, PixelFormat, Rect, Result};

/// Destination of decoded rows.
pub trait PixelSink {
    /// Bytes per pixel.
    fn pixel_size(&self) -> usize;
    /// Pixels per row.
    fn width(&self) -> u32;
    /// Number of rows.
    fn height(&self) -> u32;
    /// Row `y`, exactly `width * pixel_size` bytes.
    fn row_mut(&mut self, y: u32) -> &mut [u8];
}

/// Origin of rows to encode.
pub trait PixelSource {
    /// Bytes per pixel.
    fn pixel_size(&self) -> usize;
    /// Pixels per row.
    fn width(&self) -> u32;
    /// Number of rows.
    fn height(&self) -> u32;
    /// Row `y`, exactly `width * pixel_size` bytes.
    fn row(&self, y: u32) -> &[u8];
}

/// Owned interleaved pixels.
///
/// # Example
///
/// ```rust
/// use psd_core::Rect;
/// use psd_pixels::{PixelBuffer, PixelSink};
///
/// let mut canvas = PixelBuffer::new(8, 8, 4);
/// let mut layer = canvas.region_mut(Rect::new(2, 3, 4, 2)).unwrap();
/// layer.row_mut(0).fill(0xFF);
/// assert_eq!(canvas.pixel(2, 3), &[0xFF; 4]);
/// assert_eq!(canvas.pixel(1, 3), &[0; 4]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixel_size: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Creates a zeroed buffer.
    pub fn new(width: u32, height: u32, pixel_size: usize) -> Self {
        Self {
            width,
            height,
            pixel_size,
            data: vec![0; width as usize * height as usize * pixel_size],
        }
    }

    /// Creates a zeroed buffer sized for `format`.
    pub fn for_format(format: &PixelFormat) -> Self {
        Self::new(format.width, format.height, format.pixel_size())
    }

    /// Wraps existing bytes.
    pub fn from_vec(width: u32, height: u32, pixel_size: usize, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * pixel_size;
        if data.len() != expected {
            return Err(Error::invalid_channels(format!(
                "{width}x{height} buffer of {pixel_size}-byte pixels needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixel_size,
            data,
        })
    }

    /// Copies typed samples (`u8`, `u16`, `u32`, `f32`) into a buffer.
    pub fn from_samples<T: bytemuck::Pod>(
        width: u32,
        height: u32,
        pixel_size: usize,
        samples: &[T],
    ) -> Result<Self> {
        Self::from_vec(width, height, pixel_size, bytemuck::cast_slice(samples).to_vec())
    }

    /// Copies the bytes out as typed samples.
    pub fn to_samples<T: bytemuck::Pod>(&self) -> Vec<T> {
        self.data
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }

    /// Pixels per row.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per pixel.
    #[inline]
    pub fn pixel_size(&self) -> usize {
        self.pixel_size
    }

    /// Bytes per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width as usize * self.pixel_size
    }

    /// All bytes, row after row.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Bytes of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let start = y as usize * self.stride() + x as usize * self.pixel_size;
        &self.data[start..start + self.pixel_size]
    }

    /// Row `y`.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride();
        &self.data[start..start + self.stride()]
    }

    /// Row `y`, mutable.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// Mutable view of `rect`, which must lie inside the buffer.
    pub fn region_mut(&mut self, rect: Rect) -> Result<RegionMut<'_>> {
        self.check_region(rect)?;
        Ok(RegionMut { buffer: self, rect })
    }

    /// Read-only view of `rect`, which must lie inside the buffer.
    pub fn region(&self, rect: Rect) -> Result<Region<'_>> {
        self.check_region(rect)?;
        Ok(Region { buffer: self, rect })
    }

    fn check_region(&self, rect: Rect) -> Result<()> {
        let bounds = Rect::from_size(self.width, self.height);
        if !bounds.contains_rect(&rect) {
            return Err(Error::invalid_channels(format!("{rect} is outside {bounds}")));
        }
        Ok(())
    }

    fn span(&self, rect: &Rect, y: u32) -> std::ops::Range<usize> {
        // contained regions have non-negative origins
        let start = (rect.y as usize + y as usize) * self.stride() + rect.x as usize * self.pixel_size;
        start..start + rect.width as usize * self.pixel_size
    }
}

impl PixelSink for PixelBuffer {
    fn pixel_size(&self) -> usize {
        self.pixel_size
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn row_mut(&mut self, y: u32) -> &mut [u8] {
        PixelBuffer::row_mut(self, y)
    }
}

impl PixelSource for PixelBuffer {
    fn pixel_size(&self) -> usize {
        self.pixel_size
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn row(&self, y: u32) -> &[u8] {
        PixelBuffer::row(self, y)
    }
}

/// Rectangle of a [`PixelBuffer`] used as a sink.
#[derive(Debug)]
pub struct RegionMut<'a> {
    buffer: &'a mut PixelBuffer,
    rect: Rect,
}

impl RegionMut<'_> {
    /// Covered rectangle in buffer coordinates.
    pub fn rect(&self) -> Rect {
        self.rect
    }
}

impl PixelSink for RegionMut<'_> {
    fn pixel_size(&self) -> usize {
        self.buffer.pixel_size
    }

    fn width(&self) -> u32 {
        self.rect.width
    }

    fn height(&self) -> u32 {
        self.rect.height
    }

    fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let span = self.buffer.span(&self.rect, y);
        &mut self.buffer.data[span]
    }
}

/// Rectangle of a [`PixelBuffer`] used as a source.
#[derive(Debug, Clone, Copy)]
pub struct Region<'a> {
    buffer: &'a PixelBuffer,
    rect: Rect,
}

impl Region<'_> {
    /// Covered rectangle in buffer coordinates.
    pub fn rect(&self) -> Rect {
        self.rect
    }
}

impl PixelSource for Region<'_> {
    fn pixel_size(&self) -> usize {
        self.buffer.pixel_size
    }

    fn width(&self) -> u32 {
        self.rect.width
    }

    fn height(&self) -> u32 {
        self.rect.height
    }

    fn row(&self, y: u32) -> &[u8] {
        &self.buffer.data[self.buffer.span(&self.rect, y)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psd_core::{ColorMode, SampleWidth};

    #[test]
    fn test_for_format() {
        let format = PixelFormat::new(ColorMode::Cmyk, SampleWidth::Two, 3, 2);
        let buffer = PixelBuffer::for_format(&format);
        assert_eq!(buffer.pixel_size(), 10);
        assert_eq!(buffer.stride(), 30);
        assert_eq!(buffer.as_bytes().len(), 60);
    }

    #[test]
    fn test_samples_roundtrip() {
        let samples = [1.0f32, 0.5, 0.25, 0.0];
        let buffer = PixelBuffer::from_samples(2, 1, 8, &samples).unwrap();
        assert_eq!(buffer.to_samples::<f32>(), samples);
        assert!(PixelBuffer::from_samples(3, 1, 8, &samples).is_err());
    }

    #[test]
    fn test_region_rows() {
        let data: Vec<u8> = (0..16).collect();
        let buffer = PixelBuffer::from_vec(4, 4, 1, data).unwrap();
        let region = buffer.region(Rect::new(1, 2, 2, 2)).unwrap();
        assert_eq!(PixelSource::width(&region), 2);
        assert_eq!(region.row(0), &[9, 10]);
        assert_eq!(region.row(1), &[13, 14]);
    }

    #[test]
    fn test_region_mut_writes_in_place() {
        let mut buffer = PixelBuffer::new(3, 3, 2);
        {
            let mut region = buffer.region_mut(Rect::new(1, 1, 2, 1)).unwrap();
            region.row_mut(0).copy_from_slice(&[1, 2, 3, 4]);
        }
        assert_eq!(buffer.row(1), &[0, 0, 1, 2, 3, 4]);
        assert_eq!(buffer.row(0), &[0; 6]);
    }

    #[test]
    fn test_region_outside_buffer() {
        let mut buffer = PixelBuffer::new(3, 3, 1);
        assert!(buffer.region_mut(Rect::new(2, 0, 2, 1)).is_err());
        assert!(buffer.region(Rect::new(-1, 0, 1, 1)).is_err());
        assert!(buffer.region(Rect::new(0, 0, 3, 3)).is_ok());
    }
}
