//! Row-major RGB pixel buffer.
//!
//! [`Raster`] is the unit every other part of nocturne operates on: the
//! decoded source image, each column fragment shipped to a worker, each
//! filter stage's output, and the reassembled result are all rasters.
//!
//! Pixels are stored row-major, `pixels[y * width + x]`. Construction
//! enforces `pixels.len() == width * height` with both dimensions
//! positive, so every other module can index without re-checking.

use std::ops::Range;

use image::RgbImage;

use crate::types::{Dimensions, PipelineError, Rgb};

/// An owned row-major RGB raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    dimensions: Dimensions,
    pixels: Vec<Rgb>,
}

impl Raster {
    /// Wrap a pixel buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if either dimension is
    /// zero, or [`PipelineError::PixelCountMismatch`] if `pixels` does not
    /// hold exactly `width * height` pixels.
    pub fn new(width: u32, height: u32, pixels: Vec<Rgb>) -> Result<Self, PipelineError> {
        let dimensions = Dimensions::new(width, height);
        let expected = checked_pixel_count(dimensions)?;
        if pixels.len() != expected {
            return Err(PipelineError::PixelCountMismatch {
                dimensions,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self { dimensions, pixels })
    }

    /// A raster with every pixel set to `pixel`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if either dimension is
    /// zero.
    pub fn filled(width: u32, height: u32, pixel: Rgb) -> Result<Self, PipelineError> {
        let dimensions = Dimensions::new(width, height);
        let count = checked_pixel_count(dimensions)?;
        Ok(Self {
            dimensions,
            pixels: vec![pixel; count],
        })
    }

    /// Build a raster by evaluating `f(x, y)` for every pixel.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if either dimension is
    /// zero.
    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> Rgb,
    ) -> Result<Self, PipelineError> {
        let dimensions = Dimensions::new(width, height);
        let count = checked_pixel_count(dimensions)?;
        let mut pixels = Vec::with_capacity(count);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Ok(Self { dimensions, pixels })
    }

    /// Convert a decoded `image` buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] for an empty image.
    pub fn from_rgb_image(image: &RgbImage) -> Result<Self, PipelineError> {
        let pixels = image
            .pixels()
            .map(|p| Rgb::new(p.0[0], p.0[1], p.0[2]))
            .collect();
        Self::new(image.width(), image.height(), pixels)
    }

    /// Convert into an `image` buffer for encoding.
    #[must_use]
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width(), self.height(), |x, y| {
            image::Rgb(self.pixel(x, y).to_bytes())
        })
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.dimensions.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Width and height.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// All pixels, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Consume the raster, returning its pixel buffer.
    #[must_use]
    pub fn into_pixels(self) -> Vec<Rgb> {
        self.pixels
    }

    /// The pixel at `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    /// The pixel at `(x, y)`, black when out of bounds.
    fn pixel(&self, x: u32, y: u32) -> Rgb {
        self.get(x, y).unwrap_or(Rgb::BLACK)
    }

    /// Row `y` as a slice of `width` pixels (empty when out of bounds).
    #[must_use]
    pub fn row(&self, y: u32) -> &[Rgb] {
        self.rows().nth(y as usize).unwrap_or(&[])
    }

    /// Iterate over rows from top to bottom.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[Rgb]> + '_ {
        self.pixels.chunks_exact(self.width() as usize)
    }

    /// Iterate over the pixels of `columns` in each row, top to bottom.
    ///
    /// This is the view a worker's fragment is cut from, without copying
    /// the source raster.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ColumnRange`] if the range is empty or
    /// extends past the raster's width.
    pub fn column_rows(
        &self,
        columns: Range<u32>,
    ) -> Result<impl ExactSizeIterator<Item = &[Rgb]> + '_, PipelineError> {
        if columns.start >= columns.end || columns.end > self.width() {
            return Err(PipelineError::ColumnRange {
                start: columns.start,
                end: columns.end,
                width: self.width(),
            });
        }
        let span = columns.start as usize..columns.end as usize;
        Ok(self.rows().map(move |row| &row[span.clone()]))
    }

    /// Copy a column range into its own raster.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ColumnRange`] if the range is empty or
    /// extends past the raster's width.
    pub fn crop_columns(&self, columns: Range<u32>) -> Result<Self, PipelineError> {
        let width = columns.end.saturating_sub(columns.start);
        let pixels: Vec<Rgb> = self
            .column_rows(columns)?
            .flat_map(<[Rgb]>::iter)
            .copied()
            .collect();
        Self::new(width, self.height(), pixels)
    }

    /// Produce a new raster of the same size by mapping every pixel.
    ///
    /// The receiver is left untouched.
    #[must_use]
    pub fn map(&self, f: impl Fn(Rgb) -> Rgb) -> Self {
        Self {
            dimensions: self.dimensions,
            pixels: self.pixels.iter().copied().map(f).collect(),
        }
    }

    /// Build a raster from parts already known to satisfy the invariant.
    pub(crate) fn from_parts(dimensions: Dimensions, pixels: Vec<Rgb>) -> Self {
        debug_assert_eq!(dimensions.pixel_count(), Some(pixels.len()));
        Self { dimensions, pixels }
    }

    const fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.dimensions.width as usize + x as usize
    }
}

/// `width * height` for a non-empty raster.
fn checked_pixel_count(dimensions: Dimensions) -> Result<usize, PipelineError> {
    if dimensions.width == 0 || dimensions.height == 0 {
        return Err(PipelineError::InvalidDimensions(dimensions));
    }
    dimensions
        .pixel_count()
        .ok_or(PipelineError::InvalidDimensions(dimensions))
}
