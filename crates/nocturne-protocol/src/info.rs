//! The 40-byte info record that opens every fragment message.
//!
//! Field layout follows a `BITMAPINFOHEADER`, little-endian:
//!
//! | offset | size | field              | value on the wire        |
//! |--------|------|--------------------|--------------------------|
//! | 0      | 4    | `header_size`      | 40                       |
//! | 4      | 4    | `width` (i32)      | fragment width           |
//! | 8      | 4    | `height` (i32)     | fragment height          |
//! | 12     | 2    | `planes`           | 1                        |
//! | 14     | 2    | `bit_count`        | 24                       |
//! | 16     | 4    | `compression`      | 0                        |
//! | 20     | 4    | `image_size`       | `width * height * 3`     |
//! | 24     | 16   | resolution, colors | 0                        |
//!
//! Only `width` and `height` drive decoding. The constant fields are
//! checked on read so that a desynchronized stream is caught at the
//! header instead of producing a garbled image.

use nocturne_pipeline::Dimensions;

use crate::error::ProtocolError;

/// Value of the `header_size` field: the record's own length.
const HEADER_SIZE: u32 = 40;

/// Encoded size of the info record.
pub const INFO_RECORD_LEN: usize = HEADER_SIZE as usize;

/// Largest fragment, in pixels, a reader will allocate for.
pub const MAX_PIXELS: u64 = 1 << 28;

const PLANES: u16 = 1;
const BIT_COUNT: u16 = 24;
const COMPRESSION_NONE: u32 = 0;

/// Bytes per pixel on the wire.
pub const BYTES_PER_PIXEL: usize = 3;

/// Geometry carried by an info record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoRecord {
    /// Fragment size in pixels.
    pub dimensions: Dimensions,
}

impl InfoRecord {
    /// Describe a fragment of the given size.
    #[must_use]
    pub const fn new(dimensions: Dimensions) -> Self {
        Self { dimensions }
    }

    /// Encode into the fixed wire layout.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::BadDimensions`] if the size does not fit
    /// the record's signed 32-bit fields or exceeds [`MAX_PIXELS`].
    pub fn encode(&self) -> Result<[u8; INFO_RECORD_LEN], ProtocolError> {
        let Dimensions { width, height } = self.dimensions;
        let bad = || ProtocolError::BadDimensions {
            width: i32::try_from(width).unwrap_or(i32::MAX),
            height: i32::try_from(height).unwrap_or(i32::MAX),
        };
        let w = i32::try_from(width).map_err(|_| bad())?;
        let h = i32::try_from(height).map_err(|_| bad())?;
        let image_size = image_size(width, height).ok_or_else(bad)?;

        let mut buf = [0u8; INFO_RECORD_LEN];
        buf[0..4].copy_from_slice(&HEADER_SIZE.to_le_bytes());
        buf[4..8].copy_from_slice(&w.to_le_bytes());
        buf[8..12].copy_from_slice(&h.to_le_bytes());
        buf[12..14].copy_from_slice(&PLANES.to_le_bytes());
        buf[14..16].copy_from_slice(&BIT_COUNT.to_le_bytes());
        buf[16..20].copy_from_slice(&COMPRESSION_NONE.to_le_bytes());
        buf[20..24].copy_from_slice(&image_size.to_le_bytes());
        // Resolution and palette fields stay zero.
        Ok(buf)
    }

    /// Decode and validate the fixed wire layout.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::BadInfoRecord`] if a constant field is
    /// wrong, or [`ProtocolError::BadDimensions`] if the declared size is
    /// non-positive or larger than [`MAX_PIXELS`].
    pub fn decode(buf: &[u8; INFO_RECORD_LEN]) -> Result<Self, ProtocolError> {
        let header_size = u32_at(buf, 0);
        let width = i32_at(buf, 4);
        let height = i32_at(buf, 8);
        let planes = u16_at(buf, 12);
        let bit_count = u16_at(buf, 14);
        let compression = u32_at(buf, 16);
        let declared_size = u32_at(buf, 20);

        expect_field("header_size", HEADER_SIZE.into(), header_size.into())?;
        expect_field("planes", PLANES.into(), planes.into())?;
        expect_field("bit_count", BIT_COUNT.into(), bit_count.into())?;
        expect_field("compression", COMPRESSION_NONE.into(), compression.into())?;

        let bad = ProtocolError::BadDimensions { width, height };
        let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
            return Err(bad);
        };
        if w == 0 || h == 0 {
            return Err(bad);
        }
        let size = image_size(w, h).ok_or(bad)?;
        expect_field("image_size", size.into(), declared_size.into())?;

        Ok(Self::new(Dimensions::new(w, h)))
    }

    /// Bytes in one row of pixels.
    #[must_use]
    pub const fn row_len(&self) -> usize {
        self.dimensions.width as usize * BYTES_PER_PIXEL
    }
}

/// `width * height * 3`, if within [`MAX_PIXELS`].
fn image_size(width: u32, height: u32) -> Option<u32> {
    let pixels = u64::from(width) * u64::from(height);
    if pixels > MAX_PIXELS {
        return None;
    }
    u32::try_from(pixels * BYTES_PER_PIXEL as u64).ok()
}

fn expect_field(field: &'static str, expected: u64, actual: u64) -> Result<(), ProtocolError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ProtocolError::BadInfoRecord {
            field,
            expected,
            actual,
        })
    }
}

fn u16_at(buf: &[u8; INFO_RECORD_LEN], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn u32_at(buf: &[u8; INFO_RECORD_LEN], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn i32_at(buf: &[u8; INFO_RECORD_LEN], at: usize) -> i32 {
    i32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_bitmap_info_header() {
        let buf = InfoRecord::new(Dimensions::new(3, 2)).encode().unwrap();
        assert_eq!(&buf[0..4], &40u32.to_le_bytes());
        assert_eq!(&buf[4..8], &3i32.to_le_bytes());
        assert_eq!(&buf[8..12], &2i32.to_le_bytes());
        assert_eq!(&buf[12..14], &1u16.to_le_bytes());
        assert_eq!(&buf[14..16], &24u16.to_le_bytes());
        assert_eq!(&buf[20..24], &18u32.to_le_bytes());
        assert!(buf[24..].iter().all(|&b| b == 0));
    }

    #[test]
    fn decode_reads_back_dimensions() {
        let dims = Dimensions::new(640, 480);
        let buf = InfoRecord::new(dims).encode().unwrap();
        assert_eq!(InfoRecord::decode(&buf).unwrap().dimensions, dims);
    }

    #[test]
    fn negative_height_is_rejected() {
        let mut buf = InfoRecord::new(Dimensions::new(2, 2)).encode().unwrap();
        buf[8..12].copy_from_slice(&(-2i32).to_le_bytes());
        assert!(matches!(
            InfoRecord::decode(&buf),
            Err(ProtocolError::BadDimensions { height: -2, .. })
        ));
    }

    #[test]
    fn zero_width_is_rejected() {
        let mut buf = InfoRecord::new(Dimensions::new(2, 2)).encode().unwrap();
        buf[4..8].copy_from_slice(&0i32.to_le_bytes());
        assert!(matches!(
            InfoRecord::decode(&buf),
            Err(ProtocolError::BadDimensions { width: 0, .. })
        ));
    }

    #[test]
    fn wrong_bit_count_is_rejected() {
        let mut buf = InfoRecord::new(Dimensions::new(2, 2)).encode().unwrap();
        buf[14..16].copy_from_slice(&32u16.to_le_bytes());
        assert!(matches!(
            InfoRecord::decode(&buf),
            Err(ProtocolError::BadInfoRecord {
                field: "bit_count",
                expected: 24,
                actual: 32
            })
        ));
    }

    #[test]
    fn inconsistent_image_size_is_rejected() {
        let mut buf = InfoRecord::new(Dimensions::new(2, 2)).encode().unwrap();
        buf[20..24].copy_from_slice(&13u32.to_le_bytes());
        assert!(matches!(
            InfoRecord::decode(&buf),
            Err(ProtocolError::BadInfoRecord {
                field: "image_size",
                ..
            })
        ));
    }

    #[test]
    fn oversized_fragment_is_rejected() {
        let huge = InfoRecord::new(Dimensions::new(1 << 15, 1 << 14));
        assert!(matches!(
            huge.encode(),
            Err(ProtocolError::BadDimensions { .. })
        ));
    }
}
