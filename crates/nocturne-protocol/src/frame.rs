//! Reading and writing whole messages.
//!
//! A request is one fragment followed by the filter parameters; a reply
//! is three fragments, one per chain stage. Every read and write goes
//! through `read_exact`/`write_all`, so short transfers on a pipe are
//! retried until the full record has moved.

use std::io::{Read, Write};
use std::ops::Range;

use nocturne_pipeline::{ChainOutput, Dimensions, FilterParams, Raster, Rgb};

use crate::error::ProtocolError;
use crate::info::{BYTES_PER_PIXEL, INFO_RECORD_LEN, InfoRecord};

/// A decoded request: the fragment to process and how to process it.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Pixels of the assigned column range.
    pub fragment: Raster,
    /// Parameters for the filter chain.
    pub params: FilterParams,
}

/// Write `raster` as one fragment message.
///
/// # Errors
///
/// Returns [`ProtocolError::BadDimensions`] if the raster is too large for
/// the info record, or [`ProtocolError::Io`] if the channel fails.
pub fn write_fragment<W: Write>(out: &mut W, raster: &Raster) -> Result<(), ProtocolError> {
    write_fragment_columns(out, raster, 0..raster.width())
}

/// Write the `columns` range of `raster` as one fragment message without
/// copying it into its own raster first.
///
/// # Errors
///
/// Same as [`write_fragment`], plus [`ProtocolError::BadDimensions`] if
/// the column range is empty or outside the raster.
pub fn write_fragment_columns<W: Write>(
    out: &mut W,
    raster: &Raster,
    columns: Range<u32>,
) -> Result<(), ProtocolError> {
    let width = columns.end.saturating_sub(columns.start);
    let rows = raster
        .column_rows(columns)
        .map_err(|_| ProtocolError::BadDimensions {
            width: i32::try_from(width).unwrap_or(i32::MAX),
            height: i32::try_from(raster.height()).unwrap_or(i32::MAX),
        })?;

    let info = InfoRecord::new(Dimensions::new(width, raster.height()));
    out.write_all(&info.encode()?).map_err(ProtocolError::Io)?;

    let mut line = Vec::with_capacity(info.row_len());
    for row in rows {
        line.clear();
        line.extend(row.iter().flat_map(|p| p.to_bytes()));
        out.write_all(&line).map_err(ProtocolError::Io)?;
    }
    Ok(())
}

/// Read one fragment message, trusting the dimensions it declares.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if the stream ends early, or a
/// validation error if the info record is malformed.
pub fn read_fragment<R: Read>(input: &mut R) -> Result<Raster, ProtocolError> {
    let info = read_info(input)?;
    read_pixels(input, info)
}

/// Read one fragment message whose size is already known to the reader.
///
/// # Errors
///
/// Same as [`read_fragment`], plus [`ProtocolError::DimensionMismatch`]
/// if the declared size differs from `expected`. The pixel payload is not
/// consumed in that case.
pub fn read_fragment_expecting<R: Read>(
    input: &mut R,
    expected: Dimensions,
) -> Result<Raster, ProtocolError> {
    let info = read_info(input)?;
    if info.dimensions != expected {
        return Err(ProtocolError::DimensionMismatch {
            expected,
            actual: info.dimensions,
        });
    }
    read_pixels(input, info)
}

/// Write the two filter parameters, saturation factor first.
///
/// # Errors
///
/// Returns [`ProtocolError::Io`] if the channel fails.
pub fn write_params<W: Write>(out: &mut W, params: FilterParams) -> Result<(), ProtocolError> {
    let mut buf = [0u8; 8];
    buf[..4].copy_from_slice(&params.saturation_factor.to_le_bytes());
    buf[4..].copy_from_slice(&params.binarize_threshold.to_le_bytes());
    out.write_all(&buf).map_err(ProtocolError::Io)
}

/// Read the two filter parameters.
///
/// Values are returned as sent; range checks are left to
/// [`FilterParams::validate`].
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if fewer than eight bytes remain.
pub fn read_params<R: Read>(input: &mut R) -> Result<FilterParams, ProtocolError> {
    let mut buf = [0u8; 8];
    input
        .read_exact(&mut buf)
        .map_err(|e| ProtocolError::from_io(e, "filter parameters"))?;
    let [a, b, c, d, e, f, g, h] = buf;
    Ok(FilterParams {
        saturation_factor: f32::from_le_bytes([a, b, c, d]),
        binarize_threshold: f32::from_le_bytes([e, f, g, h]),
    })
}

/// Write a full request and flush it.
///
/// # Errors
///
/// See [`write_fragment`].
pub fn write_request<W: Write>(
    out: &mut W,
    fragment: &Raster,
    params: FilterParams,
) -> Result<(), ProtocolError> {
    write_request_columns(out, fragment, 0..fragment.width(), params)
}

/// Write a request for the `columns` range of `raster` and flush it.
///
/// # Errors
///
/// See [`write_fragment_columns`].
pub fn write_request_columns<W: Write>(
    out: &mut W,
    raster: &Raster,
    columns: Range<u32>,
    params: FilterParams,
) -> Result<(), ProtocolError> {
    write_fragment_columns(out, raster, columns)?;
    write_params(out, params)?;
    out.flush().map_err(ProtocolError::Io)
}

/// Read a full request.
///
/// # Errors
///
/// See [`read_fragment`] and [`read_params`].
pub fn read_request<R: Read>(input: &mut R) -> Result<Request, ProtocolError> {
    let fragment = read_fragment(input)?;
    let params = read_params(input)?;
    log::trace!(
        "request: {} fragment, factor {}, threshold {}",
        fragment.dimensions(),
        params.saturation_factor,
        params.binarize_threshold
    );
    Ok(Request { fragment, params })
}

/// Write the three stage outputs in chain order and flush.
///
/// # Errors
///
/// See [`write_fragment`].
pub fn write_reply<W: Write>(out: &mut W, stages: &ChainOutput) -> Result<(), ProtocolError> {
    for (_, raster) in stages.iter() {
        write_fragment(out, raster)?;
    }
    out.flush().map_err(ProtocolError::Io)
}

/// Read a reply, taking the first stage's declared size as authoritative
/// for the other two.
///
/// # Errors
///
/// See [`read_fragment_expecting`].
pub fn read_reply<R: Read>(input: &mut R) -> Result<ChainOutput, ProtocolError> {
    let first = read_fragment(input)?;
    let dimensions = first.dimensions();
    read_remaining_stages(input, first, dimensions)
}

/// Read a reply whose fragments must all be `expected` in size.
///
/// # Errors
///
/// See [`read_fragment_expecting`].
pub fn read_reply_expecting<R: Read>(
    input: &mut R,
    expected: Dimensions,
) -> Result<ChainOutput, ProtocolError> {
    let first = read_fragment_expecting(input, expected)?;
    read_remaining_stages(input, first, expected)
}

/// Decode a reply that was collected into memory, rejecting anything
/// left over after the third fragment.
///
/// # Errors
///
/// See [`read_reply_expecting`], plus [`ProtocolError::TrailingBytes`].
pub fn decode_reply(mut bytes: &[u8], expected: Dimensions) -> Result<ChainOutput, ProtocolError> {
    let stages = read_reply_expecting(&mut bytes, expected)?;
    if bytes.is_empty() {
        Ok(stages)
    } else {
        Err(ProtocolError::TrailingBytes { count: bytes.len() })
    }
}

fn read_remaining_stages<R: Read>(
    input: &mut R,
    first: Raster,
    dimensions: Dimensions,
) -> Result<ChainOutput, ProtocolError> {
    let second = read_fragment_expecting(input, dimensions)?;
    let third = read_fragment_expecting(input, dimensions)?;
    log::trace!("reply: three {dimensions} stages");
    Ok(ChainOutput::from_stages([first, second, third]))
}

fn read_info<R: Read>(input: &mut R) -> Result<InfoRecord, ProtocolError> {
    let mut buf = [0u8; INFO_RECORD_LEN];
    input
        .read_exact(&mut buf)
        .map_err(|e| ProtocolError::from_io(e, "info record"))?;
    InfoRecord::decode(&buf)
}

fn read_pixels<R: Read>(input: &mut R, info: InfoRecord) -> Result<Raster, ProtocolError> {
    let Dimensions { width, height } = info.dimensions;
    let bad = || ProtocolError::BadDimensions {
        width: i32::try_from(width).unwrap_or(i32::MAX),
        height: i32::try_from(height).unwrap_or(i32::MAX),
    };
    let count = info.dimensions.pixel_count().ok_or_else(bad)?;

    let mut pixels = Vec::with_capacity(count);
    let mut line = vec![0u8; info.row_len()];
    for _ in 0..height {
        input
            .read_exact(&mut line)
            .map_err(|e| ProtocolError::from_io(e, "pixel rows"))?;
        pixels.extend(
            line.chunks_exact(BYTES_PER_PIXEL)
                .map(|c| Rgb::new(c[0], c[1], c[2])),
        );
    }
    Raster::new(width, height, pixels).map_err(|_| bad())
}
