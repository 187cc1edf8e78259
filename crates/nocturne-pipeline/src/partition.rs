//! Column partitioning.
//!
//! Splits a raster's width into `W` contiguous column ranges, one per
//! worker. Every partition gets `width / W` columns; the last one also
//! takes the `width % W` leftover columns.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

/// The `[start_col, end_col)` column range assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    /// Position of this partition, `0..W`.
    pub index: usize,
    /// First column (inclusive).
    pub start_col: u32,
    /// Last column (exclusive).
    pub end_col: u32,
}

impl Partition {
    /// Number of columns covered.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.end_col - self.start_col
    }

    /// The covered columns as a range.
    #[must_use]
    pub const fn columns(&self) -> Range<u32> {
        self.start_col..self.end_col
    }
}

/// Split `width` columns into `workers` ordered partitions.
///
/// Partition `i < W-1` spans `[i*base, (i+1)*base)` with
/// `base = width / W`; the last spans `[(W-1)*base, width)`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `workers` is zero or
/// greater than `width`, since either would produce empty partitions.
pub fn partition(width: u32, workers: usize) -> Result<Vec<Partition>, PipelineError> {
    if workers == 0 {
        return Err(PipelineError::InvalidConfig(
            "worker count must be at least 1".into(),
        ));
    }
    let count = u32::try_from(workers)
        .ok()
        .filter(|&count| count <= width)
        .ok_or_else(|| {
            PipelineError::InvalidConfig(format!(
                "worker count {workers} exceeds image width {width}"
            ))
        })?;

    let base = width / count;
    let partitions = (0..count)
        .map(|i| {
            let start_col = i * base;
            let end_col = if i + 1 == count {
                width
            } else {
                start_col + base
            };
            Partition {
                index: i as usize,
                start_col,
                end_col,
            }
        })
        .collect();
    Ok(partitions)
}
