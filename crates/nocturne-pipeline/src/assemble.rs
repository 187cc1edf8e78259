//! Reassembly of column fragments into one raster.
//!
//! Each fragment's rows are copied into the destination at its
//! partition's column offset. Fragments are matched to partitions by
//! position, so the caller must hand them over in partition order.

use crate::partition::Partition;
use crate::raster::Raster;
use crate::types::{AssemblyError, Dimensions, Rgb};

/// Stitch one fragment per partition back into a `dimensions` raster.
///
/// # Errors
///
/// Returns an [`AssemblyError`] if the partitions do not tile the
/// target width, the fragment count differs from the partition count,
/// or any fragment's size differs from its partition's.
pub fn assemble(
    dimensions: Dimensions,
    partitions: &[Partition],
    fragments: &[Raster],
) -> Result<Raster, AssemblyError> {
    let fragments: Vec<Option<&Raster>> = fragments.iter().map(Some).collect();
    stitch(dimensions, partitions, &fragments)
}

/// Like [`assemble`], but partitions without a fragment are left black.
///
/// Used when some workers failed and the caller chose to keep the
/// partitions that did succeed.
///
/// # Errors
///
/// Same conditions as [`assemble`], checked for the fragments present.
pub fn assemble_available(
    dimensions: Dimensions,
    partitions: &[Partition],
    fragments: &[Option<Raster>],
) -> Result<Raster, AssemblyError> {
    let fragments: Vec<Option<&Raster>> = fragments.iter().map(Option::as_ref).collect();
    stitch(dimensions, partitions, &fragments)
}

fn stitch(
    dimensions: Dimensions,
    partitions: &[Partition],
    fragments: &[Option<&Raster>],
) -> Result<Raster, AssemblyError> {
    if fragments.len() != partitions.len() {
        return Err(AssemblyError::FragmentCount {
            expected: partitions.len(),
            actual: fragments.len(),
        });
    }
    check_coverage(dimensions, partitions)?;
    let pixel_count = dimensions
        .pixel_count()
        .ok_or(AssemblyError::Coverage(dimensions))?;

    let width = dimensions.width as usize;
    let mut pixels = vec![Rgb::BLACK; pixel_count];

    for (partition, fragment) in partitions.iter().zip(fragments) {
        let Some(fragment) = fragment else {
            log::debug!("partition {} missing, leaving it black", partition.index);
            continue;
        };
        let expected = Dimensions::new(partition.width(), dimensions.height);
        if fragment.dimensions() != expected {
            return Err(AssemblyError::FragmentShape {
                index: partition.index,
                expected,
                actual: fragment.dimensions(),
            });
        }

        let offset = partition.start_col as usize;
        for (dest_row, src_row) in pixels.chunks_exact_mut(width).zip(fragment.rows()) {
            dest_row[offset..offset + src_row.len()].copy_from_slice(src_row);
        }
    }

    Ok(Raster::from_parts(dimensions, pixels))
}

/// Partitions must run `0..width` contiguously, in index order.
fn check_coverage(dimensions: Dimensions, partitions: &[Partition]) -> Result<(), AssemblyError> {
    if dimensions.width == 0 || dimensions.height == 0 {
        return Err(AssemblyError::Coverage(dimensions));
    }
    let mut next = 0;
    for (i, partition) in partitions.iter().enumerate() {
        if partition.index != i
            || partition.start_col != next
            || partition.end_col <= partition.start_col
        {
            return Err(AssemblyError::Coverage(dimensions));
        }
        next = partition.end_col;
    }
    if next == dimensions.width {
        Ok(())
    } else {
        Err(AssemblyError::Coverage(dimensions))
    }
}
