//! BMP file input and output.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::ImageFormat;
use nocturne_pipeline::Raster;

use crate::error::AppError;

/// Decode a BMP file into a raster. Alpha, if any, is dropped.
///
/// # Errors
///
/// Returns [`AppError::Io`] if the file cannot be opened,
/// [`AppError::ReadImage`] if it is not a decodable BMP, and
/// [`AppError::Raster`] if it has no pixels.
pub fn read(path: &Path) -> Result<Raster, AppError> {
    let file = File::open(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let image = image::load(BufReader::new(file), ImageFormat::Bmp).map_err(|source| {
        AppError::ReadImage {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(Raster::from_rgb_image(&image.to_rgb8())?)
}

/// Encode `raster` as a 24-bit BMP at `path`, replacing any existing file.
///
/// # Errors
///
/// Returns [`AppError::WriteImage`] if encoding or writing fails.
pub fn write(path: &Path, raster: &Raster) -> Result<(), AppError> {
    raster
        .to_rgb_image()
        .save_with_format(path, ImageFormat::Bmp)
        .map_err(|source| AppError::WriteImage {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nocturne_pipeline::Rgb;

    use super::*;

    #[test]
    fn written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.bmp");
        let raster = Raster::from_fn(5, 3, |x, y| {
            Rgb::new(
                u8::try_from(x * 50).unwrap(),
                u8::try_from(y * 80).unwrap(),
                7,
            )
        })
        .unwrap();

        write(&path, &raster).unwrap();
        assert_eq!(read(&path).unwrap(), raster);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read(&dir.path().join("absent.bmp")),
            Err(AppError::Io { .. })
        ));
    }

    #[test]
    fn non_bmp_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("text.bmp");
        std::fs::write(&path, b"not a bitmap").unwrap();
        assert!(matches!(read(&path), Err(AppError::ReadImage { .. })));
    }
}
