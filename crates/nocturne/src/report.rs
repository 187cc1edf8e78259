//! The CSV classification report.

use std::path::Path;

use serde::Serialize;

use crate::error::AppError;

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    /// File name of the written image.
    pub image: String,
    /// `1` if the image is mostly black, `0` otherwise.
    pub nearly_black: u8,
}

impl ReportRow {
    /// A row for `image` with its classification.
    #[must_use]
    pub fn new(image: impl Into<String>, nearly_black: bool) -> Self {
        Self {
            image: image.into(),
            nearly_black: u8::from(nearly_black),
        }
    }
}

/// Write `rows` to `path` with an `image,nearly_black` header, replacing
/// any existing file.
///
/// # Errors
///
/// Returns [`AppError::Report`] if the file cannot be created or written.
pub fn write(path: &Path, rows: &[ReportRow]) -> Result<(), AppError> {
    let err = |source| AppError::Report {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(err)?;
    for row in rows {
        writer.serialize(row).map_err(err)?;
    }
    writer.flush().map_err(|e| err(csv::Error::from(e)))
}
