use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::columns::ColumnSpec;
use crate::exif::write_geotag;
use crate::record::{GeotagRecord, build_record};
use crate::table::{Table, find_row};
use crate::time::TimeMode;

/// Supported image extensions. Telemetry geotagging targets JPEG captures.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// The outcome of processing a single photo through the geotag pipeline.
#[derive(Debug, Serialize)]
pub struct ProcessResult {
    pub path: PathBuf,
    /// Whether a telemetry row was found for this photo.
    pub matched: bool,
    /// The record assembled from the matched row (also present on dry runs).
    pub record: Option<GeotagRecord>,
    /// Record fields actually written into the photo.
    pub fields_written: Vec<&'static str>,
    pub error: Option<String>,
}

/// Aggregated batch outcome, tallied from the per-photo results.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Photos with a telemetry row whose metadata write succeeded (or was
    /// previewed, on a dry run).
    pub tagged: usize,
    /// Photos skipped because no telemetry row matched.
    pub skipped: usize,
    /// Photos whose metadata write failed.
    pub failed: usize,
}

impl RunReport {
    pub fn tally(results: &[ProcessResult]) -> Self {
        let mut report = Self::default();
        for result in results {
            if !result.matched {
                report.skipped += 1;
            } else if result.error.is_some() {
                report.failed += 1;
            } else {
                report.tagged += 1;
            }
        }
        report
    }

    pub fn total(&self) -> usize {
        self.tagged + self.skipped + self.failed
    }
}

/// Collect supported image files below the import directory.
///
/// The directory is walked recursively (following symlinks) and results come
/// back in sorted order so batch runs are deterministic.
pub fn collect_photos(import_path: &Path) -> Vec<PathBuf> {
    let mut photos: Vec<PathBuf> = WalkDir::new(import_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file() && is_supported_image(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect();
    photos.sort();
    photos
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Process a single photo: match its telemetry row, build the geotag record,
/// and write it into the photo's metadata.
///
/// Never fails the batch. A photo without a telemetry row is reported as
/// unmatched; a failed metadata write is reported in `error`. With `dry_run`
/// the record is built and reported but nothing is written.
pub fn process_photo(
    path: &Path,
    table: &Table,
    filenames: &[String],
    spec: &ColumnSpec,
    mode: &TimeMode,
    dry_run: bool,
) -> ProcessResult {
    let mut result = ProcessResult {
        path: path.to_path_buf(),
        matched: false,
        record: None,
        fields_written: Vec::new(),
        error: None,
    };

    let row = match find_row(path, filenames) {
        Some(row) => row,
        None => {
            log::warn!("No table entry found for photo {}", path.display());
            return result;
        }
    };
    result.matched = true;

    let record = build_record(table, row, spec, mode, path);
    if record.is_empty() {
        log::warn!(
            "Telemetry row for {} produced no usable fields",
            path.display()
        );
    }

    if !dry_run {
        match write_geotag(path, &record) {
            Ok(write_result) => result.fields_written = write_result.fields_written,
            Err(e) => {
                result.error = Some(format!("{e:#}"));
                log::error!("Failed to write metadata for {}: {e:#}", path.display());
            }
        }
    }

    result.record = Some(record);
    result
}
