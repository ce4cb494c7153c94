//! Columnar telemetry table loading and photo-to-row matching.

use std::path::Path;

use crate::error::GeotagError;

/// An in-memory columnar view of the telemetry log.
///
/// Built once by [`Table::from_path`], read-only afterwards. Every column has
/// exactly one cell per row; rows that were shorter than the widest row in
/// the file are padded with empty cells so downstream indexing never has to
/// care about ragged input.
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<Vec<String>>,
}

impl Table {
    /// Read a delimited text file into a columnar table.
    ///
    /// * `delimiter` — single-byte field separator (`b','` by default at the CLI)
    /// * `has_header` — discard the first physical row before building columns
    ///
    /// The whole file is read or the call fails; there are no partial loads.
    pub fn from_path(path: &Path, delimiter: u8, has_header: bool) -> Result<Self, GeotagError> {
        let file = std::fs::File::open(path).map_err(|source| GeotagError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut rows: Vec<csv::StringRecord> = Vec::new();
        for record in reader.records() {
            rows.push(record?);
        }
        if has_header && !rows.is_empty() {
            rows.remove(0);
        }

        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let mut columns: Vec<Vec<String>> = (0..width)
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();
        for row in &rows {
            for (i, column) in columns.iter_mut().enumerate() {
                column.push(row.get(i).unwrap_or("").to_string());
            }
        }

        Ok(Self { columns })
    }

    /// All cells of one 0-based column, or `None` if the table is narrower.
    pub fn column(&self, index: usize) -> Option<&[String]> {
        self.columns.get(index).map(|c| c.as_slice())
    }

    /// A single cell by 0-based column and row.
    pub fn cell(&self, column: usize, row: usize) -> Option<&str> {
        self.columns.get(column)?.get(row).map(|s| s.as_str())
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// Find the table row whose filename cell matches a photo on disk.
///
/// Tries an exact match of the full photo path first; telemetry logs often
/// record bare filenames while the importer hands us absolute paths, so on
/// failure both sides are reduced to their last path component and compared
/// again. `None` means no entry — the caller warns and skips that photo.
pub fn find_row(photo: &Path, filenames: &[String]) -> Option<usize> {
    let needle = photo.to_string_lossy();
    if let Some(index) = filenames.iter().position(|name| name == needle.as_ref()) {
        return Some(index);
    }

    let basename = photo.file_name()?;
    filenames
        .iter()
        .position(|name| Path::new(name).file_name() == Some(basename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_table(contents: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("telemetry.csv");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_columns() {
        let (_dir, path) = write_table("IMG_1.jpg,100,52.5\nIMG_2.jpg,200,52.6\n");
        let table = Table::from_path(&path, b',', false).unwrap();

        assert_eq!(table.column_count(), 3);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, 1), Some("IMG_2.jpg"));
        assert_eq!(table.cell(2, 0), Some("52.5"));
    }

    #[test]
    fn header_row_is_discarded() {
        let (_dir, path) = write_table("file,time\nIMG_1.jpg,100\n");
        let table = Table::from_path(&path, b',', true).unwrap();

        assert_eq!(table.row_count(), 1);
        assert_eq!(table.cell(0, 0), Some("IMG_1.jpg"));
    }

    #[test]
    fn custom_delimiter() {
        let (_dir, path) = write_table("IMG_1.jpg;100\nIMG_2.jpg;200\n");
        let table = Table::from_path(&path, b';', false).unwrap();

        assert_eq!(table.cell(1, 1), Some("200"));
    }

    #[test]
    fn short_rows_are_padded() {
        let (_dir, path) = write_table("IMG_1.jpg,100,52.5\nIMG_2.jpg,200\n");
        let table = Table::from_path(&path, b',', false).unwrap();

        assert_eq!(table.column_count(), 3);
        assert_eq!(table.cell(2, 1), Some(""));
    }

    #[test]
    fn missing_file_is_file_access_error() {
        let err = Table::from_path(Path::new("/nonexistent/telemetry.csv"), b',', false)
            .unwrap_err();
        assert!(matches!(err, GeotagError::FileAccess { .. }));
    }

    #[test]
    fn find_row_exact_path() {
        let names = vec!["/data/IMG_1.jpg".to_string(), "/data/IMG_2.jpg".to_string()];
        assert_eq!(find_row(Path::new("/data/IMG_2.jpg"), &names), Some(1));
    }

    #[test]
    fn find_row_basename_fallback() {
        let names = vec!["IMG_1.jpg".to_string()];
        assert_eq!(find_row(Path::new("/a/b/IMG_1.jpg"), &names), Some(0));
    }

    #[test]
    fn find_row_basename_fallback_both_sides() {
        let names = vec!["logs/2019/IMG_7.jpg".to_string()];
        assert_eq!(find_row(Path::new("/import/IMG_7.jpg"), &names), Some(0));
    }

    #[test]
    fn find_row_no_match() {
        let names = vec!["IMG_1.jpg".to_string()];
        assert_eq!(find_row(Path::new("/a/b/IMG_9.jpg"), &names), None);
    }
}
