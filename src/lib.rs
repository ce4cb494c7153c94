//! # photo-geotag
//!
//! Geotag a directory of photographs from a delimited telemetry log. Each row
//! of the log is keyed by filename and carries a timestamp plus optional
//! latitude/longitude, heading, altitude, and arbitrary typed meta fields;
//! matching rows are converted into EXIF metadata and written into the photos
//! in place.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use photo_geotag::columns::{ColumnSpec, RawColumns};
//! use photo_geotag::pipeline::{collect_photos, process_photo, RunReport};
//! use photo_geotag::table::Table;
//! use photo_geotag::time::{TimeMode, DEFAULT_TIME_FORMAT};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     // Describe which table columns carry what (1-based, as on the CLI).
//!     let spec = ColumnSpec::resolve(
//!         &RawColumns {
//!             filename: 1,
//!             timestamp: Some(2),
//!             latitude: Some(3),
//!             longitude: Some(4),
//!             ..RawColumns::default()
//!         },
//!         None,
//!         None,
//!         None,
//!     )?;
//!
//!     // Load the telemetry table and the photos to process.
//!     let table = Table::from_path(Path::new("track.csv"), b',', true)?;
//!     let filenames = table
//!         .column(spec.filename)
//!         .ok_or_else(|| anyhow::anyhow!("filename column out of range"))?
//!         .to_vec();
//!     let photos = collect_photos(Path::new("./photos"));
//!
//!     let mode = TimeMode::Calendar {
//!         format: DEFAULT_TIME_FORMAT.to_string(),
//!     };
//!     let results: Vec<_> = photos
//!         .iter()
//!         .map(|photo| process_photo(photo, &table, &filenames, &spec, &mode, false))
//!         .collect();
//!
//!     let report = RunReport::tally(&results);
//!     println!("{} tagged, {} skipped, {} failed", report.tagged, report.skipped, report.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Timestamp encodings
//!
//! Telemetry logs encode time three ways; pick one [`time::TimeMode`] per run:
//!
//! | Mode | Cell contents |
//! |------|---------------|
//! | `Calendar` | calendar strings in a caller-declared format |
//! | `UtcEpoch` | epoch seconds or milliseconds, auto-disambiguated |
//! | `GpsTicks` | raw GNSS tick counts since 1980-01-06 |
//!
//! ## Modules
//!
//! - [`table`] — delimited-file loading and photo-to-row matching
//! - [`columns`] — validation of caller-supplied column numbers
//! - [`time`] — timestamp cell conversion, including satellite-tick math
//! - [`record`] — per-photo geotag record assembly
//! - [`exif`] — EXIF metadata writing
//! - [`pipeline`] — batch processing and run reporting
//! - [`pairing`] — front/back fisheye pairing for external stitching

pub mod columns;
pub mod error;
pub mod exif;
pub mod pairing;
pub mod pipeline;
pub mod record;
pub mod table;
pub mod time;
