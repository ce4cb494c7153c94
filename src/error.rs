use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for the photo-geotag crate.
///
/// Everything in here is fatal for the whole run: these errors surface during
/// pre-flight (column spec validation, table loading) before any photo is
/// touched. Per-photo and per-field failures are deliberately *not* errors —
/// they degrade to warnings and the batch continues.
#[derive(Error, Debug)]
pub enum GeotagError {
    /// A caller-supplied column number was `0`. Columns are 1-based; absence
    /// is expressed by omitting the argument, never by zero.
    #[error("csv column numbers start with 1, column `{name}` was given as 0")]
    InvalidColumnSpec { name: &'static str },

    /// The meta column/name/type triple was incomplete or inconsistent.
    #[error("invalid meta data spec: {0}")]
    InvalidMetaSpec(String),

    /// The telemetry table (or another required file) could not be opened.
    #[error("cannot access {}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A timestamp cell could not be converted under the selected time mode.
    #[error("cannot parse timestamp {value:?}: {reason}")]
    TimeParse { value: String, reason: String },

    #[error("csv read failed: {0}")]
    Csv(#[from] csv::Error),
}
