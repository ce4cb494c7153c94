//! EXIF metadata writing.
//!
//! The geotag pipeline hands a [`GeotagRecord`](crate::record::GeotagRecord)
//! and a file path to [`write_geotag`], which embeds the timestamp, GPS
//! position, heading, altitude, and meta fields into the photo's EXIF while
//! preserving every other byte of the file.

mod writer;

pub use writer::{WriteResult, write_geotag};
