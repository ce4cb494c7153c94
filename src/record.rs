//! Assembly of the per-photo geotag record from a matched table row.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::columns::{ColumnSpec, MetaType};
use crate::table::Table;
use crate::time::{TimeMode, convert_timestamp};

/// A latitude/longitude pair in decimal degrees.
///
/// Always constructed whole: a record either has a full position or none at
/// all. Consumers never see a lone latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsPosition {
    pub latitude: f64,
    pub longitude: f64,
}

/// A typed meta value extracted from an extra table column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    String(String),
    Double(f64),
    Long(i64),
    Date(NaiveDateTime),
    Boolean(bool),
}

/// The geotag assembled for one photo, consumed immediately by the metadata
/// writer and then discarded.
///
/// Every field is optional: it is populated only when its column was
/// specified for the run *and* the cell parsed. A field that fails to parse
/// is logged and left absent — one bad cell never sinks the record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GeotagRecord {
    pub timestamp: Option<NaiveDateTime>,
    pub position: Option<GpsPosition>,
    /// Camera direction in degrees.
    pub heading: Option<f64>,
    /// Altitude in meters.
    pub altitude: Option<f64>,
    pub meta: BTreeMap<String, MetaValue>,
}

impl GeotagRecord {
    pub fn is_empty(&self) -> bool {
        self.timestamp.is_none()
            && self.position.is_none()
            && self.heading.is_none()
            && self.altitude.is_none()
            && self.meta.is_empty()
    }
}

/// Build the geotag record for the photo matched at `row`.
///
/// `photo` is only used to identify the file in warnings.
pub fn build_record(
    table: &Table,
    row: usize,
    spec: &ColumnSpec,
    mode: &TimeMode,
    photo: &Path,
) -> GeotagRecord {
    let mut record = GeotagRecord::default();

    if let Some(column) = spec.timestamp {
        record.timestamp = match convert_timestamp(cell(table, column, row), mode) {
            Ok(dt) => Some(dt),
            Err(e) => {
                log::warn!("{}: {e}, timestamp omitted", photo.display());
                None
            }
        };
    }

    let latitude = spec.latitude.and_then(|c| parse_float(table, c, row, "latitude", photo));
    let longitude = spec.longitude.and_then(|c| parse_float(table, c, row, "longitude", photo));
    record.position = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(GpsPosition { latitude, longitude }),
        (None, None) => None,
        _ => {
            // Both halves must be present to emit a position.
            log::warn!(
                "{}: only one of latitude/longitude available, position omitted",
                photo.display()
            );
            None
        }
    };

    record.heading = spec.heading.and_then(|c| parse_float(table, c, row, "heading", photo));
    record.altitude = spec.altitude.and_then(|c| parse_float(table, c, row, "altitude", photo));

    for meta in &spec.meta {
        match coerce_meta(cell(table, meta.column, row), meta.ty, mode) {
            Some(value) => {
                record.meta.insert(meta.name.clone(), value);
            }
            None => log::warn!(
                "{}: meta data {} could not be extracted",
                photo.display(),
                meta.name
            ),
        }
    }

    record
}

/// A cell by 0-based column/row; out-of-range reads as an empty cell, which
/// fails every downstream parse the same way an empty string would.
fn cell<'a>(table: &'a Table, column: usize, row: usize) -> &'a str {
    table.cell(column, row).unwrap_or("")
}

fn parse_float(
    table: &Table,
    column: usize,
    row: usize,
    field: &str,
    photo: &Path,
) -> Option<f64> {
    let raw = cell(table, column, row);
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            log::warn!(
                "{}: {field} cell {raw:?} is not numeric, field omitted",
                photo.display()
            );
            None
        }
    }
}

/// Coerce a raw cell to its declared meta type. `None` means the coercion
/// failed and the field is dropped from the record.
fn coerce_meta(raw: &str, ty: MetaType, mode: &TimeMode) -> Option<MetaValue> {
    let trimmed = raw.trim();
    match ty {
        MetaType::String => {
            if trimmed.is_empty() {
                None
            } else {
                Some(MetaValue::String(trimmed.to_string()))
            }
        }
        MetaType::Double => trimmed.parse().ok().map(MetaValue::Double),
        MetaType::Long => trimmed.parse().ok().map(MetaValue::Long),
        // Date cells follow the run's time mode, so a tick-based log can
        // carry tick-based meta dates without a second format flag.
        MetaType::Date => convert_timestamp(trimmed, mode).ok().map(MetaValue::Date),
        MetaType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(MetaValue::Boolean(true)),
            "false" | "0" => Some(MetaValue::Boolean(false)),
            _ => None,
        },
    }
}
