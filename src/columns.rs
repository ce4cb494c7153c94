//! Validation and normalization of caller-supplied column numbers.
//!
//! The CLI surface speaks 1-based column numbers; everything downstream works
//! with 0-based indices. An unspecified column stays `None` through the whole
//! pipeline — it is never collapsed into index 0, which is itself a valid
//! position for the first column.

use std::str::FromStr;

use crate::error::GeotagError;

/// The fixed set of types a meta field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaType {
    String,
    Double,
    Long,
    Date,
    Boolean,
}

impl MetaType {
    pub const ALL: &'static [&'static str] = &["string", "double", "long", "date", "boolean"];
}

impl FromStr for MetaType {
    type Err = GeotagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "double" => Ok(Self::Double),
            "long" => Ok(Self::Long),
            "date" => Ok(Self::Date),
            "boolean" => Ok(Self::Boolean),
            other => Err(GeotagError::InvalidMetaSpec(format!(
                "unknown meta type {other:?}, valid types are {}",
                Self::ALL.join(", ")
            ))),
        }
    }
}

/// One extra table column to extract as a typed, named meta field.
#[derive(Debug, Clone)]
pub struct MetaColumn {
    /// 0-based table column.
    pub column: usize,
    /// Field name the value is stored under in the photo metadata.
    pub name: String,
    pub ty: MetaType,
}

/// Raw 1-based column numbers as supplied by the caller, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawColumns {
    pub filename: u32,
    pub timestamp: Option<u32>,
    pub latitude: Option<u32>,
    pub longitude: Option<u32>,
    pub heading: Option<u32>,
    pub altitude: Option<u32>,
}

/// Validated, 0-based column layout for one run. Built once, immutable.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub filename: usize,
    pub timestamp: Option<usize>,
    pub latitude: Option<usize>,
    pub longitude: Option<usize>,
    pub heading: Option<usize>,
    pub altitude: Option<usize>,
    pub meta: Vec<MetaColumn>,
}

impl ColumnSpec {
    /// Validate raw column numbers and the optional meta triple.
    ///
    /// Fails with [`GeotagError::InvalidColumnSpec`] if any *provided* column
    /// number is `0`, and with [`GeotagError::InvalidMetaSpec`] if the meta
    /// columns/names/types are not supplied all together with equal lengths
    /// and known types.
    pub fn resolve(
        raw: &RawColumns,
        meta_columns: Option<&str>,
        meta_names: Option<&str>,
        meta_types: Option<&str>,
    ) -> Result<Self, GeotagError> {
        let filename = match raw.filename {
            0 => return Err(GeotagError::InvalidColumnSpec { name: "filename" }),
            n => n as usize - 1,
        };

        Ok(Self {
            filename,
            timestamp: to_index(raw.timestamp, "timestamp")?,
            latitude: to_index(raw.latitude, "latitude")?,
            longitude: to_index(raw.longitude, "longitude")?,
            heading: to_index(raw.heading, "heading")?,
            altitude: to_index(raw.altitude, "altitude")?,
            meta: resolve_meta(meta_columns, meta_names, meta_types)?,
        })
    }
}

/// Convert a provided 1-based column number to a 0-based index.
///
/// `Some(0)` is a caller error, not "absent" — absence is `None`.
fn to_index(raw: Option<u32>, name: &'static str) -> Result<Option<usize>, GeotagError> {
    match raw {
        None => Ok(None),
        Some(0) => Err(GeotagError::InvalidColumnSpec { name }),
        Some(n) => Ok(Some(n as usize - 1)),
    }
}

/// Validate the all-or-nothing meta column/name/type triple.
fn resolve_meta(
    columns: Option<&str>,
    names: Option<&str>,
    types: Option<&str>,
) -> Result<Vec<MetaColumn>, GeotagError> {
    let supplied = [columns, names, types];
    if supplied.iter().all(Option::is_none) {
        return Ok(Vec::new());
    }
    if supplied.iter().any(Option::is_none) {
        return Err(GeotagError::InvalidMetaSpec(
            "extracting meta data requires meta columns, meta names and meta types together"
                .to_string(),
        ));
    }

    let columns = split_list(columns);
    let names = split_list(names);
    let types = split_list(types);
    if columns.len() != names.len() || types.len() != names.len() {
        return Err(GeotagError::InvalidMetaSpec(format!(
            "meta columns ({}), names ({}) and types ({}) must have the same count",
            columns.len(),
            names.len(),
            types.len()
        )));
    }

    let mut meta = Vec::with_capacity(columns.len());
    for ((column, name), ty) in columns.iter().zip(&names).zip(&types) {
        let number: u32 = column.parse().map_err(|_| {
            GeotagError::InvalidMetaSpec(format!(
                "meta column numbers must be comma-separated integers, got {column:?}"
            ))
        })?;
        if number == 0 {
            return Err(GeotagError::InvalidColumnSpec { name: "meta" });
        }
        meta.push(MetaColumn {
            column: number as usize - 1,
            name: name.to_string(),
            ty: ty.parse()?,
        });
    }
    Ok(meta)
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|part| part.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(filename: u32) -> RawColumns {
        RawColumns {
            filename,
            ..RawColumns::default()
        }
    }

    #[test]
    fn converts_one_based_to_zero_based() {
        let spec = ColumnSpec::resolve(
            &RawColumns {
                filename: 1,
                timestamp: Some(2),
                latitude: Some(3),
                longitude: Some(4),
                heading: None,
                altitude: None,
            },
            None,
            None,
            None,
        )
        .unwrap();

        assert_eq!(spec.filename, 0);
        assert_eq!(spec.timestamp, Some(1));
        assert_eq!(spec.latitude, Some(2));
        assert_eq!(spec.longitude, Some(3));
        assert_eq!(spec.heading, None);
        assert_eq!(spec.altitude, None);
        assert!(spec.meta.is_empty());
    }

    #[test]
    fn zero_column_is_rejected() {
        let err = ColumnSpec::resolve(
            &RawColumns {
                filename: 1,
                latitude: Some(0),
                ..RawColumns::default()
            },
            None,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GeotagError::InvalidColumnSpec { name: "latitude" }
        ));
    }

    #[test]
    fn zero_filename_column_is_rejected() {
        let err = ColumnSpec::resolve(&raw(0), None, None, None).unwrap_err();
        assert!(matches!(
            err,
            GeotagError::InvalidColumnSpec { name: "filename" }
        ));
    }

    #[test]
    fn partial_meta_spec_is_rejected() {
        for (columns, names, types) in [
            (Some("7"), None, None),
            (Some("7"), Some("speed"), None),
            (None, Some("speed"), Some("double")),
        ] {
            let err = ColumnSpec::resolve(&raw(1), columns, names, types).unwrap_err();
            assert!(matches!(err, GeotagError::InvalidMetaSpec(_)));
        }
    }

    #[test]
    fn meta_count_mismatch_is_rejected() {
        let err =
            ColumnSpec::resolve(&raw(1), Some("7,8"), Some("speed"), Some("double")).unwrap_err();
        assert!(matches!(err, GeotagError::InvalidMetaSpec(_)));
    }

    #[test]
    fn unknown_meta_type_is_rejected() {
        let err =
            ColumnSpec::resolve(&raw(1), Some("7"), Some("speed"), Some("velocity")).unwrap_err();
        assert!(matches!(err, GeotagError::InvalidMetaSpec(_)));
    }

    #[test]
    fn non_numeric_meta_column_is_rejected() {
        let err =
            ColumnSpec::resolve(&raw(1), Some("7;8"), Some("a,b"), Some("string,string"))
                .unwrap_err();
        assert!(matches!(err, GeotagError::InvalidMetaSpec(_)));
    }

    #[test]
    fn full_meta_spec_resolves() {
        let spec = ColumnSpec::resolve(
            &raw(1),
            Some("7,9,10"),
            Some("speed,sequence,flagged"),
            Some("double,long,boolean"),
        )
        .unwrap();

        assert_eq!(spec.meta.len(), 3);
        assert_eq!(spec.meta[0].column, 6);
        assert_eq!(spec.meta[0].name, "speed");
        assert_eq!(spec.meta[0].ty, MetaType::Double);
        assert_eq!(spec.meta[2].ty, MetaType::Boolean);
    }

    #[test]
    fn meta_type_parses_every_variant() {
        for (s, ty) in [
            ("string", MetaType::String),
            ("double", MetaType::Double),
            ("long", MetaType::Long),
            ("date", MetaType::Date),
            ("boolean", MetaType::Boolean),
        ] {
            assert_eq!(s.parse::<MetaType>().unwrap(), ty);
        }
    }
}
