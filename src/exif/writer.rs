use anyhow::{Context, Result};
use img_parts::Bytes;
use img_parts::ImageEXIF;
use img_parts::jpeg::Jpeg;
use little_exif::endian::Endian;
use little_exif::exif_tag::{ExifTag, ExifTagGroup};
use little_exif::exif_tag_format::ExifTagFormat;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;
use std::path::Path;

use crate::record::{GeotagRecord, GpsPosition};

// GPS IFD tag IDs
const TAG_GPS_LATITUDE_REF: u16 = 0x0001;
const TAG_GPS_LATITUDE: u16 = 0x0002;
const TAG_GPS_LONGITUDE_REF: u16 = 0x0003;
const TAG_GPS_LONGITUDE: u16 = 0x0004;
const TAG_GPS_ALTITUDE_REF: u16 = 0x0005;
const TAG_GPS_ALTITUDE: u16 = 0x0006;
const TAG_GPS_IMG_DIRECTION_REF: u16 = 0x0010;
const TAG_GPS_IMG_DIRECTION: u16 = 0x0011;

// Meta fields travel as JSON in ImageHistory, the same container the
// telemetry importers this tool replaces have always used.
const TAG_IMAGE_HISTORY: u16 = 0x9213;

// little_exif as_u8_vec(JPEG) returns: [APP1 marker 2B][length 2B][Exif\0\0 6B][TIFF data]
// img-parts set_exif() expects just the TIFF data (after Exif\0\0)
const JPEG_EXIF_OVERHEAD: usize = 10; // 2 + 2 + 6

/// Result of writing a geotag record to an image.
#[derive(Debug, Default)]
pub struct WriteResult {
    /// Names of the record fields that were written.
    pub fields_written: Vec<&'static str>,
}

/// Write a geotag record into the photo's EXIF, preserving all existing data.
///
/// Strategy (JPEG):
/// 1. Read the entire file with img-parts (preserves all segments)
/// 2. Try to load existing EXIF with little_exif and merge the geotag tags
/// 3. If little_exif can't parse, build the geotag tags as fresh metadata
/// 4. Write back via img-parts (only the APP1 EXIF segment changes)
///
/// An empty record is a no-op that reports zero fields written.
pub fn write_geotag(path: &Path, record: &GeotagRecord) -> Result<WriteResult> {
    let mut result = WriteResult::default();
    let mut tags: Vec<ExifTag> = Vec::new();

    if let Some(timestamp) = record.timestamp {
        tags.push(ExifTag::DateTimeOriginal(
            timestamp.format("%Y:%m:%d %H:%M:%S").to_string(),
        ));
        result.fields_written.push("timestamp");
        log::debug!("  DateTimeOriginal: {timestamp}");
    }

    if let Some(position) = record.position {
        collect_position_tags(&mut tags, &position);
        result.fields_written.push("position");
        log::debug!("  GPS: {}, {}", position.latitude, position.longitude);
    }

    if let Some(altitude) = record.altitude {
        collect_altitude_tags(&mut tags, altitude);
        result.fields_written.push("altitude");
        log::debug!("  GPSAltitude: {altitude}");
    }

    if let Some(heading) = record.heading {
        collect_heading_tags(&mut tags, heading);
        result.fields_written.push("heading");
        log::debug!("  GPSImgDirection: {heading}");
    }

    if !record.meta.is_empty() {
        let payload =
            serde_json::to_string(&record.meta).context("Failed to serialize meta fields")?;
        if let Some(tag) = make_string_tag(TAG_IMAGE_HISTORY, &payload, &ExifTagGroup::IFD0) {
            tags.push(tag);
            result.fields_written.push("meta");
            log::debug!("  ImageHistory: {payload}");
        }
    }

    if !tags.is_empty() {
        write_tags_to_jpeg(path, &tags).context("Failed to write EXIF metadata to file")?;
    }

    Ok(result)
}

/// Write new EXIF tags into a JPEG file, preserving all existing data.
fn write_tags_to_jpeg(path: &Path, new_tags: &[ExifTag]) -> Result<()> {
    let file_bytes = std::fs::read(path).context("Failed to read image file")?;

    // Parse JPEG structure with img-parts (preserves all segments)
    let mut jpeg = Jpeg::from_bytes(Bytes::from(file_bytes))
        .map_err(|e| anyhow::anyhow!("Failed to parse JPEG: {e}"))?;

    // Remember where the EXIF segment was originally positioned
    let orig_exif_pos = find_exif_segment_pos(&jpeg);

    // Merge into existing EXIF when little_exif can parse it, otherwise
    // start from fresh metadata (non-EXIF segments survive either way).
    let mut metadata = load_existing_metadata(path).unwrap_or_else(Metadata::new);
    for tag in new_tags {
        metadata.set_tag(tag.clone());
    }

    let exif_bytes = metadata.as_u8_vec(FileExtension::JPEG);
    if exif_bytes.len() <= JPEG_EXIF_OVERHEAD {
        anyhow::bail!("little_exif produced an empty EXIF block");
    }
    jpeg.set_exif(Some(Bytes::from(exif_bytes[JPEG_EXIF_OVERHEAD..].to_vec())));

    // set_exif() inserts at position 3, which may be after XMP APP1. Move the
    // EXIF segment back to its original position so EXIF comes before XMP
    // (required for many EXIF parsers).
    if let Some(new_pos) = find_exif_segment_pos(&jpeg) {
        let target_pos = orig_exif_pos.unwrap_or(1); // default: right after APP0
        if new_pos != target_pos && target_pos < new_pos {
            let segments = jpeg.segments_mut();
            let seg = segments.remove(new_pos);
            segments.insert(target_pos, seg);
        }
    }

    let output = jpeg.encoder().bytes();
    std::fs::write(path, &output).context("Failed to write JPEG file")?;

    Ok(())
}

/// Load existing EXIF metadata from a file path using little_exif.
/// Returns None if it can't parse (instead of losing data).
fn load_existing_metadata(path: &Path) -> Option<Metadata> {
    let path_owned = path.to_path_buf();
    // Suppress panics from little_exif
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    let result = std::panic::catch_unwind(move || Metadata::new_from_path(&path_owned));
    std::panic::set_hook(prev_hook);

    match result {
        Ok(Ok(m)) => {
            if m.data().is_empty() {
                log::debug!("little_exif loaded empty metadata");
                None
            } else {
                log::debug!("little_exif loaded {} existing EXIF tags", m.data().len());
                Some(m)
            }
        }
        Ok(Err(e)) => {
            log::debug!("little_exif could not parse EXIF: {e}");
            None
        }
        Err(_) => {
            log::debug!("little_exif panicked parsing EXIF");
            None
        }
    }
}

/// Find the position of the EXIF APP1 segment in a JPEG.
/// EXIF segments have marker 0xE1 (APP1) and contents starting with "Exif\0\0".
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    const EXIF_PREFIX: &[u8] = b"Exif\0\0";
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == 0xE1 && s.contents().starts_with(EXIF_PREFIX))
}

/// Create a nul-terminated STRING tag in the given IFD group.
fn make_string_tag(tag_id: u16, value: &str, group: &ExifTagGroup) -> Option<ExifTag> {
    ExifTag::from_u16_with_data(
        tag_id,
        &ExifTagFormat::STRING,
        &format!("{value}\0").into_bytes(),
        &Endian::Little,
        group,
    )
    .ok()
}

/// Create a RATIONAL64U tag in the GPS IFD from raw rational pairs.
fn make_rational_tag(tag_id: u16, rationals: &[(u32, u32)]) -> Option<ExifTag> {
    let mut bytes = Vec::with_capacity(rationals.len() * 8);
    for (numerator, denominator) in rationals {
        bytes.extend_from_slice(&numerator.to_le_bytes());
        bytes.extend_from_slice(&denominator.to_le_bytes());
    }
    ExifTag::from_u16_with_data(
        tag_id,
        &ExifTagFormat::RATIONAL64U,
        &bytes,
        &Endian::Little,
        &ExifTagGroup::GPSIFD,
    )
    .ok()
}

/// Split an absolute decimal-degree coordinate into EXIF degree/minute/second
/// rationals, seconds carried at 1/10000 precision.
fn to_dms(coordinate: f64) -> [(u32, u32); 3] {
    let degrees = coordinate.floor();
    let minutes = ((coordinate - degrees) * 60.0).floor();
    let seconds = (coordinate - degrees - minutes / 60.0) * 3600.0 * 10_000.0;
    [
        (degrees as u32, 1),
        (minutes as u32, 1),
        (seconds.round() as u32, 10_000),
    ]
}

/// Collect latitude/longitude tags with hemisphere references.
fn collect_position_tags(tags: &mut Vec<ExifTag>, position: &GpsPosition) {
    let coordinates = [
        (
            position.latitude,
            if position.latitude >= 0.0 { "N" } else { "S" },
            TAG_GPS_LATITUDE_REF,
            TAG_GPS_LATITUDE,
        ),
        (
            position.longitude,
            if position.longitude >= 0.0 { "E" } else { "W" },
            TAG_GPS_LONGITUDE_REF,
            TAG_GPS_LONGITUDE,
        ),
    ];

    for (value, reference, ref_tag, coordinate_tag) in coordinates {
        if let Some(tag) = make_string_tag(ref_tag, reference, &ExifTagGroup::GPSIFD) {
            tags.push(tag);
        }
        if let Some(tag) = make_rational_tag(coordinate_tag, &to_dms(value.abs())) {
            tags.push(tag);
        }
    }
}

/// Collect altitude tags. GPSAltitudeRef byte 1 marks below sea level.
fn collect_altitude_tags(tags: &mut Vec<ExifTag>, altitude: f64) {
    let below_sea_level: u8 = if altitude < 0.0 { 1 } else { 0 };
    if let Ok(tag) = ExifTag::from_u16_with_data(
        TAG_GPS_ALTITUDE_REF,
        &ExifTagFormat::INT8U,
        &vec![below_sea_level],
        &Endian::Little,
        &ExifTagGroup::GPSIFD,
    ) {
        tags.push(tag);
    }
    let millimeters = (altitude.abs() * 1000.0).round() as u32;
    if let Some(tag) = make_rational_tag(TAG_GPS_ALTITUDE, &[(millimeters, 1000)]) {
        tags.push(tag);
    }
}

/// Collect camera direction tags, true-north referenced.
fn collect_heading_tags(tags: &mut Vec<ExifTag>, heading: f64) {
    if let Some(tag) = make_string_tag(TAG_GPS_IMG_DIRECTION_REF, "T", &ExifTagGroup::GPSIFD) {
        tags.push(tag);
    }
    let normalized = heading.rem_euclid(360.0);
    let hundredths = (normalized * 100.0).round() as u32;
    if let Some(tag) = make_rational_tag(TAG_GPS_IMG_DIRECTION, &[(hundredths, 100)]) {
        tags.push(tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dms_whole_degrees() {
        assert_eq!(to_dms(52.0), [(52, 1), (0, 1), (0, 10_000)]);
    }

    #[test]
    fn dms_half_degree_is_thirty_minutes() {
        assert_eq!(to_dms(52.5), [(52, 1), (30, 1), (0, 10_000)]);
    }

    #[test]
    fn dms_seconds_precision() {
        // 13.4125° = 13° 24' 45.0"
        let [d, m, s] = to_dms(13.4125);
        assert_eq!(d, (13, 1));
        assert_eq!(m, (24, 1));
        assert_eq!(s, (450_000, 10_000));
    }

    #[test]
    fn position_tags_cover_both_coordinates() {
        let mut tags = Vec::new();
        collect_position_tags(
            &mut tags,
            &GpsPosition {
                latitude: 52.5,
                longitude: -13.4,
            },
        );
        // Two hemisphere refs + two coordinate triples.
        assert_eq!(tags.len(), 4);
    }

    #[test]
    fn altitude_tags_mark_below_sea_level() {
        let mut tags = Vec::new();
        collect_altitude_tags(&mut tags, -2.5);
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn heading_tags_are_emitted_in_pairs() {
        let mut tags = Vec::new();
        collect_heading_tags(&mut tags, -90.0);
        assert_eq!(tags.len(), 2);
        // -90° normalizes to 270° true.
        assert_eq!((-90.0f64).rem_euclid(360.0), 270.0);
    }

    #[test]
    fn empty_record_writes_nothing() {
        let record = GeotagRecord::default();
        // No file access happens for an empty record, so a bogus path is fine.
        let result = write_geotag(Path::new("/nonexistent/a.jpg"), &record).unwrap();
        assert!(result.fields_written.is_empty());
    }
}
