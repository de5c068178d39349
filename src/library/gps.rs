use super::{GpsCoordinates, GpsReader, MediaId, MediaMetadata};
use std::path::PathBuf;
use tracing::trace;

/// Reads coordinates recorded with the media item at upload time.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataGpsReader;

impl GpsReader for MetadataGpsReader {
    fn gps(&self, _id: MediaId, meta: &MediaMetadata) -> Option<GpsCoordinates> {
        match (meta.image_meta.latitude, meta.image_meta.longitude) {
            (Some(lat), Some(lon)) => Some(GpsCoordinates { lat, lon }),
            _ => None,
        }
    }
}

/// Reads GPS tags straight from the uploaded file, falling back to the
/// stored coordinates when the file carries none.
#[derive(Debug, Clone)]
pub struct ExifGpsReader {
    uploads_directory: PathBuf,
}

impl ExifGpsReader {
    pub fn new(uploads_directory: impl Into<PathBuf>) -> Self {
        Self {
            uploads_directory: uploads_directory.into(),
        }
    }

    fn read_file(&self, file: &str) -> Option<GpsCoordinates> {
        let path = self.uploads_directory.join(file);
        if !path.starts_with(&self.uploads_directory) {
            return None;
        }

        match rexif::parse_file(&path) {
            Ok(exif) => extract_coordinates(&exif),
            Err(e) => {
                trace!("No EXIF data for {}: {}", path.display(), e);
                None
            }
        }
    }
}

impl GpsReader for ExifGpsReader {
    fn gps(&self, id: MediaId, meta: &MediaMetadata) -> Option<GpsCoordinates> {
        meta.file
            .as_deref()
            .and_then(|file| self.read_file(file))
            .or_else(|| MetadataGpsReader.gps(id, meta))
    }
}

fn extract_coordinates(exif: &rexif::ExifData) -> Option<GpsCoordinates> {
    let mut latitude: Option<f64> = None;
    let mut longitude: Option<f64> = None;
    let mut lat_ref: Option<String> = None;
    let mut lon_ref: Option<String> = None;

    for entry in &exif.entries {
        match entry.tag {
            rexif::ExifTag::GPSLatitude => {
                latitude = parse_gps_coordinate(&entry.value_more_readable).ok();
            }
            rexif::ExifTag::GPSLongitude => {
                longitude = parse_gps_coordinate(&entry.value_more_readable).ok();
            }
            rexif::ExifTag::GPSLatitudeRef => {
                lat_ref = Some(entry.value_more_readable.trim().to_string());
            }
            rexif::ExifTag::GPSLongitudeRef => {
                lon_ref = Some(entry.value_more_readable.trim().to_string());
            }
            _ => {}
        }
    }

    let (mut lat, mut lon) = (latitude?, longitude?);
    if lat_ref.as_deref() == Some("S") {
        lat = -lat;
    }
    if lon_ref.as_deref() == Some("W") {
        lon = -lon;
    }
    Some(GpsCoordinates { lat, lon })
}

/// Parses the readable EXIF form, e.g. `51 deg 30' 45.60"`.
fn parse_gps_coordinate(coord_str: &str) -> Result<f64, String> {
    let parts: Vec<&str> = coord_str.split_whitespace().collect();

    if parts.len() >= 6 {
        let degrees = parts[0]
            .parse::<f64>()
            .map_err(|_| "Invalid degrees")?;
        let minutes = parts[2]
            .trim_end_matches('\'')
            .parse::<f64>()
            .map_err(|_| "Invalid minutes")?;
        let seconds = parts[4]
            .trim_end_matches('"')
            .parse::<f64>()
            .map_err(|_| "Invalid seconds")?;

        Ok(degrees + minutes / 60.0 + seconds / 3600.0)
    } else {
        Err("Invalid GPS coordinate format".to_string())
    }
}
