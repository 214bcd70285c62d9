use ::exif::{Context as IfdContext, Field, In, Tag, Value};
use anyhow::{Context, Result};
use nom_exif::*;
use std::fs::File;
use std::path::Path;

use super::{MetaValue, MetadataMap};
use crate::editor::{self, LAYOUT_TAGS};
use crate::gps::{Dms, GpsCoordinate};

/// EXIF data extracted from an image.
#[derive(Debug, Clone, Default)]
pub struct ExifData {
    /// Tag name → value. Unknown tags are keyed by hex code (`0x9c9b`).
    pub fields: MetadataMap,
    /// Decimal coordinates, when the GPS sub-IFD carries latitude and longitude.
    pub gps: Option<GpsCoordinate>,
}

/// Read EXIF data from an image file.
///
/// `nom-exif` walks the tags of the containers it knows. `kamadak-exif` then
/// reads the GPS sub-IFD, which `nom-exif` stops short on when it starts
/// with `GPSVersionID` (tag 0), and takes over entirely for containers
/// `nom-exif` rejects (PNG, WebP).
///
/// A file that opens but carries no EXIF block yields an empty [`ExifData`];
/// only a file that cannot be opened or parsed by either reader is an error.
pub fn read_exif(path: &Path) -> Result<ExifData> {
    File::open(path).context("Failed to open image file")?;

    let nom = read_with_nom(path);
    if let Err(e) = &nom {
        log::debug!("nom-exif cannot read {}: {e:#}", path.display());
    }
    let nom_failed = nom.is_err();
    let mut data = nom.unwrap_or_default();
    let gps_only = !data.fields.is_empty();

    match editor::read_exif_container(path) {
        Ok(exif) => {
            for field in exif.fields() {
                if gps_only && field.tag.context() != IfdContext::Gps {
                    continue;
                }
                if LAYOUT_TAGS.contains(&field.tag) || field.ifd_num != In::PRIMARY {
                    continue;
                }
                let key = field_key(field.tag);
                if data.fields.contains_key(&key) {
                    continue;
                }
                if let Some(value) = field_to_value(field) {
                    log::debug!("  EXIF {key} = {value}");
                    data.fields.insert(key, value);
                }
            }
            if let Some(coord) = gps_from_fields(&exif) {
                data.gps = Some(coord);
            }
        }
        Err(e) if editor::is_not_found(&e) => {}
        Err(e) if nom_failed => return Err(e),
        Err(e) => log::debug!("kamadak-exif cannot read {}: {e:#}", path.display()),
    }

    data.gps = data.gps.filter(GpsCoordinate::is_valid);
    Ok(data)
}

/// Read EXIF fields only, as a flat map.
pub fn read_exif_map(path: &Path) -> Result<MetadataMap> {
    Ok(read_exif(path)?.fields)
}

fn read_with_nom(path: &Path) -> Result<ExifData> {
    let mut parser = MediaParser::new();
    let ms = MediaSource::file_path(path).context("Failed to open image file")?;

    if !ms.has_exif() {
        log::debug!("{} is not an EXIF container", path.display());
        return Ok(ExifData::default());
    }

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(e) => {
            log::debug!("No EXIF data found in {}: {e}", path.display());
            return Ok(ExifData::default());
        }
    };

    // Parse GPS info before walking the entries (the walk consumes the iterator)
    let gps = match iter.parse_gps_info() {
        Ok(Some(info)) => Some(GpsCoordinate::from_dms(
            latlng_to_dms(&info.latitude),
            info.latitude_ref,
            latlng_to_dms(&info.longitude),
            info.longitude_ref,
        )),
        Ok(None) => None,
        Err(e) => {
            log::debug!("GPS info unreadable in {}: {e}", path.display());
            None
        }
    };

    let mut data = ExifData {
        fields: MetadataMap::new(),
        gps,
    };

    for entry in iter {
        let key = match entry.tag() {
            Some(tag) => tag.to_string(),
            None => format!("{:#06x}", entry.tag_code()),
        };
        // IFD0 comes before the thumbnail IFD, so the primary image wins
        if data.fields.contains_key(&key) {
            continue;
        }
        if let Some(value) = entry.get_value().and_then(entry_to_value) {
            log::debug!("  EXIF {key} = {value}");
            data.fields.insert(key, value);
        }
    }

    Ok(data)
}

/// Convert an EntryValue to a map value, dropping empty text.
fn entry_to_value(val: &EntryValue) -> Option<MetaValue> {
    match val {
        EntryValue::Undefined(bytes) => return Some(MetaValue::Bytes(bytes.clone())),
        EntryValue::URationalArray(parts) => {
            return Some(MetaValue::Rationals(parts.iter().map(|r| (r.0, r.1)).collect()));
        }
        _ => {}
    }
    text_value(val.to_string())
}

fn text_value(s: String) -> Option<MetaValue> {
    let s = s.trim().trim_matches('"').trim_end_matches('\0').to_string();
    if s.is_empty() {
        None
    } else if let Ok(n) = s.parse::<i64>() {
        Some(MetaValue::Int(n))
    } else {
        Some(MetaValue::Text(s))
    }
}

/// Key for a `kamadak-exif` tag, hex for tags it has no name for.
fn field_key(tag: Tag) -> String {
    if tag.description().is_some() {
        tag.to_string()
    } else {
        format!("{:#06x}", tag.number())
    }
}

fn field_to_value(field: &Field) -> Option<MetaValue> {
    match &field.value {
        Value::Undefined(bytes, _) => Some(MetaValue::Bytes(bytes.clone())),
        Value::Rational(parts) if parts.len() > 1 => Some(MetaValue::Rationals(
            parts.iter().map(|r| (r.num, r.denom)).collect(),
        )),
        Value::Ascii(parts) => {
            let text: Vec<String> = parts
                .iter()
                .map(|p| String::from_utf8_lossy(p).to_string())
                .collect();
            text_value(text.join(" "))
        }
        Value::Byte(v) if v.len() == 1 => Some(MetaValue::Int(v[0].into())),
        Value::Short(v) if v.len() == 1 => Some(MetaValue::Int(v[0].into())),
        Value::Long(v) if v.len() == 1 => Some(MetaValue::Int(v[0].into())),
        _ => text_value(field.display_value().to_string()),
    }
}

/// Signed coordinate from the GPS sub-IFD, when latitude and longitude are both present.
fn gps_from_fields(exif: &::exif::Exif) -> Option<GpsCoordinate> {
    let latitude = dms_field(exif, Tag::GPSLatitude)?;
    let longitude = dms_field(exif, Tag::GPSLongitude)?;
    Some(GpsCoordinate::from_dms(
        latitude,
        ref_field(exif, Tag::GPSLatitudeRef).unwrap_or('N'),
        longitude,
        ref_field(exif, Tag::GPSLongitudeRef).unwrap_or('E'),
    ))
}

fn dms_field(exif: &::exif::Exif, tag: Tag) -> Option<Dms> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(parts) if parts.len() >= 3 => Some(Dms::from_rationals(
            (parts[0].num, parts[0].denom),
            (parts[1].num, parts[1].denom),
            (parts[2].num, parts[2].denom),
        )),
        _ => None,
    }
}

fn ref_field(exif: &::exif::Exif, tag: Tag) -> Option<char> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(parts) => parts.first()?.first().map(|&b| b as char),
        _ => None,
    }
}

/// Convert a nom-exif LatLng (3 URationals: deg, min, sec) to a [`Dms`].
fn latlng_to_dms(latlng: &LatLng) -> Dms {
    Dms::from_rationals(
        (latlng.0.0, latlng.0.1),
        (latlng.1.0, latlng.1.1),
        (latlng.2.0, latlng.2.1),
    )
}
