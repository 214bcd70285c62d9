//! IPTC-IIM records inside the Photoshop APP13 segment.
//!
//! Layout: `Photoshop 3.0\0`, then a sequence of 8BIM image resources.
//! Resource 0x0404 holds the IIM datasets, each `0x1C record dataset len data`.

use anyhow::{Context, Result, bail};
use std::path::Path;

use super::{IPTC_PREFIX, MetaValue, MetadataMap};
use crate::container::{self, IPTC_HEADER};

const IPTC_8BIM: &[u8] = b"8BIM";
const IIM_RESOURCE_ID: u16 = 0x0404;
const IIM_TAG_MARKER: u8 = 0x1C;
/// Largest dataset the standard two-byte length field can describe.
const IIM_MAX_STANDARD_LEN: usize = 0x7FFF;

/// Application record (record 2) carries all user-visible fields.
pub const APPLICATION_RECORD: u8 = 2;
/// Dataset 2:25, keywords: one record per keyword.
pub const KEYWORDS: u8 = 25;

/// One IIM dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub record: u8,
    pub number: u8,
    pub data: Vec<u8>,
}

impl Dataset {
    pub fn new(record: u8, number: u8, data: impl Into<Vec<u8>>) -> Self {
        Self { record, number, data: data.into() }
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).trim_end_matches('\0').to_string()
    }
}

/// IIM dataset names (record 2), as used for `IPTC:` keys.
fn dataset_name(number: u8) -> Option<&'static str> {
    Some(match number {
        5 => "object name",
        7 => "edit status",
        8 => "editorial update",
        10 => "urgency",
        12 => "subject reference",
        15 => "category",
        20 => "supplemental category",
        22 => "fixture identifier",
        25 => "keywords",
        26 => "content location code",
        27 => "content location name",
        30 => "release date",
        35 => "release time",
        37 => "expiration date",
        38 => "expiration time",
        40 => "special instructions",
        42 => "action advised",
        45 => "reference service",
        47 => "reference date",
        50 => "reference number",
        55 => "date created",
        60 => "time created",
        62 => "digital creation date",
        63 => "digital creation time",
        65 => "originating program",
        70 => "program version",
        75 => "object cycle",
        80 => "by-line",
        85 => "by-line title",
        90 => "city",
        92 => "sub-location",
        95 => "province/state",
        100 => "country/primary location code",
        101 => "country/primary location name",
        103 => "original transmission reference",
        105 => "headline",
        110 => "credit",
        115 => "source",
        116 => "copyright notice",
        118 => "contact",
        120 => "caption/abstract",
        121 => "local caption",
        122 => "writer/editor",
        130 => "image type",
        131 => "image orientation",
        135 => "language identifier",
        _ => return None,
    })
}

/// Datasets that may occur more than once and are reported as lists.
fn is_repeatable(number: u8) -> bool {
    matches!(number, 12 | 20 | 25 | 26 | 27 | 80 | 85 | 118 | 122)
}

/// Locate the IIM block (resource 0x0404) in APP13 contents.
pub fn find_iim(app13: &[u8]) -> Option<&[u8]> {
    let mut found = None;
    walk_resources(app13, |id, _, data| {
        if id == IIM_RESOURCE_ID && found.is_none() {
            found = Some(data);
        }
    });
    found
}

/// Walk the 8BIM resources of an APP13 segment.
///
/// The callback receives the resource id, the whole raw resource (padding
/// included), and the resource data. Walking stops at the first malformed
/// resource; the returned offset is where it stopped.
fn walk_resources<'a>(app13: &'a [u8], mut f: impl FnMut(u16, &'a [u8], &'a [u8])) -> usize {
    let data = app13;
    let mut pos = if data.starts_with(IPTC_HEADER) { IPTC_HEADER.len() } else { 0 };
    while pos + 12 <= data.len() {
        if &data[pos..pos + 4] != IPTC_8BIM {
            break;
        }
        let resource_id = u16::from_be_bytes([data[pos + 4], data[pos + 5]]);
        // Skip pascal string (1 byte length + string + padding to even)
        let pascal_len = data[pos + 6] as usize;
        let pascal_padded = if (pascal_len + 1) % 2 == 0 { pascal_len + 1 } else { pascal_len + 2 };
        let data_start = pos + 6 + pascal_padded;
        if data_start + 4 > data.len() {
            break;
        }
        let data_len = u32::from_be_bytes([
            data[data_start], data[data_start + 1],
            data[data_start + 2], data[data_start + 3],
        ]) as usize;
        let resource_end = data_start + 4 + data_len;
        if resource_end > data.len() {
            break;
        }
        let resource_end_padded = if data_len % 2 == 0 { resource_end } else { resource_end + 1 };
        let raw_end = resource_end_padded.min(data.len());

        f(resource_id, &data[pos..raw_end], &data[data_start + 4..resource_end]);

        pos = resource_end_padded.min(data.len());
    }
    pos
}

/// Parse IIM datasets.
pub fn parse_iim(data: &[u8]) -> Result<Vec<Dataset>> {
    let mut datasets = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        if data[pos] != IIM_TAG_MARKER {
            // Trailing padding after the last dataset
            if data[pos..].iter().all(|&b| b == 0) {
                break;
            }
            bail!("Invalid IIM tag marker 0x{:02x} at offset {pos}", data[pos]);
        }
        if pos + 5 > data.len() {
            bail!("Truncated IIM dataset header at offset {pos}");
        }
        let record = data[pos + 1];
        let number = data[pos + 2];
        let raw_len = u16::from_be_bytes([data[pos + 3], data[pos + 4]]);
        pos += 5;

        // Extended dataset: the low 15 bits give the size of the length field
        let len = if raw_len & 0x8000 != 0 {
            let size = (raw_len & 0x7FFF) as usize;
            if size == 0 || size > 4 || pos + size > data.len() {
                bail!("Unsupported extended IIM length ({size} bytes)");
            }
            let len = data[pos..pos + size]
                .iter()
                .fold(0usize, |acc, &b| (acc << 8) | b as usize);
            pos += size;
            len
        } else {
            raw_len as usize
        };

        if pos + len > data.len() {
            bail!("IIM dataset {record}:{number} overruns the block");
        }
        datasets.push(Dataset::new(record, number, &data[pos..pos + len]));
        pos += len;
    }

    Ok(datasets)
}

/// Encode IIM datasets.
///
/// Values longer than 0x7FFF bytes use the extended form: `0x8004` and a
/// four-byte length.
pub fn encode_iim(datasets: &[Dataset]) -> Vec<u8> {
    let mut iptc_data = Vec::new();
    for ds in datasets {
        iptc_data.extend_from_slice(&[IIM_TAG_MARKER, ds.record, ds.number]);
        if ds.data.len() > IIM_MAX_STANDARD_LEN {
            iptc_data.extend_from_slice(&0x8004u16.to_be_bytes());
            iptc_data.extend_from_slice(&(ds.data.len() as u32).to_be_bytes());
        } else {
            iptc_data.extend_from_slice(&(ds.data.len() as u16).to_be_bytes());
        }
        iptc_data.extend_from_slice(&ds.data);
    }
    iptc_data
}

/// Build APP13 segment contents.
///
/// Preserves existing 8BIM resources, replaces the IPTC-IIM resource (0x0404).
/// An empty `datasets` slice drops the IIM resource entirely. Bytes after
/// the last well-formed resource are kept verbatim at the end.
pub fn build_app13(existing: Option<&[u8]>, datasets: &[Dataset]) -> Vec<u8> {
    let mut result = Vec::new();
    result.extend_from_slice(IPTC_HEADER);

    // Copy existing 8BIM resources except IPTC-IIM (0x0404)
    let mut tail: &[u8] = &[];
    if let Some(data) = existing {
        let end = walk_resources(data, |id, raw, _| {
            if id != IIM_RESOURCE_ID {
                result.extend_from_slice(raw);
            }
        });
        tail = &data[end..];
        if !tail.is_empty() {
            log::debug!("Keeping {} unparsed bytes at the end of APP13", tail.len());
        }
    }

    let iptc_data = encode_iim(datasets);

    // Write the IPTC-IIM as 8BIM resource 0x0404
    if !iptc_data.is_empty() {
        result.extend_from_slice(IPTC_8BIM);
        result.extend_from_slice(&IIM_RESOURCE_ID.to_be_bytes());
        result.push(0x00); // pascal string (empty, length 0)
        result.push(0x00); // padding to even
        let data_len = iptc_data.len() as u32;
        result.extend_from_slice(&data_len.to_be_bytes());
        result.extend_from_slice(&iptc_data);
        if iptc_data.len() % 2 != 0 {
            result.push(0x00); // pad to even
        }
    }

    // After the IIM resource, so walkers reach it before the malformed bytes
    result.extend_from_slice(tail);
    result
}

/// Read the IIM datasets of a JPEG file.
///
/// Returns `Ok(None)` for non-JPEG files and JPEGs without an IIM block.
pub fn read_iptc(path: &Path) -> Result<Option<Vec<Dataset>>> {
    let header = read_header(path)?;
    if !header.starts_with(&[0xFF, 0xD8]) {
        return Ok(None);
    }

    let jpeg = container::read_jpeg(path)?;
    let Some(app13) = container::app13_contents(&jpeg) else {
        return Ok(None);
    };
    match find_iim(&app13) {
        Some(iim) => parse_iim(iim).map(Some).context("Malformed IPTC block"),
        None => Ok(None),
    }
}

fn read_header(path: &Path) -> Result<[u8; 2]> {
    use std::io::Read;
    let mut header = [0u8; 2];
    let mut file = std::fs::File::open(path).context("Failed to open image file")?;
    // Files shorter than two bytes are simply not JPEG
    let _ = file.read(&mut header).context("Failed to read image file")?;
    Ok(header)
}

/// Convert datasets to `IPTC:<name>` entries.
///
/// Only the application record is reported; repeatable datasets become lists.
pub fn datasets_to_map(datasets: &[Dataset]) -> MetadataMap {
    let mut map = MetadataMap::new();
    for ds in datasets.iter().filter(|d| d.record == APPLICATION_RECORD) {
        // 2:0 is the record version, not user data
        if ds.number == 0 {
            continue;
        }
        let key = match dataset_name(ds.number) {
            Some(name) => format!("{IPTC_PREFIX}{name}"),
            None => format!("{IPTC_PREFIX}2:{}", ds.number),
        };
        if is_repeatable(ds.number) {
            if let MetaValue::List(items) =
                map.entry(key).or_insert_with(|| MetaValue::List(Vec::new()))
            {
                items.push(ds.text());
            }
        } else {
            map.entry(key).or_insert_with(|| MetaValue::Text(ds.text()));
        }
    }
    map
}

/// Read IPTC data of an image as `IPTC:` entries.
pub fn read_iptc_map(path: &Path) -> Result<MetadataMap> {
    Ok(read_iptc(path)?
        .map(|datasets| datasets_to_map(&datasets))
        .unwrap_or_default())
}

/// Count the keyword datasets in a list.
pub fn keyword_count(datasets: &[Dataset]) -> usize {
    datasets
        .iter()
        .filter(|d| d.record == APPLICATION_RECORD && d.number == KEYWORDS)
        .count()
}

/// Remove every keyword dataset from a JPEG file, in place.
///
/// All other datasets and 8BIM resources are preserved. Returns the
/// number of keywords removed; the file is only rewritten when that is
/// non-zero.
pub fn strip_keywords(path: &Path) -> Result<usize> {
    let mut jpeg = container::read_jpeg(path)?;
    let Some(app13) = container::app13_contents(&jpeg) else {
        return Ok(0);
    };
    let Some(iim) = find_iim(&app13) else {
        return Ok(0);
    };
    let datasets = parse_iim(iim).context("Malformed IPTC block")?;
    let removed = keyword_count(&datasets);
    if removed == 0 {
        return Ok(0);
    }

    let kept: Vec<Dataset> = datasets
        .into_iter()
        .filter(|d| !(d.record == APPLICATION_RECORD && d.number == KEYWORDS))
        .collect();
    let contents = build_app13(Some(&app13[..]), &kept);
    container::set_app13(&mut jpeg, Some(contents));
    container::write_jpeg(path, jpeg)?;

    log::debug!("Removed {removed} IPTC keywords from {}", path.display());
    Ok(removed)
}

/// Write datasets into a JPEG's APP13 segment, replacing any IIM block.
pub fn write_iptc(path: &Path, datasets: &[Dataset]) -> Result<()> {
    let mut jpeg = container::read_jpeg(path)?;
    let existing = container::app13_contents(&jpeg);
    let contents = build_app13(existing.as_deref(), datasets);
    container::set_app13(&mut jpeg, Some(contents));
    container::write_jpeg(path, jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use tempfile::TempDir;

    fn sample() -> Vec<Dataset> {
        vec![
            Dataset::new(2, 0, vec![0x00, 0x04]),
            Dataset::new(2, 5, "Harbour at dusk"),
            Dataset::new(2, 25, "harbour"),
            Dataset::new(2, 25, "boats"),
            Dataset::new(2, 80, "A. Photographer"),
            Dataset::new(2, 120, "Fishing boats returning"),
            Dataset::new(2, 200, "custom"),
        ]
    }

    #[test]
    fn iim_roundtrip_through_app13() {
        let app13 = build_app13(None, &sample());
        let iim = find_iim(&app13).unwrap();
        assert_eq!(parse_iim(iim).unwrap(), sample());
    }

    #[test]
    fn build_preserves_other_resources() {
        // A resolution-info resource (0x03ED) with odd-length data
        let mut existing = IPTC_HEADER.to_vec();
        existing.extend_from_slice(b"8BIM");
        existing.extend_from_slice(&0x03EDu16.to_be_bytes());
        existing.extend_from_slice(&[0, 0]);
        existing.extend_from_slice(&3u32.to_be_bytes());
        existing.extend_from_slice(&[1, 2, 3, 0]);

        let app13 = build_app13(Some(existing.as_slice()), &sample());
        assert!(app13.starts_with(&existing));
        assert_eq!(parse_iim(find_iim(&app13).unwrap()).unwrap().len(), sample().len());

        let without = build_app13(Some(app13.as_slice()), &[]);
        assert_eq!(without, existing);
        assert!(find_iim(&without).is_none());
    }

    #[test]
    fn extended_length_dataset() {
        let mut data = vec![IIM_TAG_MARKER, 2, 120, 0x80, 0x02, 0x00, 0x03];
        data.extend_from_slice(b"abc");
        let parsed = parse_iim(&data).unwrap();
        assert_eq!(parsed, vec![Dataset::new(2, 120, "abc")]);
    }

    #[test]
    fn long_dataset_uses_extended_length() {
        let caption = vec![b'x'; 40_000];
        let datasets = vec![Dataset::new(2, 120, caption.clone()), Dataset::new(2, 25, "sea")];
        let encoded = encode_iim(&datasets);
        assert_eq!(&encoded[3..5], &[0x80, 0x04]);
        assert_eq!(parse_iim(&encoded).unwrap(), datasets);
    }

    #[test]
    fn strip_keywords_keeps_long_caption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        testutil::write_jpeg(&path, 4, 4);
        let caption = vec![b'c'; 40_000];
        write_iptc(
            &path,
            &[Dataset::new(2, 120, caption.clone()), Dataset::new(2, 25, "sea")],
        )
        .unwrap();

        assert_eq!(strip_keywords(&path).unwrap(), 1);
        let remaining = read_iptc(&path).unwrap().unwrap();
        assert_eq!(remaining, vec![Dataset::new(2, 120, caption)]);
    }

    #[test]
    fn build_keeps_unparsed_trailing_bytes() {
        let mut existing = build_app13(None, &sample());
        // A truncated thumbnail resource: declares 100 bytes, carries 3
        let mut tail = b"8BIM".to_vec();
        tail.extend_from_slice(&0x040Cu16.to_be_bytes());
        tail.extend_from_slice(&[0, 0]);
        tail.extend_from_slice(&100u32.to_be_bytes());
        tail.extend_from_slice(&[7, 8, 9]);
        existing.extend_from_slice(&tail);

        let kept = vec![Dataset::new(2, 5, "Harbour at dusk")];
        let rebuilt = build_app13(Some(existing.as_slice()), &kept);
        assert!(rebuilt.ends_with(&tail));
        assert_eq!(parse_iim(find_iim(&rebuilt).unwrap()).unwrap(), kept);
    }

    #[test]
    fn strip_keywords_keeps_unparsed_resources() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        testutil::write_jpeg(&path, 4, 4);

        let mut app13 = build_app13(None, &sample());
        let tail = b"8BIM\x04\x0c\0\0\0\0\0\x64abc".to_vec();
        app13.extend_from_slice(&tail);
        let mut jpeg = container::read_jpeg(&path).unwrap();
        container::set_app13(&mut jpeg, Some(app13));
        container::write_jpeg(&path, jpeg).unwrap();

        assert_eq!(strip_keywords(&path).unwrap(), 2);
        let jpeg = container::read_jpeg(&path).unwrap();
        assert!(container::app13_contents(&jpeg).unwrap().ends_with(&tail));
        assert_eq!(keyword_count(&read_iptc(&path).unwrap().unwrap()), 0);
    }

    #[test]
    fn malformed_iim_is_error() {
        assert!(parse_iim(&[0x42, 2, 5, 0, 1, b'x']).is_err());
        assert!(parse_iim(&[IIM_TAG_MARKER, 2, 5, 0, 9, b'x']).is_err());
        assert!(parse_iim(&[IIM_TAG_MARKER, 2]).is_err());
        assert!(parse_iim(&[IIM_TAG_MARKER, 2, 5, 0, 1, b'x', 0, 0]).is_ok());
    }

    #[test]
    fn map_names_and_lists() {
        let map = datasets_to_map(&sample());
        assert_eq!(
            map.get("IPTC:keywords"),
            Some(&MetaValue::List(vec!["harbour".into(), "boats".into()]))
        );
        assert_eq!(map.get("IPTC:object name"), Some(&MetaValue::from("Harbour at dusk")));
        assert_eq!(
            map.get("IPTC:by-line"),
            Some(&MetaValue::List(vec!["A. Photographer".into()]))
        );
        assert_eq!(map.get("IPTC:2:200"), Some(&MetaValue::from("custom")));
        assert!(!map.keys().any(|k| k.ends_with("2:0")));
    }

    #[test]
    fn strip_keywords_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        testutil::write_jpeg(&path, 4, 4);
        write_iptc(&path, &sample()).unwrap();

        assert_eq!(strip_keywords(&path).unwrap(), 2);
        let remaining = read_iptc(&path).unwrap().unwrap();
        assert_eq!(keyword_count(&remaining), 0);
        assert_eq!(remaining.len(), sample().len() - 2);

        // Second pass has nothing left to do
        assert_eq!(strip_keywords(&path).unwrap(), 0);
    }

    #[test]
    fn non_jpeg_has_no_iptc() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.png");
        image::RgbImage::new(2, 2).save(&path).unwrap();
        assert!(read_iptc(&path).unwrap().is_none());
        assert!(read_iptc_map(&path).unwrap().is_empty());
    }
}
