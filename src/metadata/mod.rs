//! EXIF, IPTC, and XMP metadata sources.
//!
//! Each source is read independently into a [`MetadataMap`]:
//!
//! - [`read_exif_map`]: flat EXIF tag map via `nom-exif`, with `kamadak-exif`
//!   covering GPS and the containers `nom-exif` rejects
//! - [`read_iptc_map`]: IPTC-IIM datasets from the Photoshop APP13 segment
//! - [`read_xmp_map`]: properties of the embedded XMP packet
//!
//! A source that cannot be read reports [`SourceStatus::Unreadable`]
//! instead of failing the whole extraction.

mod exif;
pub mod iptc;
pub mod xmp;

pub use self::exif::{ExifData, read_exif, read_exif_map};
pub use iptc::read_iptc_map;
pub use xmp::read_xmp_map;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Key prefix for IPTC entries in a [`MetadataMap`].
pub const IPTC_PREFIX: &str = "IPTC:";
/// Key prefix for XMP entries in a [`MetadataMap`].
pub const XMP_PREFIX: &str = "XMP:";

/// Tag name → value, across all sources. Keys are unique and sorted.
pub type MetadataMap = BTreeMap<String, MetaValue>;

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<String>),
    Rationals(Vec<(u32, u32)>),
}

impl MetaValue {
    /// The value in full, for files. [`Display`](fmt::Display) shortens
    /// long byte values for the terminal.
    pub fn to_full_string(&self) -> String {
        match self {
            Self::Bytes(b) => hex(b),
            other => other.to_string(),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    let parts: Vec<String> = bytes.iter().map(|x| format!("{x:02x}")).collect();
    parts.join(" ")
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Bytes(b) if b.len() > 16 => write!(f, "<{} bytes>", b.len()),
            Self::Bytes(b) => f.write_str(&hex(b)),
            Self::List(items) => f.write_str(&items.join("; ")),
            Self::Rationals(items) => {
                let parts: Vec<String> = items.iter().map(|(n, d)| format!("{n}/{d}")).collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// The three metadata sources merged by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Source {
    Exif,
    Iptc,
    Xmp,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exif => "EXIF",
            Self::Iptc => "IPTC",
            Self::Xmp => "XMP",
        })
    }
}

/// What happened when a single source was read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SourceStatus {
    /// The source was present and contributed this many keys.
    Found(usize),
    /// The file was readable but carries no data for this source.
    Empty,
    /// The source could not be read.
    Unreadable(String),
}

impl SourceStatus {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Merge `entries` into `map`, returning the status for the source.
///
/// Existing keys are kept; the first source to report a key wins.
pub(crate) fn merge_source(
    map: &mut MetadataMap,
    entries: anyhow::Result<MetadataMap>,
) -> SourceStatus {
    match entries {
        Ok(entries) if entries.is_empty() => SourceStatus::Empty,
        Ok(entries) => {
            let mut added = 0;
            for (key, value) in entries {
                if !map.contains_key(&key) {
                    map.insert(key, value);
                    added += 1;
                }
            }
            SourceStatus::Found(added)
        }
        Err(e) => SourceStatus::Unreadable(format!("{e:#}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_values() {
        assert_eq!(MetaValue::Int(42).to_string(), "42");
        assert_eq!(MetaValue::from("Canon").to_string(), "Canon");
        assert_eq!(MetaValue::Bytes(vec![0x30, 0x32]).to_string(), "30 32");
        assert_eq!(MetaValue::Bytes(vec![0; 40]).to_string(), "<40 bytes>");
        assert_eq!(
            MetaValue::Bytes(vec![0xab; 20]).to_full_string(),
            vec!["ab"; 20].join(" ")
        );
        assert_eq!(MetaValue::Int(7).to_full_string(), "7");
        assert_eq!(
            MetaValue::List(vec!["sea".into(), "sky".into()]).to_string(),
            "sea; sky"
        );
        assert_eq!(
            MetaValue::Rationals(vec![(35, 1), (41, 1), (2130, 100)]).to_string(),
            "35/1, 41/1, 2130/100"
        );
    }

    #[test]
    fn merge_reports_status() {
        let mut map = MetadataMap::new();
        map.insert("Make".into(), "Canon".into());

        let mut incoming = MetadataMap::new();
        incoming.insert("Make".into(), "Nikon".into());
        incoming.insert("Model".into(), "D750".into());

        assert_eq!(merge_source(&mut map, Ok(incoming)), SourceStatus::Found(1));
        assert_eq!(map["Make"], MetaValue::from("Canon"));

        assert_eq!(merge_source(&mut map, Ok(MetadataMap::new())), SourceStatus::Empty);

        let status = merge_source(&mut map, Err(anyhow::anyhow!("truncated segment")));
        assert_eq!(status, SourceStatus::Unreadable("truncated segment".into()));
        assert_eq!(map.len(), 2);
    }
}
