//! EXIF editing through a CSV round trip.
//!
//! [`export_exif_csv`] writes every data-bearing EXIF field as a
//! `group,tag,name,value` row; the user edits the file; [`import_exif_csv`]
//! rebuilds the fields, serializes them with `kamadak-exif`'s writer, and
//! replaces the image's EXIF block.

mod value;

pub use value::TagValue;

use anyhow::{Context, Result};
use exif::{Context as IfdContext, Field, In, Tag};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

use crate::container;
use crate::pipeline::ImageKind;

/// Tags that describe file layout rather than image data. The writer
/// regenerates them, so they are never exported.
pub(crate) const LAYOUT_TAGS: &[Tag] = &[
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
    Tag::StripOffsets,
    Tag::StripByteCounts,
    Tag::TileOffsets,
    Tag::TileByteCounts,
    Tag::JPEGInterchangeFormat,
    Tag::JPEGInterchangeFormatLength,
];

/// The IFD a field lives in, named the way EXIF tools name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfdGroup {
    /// IFD0, the primary image.
    Zeroth,
    Exif,
    Gps,
    Interop,
    /// IFD1, the thumbnail.
    First,
}

impl IfdGroup {
    pub fn of(field: &Field) -> Self {
        match field.tag.context() {
            IfdContext::Exif => Self::Exif,
            IfdContext::Gps => Self::Gps,
            IfdContext::Interop => Self::Interop,
            _ if field.ifd_num == In::THUMBNAIL => Self::First,
            _ => Self::Zeroth,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Zeroth => "0th",
            Self::Exif => "Exif",
            Self::Gps => "GPS",
            Self::Interop => "Interop",
            Self::First => "1st",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "0th" => Some(Self::Zeroth),
            "Exif" => Some(Self::Exif),
            "GPS" => Some(Self::Gps),
            "Interop" => Some(Self::Interop),
            "1st" => Some(Self::First),
            _ => None,
        }
    }

    /// Build the tag identity and IFD index for a numeric tag in this group.
    fn locate(self, number: u16) -> (Tag, In) {
        match self {
            Self::Zeroth => (Tag(IfdContext::Tiff, number), In::PRIMARY),
            Self::First => (Tag(IfdContext::Tiff, number), In::THUMBNAIL),
            Self::Exif => (Tag(IfdContext::Exif, number), In::PRIMARY),
            Self::Gps => (Tag(IfdContext::Gps, number), In::PRIMARY),
            Self::Interop => (Tag(IfdContext::Interop, number), In::PRIMARY),
        }
    }
}

/// One row of the editor CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRow {
    pub group: String,
    pub tag: u16,
    /// Informational; `group` and `tag` identify the field on import.
    pub name: String,
    /// [`TagValue`] literal.
    pub value: String,
}

impl TagRow {
    fn from_field(field: &Field) -> Result<Option<Self>> {
        let Some(value) = TagValue::from_value(&field.value) else {
            log::debug!("Skipping {} with unknown value type", field.tag);
            return Ok(None);
        };
        Ok(Some(Self {
            group: IfdGroup::of(field).name().to_string(),
            tag: field.tag.number(),
            name: field.tag.to_string(),
            value: value.to_text()?,
        }))
    }

    fn into_field(self) -> Result<Field> {
        let group = IfdGroup::from_name(&self.group)
            .with_context(|| format!("Unknown IFD group '{}'", self.group))?;
        let (tag, ifd_num) = group.locate(self.tag);
        let value = TagValue::parse(&self.value)?.into_value();
        Ok(Field {
            tag,
            ifd_num,
            value,
        })
    }
}

pub(crate) fn read_exif_container(image: &Path) -> Result<exif::Exif> {
    let file = File::open(image).context("Failed to open image file")?;
    let mut reader = BufReader::new(file);
    exif::Reader::new()
        .read_from_container(&mut reader)
        .context("Failed to read EXIF data")
}

/// Structured EXIF rows of an image, layout tags excluded.
///
/// An image without EXIF yields no rows.
pub fn read_tag_rows(image: &Path) -> Result<Vec<TagRow>> {
    let exif = match read_exif_container(image) {
        Ok(exif) => exif,
        Err(e) if is_not_found(&e) => {
            log::debug!("No EXIF block in {}", image.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut rows = Vec::new();
    for field in exif.fields() {
        if LAYOUT_TAGS.contains(&field.tag) {
            continue;
        }
        if let Some(row) = TagRow::from_field(field)? {
            log::debug!("  {} {} = {}", row.group, row.name, row.value);
            rows.push(row);
        }
    }
    Ok(rows)
}

pub(crate) fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<exif::Error>(), Some(exif::Error::NotFound(_)))
}

/// Serialize fields into a raw TIFF/EXIF block (starting with `II`/`MM`).
pub fn encode_exif_block(fields: &[Field], little_endian: bool) -> Result<Vec<u8>> {
    let mut writer = exif::experimental::Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut buf = Cursor::new(Vec::new());
    writer
        .write(&mut buf, little_endian)
        .context("Failed to encode EXIF block")?;
    Ok(buf.into_inner())
}

/// Write the image's EXIF rows to `csv`. Returns the number of rows.
pub fn export_exif_csv(image: &Path, csv: &Path) -> Result<usize> {
    let rows = read_tag_rows(image)?;

    let file = File::create(csv).context("Failed to create CSV file")?;
    let mut writer = csv::Writer::from_writer(file);
    for row in &rows {
        writer.serialize(row).context("Failed to write CSV row")?;
    }
    writer.flush().context("Failed to flush CSV file")?;

    log::info!("Exported {} EXIF tags to {}", rows.len(), csv.display());
    Ok(rows.len())
}

/// Rebuild EXIF from `csv` and replace the EXIF block of `image`.
///
/// Every row must parse before anything is written; the first bad row
/// is reported with its line number. Returns the number of fields written.
pub fn import_exif_csv(csv: &Path, image: &Path) -> Result<usize> {
    let kind = ImageKind::from_path(image)
        .with_context(|| format!("Unsupported image type: {}", image.display()))?;
    if !kind.supports_exif_embedding() {
        anyhow::bail!("Cannot embed EXIF into {:?} files", kind);
    }

    let file = File::open(csv).context("Failed to open CSV file")?;
    let mut reader = csv::Reader::from_reader(file);

    let mut fields = Vec::new();
    for (i, row) in reader.deserialize::<TagRow>().enumerate() {
        // Header is line 1
        let line = i + 2;
        let row = row.with_context(|| format!("Malformed CSV at line {line}"))?;
        let field = row
            .into_field()
            .with_context(|| format!("Bad EXIF row at line {line}"))?;
        fields.push(field);
    }

    // Keep the byte order of the block being replaced
    let little_endian = read_exif_container(image)
        .map(|exif| exif.little_endian())
        .unwrap_or(false);

    let block = encode_exif_block(&fields, little_endian)?;
    container::embed_exif(image, Some(block))?;

    log::info!("Wrote {} EXIF tags to {}", fields.len(), image.display());
    Ok(fields.len())
}
