use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::gps::GpsCoordinate;
use crate::metadata::{
    MetadataMap, Source, SourceStatus, merge_source, read_exif, read_iptc_map, read_xmp_map,
};
use crate::pipeline;

/// Header row of the metadata log CSV.
pub const LOG_CSV_HEADER: [&str; 2] = ["Metadata Tag", "Value"];

/// Everything read from one image.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub path: PathBuf,
    /// EXIF, IPTC, and XMP entries merged; EXIF keys win on collision.
    pub metadata: MetadataMap,
    pub gps: Option<GpsCoordinate>,
    /// Outcome per source, in read order.
    pub sources: Vec<(Source, SourceStatus)>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn status(&self, source: Source) -> Option<&SourceStatus> {
        self.sources
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, status)| status)
    }
}

/// Read EXIF, IPTC, and XMP from an image into one map.
///
/// Never fails: a source that cannot be read is recorded as
/// [`SourceStatus::Unreadable`] and contributes no keys.
pub fn extract(path: &Path) -> Extraction {
    let mut metadata = MetadataMap::new();
    let mut sources = Vec::with_capacity(3);

    let exif = read_exif(path);
    let gps = exif.as_ref().ok().and_then(|data| data.gps);
    sources.push((
        Source::Exif,
        merge_source(&mut metadata, exif.map(|data| data.fields)),
    ));
    sources.push((Source::Iptc, merge_source(&mut metadata, read_iptc_map(path))));
    sources.push((Source::Xmp, merge_source(&mut metadata, read_xmp_map(path))));

    for (source, status) in &sources {
        match status {
            SourceStatus::Found(n) => log::debug!("{source}: {n} entries"),
            SourceStatus::Empty => log::debug!("{source}: none"),
            SourceStatus::Unreadable(reason) => {
                log::warn!("{source} unreadable in {}: {reason}", path.display())
            }
        }
    }

    Extraction {
        path: path.to_path_buf(),
        metadata,
        gps,
        sources,
    }
}

/// Write the map as a two-column CSV next to the image
/// (`photo.jpg` → `photo.jpg-log.csv`).
pub fn write_log_csv(metadata: &MetadataMap, image_path: &Path) -> Result<PathBuf> {
    let csv_path = pipeline::log_csv_path(image_path);
    let file = File::create(&csv_path).context("Failed to create CSV file")?;
    let mut writer = csv::Writer::from_writer(file);

    writer
        .write_record(LOG_CSV_HEADER)
        .context("Failed to write CSV header")?;
    for (tag, value) in metadata {
        writer
            .write_record([tag.as_str(), value.to_full_string().as_str()])
            .context("Failed to write CSV row")?;
    }
    writer.flush().context("Failed to flush CSV file")?;

    log::info!("Metadata log written to {}", csv_path.display());
    Ok(csv_path)
}

/// `1`, `y`, or `yes`, case-insensitive.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "1" | "y" | "yes")
}
