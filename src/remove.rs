//! Write a metadata-free copy of an image.
//!
//! The pixels are decoded and re-encoded into `<prefix><name>` next to the
//! source, which drops every EXIF, IPTC, and XMP block. Three best-effort
//! steps then run and report independently:
//!
//! 1. **EXIF**: only the MakerNote survives, re-embedded alone when enabled.
//! 2. **IPTC**: the copy has none; the source keeps its keywords unless
//!    [`RemoveConfig::scrub_source_iptc`] is set.
//! 3. **Pixels**: 4-channel images get a fully opaque alpha channel.

use anyhow::{Context, Result};
use exif::{In, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage};
use little_exif::exif_tag::ExifTag;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::config::RemoveConfig;
use crate::container;
use crate::editor;
use crate::metadata::iptc;
use crate::pipeline::{self, ImageKind};

const JPEG_QUALITY: u8 = 95;

// little_exif as_u8_vec(JPEG) returns: [APP1 marker 2B][length 2B][Exif\0\0 6B][TIFF data]
const JPEG_EXIF_OVERHEAD: usize = 10;

/// Result of one remover step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Done(String),
    Skipped(String),
    Failed(String),
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    fn failed(err: anyhow::Error) -> Self {
        Self::Failed(format!("{err:#}"))
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(msg) | Self::Skipped(msg) | Self::Failed(msg) => f.write_str(msg),
        }
    }
}

/// What the remover did to one image.
#[derive(Debug, Clone)]
pub struct RemoveReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub color: ColorType,
    pub exif: StepOutcome,
    pub iptc: StepOutcome,
    pub pixels: StepOutcome,
}

impl RemoveReport {
    /// The three step outcomes, labelled, in the order they are reported.
    pub fn steps(&self) -> [(&'static str, &StepOutcome); 3] {
        [("EXIF", &self.exif), ("IPTC", &self.iptc), ("Pixels", &self.pixels)]
    }
}

/// Strip metadata from `path` into a new file next to it.
///
/// Fails only when the image cannot be decoded or the copy cannot be
/// encoded; step failures are reported in the [`RemoveReport`].
pub fn remove_metadata(path: &Path, config: &RemoveConfig) -> Result<RemoveReport> {
    let kind = ImageKind::from_path(path)
        .with_context(|| format!("Unsupported image type: {}", path.display()))?;

    let mut img = image::open(path)
        .with_context(|| format!("Failed to decode image: {}", path.display()))?;
    let (width, height) = (img.width(), img.height());
    let color = img.color();

    let pixels = if config.force_opaque_alpha {
        force_opaque(&mut img)
    } else {
        StepOutcome::Skipped("alpha channel left as is".to_string())
    };

    let output = pipeline::clean_path(path, &config.output_prefix);
    save_image(&img, &output, kind)?;
    log::info!("Clean copy written to {}", output.display());

    let exif = exif_step(path, &output, kind, config);
    let iptc = iptc_step(path, config);

    Ok(RemoveReport {
        source: path.to_path_buf(),
        output,
        width,
        height,
        color,
        exif,
        iptc,
        pixels,
    })
}

/// Set every alpha sample to the channel maximum.
fn force_opaque(img: &mut DynamicImage) -> StepOutcome {
    let count = match img {
        DynamicImage::ImageRgba8(buf) => {
            buf.pixels_mut().for_each(|p| p[3] = u8::MAX);
            buf.len() / 4
        }
        DynamicImage::ImageRgba16(buf) => {
            buf.pixels_mut().for_each(|p| p[3] = u16::MAX);
            buf.len() / 4
        }
        DynamicImage::ImageRgba32F(buf) => {
            buf.pixels_mut().for_each(|p| p[3] = 1.0);
            buf.len() / 4
        }
        _ => return StepOutcome::Skipped("no alpha channel".to_string()),
    };
    StepOutcome::Done(format!("alpha forced opaque on {count} pixels"))
}

fn save_image(img: &DynamicImage, output: &Path, kind: ImageKind) -> Result<()> {
    match kind {
        ImageKind::Jpeg => {
            let file = File::create(output).context("Failed to create output file")?;
            let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), JPEG_QUALITY);
            img.write_with_encoder(encoder)
                .context("Failed to encode JPEG")
        }
        _ => img
            .save(output)
            .with_context(|| format!("Failed to encode {}", output.display())),
    }
}

fn exif_step(source: &Path, output: &Path, kind: ImageKind, config: &RemoveConfig) -> StepOutcome {
    if !config.keep_maker_note {
        return StepOutcome::Done("all EXIF removed".to_string());
    }

    let maker_note = match read_maker_note(source) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return StepOutcome::Done("all EXIF removed (no MakerNote)".to_string()),
        Err(e) => return StepOutcome::failed(e.context("Could not read source EXIF")),
    };

    if !kind.supports_exif_embedding() {
        return StepOutcome::Skipped(format!(
            "EXIF removed; MakerNote ({} bytes) cannot be embedded into {:?}",
            maker_note.len(),
            kind
        ));
    }

    let len = maker_note.len();
    match encode_maker_note(maker_note).and_then(|tiff| container::embed_exif(output, Some(tiff))) {
        Ok(()) => StepOutcome::Done(format!("EXIF removed, MakerNote kept ({len} bytes)")),
        Err(e) => StepOutcome::failed(e.context("Could not re-embed MakerNote")),
    }
}

/// The source's MakerNote bytes, if it has one.
fn read_maker_note(path: &Path) -> Result<Option<Vec<u8>>> {
    let exif = match editor::read_exif_container(path) {
        Ok(exif) => exif,
        Err(e) if editor::is_not_found(&e) => return Ok(None),
        Err(e) => return Err(e),
    };
    Ok(match exif.get_field(Tag::MakerNote, In::PRIMARY) {
        Some(field) => match &field.value {
            Value::Undefined(bytes, _) if !bytes.is_empty() => Some(bytes.clone()),
            _ => None,
        },
        None => None,
    })
}

/// A TIFF block holding only the MakerNote, built with `little_exif`.
fn encode_maker_note(maker_note: Vec<u8>) -> Result<Vec<u8>> {
    // Suppress panics from little_exif
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    let result = std::panic::catch_unwind(move || {
        let mut metadata = Metadata::new();
        metadata.set_tag(ExifTag::MakerNote(maker_note));
        metadata.as_u8_vec(FileExtension::JPEG)
    });
    std::panic::set_hook(prev_hook);

    let exif_bytes = result.map_err(|_| anyhow::anyhow!("little_exif panicked encoding MakerNote"))?;
    if exif_bytes.len() <= JPEG_EXIF_OVERHEAD {
        anyhow::bail!("little_exif produced an empty EXIF block");
    }
    Ok(exif_bytes[JPEG_EXIF_OVERHEAD..].to_vec())
}

fn iptc_step(source: &Path, config: &RemoveConfig) -> StepOutcome {
    let datasets = match iptc::read_iptc(source) {
        Ok(Some(datasets)) => datasets,
        Ok(None) => return StepOutcome::Done("no IPTC data".to_string()),
        Err(e) => return StepOutcome::failed(e.context("Could not read source IPTC")),
    };

    let keywords = iptc::keyword_count(&datasets);
    if keywords == 0 {
        return StepOutcome::Done("IPTC removed (no keywords)".to_string());
    }
    if !config.scrub_source_iptc {
        return StepOutcome::Done(format!(
            "IPTC removed; {keywords} keywords left in source"
        ));
    }

    match iptc::strip_keywords(source) {
        Ok(n) => StepOutcome::Done(format!("IPTC removed; {n} keywords cleared from source")),
        Err(e) => StepOutcome::failed(e.context("Could not clear source keywords")),
    }
}
