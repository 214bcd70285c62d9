//! The four operations, rendered for the terminal.
//!
//! Shared by the interactive menu and the subcommands. Each flow reports
//! its progress as status lines and returns an error only when the
//! operation as a whole failed.

use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

use exif_scrub::config::Config;
use exif_scrub::editor;
use exif_scrub::extract::{self, Extraction};
use exif_scrub::map;
use exif_scrub::metadata::SourceStatus;
use exif_scrub::pipeline;
use exif_scrub::remove::{self, StepOutcome};

use crate::render::{self, Style};

/// Strip one image. Returns an error when no clean copy was written.
pub fn remove_one(out: &mut impl Write, style: Style, path: &Path, config: &Config) -> Result<()> {
    let report = match remove::remove_metadata(path, &config.remove) {
        Ok(report) => report,
        Err(e) => {
            render::failure(out, style, &format!("{e:#}"))?;
            return Err(e);
        }
    };

    for (step, outcome) in report.steps() {
        let line = format!("{step}: {outcome}");
        match outcome {
            StepOutcome::Done(_) => render::success(out, style, &line)?,
            StepOutcome::Skipped(_) => render::notice(out, style, &line)?,
            StepOutcome::Failed(_) => render::failure(out, style, &line)?,
        }
    }
    writeln!(
        out,
        "{}> Clean image saved to '{}' ({}x{}, {:?}){}",
        style.green(),
        report.output.display(),
        report.width,
        report.height,
        report.color,
        style.reset()
    )?;
    Ok(())
}

/// Strip every image found under `paths`. Returns the number of failures.
pub fn remove_many(
    out: &mut impl Write,
    style: Style,
    paths: &[PathBuf],
    config: &Config,
) -> Result<usize> {
    let images = pipeline::collect_images(paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    let total = images.len();
    let mut failed = 0;
    for (i, image_path) in images.iter().enumerate() {
        log::info!("[{}/{}] Processing: {}", i + 1, total, image_path.display());
        if remove_one(out, style, image_path, config).is_err() {
            failed += 1;
        }
    }
    log::info!("Done: {} succeeded, {failed} failed out of {total} images", total - failed);
    Ok(failed)
}

/// Print the merged metadata and, when the image has GPS data, write the map.
pub fn extract(
    out: &mut impl Write,
    style: Style,
    path: &Path,
    config: &Config,
    write_map: bool,
) -> Result<Extraction> {
    let extraction = extract::extract(path);

    for (source, status) in &extraction.sources {
        match status {
            SourceStatus::Found(_) => {}
            SourceStatus::Empty => {
                render::failure(out, style, &format!("{source} data not found in the image"))?
            }
            SourceStatus::Unreadable(reason) => {
                render::failure(out, style, &format!("{source} data unreadable: {reason}"))?
            }
        }
    }

    match extraction.gps {
        Some(coord) => {
            render::success(out, style, &format!("GPS position: {coord}"))?;
            if write_map {
                match map::write_map(coord, path, &config.map) {
                    Ok(map_path) => render::success(
                        out,
                        style,
                        &format!("Map saved to '{}'", map_path.display()),
                    )?,
                    Err(e) => render::failure(out, style, &format!("Could not write map: {e:#}"))?,
                }
            }
        }
        None => render::failure(out, style, "GPS data not found in the image")?,
    }

    render::metadata_table(out, style, &extraction.metadata)?;
    Ok(extraction)
}

/// Write `<image>-log.csv`.
pub fn save_log(out: &mut impl Write, style: Style, extraction: &Extraction) -> Result<()> {
    match extract::write_log_csv(&extraction.metadata, &extraction.path) {
        Ok(csv_path) => {
            render::success(
                out,
                style,
                &format!("Metadata saved to '{}'", csv_path.display()),
            )?;
            Ok(())
        }
        Err(e) => {
            render::failure(out, style, &format!("Could not save CSV: {e:#}"))?;
            Err(e)
        }
    }
}

/// Export EXIF tags to `<image>-metadata.csv`.
pub fn export(out: &mut impl Write, style: Style, image: &Path) -> Result<()> {
    let csv_path = pipeline::metadata_csv_path(image);
    match editor::export_exif_csv(image, &csv_path) {
        Ok(0) => {
            render::notice(out, style, "EXIF data not found in the image")?;
            Ok(())
        }
        Ok(n) => {
            render::success(
                out,
                style,
                &format!("{n} EXIF tags exported to '{}'", csv_path.display()),
            )?;
            Ok(())
        }
        Err(e) => {
            render::failure(out, style, &format!("{e:#}"))?;
            Err(e)
        }
    }
}

/// Load EXIF tags from `csv` into `image`.
pub fn import(out: &mut impl Write, style: Style, csv: &Path, image: &Path) -> Result<()> {
    match editor::import_exif_csv(csv, image) {
        Ok(n) => {
            render::success(
                out,
                style,
                &format!("{n} EXIF tags loaded into '{}'", image.display()),
            )?;
            Ok(())
        }
        Err(e) => {
            render::failure(out, style, &format!("{e:#}"))?;
            Err(e)
        }
    }
}
