//! # exif-scrub
//!
//! Inspect, strip, and edit the metadata embedded in images: EXIF, IPTC, and XMP.
//! Embedded GPS positions can be plotted on a Leaflet map, and the merged
//! metadata or the raw EXIF tags can be exported to CSV.
//!
//! ## Quick Start
//!
//! Strip every image in a folder into `clean-*` copies:
//!
//! ```rust,no_run
//! use exif_scrub::config::Config;
//! use exif_scrub::pipeline::collect_images;
//! use exif_scrub::remove::remove_metadata;
//! use std::path::PathBuf;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!
//!     for path in collect_images(&[PathBuf::from("./photos")]) {
//!         let report = remove_metadata(&path, &config.remove)?;
//!         println!("{} -> {}", path.display(), report.output.display());
//!         for (step, outcome) in report.steps() {
//!             println!("  {step}: {outcome}");
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Inspecting
//!
//! ```rust,no_run
//! use exif_scrub::config::MapConfig;
//! use exif_scrub::extract::{extract, write_log_csv};
//! use exif_scrub::map::write_map;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let path = Path::new("photo.jpg");
//!
//!     // Never fails; per-source problems land in `sources`
//!     let extraction = extract(path);
//!     for (tag, value) in &extraction.metadata {
//!         println!("{tag:<30} {value}");
//!     }
//!
//!     if let Some(coord) = extraction.gps {
//!         write_map(coord, path, &MapConfig::default())?; // photo.jpg-map.html
//!     }
//!     write_log_csv(&extraction.metadata, path)?; // photo.jpg-log.csv
//!     Ok(())
//! }
//! ```
//!
//! ## Editing EXIF
//!
//! ```rust,no_run
//! use exif_scrub::editor::{export_exif_csv, import_exif_csv};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let image = Path::new("photo.jpg");
//!     let csv = Path::new("photo.jpg-metadata.csv");
//!
//!     export_exif_csv(image, csv)?;
//!     // ... edit the `value` column, e.g. {"ascii":["Canon"]} ...
//!     import_exif_csv(csv, image)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Format | Read | Strip | EXIF import |
//! |--------|------|-------|-------------|
//! | JPEG (`.jpg`, `.jpeg`) | EXIF + IPTC + XMP | Yes | Yes |
//! | PNG (`.png`) | EXIF + XMP | Yes | Yes |
//! | WebP (`.webp`) | EXIF + XMP | Yes | Yes |
//! | TIFF (`.tif`, `.tiff`) | EXIF + XMP | Yes (MakerNote dropped) | No |
//!
//! ## Modules
//!
//! - [`config`]: Configuration types and loading/saving
//! - [`metadata`]: EXIF, IPTC, and XMP readers
//! - [`extract`]: Merged metadata view and the log CSV
//! - [`map`]: Leaflet map page for GPS positions
//! - [`remove`]: Stripped copies of images
//! - [`editor`]: EXIF export/import through CSV
//! - [`pipeline`]: Image collection, format detection, and output naming

pub mod config;
pub mod container;
pub mod editor;
pub mod extract;
pub mod gps;
pub mod map;
pub mod metadata;
pub mod pipeline;
pub mod remove;

#[cfg(test)]
pub(crate) mod testutil;
