use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;

use exif_scrub::config;

mod flows;
mod menu;
mod render;

use render::Style;

#[derive(Parser, Debug)]
#[command(
    name = "exif-scrub",
    version,
    about = "Inspect, strip, and edit EXIF/IPTC/XMP metadata in images. Without a subcommand, shows the interactive menu."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored status lines
    #[arg(long = "no-color", global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a metadata-free copy of each image (clean-<name>)
    Remove {
        /// Image files or directories to process
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// Also delete IPTC keywords from the source files, in place
        #[arg(long = "scrub-source-iptc")]
        scrub_source_iptc: bool,

        /// File name prefix of the clean copies
        #[arg(long, value_name = "PREFIX")]
        prefix: Option<String>,
    },
    /// Print EXIF, IPTC, and XMP metadata and map any GPS position
    Extract {
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Save the metadata to <name>-log.csv
        #[arg(long)]
        csv: bool,

        /// Do not write <name>-map.html
        #[arg(long = "no-map")]
        no_map: bool,

        /// Output the extraction as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Export EXIF tags to <name>-metadata.csv
    Export {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Load EXIF tags from a CSV file into the image
    Import {
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// CSV file to load (default: <name>-metadata.csv)
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let written = config::Config::default().save(cli.config.as_deref())?;
        println!("Default config written to {}", written.display());
        return Ok(());
    }

    // Load config; CLI flags override it
    let mut config = config::Config::load(cli.config.as_deref())?;
    if cli.no_color {
        config.output.color = false;
    }
    let style = Style::new(config.output.color);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        None => {
            let stdin = io::stdin();
            menu::Session::new(stdin.lock(), &mut out, &config, style).run()?;
        }
        Some(Command::Remove {
            paths,
            scrub_source_iptc,
            prefix,
        }) => {
            if scrub_source_iptc {
                config.remove.scrub_source_iptc = true;
            }
            if let Some(prefix) = prefix {
                config.remove.output_prefix = prefix;
            }
            let failed = flows::remove_many(&mut out, style, &paths, &config)?;
            if failed > 0 {
                anyhow::bail!("{failed} image(s) could not be cleaned");
            }
        }
        Some(Command::Extract {
            path,
            csv,
            no_map,
            json,
        }) => {
            if json {
                let extraction = exif_scrub::extract::extract(&path);
                if !no_map {
                    if let Some(coord) = extraction.gps {
                        exif_scrub::map::write_map(coord, &path, &config.map)?;
                    }
                }
                if csv {
                    exif_scrub::extract::write_log_csv(&extraction.metadata, &path)?;
                }
                writeln!(out, "{}", serde_json::to_string_pretty(&extraction)?)?;
            } else {
                let extraction = flows::extract(&mut out, style, &path, &config, !no_map)?;
                if csv {
                    flows::save_log(&mut out, style, &extraction)?;
                }
            }
        }
        Some(Command::Export { path }) => flows::export(&mut out, style, &path)?,
        Some(Command::Import { path, csv }) => {
            let csv = csv.unwrap_or_else(|| exif_scrub::pipeline::metadata_csv_path(&path));
            flows::import(&mut out, style, &csv, &path)?;
        }
    }

    Ok(())
}
