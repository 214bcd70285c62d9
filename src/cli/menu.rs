//! Interactive menu: pick one operation, answer its prompts, done.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use exif_scrub::config::Config;
use exif_scrub::extract::is_affirmative;
use exif_scrub::pipeline;

use crate::flows;
use crate::render::{self, Style};

const MENU: &[&str] = &[
    "1. Remove Metadata from image",
    "2. Extract Metadata from image",
    "3. Export EXIF tags to CSV",
    "4. Load EXIF tags from CSV",
    "5. Exit",
];

/// One menu run over arbitrary input/output streams.
pub struct Session<'a, R, W> {
    input: R,
    out: W,
    config: &'a Config,
    style: Style,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    pub fn new(input: R, out: W, config: &'a Config, style: Style) -> Self {
        Self {
            input,
            out,
            config,
            style,
        }
    }

    /// Show the menu and run the selected operation once.
    ///
    /// Flow failures are reported on the terminal, not returned; only
    /// console I/O errors are.
    pub fn run(&mut self) -> Result<()> {
        for line in MENU {
            render::info(&mut self.out, self.style, line)?;
        }
        let choice = self.prompt("> Select operation: ")?;

        let outcome = match choice.trim() {
            "1" => self.remove(),
            "2" => self.extract(),
            "3" => self.export(),
            "4" => self.import(),
            "5" => return Ok(()),
            _ => {
                render::failure(&mut self.out, self.style, "Choice incorrect")?;
                return Ok(());
            }
        };

        if let Err(e) = outcome {
            log::debug!("Operation failed: {e:#}");
        }
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        let Some(path) = self.prompt_path("> Enter the image to remove metadata from: ")? else {
            return Ok(());
        };
        flows::remove_one(&mut self.out, self.style, &path, self.config)
    }

    fn extract(&mut self) -> Result<()> {
        let Some(path) = self.prompt_path("> Enter the path of the image: ")? else {
            return Ok(());
        };
        let extraction = flows::extract(&mut self.out, self.style, &path, self.config, true)?;

        let answer = self.prompt("> Do you want to save the metadata to a CSV file? (1/0): ")?;
        if is_affirmative(&answer) {
            flows::save_log(&mut self.out, self.style, &extraction)
        } else {
            render::notice(&mut self.out, self.style, "Metadata was not saved to CSV file")?;
            Ok(())
        }
    }

    fn export(&mut self) -> Result<()> {
        let Some(path) = self.prompt_path("> Enter the path of the image: ")? else {
            return Ok(());
        };
        flows::export(&mut self.out, self.style, &path)
    }

    fn import(&mut self) -> Result<()> {
        let Some(image) = self.prompt_path("> Enter the path of the image: ")? else {
            return Ok(());
        };
        let default_csv = pipeline::metadata_csv_path(&image);
        let answer = self.prompt(&format!(
            "> Enter the path of the CSV file [{}]: ",
            default_csv.display()
        ))?;
        let csv = match answer.trim() {
            "" => default_csv,
            other => PathBuf::from(other),
        };
        flows::import(&mut self.out, self.style, &csv, &image)
    }

    /// Print `question` and read one line. End of input reads as empty.
    fn prompt(&mut self, question: &str) -> Result<String> {
        write!(self.out, "{question}")?;
        self.out.flush()?;
        let mut line = String::new();
        self.input
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn prompt_path(&mut self, question: &str) -> Result<Option<PathBuf>> {
        let answer = self.prompt(question)?;
        let answer = answer.trim().trim_matches(['"', '\'']);
        if answer.is_empty() {
            render::failure(&mut self.out, self.style, "No file given")?;
            return Ok(None);
        }
        Ok(Some(PathBuf::from(answer)))
    }
}
