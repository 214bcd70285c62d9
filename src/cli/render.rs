use std::io::{self, Write};

use exif_scrub::metadata::MetadataMap;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const BLUE: &str = "\x1b[34m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;
/// Tag column bounds; long XMP keys push the column up to the maximum.
const MIN_TAG_WIDTH: usize = 22;
const MAX_TAG_WIDTH: usize = 36;

/// Terminal styling. With color off every code is empty.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    color: bool,
}

impl Style {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn code(self, code: &'static str) -> &'static str {
        if self.color { code } else { "" }
    }

    pub fn green(self) -> &'static str {
        self.code(GREEN)
    }

    pub fn red(self) -> &'static str {
        self.code(RED)
    }

    pub fn blue(self) -> &'static str {
        self.code(BLUE)
    }

    pub fn dim(self) -> &'static str {
        self.code(DIM)
    }

    pub fn bold(self) -> &'static str {
        self.code(BOLD)
    }

    pub fn reset(self) -> &'static str {
        self.code(RESET)
    }
}

/// `[+] msg` in green.
pub fn success(out: &mut impl Write, style: Style, msg: &str) -> io::Result<()> {
    writeln!(out, "{}[+] {msg}{}", style.green(), style.reset())
}

/// `[-] msg` in red.
pub fn failure(out: &mut impl Write, style: Style, msg: &str) -> io::Result<()> {
    writeln!(out, "{}[-] {msg}{}", style.red(), style.reset())
}

/// `[-] msg` in blue: nothing went wrong, but nothing was done either.
pub fn notice(out: &mut impl Write, style: Style, msg: &str) -> io::Result<()> {
    writeln!(out, "{}[-] {msg}{}", style.blue(), style.reset())
}

/// A plain line in blue, used for the menu.
pub fn info(out: &mut impl Write, style: Style, msg: &str) -> io::Result<()> {
    writeln!(out, "{}{msg}{}", style.blue(), style.reset())
}

/// Two-column `Metadata Tag | Value` table.
pub fn metadata_table(out: &mut impl Write, style: Style, metadata: &MetadataMap) -> io::Result<()> {
    let tag_width = metadata
        .keys()
        .map(|k| k.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(MIN_TAG_WIDTH, MAX_TAG_WIDTH);
    let rule = "─".repeat(tag_width + 3 + VAL_WIDTH);
    let indent = " ".repeat(tag_width + 3);

    writeln!(out)?;
    writeln!(
        out,
        "  {}{:<tag_width$} : Value{}",
        style.bold(),
        "Metadata Tag",
        style.reset()
    )?;
    writeln!(out, "  {}{rule}{}", style.dim(), style.reset())?;

    if metadata.is_empty() {
        writeln!(out, "  {}(no metadata found){}", style.dim(), style.reset())?;
    }

    for (tag, value) in metadata {
        let lines = wrap_text(&value.to_string(), VAL_WIDTH);
        for (i, line) in lines.iter().enumerate() {
            if i == 0 {
                writeln!(out, "  {tag:<tag_width$} : {line}")?;
            } else {
                writeln!(out, "  {indent}{line}")?;
            }
        }
    }

    writeln!(out, "  {}{rule}{}", style.dim(), style.reset())?;
    writeln!(out)
}

/// Wrap text at word boundaries to fit within max_width.
///
/// A single word longer than the width is split, so hex dumps and URLs
/// cannot blow out the table.
pub fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > max_width {
            if !current_line.is_empty() {
                lines.push(std::mem::take(&mut current_line));
            }
            let head: String = word.chars().take(max_width).collect();
            word = word.chars().skip(max_width).collect();
            lines.push(head);
        }

        if current_line.is_empty() {
            current_line = word;
        } else if current_line.chars().count() + 1 + word.chars().count() <= max_width {
            current_line.push(' ');
            current_line.push_str(&word);
        } else {
            lines.push(current_line);
            current_line = word;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}
