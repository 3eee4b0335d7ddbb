//! Source navigation for the loaded script.
//!
//! Keeps a listing cursor over the loaded file and renders numbered lines,
//! right-aligned to the width of the file's line count.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Listing state for one loaded source file.
#[derive(Debug, Clone)]
pub struct SourceNavigator {
    path: Option<PathBuf>,
    /// Digits needed for the largest line number.
    width: usize,
    /// Zero-based index of the next line a continued listing prints.
    cursor: usize,
    count: usize,
}

impl SourceNavigator {
    /// Create a navigator with nothing loaded that lists `count` lines at a time.
    pub const fn new(count: usize) -> Self {
        Self {
            path: None,
            width: 1,
            cursor: 0,
            count,
        }
    }

    /// Point the navigator at `path`, recomputing the line-number width.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let total = count_lines(path)?;
        self.width = line_number_width(total);
        self.cursor = 0;
        self.path = Some(path.to_path_buf());
        debug!(path = %path.display(), total, width = self.width, "Loaded source");
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub const fn width(&self) -> usize {
        self.width
    }

    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Dispatch a `list` invocation.
    ///
    /// No argument continues from the cursor, a number lists from that
    /// (one-based) line, anything else is searched as a keyword.
    pub fn list<W: Write>(&mut self, args: &[String], out: &mut W) -> Result<()> {
        match args.first() {
            None => self.list_continuously(out),
            Some(arg) => match arg.parse::<usize>() {
                Ok(line) => self.list_from_line(line, out),
                Err(_) => self.list_by_keyword(arg, out),
            },
        }
    }

    /// List the next page starting at the cursor.
    pub fn list_continuously<W: Write>(&mut self, out: &mut W) -> Result<()> {
        self.list_range(self.cursor, out)
    }

    /// List a page starting at one-based `line`.
    pub fn list_from_line<W: Write>(&mut self, line: usize, out: &mut W) -> Result<()> {
        let from = line.saturating_sub(1);
        let lines = self.read_source()?;
        if from >= lines.len() && !lines.is_empty() {
            return Err(Error::LineOutOfRange {
                line,
                total: lines.len(),
            });
        }
        self.print_page(&lines, from, out)
    }

    /// List a page starting at the first line containing `keyword` as a word.
    pub fn list_by_keyword<W: Write>(&mut self, keyword: &str, out: &mut W) -> Result<()> {
        let lines = self.read_source()?;
        let from = lines
            .iter()
            .position(|line| contains_word(line, keyword))
            .ok_or_else(|| Error::KeywordNotFound(keyword.to_string()))?;
        self.print_page(&lines, from, out)
    }

    fn list_range<W: Write>(&mut self, from: usize, out: &mut W) -> Result<()> {
        let lines = self.read_source()?;
        self.print_page(&lines, from, out)
    }

    fn print_page<W: Write>(&mut self, lines: &[String], from: usize, out: &mut W) -> Result<()> {
        let end = from.saturating_add(self.count).min(lines.len());
        for (idx, text) in lines.iter().enumerate().take(end).skip(from) {
            writeln!(out, "{:>width$} {}", idx + 1, text, width = self.width)?;
        }
        // Wrap around once the end of the file has been shown.
        self.cursor = if end >= lines.len() { 0 } else { end };
        Ok(())
    }

    fn read_source(&self) -> Result<Vec<String>> {
        let path = self.path.as_deref().ok_or(Error::NotLoaded)?;
        read_lines(path)
    }
}

/// Read every line of `path`, without terminators.
///
/// Invalid UTF-8 is replaced rather than rejected so that any script can be
/// listed and fed to the shell.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    reader
        .split(b'\n')
        .map(|line| {
            let mut bytes = line?;
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        })
        .collect()
}

/// Count the lines of `path`.
pub fn count_lines(path: &Path) -> Result<usize> {
    let reader = BufReader::new(File::open(path)?);
    let mut total = 0;
    for line in reader.split(b'\n') {
        line?;
        total += 1;
    }
    Ok(total)
}

/// Number of decimal digits needed to print line numbers up to `total`.
pub fn line_number_width(total: usize) -> usize {
    total.to_string().len()
}

fn contains_word(line: &str, keyword: &str) -> bool {
    line.split(|c: char| !c.is_alphanumeric() && c != '_')
        .any(|word| word == keyword)
}
