//! Document Export
//!
//! Renders the current form (never the history) into a paginated document.
//! The document is written as Markdown next to the portrait image; if that
//! fails the caller gets the plain printable text instead.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::fields::{CharacterSheet, Field};
use super::form::CharacterForm;
use crate::config::ExportConfig;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Page size too small: {0} lines")]
    PageTooSmall(usize),
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// Lines reserved at the bottom of each page for the footer.
const FOOTER_LINES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub line_width: usize,
    pub lines_per_page: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from(&ExportConfig::default())
    }
}

impl From<&ExportConfig> for ExportOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            line_width: config.line_width.max(20),
            lines_per_page: config.lines_per_page,
        }
    }
}

/// A rendered, paginated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    /// Body lines per page, footer excluded.
    pub pages: Vec<Vec<String>>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn footer(&self, index: usize) -> String {
        format!("Page {}/{}", index + 1, self.pages.len())
    }

    /// Markdown with a horizontal rule between pages.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                out.push_str("\n---\n\n");
            }
            for line in page {
                out.push_str(line);
                out.push('\n');
            }
            out.push_str(&format!("\n*{}*\n", self.footer(i)));
        }
        out
    }

    /// Plain text with form feeds between pages, for printing.
    pub fn to_printable(&self) -> String {
        let mut out = String::new();
        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                out.push('\u{000C}');
            }
            for line in page {
                out.push_str(line.trim_start_matches("# ").trim_start_matches("## "));
                out.push('\n');
            }
            out.push('\n');
            out.push_str(&self.footer(i));
            out.push('\n');
        }
        out
    }
}

/// Result of an export attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Files written (document first, portrait second if any).
    Written(Vec<PathBuf>),
    /// Writing failed; printable text to show instead.
    Printable(String),
}

/// Render the form into a paginated document.
pub fn render(
    sheet: &CharacterSheet,
    form: &CharacterForm,
    options: &ExportOptions,
) -> Result<Document> {
    if options.lines_per_page <= FOOTER_LINES + 2 {
        return Err(ExportError::PageTooSmall(options.lines_per_page));
    }
    let body_lines = options.lines_per_page - FOOTER_LINES;
    let width = options.line_width;

    let title = sheet.display_name().to_string();
    let mut blocks: Vec<Vec<String>> = Vec::new();

    let mut header = vec![format!("# {title}"), String::new()];
    for (label, value) in sheet.filled() {
        if label == "Name" {
            continue;
        }
        header.extend(wrap(&format!("{label}: {value}"), width));
    }
    if form.portrait.is_some() {
        header.push(format!("Portrait: {}", portrait_file_name(&title)));
    }
    blocks.push(header);

    for field in Field::ALL {
        let value = form.value(field).trim();
        if value.is_empty() {
            continue;
        }
        let mut block = vec![String::new(), format!("## {}", field.label())];
        for paragraph in value.lines() {
            if paragraph.trim().is_empty() {
                block.push(String::new());
            } else {
                block.extend(wrap(paragraph, width));
            }
        }
        blocks.push(block);
    }

    Ok(Document {
        title,
        pages: paginate(blocks, body_lines),
    })
}

/// Render and write `<slug>.md` (plus the portrait) into `dir`.
///
/// Any write failure falls back to the printable text.
pub fn export(
    sheet: &CharacterSheet,
    form: &CharacterForm,
    options: &ExportOptions,
    dir: &Path,
) -> Result<ExportOutcome> {
    let document = render(sheet, form, options)?;

    match write_files(&document, form, dir) {
        Ok(paths) => {
            log::info!("Exported {} page(s) to {}", document.page_count(), dir.display());
            Ok(ExportOutcome::Written(paths))
        }
        Err(e) => {
            log::warn!("Export to {} failed ({}), falling back to printable view", dir.display(), e);
            Ok(ExportOutcome::Printable(document.to_printable()))
        }
    }
}

fn write_files(document: &Document, form: &CharacterForm, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let doc_path = dir.join(format!("{}.md", slug(&document.title)));
    fs::write(&doc_path, document.to_markdown())?;
    let mut paths = vec![doc_path];

    if let Some(portrait) = &form.portrait {
        let image_path = dir.join(portrait_file_name(&document.title));
        fs::write(&image_path, &portrait.bytes)?;
        paths.push(image_path);
    }

    Ok(paths)
}

fn portrait_file_name(title: &str) -> String {
    format!("{}-portrait.png", slug(title))
}

/// Lowercase ASCII slug; never empty.
pub fn slug(title: &str) -> String {
    let mut out = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "character".to_string()
    } else {
        trimmed.to_string()
    }
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    textwrap::wrap(text, width)
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}

/// Lay blocks onto pages. A block's heading is never left alone at the
/// bottom of a page, and pages never start with a blank line.
fn paginate(blocks: Vec<Vec<String>>, body_lines: usize) -> Vec<Vec<String>> {
    let mut pages: Vec<Vec<String>> = vec![Vec::new()];

    for block in blocks {
        let leading_blank = block.first().is_some_and(|l| l.is_empty());
        let keep_together = if leading_blank { 3 } else { 2 }.min(block.len());

        let room = body_lines - pages.last().map_or(0, Vec::len);
        if room < keep_together && pages.last().is_some_and(|p| !p.is_empty()) {
            pages.push(Vec::new());
        }

        for line in block {
            if pages.last().map_or(true, |p| p.len() >= body_lines) {
                pages.push(Vec::new());
            }
            if let Some(page) = pages.last_mut() {
                if !(page.is_empty() && line.is_empty()) {
                    page.push(line);
                }
            }
        }
    }

    pages
}
