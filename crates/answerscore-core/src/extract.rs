//! PDF text extraction.
//!
//! Wraps `lopdf` page-by-page so one broken page does not sink the whole
//! document: the page is skipped with a warning and the rest is kept.

use std::fmt;
use std::path::Path;

use lopdf::Document;

use crate::error::ExtractionError;

/// Text of a PDF, page by page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPdf {
    /// Text of each page that extracted cleanly, in page order.
    pub pages: Vec<String>,
    /// 1-based numbers of the pages that failed and were skipped.
    pub skipped_pages: Vec<u32>,
    /// First non-empty line of the first page, trimmed. `None` when the
    /// document has no pages, the first page is blank or it failed.
    pub header: Option<String>,
}

impl ExtractedPdf {
    /// All page texts concatenated in order.
    pub fn text(&self) -> String {
        self.pages.join("\n")
    }
}

fn open(path: &Path) -> Result<Document, ExtractionError> {
    if !path.exists() {
        return Err(ExtractionError::FileNotFound(path.to_path_buf()));
    }
    Document::load(path).map_err(|e| ExtractionError::Unreadable {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn header_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Run `extract` over `page_numbers` in order, skipping pages that fail.
fn collect_pages<E: fmt::Display>(
    source: &str,
    page_numbers: impl IntoIterator<Item = u32>,
    mut extract: impl FnMut(u32) -> Result<String, E>,
) -> ExtractedPdf {
    let mut extracted = ExtractedPdf::default();

    for (index, page_number) in page_numbers.into_iter().enumerate() {
        match extract(page_number) {
            Ok(text) => {
                if index == 0 {
                    extracted.header = header_line(&text);
                }
                extracted.pages.push(text);
            }
            Err(e) => {
                tracing::warn!("skipping page {page_number} of {source}: {e}");
                extracted.skipped_pages.push(page_number);
            }
        }
    }
    extracted
}

/// Extract every page of an already loaded document.
pub fn extract_document(document: &Document, source: &str) -> ExtractedPdf {
    collect_pages(source, document.get_pages().keys().copied(), |page_number| {
        document.extract_text(&[page_number])
    })
}

/// Extract the text of every page of the PDF at `path`.
pub fn extract_pages(path: &Path) -> Result<ExtractedPdf, ExtractionError> {
    let document = open(path)?;
    let extracted = extract_document(&document, &path.display().to_string());

    tracing::debug!(
        path = %path.display(),
        pages = extracted.pages.len(),
        skipped = extracted.skipped_pages.len(),
        "extracted PDF text"
    );
    Ok(extracted)
}

/// Extract the concatenated text of all pages.
pub fn extract_text(path: &Path) -> Result<String, ExtractionError> {
    extract_pages(path).map(|pdf| pdf.text())
}

/// First non-empty line of the first page, trimmed.
///
/// Every failure (missing file, no pages, unreadable first page) collapses
/// to `None` after a warning.
pub fn first_line(path: &Path) -> Option<String> {
    match extract_pages(path) {
        Ok(pdf) => pdf.header,
        Err(e) => {
            tracing::warn!("cannot read header line: {e}");
            None
        }
    }
}
