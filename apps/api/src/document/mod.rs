//! Uploaded resume / JD text extraction.
//!
//! Only the first pages are read and the result is capped so the summary
//! prompt stays small. Character limits count Unicode scalar values.

use serde::Serialize;
use thiserror::Error;

pub const MAX_PAGES: usize = 3;
pub const MAX_CHARS: usize = 4000;
pub const TRUNCATION_MARKER: &str = "\n\n[Document truncated for processing...]";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Could not read PDF: {0}")]
    Unreadable(String),

    #[error("Document contains no extractable text")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedDocument {
    pub text: String,
    pub pages_read: usize,
    pub truncated: bool,
}

/// Extracts text from an in-memory PDF.
///
/// Parsing is CPU-bound; async callers should run this inside `spawn_blocking`.
pub fn extract_pdf(bytes: &[u8]) -> Result<ExtractedDocument, DocumentError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| DocumentError::Unreadable(format!("{e:?}")))?;

    let document = assemble_pages(pages.iter().map(String::as_str));
    if document.text.trim().is_empty() {
        return Err(DocumentError::Empty);
    }
    Ok(document)
}

/// Joins at most `MAX_PAGES` pages and caps the result at `MAX_CHARS` characters,
/// appending `TRUNCATION_MARKER` when anything was cut.
pub fn assemble_pages<'a, I>(pages: I) -> ExtractedDocument
where
    I: IntoIterator<Item = &'a str>,
{
    let mut text = String::new();
    let mut pages_read = 0;
    for page in pages.into_iter().take(MAX_PAGES) {
        text.push_str(page);
        pages_read += 1;
    }

    let truncated = match text.char_indices().nth(MAX_CHARS) {
        Some((cut, _)) => {
            text.truncate(cut);
            text.push_str(TRUNCATION_MARKER);
            true
        }
        None => false,
    };

    ExtractedDocument {
        text,
        pages_read,
        truncated,
    }
}
