// Transcript export: plain text and PDF.
// Both return None for an empty transcript so callers can skip the download.

pub mod font_metrics;
pub mod pdf;
pub mod text;

pub use pdf::export_pdf;
pub use text::export_text;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PDF serialization failed: {0}")]
    Pdf(String),
}

/// Replaces typographic punctuation the PDF core fonts render badly with ASCII.
pub fn normalize_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2022}' => '*',
            other => other,
        })
        .collect()
}
