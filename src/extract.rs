//! Per-page text extraction for uploaded files.
//!
//! PDFs are split into pages by `pdf-extract`. Plain-text uploads use the
//! form feed character (`\x0c`) as the page separator, which is also what
//! `pdftotext` emits, so a converted contract keeps its page numbers.

use thiserror::Error;

pub const PAGE_BREAK: char = '\x0c';

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0} (only .pdf and .txt are accepted)")]
    UnsupportedFileType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("text upload is not valid UTF-8")]
    InvalidUtf8,
}

/// True when `filename` has an extension this module can read.
pub fn is_supported(filename: &str) -> bool {
    matches!(extension(filename).as_deref(), Some("pdf") | Some("txt"))
}

fn extension(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Extract ordered page texts from an uploaded file.
pub fn extract_pages(filename: &str, bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    match extension(filename).as_deref() {
        Some("pdf") => extract_pdf_pages(bytes),
        Some("txt") => {
            let text = std::str::from_utf8(bytes).map_err(|_| ExtractError::InvalidUtf8)?;
            Ok(split_text_pages(text))
        }
        _ => Err(ExtractError::UnsupportedFileType(filename.to_string())),
    }
}

fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Split plain text on form feeds. A text without form feeds is one page.
pub fn split_text_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split(PAGE_BREAK).map(String::from).collect();
    // A trailing form feed does not start a new page
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}
