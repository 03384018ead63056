//! Financial document reader
//!
//! Reads the first pages of a PDF and returns bounded plain text.

use super::{extract_argument, truncate_chars, Tool};
use crate::error::AnalysisError;
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

pub const READER_TOOL_NAME: &str = "Financial Document Reader";
pub const MAX_PAGES: usize = 5;
pub const MAX_DOCUMENT_CHARS: usize = 3000;

/// Source of per-page text for a document
pub trait PageSource: Send + Sync {
    /// Text of at most `limit` leading pages, in page order
    fn pages(&self, path: &Path, limit: usize) -> Result<Vec<String>>;
}

/// PDF page extraction backed by `pdf-extract`. Only the requested pages
/// are laid out; the rest of the document is parsed but never rendered.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfPageSource;

impl PageSource for PdfPageSource {
    fn pages(&self, path: &Path, limit: usize) -> Result<Vec<String>> {
        let mut doc = pdf_extract::Document::load(path).map_err(pdf_error)?;
        if doc.is_encrypted() {
            doc.decrypt("").map_err(pdf_error)?;
        }

        let page_numbers = doc.get_pages();
        page_numbers
            .keys()
            .take(limit)
            .map(|&page_num| -> Result<String> {
                let mut text = String::new();
                {
                    let mut output = pdf_extract::PlainTextOutput::new(&mut text);
                    pdf_extract::output_doc_page(&doc, &mut output, page_num).map_err(pdf_error)?;
                }
                Ok(text)
            })
            .collect()
    }
}

fn pdf_error(e: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::ToolError(e.to_string())
}

pub struct ReadDocumentTool {
    source: Arc<dyn PageSource>,
}

impl ReadDocumentTool {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self { source }
    }

    pub fn pdf() -> Self {
        Self::new(Arc::new(PdfPageSource))
    }

    /// Read `path` and apply the page and length bounds
    pub async fn read_document(&self, path: &str) -> String {
        if path.is_empty() {
            return "Error: No document path provided".to_string();
        }

        let file_path = PathBuf::from(path);
        if !tokio::fs::try_exists(&file_path).await.unwrap_or(false) {
            warn!(path, "Document not found");
            return format!("Error: File not found at path '{}'", path);
        }

        let source = Arc::clone(&self.source);
        let extracted =
            tokio::task::spawn_blocking(move || source.pages(&file_path, MAX_PAGES)).await;

        let pages = match extracted {
            Ok(Ok(pages)) => pages,
            Ok(Err(e)) => {
                warn!(path, error = %e, "Failed to extract document text");
                return format!("Error: Failed to read PDF at '{}': {}", path, e);
            }
            Err(e) => {
                warn!(path, error = %e, "Document extraction aborted");
                return format!("Error: Failed to read PDF at '{}': {}", path, e);
            }
        };

        let text = bounded_text(&pages);
        if text.is_empty() {
            return format!("Error: No extractable text found in document at '{}'", path);
        }

        debug!(path, page_count = pages.len(), chars = text.chars().count(), "Document read");
        text
    }
}

#[async_trait::async_trait]
impl Tool for ReadDocumentTool {
    fn name(&self) -> &str {
        READER_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Reads a PDF financial document from the given path and returns its text content. \
         Limited to the first 5 pages. Input: the document path, e.g. {\"path\": \"data/report.pdf\"}"
    }

    async fn invoke(&self, input: &str) -> String {
        let path = extract_argument(input, "path");
        self.read_document(&path).await
    }
}

/// Join the non-empty pages among the first `MAX_PAGES`, squeezing blank
/// lines, and cut the result to `MAX_DOCUMENT_CHARS`.
fn bounded_text(pages: &[String]) -> String {
    let mut report = String::new();

    for page in pages.iter().take(MAX_PAGES) {
        if page.is_empty() {
            continue;
        }
        report.push_str(&squeeze_newlines(page));
        report.push('\n');
    }

    truncate_chars(report.trim(), MAX_DOCUMENT_CHARS).to_string()
}

fn squeeze_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_newline = false;

    for c in text.chars() {
        if c == '\n' {
            if previous_newline {
                continue;
            }
            previous_newline = true;
        } else {
            previous_newline = false;
        }
        out.push(c);
    }

    out
}
