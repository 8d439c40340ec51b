//! # receiptpdf
//!
//! Extract machine-readable text from PDF documents, preferring a structured
//! payload embedded in the PDF (a machine-generated receipt record) over text
//! rebuilt from the page content streams.
//!
//! ## What this crate does
//!
//! 1. **Locate an attachment**: walks the `/Names/EmbeddedFiles` name tree
//!    depth-first, then every page's `/FileAttachment` annotations.
//! 2. **Unwrap containers**: sniffs zip and gzip payloads (by declared MIME
//!    type and magic bytes) and decompresses them.
//! 3. **Validate the payload**: strips byte-order marks and whitespace and
//!    accepts JSON-tagged or JSON-shaped text.
//! 4. **Fall back to page text**: renders each page's glyph text in reading
//!    order and normalizes it to Unicode NFC.
//!
//! ## Quick example
//!
//! ```no_run
//! use receiptpdf::PdfTextExtractor;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = PdfTextExtractor::from_path("receipt.pdf")?;
//!
//! println!("Pages : {}", extractor.page_count());
//! for text in extractor.extract_text_pages()?.into_vec() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

mod analyzer;
pub mod container;
mod embedded;
mod extraction_engine;
mod file_discovery;
mod file_parsing;
pub mod host;
mod page_text;
mod pdf_utils;
pub mod sanitizer;
pub mod sniffer;

pub use analyzer::{ExtractionResult, PdfTextExtractor};
pub use container::decode_container;
pub use embedded::{EmbeddedFile, FileSpecification};
pub use file_discovery::NameTreeNode;
pub use sanitizer::{is_acceptable, sanitize};
pub use sniffer::{classify, PayloadKind};

// ── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration for [`PdfTextExtractor`] and the [`host`] operations.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Order page text by position (top to bottom, then left to right)
    /// instead of raw content-stream order.
    pub sort_by_position: bool,

    /// When `false`, embedded attachments are ignored and
    /// [`PdfTextExtractor::extract_text_pages`] always renders pages.
    pub prefer_embedded_payload: bool,

    /// When `true`, an attachment whose MIME type merely says "json" must
    /// also parse as a JSON object or array to be accepted.
    pub require_json_payload: bool,

    /// If set, host operations refuse documents larger than this many bytes
    /// with [`ExtractError::DocumentTooLarge`].
    pub max_document_size: Option<usize>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            sort_by_position: true,
            prefer_embedded_payload: true,
            require_json_payload: false,
            max_document_size: None,
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

/// Every error that this crate can produce.
///
/// Problems with individual attachments are never reported here: they are
/// logged and the next candidate (or the page text) is used instead.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// A filesystem I/O error occurred while reading an already opened input.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The document reference could not be opened at all.
    #[error("Cannot open '{reference}': {source}")]
    InputAccess {
        reference: String,
        #[source]
        source: std::io::Error,
    },

    /// The input bytes do not form a structurally valid PDF document.
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// The underlying lopdf parser returned an error.
    #[error("PDF parse error: {0}")]
    ParseError(#[from] lopdf::Error),

    /// Rendering the text of one page failed; no partial result is returned.
    #[error("Failed to extract text from page {page}: {reason}")]
    PageText { page: u32, reason: String },

    /// The input exceeds the configured `max_document_size` limit.
    #[error("Document is {size} bytes, above the configured limit of {limit} bytes")]
    DocumentTooLarge { size: usize, limit: usize },
}

impl ExtractError {
    /// Short machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ExtractError::IoError(_) => "IO_ERROR",
            ExtractError::InputAccess { .. } => "INPUT_ACCESS_ERROR",
            ExtractError::InvalidPdf(_) | ExtractError::ParseError(_) => "INVALID_PDF",
            ExtractError::PageText { .. } => "PAGE_TEXT_ERROR",
            ExtractError::DocumentTooLarge { .. } => "DOCUMENT_TOO_LARGE",
        }
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ExtractError>;
