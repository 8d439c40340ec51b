use crate::extraction_engine::ExtractionEngine;
use crate::{page_text, ExtractError, ExtractorConfig, Result};
use log::info;
use lopdf::Document;
use std::path::Path;

// ── ExtractionResult ──────────────────────────────────────────────────────────

/// Text extracted from one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    /// The sanitized payload of an embedded attachment.
    Embedded(String),
    /// Rendered, NFC-normalized text of every page, in page order.
    Pages(Vec<String>),
}

impl ExtractionResult {
    /// Number of strings: 1 for an embedded payload, else the page count.
    pub fn len(&self) -> usize {
        match self {
            ExtractionResult::Embedded(_) => 1,
            ExtractionResult::Pages(pages) => pages.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, ExtractionResult::Embedded(_))
    }

    /// The result as an ordered sequence of strings.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ExtractionResult::Embedded(payload) => vec![payload],
            ExtractionResult::Pages(pages) => pages,
        }
    }
}

// ── PdfTextExtractor ──────────────────────────────────────────────────────────

/// Entry point for text extraction from one PDF document.
///
/// The parsed document lives exactly as long as the extractor; dropping it
/// releases every resource.
///
/// # Creating an extractor
///
/// ```no_run
/// use receiptpdf::{PdfTextExtractor, ExtractorConfig};
///
/// // From a file path
/// let a = PdfTextExtractor::from_path("receipt.pdf").unwrap();
///
/// // From an in-memory buffer
/// let bytes = std::fs::read("receipt.pdf").unwrap();
/// let a = PdfTextExtractor::from_bytes(&bytes).unwrap();
///
/// // With custom configuration
/// let cfg = ExtractorConfig {
///     sort_by_position: false,
///     ..Default::default()
/// };
/// let a = PdfTextExtractor::with_config("receipt.pdf", cfg).unwrap();
/// ```
pub struct PdfTextExtractor {
    document: Document,
    config: ExtractorConfig,
}

impl PdfTextExtractor {
    // ── Constructors ──────────────────────────────────────────────────────────

    /// Load a PDF from the file system.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_config(path, ExtractorConfig::default())
    }

    /// Load a PDF from an in-memory byte slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::with_config_bytes(data, ExtractorConfig::default())
    }

    /// Load a PDF from the file system with a custom [`ExtractorConfig`].
    pub fn with_config<P: AsRef<Path>>(path: P, config: ExtractorConfig) -> Result<Self> {
        Self::new(Document::load(path)?, config)
    }

    /// Load a PDF from memory with a custom [`ExtractorConfig`].
    pub fn with_config_bytes(data: &[u8], config: ExtractorConfig) -> Result<Self> {
        Self::new(Document::load_mem(data)?, config)
    }

    fn new(document: Document, config: ExtractorConfig) -> Result<Self> {
        document
            .catalog()
            .map_err(|e| ExtractError::InvalidPdf(format!("missing or invalid catalog: {e}")))?;
        Ok(Self { document, config })
    }

    // ── Extraction ────────────────────────────────────────────────────────────

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// The first embedded attachment that decodes into acceptable text, if
    /// any. The `/EmbeddedFiles` name tree is searched depth-first before
    /// the pages' file attachment annotations.
    pub fn find_embedded_text(&self) -> Option<String> {
        ExtractionEngine::new(&self.document, &self.config).find_embedded_text()
    }

    /// Number of attachment candidates (name-tree entries plus file
    /// attachment annotations), whether or not they decode.
    pub fn count_attachments(&self) -> usize {
        ExtractionEngine::new(&self.document, &self.config).count_candidates()
    }

    /// Render every page's text, in page order, NFC-normalized.
    pub fn extract_pages(&self) -> Result<Vec<String>> {
        page_text::extract_pages(&self.document, self.config.sort_by_position)
    }

    /// Extract the document's text: the embedded payload when one is usable,
    /// otherwise the text of every page.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use receiptpdf::PdfTextExtractor;
    ///
    /// let extractor = PdfTextExtractor::from_path("receipt.pdf").unwrap();
    /// let result = extractor.extract_text_pages().unwrap();
    /// if result.is_embedded() {
    ///     println!("receipt record: {}", result.into_vec()[0]);
    /// }
    /// ```
    pub fn extract_text_pages(&self) -> Result<ExtractionResult> {
        if self.config.prefer_embedded_payload {
            if let Some(payload) = self.find_embedded_text() {
                info!("using embedded payload ({} bytes) instead of page text", payload.len());
                return Ok(ExtractionResult::Embedded(payload));
            }
        }
        self.extract_pages().map(ExtractionResult::Pages)
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    /// Returns a reference to the underlying [`lopdf::Document`].
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Returns a reference to the active [`ExtractorConfig`].
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }
}
