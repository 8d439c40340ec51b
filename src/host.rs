//! Operations exposed to a host application, one call per document.
//!
//! A document reference is a filesystem path. Every call opens its own
//! handle and releases it before returning, so concurrent calls on different
//! documents share nothing.
//!
//! ```no_run
//! use receiptpdf::host;
//!
//! let pages = host::extract_text_pages("receipt.pdf")?;
//! let digest = host::file_hash("receipt.pdf")?;
//! # Ok::<(), receiptpdf::host::HostError>(())
//! ```

use crate::{ExtractError, ExtractorConfig, PdfTextExtractor, Result};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Read window for streaming digests.
const HASH_CHUNK_SIZE: usize = 8 * 1024;

pub const EXTRACTION_ERROR: &str = "EXTRACTION_ERROR";
pub const PAGE_COUNT_ERROR: &str = "PAGE_COUNT_ERROR";
pub const HASH_ERROR: &str = "HASH_ERROR";
pub const READ_TEXT_ERROR: &str = "READ_TEXT_ERROR";
pub const INPUT_ACCESS_ERROR: &str = "INPUT_ACCESS_ERROR";
pub const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";

// ── HostError ─────────────────────────────────────────────────────────────────

/// Error reported across the host boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct HostError {
    /// Short machine-readable code, e.g. [`EXTRACTION_ERROR`].
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Description of the underlying cause, for diagnostics.
    pub details: String,
}

impl HostError {
    /// Wrap `error` under the operation's `code`. Input-access failures keep
    /// their own [`INPUT_ACCESS_ERROR`] code whatever the operation.
    fn from_extract(code: &'static str, error: ExtractError) -> Self {
        let code = match error {
            ExtractError::InputAccess { .. } => INPUT_ACCESS_ERROR,
            _ => code,
        };
        Self {
            code,
            message: error.to_string(),
            details: format!("{error:?}"),
        }
    }

    /// The error as a JSON object, as written by the CLI.
    pub fn to_json(&self) -> Value {
        json!({
            "code": self.code,
            "message": self.message,
            "details": self.details,
        })
    }
}

// ── Operations ────────────────────────────────────────────────────────────────

/// Extract the document's text: one element holding the embedded payload,
/// or one element per page.
pub fn extract_text_pages<P: AsRef<Path>>(path: P) -> std::result::Result<Vec<String>, HostError> {
    extract_text_pages_with(path, &ExtractorConfig::default())
}

/// [`extract_text_pages`] with a custom [`ExtractorConfig`].
pub fn extract_text_pages_with<P: AsRef<Path>>(
    path: P,
    config: &ExtractorConfig,
) -> std::result::Result<Vec<String>, HostError> {
    open(path.as_ref(), config)
        .and_then(|extractor| extractor.extract_text_pages())
        .map(|result| result.into_vec())
        .map_err(|e| HostError::from_extract(EXTRACTION_ERROR, e))
}

/// Number of pages in the document.
pub fn page_count<P: AsRef<Path>>(path: P) -> std::result::Result<usize, HostError> {
    page_count_with(path, &ExtractorConfig::default())
}

/// [`page_count`] with a custom [`ExtractorConfig`].
pub fn page_count_with<P: AsRef<Path>>(
    path: P,
    config: &ExtractorConfig,
) -> std::result::Result<usize, HostError> {
    open(path.as_ref(), config)
        .map(|extractor| extractor.page_count())
        .map_err(|e| HostError::from_extract(PAGE_COUNT_ERROR, e))
}

/// Lowercase hex SHA-256 digest of the raw file bytes.
pub fn file_hash<P: AsRef<Path>>(path: P) -> std::result::Result<String, HostError> {
    hash_file(path.as_ref()).map_err(|e| HostError::from_extract(HASH_ERROR, e))
}

/// The whole file decoded as UTF-8, malformed sequences replaced.
pub fn read_text_file<P: AsRef<Path>>(path: P) -> std::result::Result<String, HostError> {
    read_lossy(path.as_ref()).map_err(|e| HostError::from_extract(READ_TEXT_ERROR, e))
}

/// Route a host method call by name.
///
/// Method names are `extractTextPages`, `pageCount`, `fileHash` and
/// `readTextFile`; `argument` is the document reference. Anything else is
/// answered with [`NOT_IMPLEMENTED`].
pub fn dispatch(
    method: &str,
    argument: &str,
    config: &ExtractorConfig,
) -> std::result::Result<Value, HostError> {
    match method {
        "extractTextPages" => extract_text_pages_with(argument, config).map(|pages| json!(pages)),
        "pageCount" => page_count_with(argument, config).map(|count| json!(count)),
        "fileHash" => file_hash(argument).map(Value::String),
        "readTextFile" => read_text_file(argument).map(Value::String),
        other => Err(HostError {
            code: NOT_IMPLEMENTED,
            message: format!("unknown method '{other}'"),
            details: String::new(),
        }),
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| ExtractError::InputAccess {
        reference: path.display().to_string(),
        source,
    })
}

fn open(path: &Path, config: &ExtractorConfig) -> Result<PdfTextExtractor> {
    let mut file = open_file(path)?;
    let mut bytes = Vec::new();

    match config.max_document_size {
        Some(limit) => {
            let too_large = |size: u64| ExtractError::DocumentTooLarge {
                size: usize::try_from(size).unwrap_or(usize::MAX),
                limit,
            };
            let size = file.metadata()?.len();
            if size > limit as u64 {
                return Err(too_large(size));
            }
            // The file may have grown since the metadata was read.
            (&mut file).take(limit as u64 + 1).read_to_end(&mut bytes)?;
            if bytes.len() > limit {
                return Err(too_large(bytes.len() as u64));
            }
        }
        None => {
            file.read_to_end(&mut bytes)?;
        }
    }

    PdfTextExtractor::with_config_bytes(&bytes, config.clone())
}

fn hash_file(path: &Path) -> Result<String> {
    let mut reader = open_file(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_CHUNK_SIZE];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

fn read_lossy(path: &Path) -> Result<String> {
    let mut bytes = Vec::new();
    BufReader::new(open_file(path)?).read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
