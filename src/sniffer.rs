//! Classify attachment bytes as zip, gzip, or raw.

/// Container format of an attachment's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// A zip archive (local file header or empty-archive signature).
    Zip,
    /// A single gzip stream.
    Gzip,
    /// Anything else; used as-is.
    Raw,
}

const ZIP_MAGIC: [u8; 2] = [0x50, 0x4B];
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Classify `bytes` using both magic-byte inspection and the declared MIME
/// type hint.
///
/// Magic bytes are checked first, so a zip signature wins over a misleading
/// hint. Among the hints, `gzip` is tested before `zip` because the former
/// contains the latter.
///
/// ```
/// use receiptpdf::{classify, PayloadKind};
///
/// assert_eq!(classify(b"PK\x03\x04rest", ""), PayloadKind::Zip);
/// assert_eq!(classify(b"\x1f\x8b\x08\x00", "text/plain"), PayloadKind::Gzip);
/// assert_eq!(classify(b"{}", "application/zip"), PayloadKind::Zip);
/// assert_eq!(classify(b"{}", "application/json"), PayloadKind::Raw);
/// ```
pub fn classify(bytes: &[u8], declared_mime_type: &str) -> PayloadKind {
    if has_zip_magic(bytes) {
        return PayloadKind::Zip;
    }
    if has_gzip_magic(bytes) {
        return PayloadKind::Gzip;
    }

    let hint = declared_mime_type.to_ascii_lowercase();
    if hint.contains("gzip") {
        PayloadKind::Gzip
    } else if hint.contains("zip") {
        PayloadKind::Zip
    } else {
        PayloadKind::Raw
    }
}

/// `PK\x03` (local file header) or `PK\x05` (end of central directory).
fn has_zip_magic(bytes: &[u8]) -> bool {
    bytes.len() > 4 && bytes[..2] == ZIP_MAGIC && matches!(bytes[2], 0x03 | 0x05)
}

fn has_gzip_magic(bytes: &[u8]) -> bool {
    bytes.len() > 2 && bytes[..2] == GZIP_MAGIC
}
