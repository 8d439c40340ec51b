//! Unwrap zip and gzip containers around an attachment payload.
//!
//! Decoding never fails outward: a corrupt or unsupported container yields
//! the original bytes, and the sanitizer downstream rejects them if they are
//! not usable text.

use crate::PayloadKind;
use flate2::read::MultiGzDecoder;
use log::{debug, warn};
use std::borrow::Cow;
use std::io::{Cursor, Read};
use zip::result::ZipResult;
use zip::ZipArchive;

/// Entry suffixes (lowercase) that may carry the payload inside a zip archive.
const TEXT_ENTRY_SUFFIXES: [&str; 2] = [".json", ".txt"];

/// Decode `bytes` according to `kind`.
///
/// - [`PayloadKind::Zip`]: contents of the first non-directory entry, in
///   archive order, whose name ends with `.json` or `.txt`.
/// - [`PayloadKind::Gzip`]: the fully decompressed stream, every member of
///   a concatenated gzip included.
/// - [`PayloadKind::Raw`]: `bytes` unchanged.
///
/// Any decode failure, or a zip with no matching entry, returns `bytes`.
pub fn decode_container(bytes: &[u8], kind: PayloadKind) -> Cow<'_, [u8]> {
    let decoded = match kind {
        PayloadKind::Raw => None,
        PayloadKind::Zip => match first_text_entry(bytes) {
            Ok(Some(contents)) => Some(contents),
            Ok(None) => {
                debug!("zip payload has no .json or .txt entry; using raw bytes");
                None
            }
            Err(e) => {
                warn!("cannot read zip payload ({e}); using raw bytes");
                None
            }
        },
        PayloadKind::Gzip => match gunzip(bytes) {
            Ok(contents) => Some(contents),
            Err(e) => {
                warn!("cannot decompress gzip payload ({e}); using raw bytes");
                None
            }
        },
    };

    match decoded {
        Some(contents) => Cow::Owned(contents),
        None => Cow::Borrowed(bytes),
    }
}

fn first_text_entry(bytes: &[u8]) -> ZipResult<Option<Vec<u8>>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_ascii_lowercase();
        if !TEXT_ENTRY_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            continue;
        }

        debug!("using zip entry '{}'", entry.name());
        let mut contents = Vec::with_capacity(entry.size().min(1 << 20) as usize);
        entry.read_to_end(&mut contents)?;
        return Ok(Some(contents));
    }

    Ok(None)
}

fn gunzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = MultiGzDecoder::new(bytes);
    let mut contents = Vec::new();
    decoder.read_to_end(&mut contents)?;
    Ok(contents)
}
