//! Best-effort MIME classification
//!
//! Content is probed first (magic numbers), then the file name's extension
//! is consulted. Anything still unknown is reported as
//! [`DEFAULT_MIME_TYPE`].

use crate::types::DEFAULT_MIME_TYPE;
use tracing::trace;

/// Classify a file from its name and bytes
///
/// ```rust
/// use noobsave::mime::detect_mime_type;
///
/// assert_eq!(detect_mime_type("x.pdf", b"%PDF-1.7\n"), "application/pdf");
/// assert_eq!(detect_mime_type("notes.txt", b"hello"), "text/plain");
/// assert_eq!(detect_mime_type("blob", b"\x00\x01"), "application/octet-stream");
/// ```
pub fn detect_mime_type(file_name: &str, content: &[u8]) -> String {
    if let Some(kind) = infer::get(content) {
        trace!("Probed {} as {}", file_name, kind.mime_type());
        return kind.mime_type().to_string();
    }

    match mime_guess::from_path(file_name).first() {
        Some(guess) => guess.essence_str().to_string(),
        None => DEFAULT_MIME_TYPE.to_string(),
    }
}
