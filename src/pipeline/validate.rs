//! Local file validation: size ceiling and MIME allow-list.
//!
//! Runs before a file enters the batch so the user learns about an oversized
//! scan or an unsupported format immediately, instead of after a 30-second
//! round trip. The check is a pure function of the document and the limits.

use crate::config::FileLimits;
use crate::document::Document;
use crate::error::RejectReason;

/// Decide whether `doc` may be staged.
///
/// The type check runs first, so a file that is both too large and of the
/// wrong type is reported as [`RejectReason::UnsupportedType`]. A zero-byte
/// file of an allowed type passes: only `size > max_bytes` is rejected.
pub fn validate(doc: &Document, limits: &FileLimits) -> Result<(), RejectReason> {
    if !mime_allowed(doc.mime_type(), &limits.allowed_mime_types) {
        return Err(RejectReason::UnsupportedType {
            mime: doc.mime_type().to_string(),
        });
    }

    if doc.size() > limits.max_bytes {
        return Err(RejectReason::TooLarge {
            size: doc.size(),
            max: limits.max_bytes,
        });
    }

    Ok(())
}

/// Match a MIME type against an allow-list.
///
/// Comparison ignores case and any `;param=value` suffix. An entry ending in
/// `/*` matches every subtype of that top-level type.
pub fn mime_allowed(mime: &str, allowed: &[String]) -> bool {
    let wanted = essence(mime);
    if wanted.is_empty() {
        return false;
    }
    allowed.iter().any(|pattern| {
        let pattern = essence(pattern);
        match pattern.strip_suffix("/*") {
            Some(top) => wanted
                .split_once('/')
                .is_some_and(|(t, sub)| t == top && !sub.is_empty()),
            None => pattern == wanted,
        }
    })
}

fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}
