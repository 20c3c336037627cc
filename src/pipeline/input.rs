//! Input resolution: turn a user-supplied path or URL into a [`Document`].
//!
//! The MIME type is sniffed from the file's leading bytes rather than taken
//! from its extension, because the service rejects anything it cannot open
//! and a renamed `.png` that is really a HEIC would otherwise fail only after
//! upload. The extension is consulted only when the bytes are not recognised.

use crate::document::Document;
use crate::error::VerifyError;
use futures::future::join_all;
use image::ImageFormat;
use std::path::Path;
use tracing::{debug, info};

/// Fallback type for content that could not be identified.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load one document from a local path or an HTTP(S) URL.
pub async fn load_document(input: &str, timeout_secs: u64) -> Result<Document, VerifyError> {
    if input.trim().is_empty() {
        return Err(VerifyError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        load_local(Path::new(input)).await
    }
}

/// Load several inputs concurrently, one result per input in input order.
///
/// A failing input does not prevent the others from loading.
pub async fn load_documents<S: AsRef<str>>(
    inputs: &[S],
    timeout_secs: u64,
) -> Vec<Result<Document, VerifyError>> {
    join_all(
        inputs
            .iter()
            .map(|i| load_document(i.as_ref(), timeout_secs)),
    )
    .await
}

async fn load_local(path: &Path) -> Result<Document, VerifyError> {
    let data = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => VerifyError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => VerifyError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => VerifyError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    let mime = sniff_mime(&data, Some(path));

    debug!("Loaded local file {} ({} bytes, {})", path.display(), data.len(), mime);
    Ok(Document::new(name, mime, data))
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Document, VerifyError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| VerifyError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let timeout_err = |e: reqwest::Error| {
        if e.is_timeout() {
            VerifyError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            VerifyError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(timeout_err)?;

    if !response.status().is_success() {
        return Err(VerifyError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let header_mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase());

    let filename = extract_filename(url);
    let bytes = response.bytes().await.map_err(timeout_err)?;

    let mut mime = sniff_mime(&bytes, Some(Path::new(&filename))).to_string();
    if mime == OCTET_STREAM {
        if let Some(h) = header_mime.filter(|h| !h.is_empty()) {
            mime = h;
        }
    }

    info!("Downloaded {} ({} bytes, {})", filename, bytes.len(), mime);
    Ok(Document::new(filename, mime, bytes))
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded".to_string()
}

/// Identify the MIME type of `data`.
///
/// Order: PDF magic (`%PDF`), image magic bytes, then the extension of
/// `path` if given, else [`OCTET_STREAM`].
pub fn sniff_mime(data: &[u8], path: Option<&Path>) -> &'static str {
    if data.starts_with(b"%PDF") {
        return "application/pdf";
    }
    if let Ok(format) = image::guess_format(data) {
        return format.to_mime_type();
    }
    if let Some(ext) = path.and_then(|p| p.extension()).and_then(|e| e.to_str()) {
        if ext.eq_ignore_ascii_case("pdf") {
            return "application/pdf";
        }
        if let Some(format) = ImageFormat::from_extension(ext) {
            return format.to_mime_type();
        }
    }
    OCTET_STREAM
}
