//! In-memory documents staged for verification.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;

/// A file selected by the user: name, MIME type and contents.
///
/// The contents are a shared [`Bytes`] buffer, so cloning a `Document`
/// (for example when a batch snapshot is handed to a submission) does not
/// copy the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    name: String,
    mime_type: String,
    data: Bytes,
}

impl Document {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// `data:` URL embedding the file, usable as an `<img src>` or
    /// `<embed src>` without touching the disk again.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}
