//! The upload batch: ordered documents staged for one verification request.
//!
//! The batch owns a [`PreviewRegistry`] and gives every accepted document a
//! preview handle. Handles are released on [`UploadBatch::remove`] and
//! [`UploadBatch::clear`]; nothing else frees them, and the counters on the
//! batch let tests prove it.

use crate::config::FileLimits;
use crate::document::Document;
use crate::error::{Rejection, VerifyError};
use crate::pipeline::validate::validate;
use crate::preview::{PreviewHandle, PreviewRegistry};
use serde::Serialize;
use tracing::{debug, warn};

/// A staged document and its preview handle.
#[derive(Debug)]
pub struct UploadedDocument {
    pub document: Document,
    pub preview: PreviewHandle,
}

/// What [`UploadBatch::add`] did with each input file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddReport {
    /// Number of files appended to the batch.
    pub accepted: usize,
    /// One entry per refused file, in input order.
    pub rejections: Vec<Rejection>,
}

impl AddReport {
    pub fn is_fully_accepted(&self) -> bool {
        self.rejections.is_empty()
    }
}

/// Ordered collection of accepted documents.
#[derive(Debug)]
pub struct UploadBatch {
    limits: FileLimits,
    entries: Vec<UploadedDocument>,
    previews: PreviewRegistry,
}

impl UploadBatch {
    pub fn new(limits: FileLimits) -> Self {
        Self {
            limits,
            entries: Vec::new(),
            previews: PreviewRegistry::new(),
        }
    }

    /// Validate each file independently and append the accepted ones.
    ///
    /// Accepted files keep their input order and go after any documents
    /// already staged. A rejected file is reported and skipped; it does not
    /// stop the rest.
    pub fn add<I>(&mut self, files: I) -> AddReport
    where
        I: IntoIterator<Item = Document>,
    {
        let mut report = AddReport::default();
        for document in files {
            match validate(&document, &self.limits) {
                Ok(()) => {
                    let preview = self.previews.create();
                    debug!(
                        "Staged '{}' ({} bytes) as {}",
                        document.name(),
                        document.size(),
                        preview.url()
                    );
                    self.entries.push(UploadedDocument { document, preview });
                    report.accepted += 1;
                }
                Err(reason) => {
                    warn!("Rejected '{}': {}", document.name(), reason);
                    report.rejections.push(Rejection {
                        file_name: document.name().to_string(),
                        reason,
                    });
                }
            }
        }
        report
    }

    /// Remove the document at `index`, releasing its preview handle.
    pub fn remove(&mut self, index: usize) -> Result<Document, VerifyError> {
        if index >= self.entries.len() {
            return Err(VerifyError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        let UploadedDocument { document, preview } = self.entries.remove(index);
        self.previews.revoke(preview);
        debug!("Removed '{}' from batch", document.name());
        Ok(document)
    }

    /// Release every preview handle and empty the batch.
    pub fn clear(&mut self) {
        for entry in self.entries.drain(..) {
            self.previews.revoke(entry.preview);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[UploadedDocument] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&UploadedDocument> {
        self.entries.get(index)
    }

    pub fn limits(&self) -> &FileLimits {
        &self.limits
    }

    /// The staged documents in order, sharing their byte buffers.
    pub fn snapshot(&self) -> Vec<Document> {
        self.entries.iter().map(|e| e.document.clone()).collect()
    }

    /// Total size of the staged documents.
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.document.size()).sum()
    }

    /// Dereference a preview URL to the document it shows, while live.
    pub fn resolve_preview(&self, url: &str) -> Option<&Document> {
        let id = self.previews.lookup(url)?;
        self.entries
            .iter()
            .find(|e| e.preview.id() == id)
            .map(|e| &e.document)
    }

    /// Preview handles currently allocated.
    pub fn outstanding_previews(&self) -> usize {
        self.previews.outstanding()
    }

    /// Preview handles released so far.
    pub fn released_previews(&self) -> u64 {
        self.previews.released()
    }
}
