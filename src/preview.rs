//! Preview handles: local URLs that let a host display a staged file.
//!
//! A handle is an entry in a [`PreviewRegistry`] table. Creating one costs a
//! table slot; the slot is freed only by [`PreviewRegistry::revoke`], which
//! takes the handle by value. `PreviewHandle` is neither `Clone` nor `Copy`,
//! so each handle can be revoked at most once.

use std::collections::HashSet;
use std::fmt;

/// URL scheme prefix of every preview handle.
pub const PREVIEW_URL_PREFIX: &str = "blob:dochub/";

/// A live preview reference. Obtain from [`PreviewRegistry::create`].
#[derive(PartialEq, Eq, Hash)]
pub struct PreviewHandle {
    id: u64,
    url: String,
}

impl PreviewHandle {
    /// Dereferenceable URL, e.g. `blob:dochub/7`.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PreviewHandle").field(&self.url).finish()
    }
}

/// Table of live preview handles.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    next_id: u64,
    live: HashSet<u64>,
    released: u64,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new handle.
    pub fn create(&mut self) -> PreviewHandle {
        self.next_id += 1;
        let id = self.next_id;
        self.live.insert(id);
        PreviewHandle {
            id,
            url: format!("{PREVIEW_URL_PREFIX}{id}"),
        }
    }

    /// Release a handle. Returns `false` if it did not belong to this table.
    pub fn revoke(&mut self, handle: PreviewHandle) -> bool {
        let removed = self.live.remove(&handle.id);
        if removed {
            self.released += 1;
        }
        removed
    }

    /// Whether `url` names a live handle; returns its id.
    pub fn lookup(&self, url: &str) -> Option<u64> {
        let id: u64 = url.strip_prefix(PREVIEW_URL_PREFIX)?.parse().ok()?;
        self.live.contains(&id).then_some(id)
    }

    /// Handles created and not yet revoked.
    pub fn outstanding(&self) -> usize {
        self.live.len()
    }

    /// Total successful revocations over the registry's lifetime.
    pub fn released(&self) -> u64 {
        self.released
    }
}
