//! Pipeline stages for document verification.
//!
//! Each submodule implements one step. Only [`submit`] does network I/O
//! against the extraction service; [`input`] may download inputs given as
//! URLs.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ validate ──▶ submit ──▶ normalize
//! (path/URL)  (limits)   (multipart)  (3 shapes → outcome)
//! ```
//!
//! 1. [`input`]: read a local file or download a URL into a `Document`
//! 2. [`validate`]: size and MIME checks against `FileLimits`
//! 3. [`submit`]: one `POST` with every document, under a deadline
//! 4. [`normalize`]: decode the body and map it to a `VerificationOutcome`

pub mod input;
pub mod normalize;
pub mod submit;
pub mod validate;
