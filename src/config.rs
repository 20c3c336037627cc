//! Configuration types for document verification.
//!
//! Everything that can vary between deployments lives in [`VerifierConfig`]:
//! the service endpoint, the local file limits, the request deadline and the
//! normaliser options. Build one with [`VerifierConfig::builder()`], or take
//! the endpoint from the environment with [`VerifierConfig::from_env()`].

use crate::error::VerifyError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::time::Duration;

/// Environment variable holding the extraction service endpoint.
pub const ENDPOINT_ENV: &str = "DOCHUB_ENDPOINT";

/// Route served by the reference extraction backend.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/analyze-images";

/// 10 MiB, the ceiling advertised on the upload form.
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Types accepted when the caller does not configure any.
pub const DEFAULT_ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

/// Local size/type limits applied before a file enters the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLimits {
    /// Files strictly larger than this are rejected. Default: 10 MiB.
    pub max_bytes: u64,

    /// Allowed MIME types, matched case-insensitively. Entries of the form
    /// `image/*` match any subtype. Default: JPEG, PNG, PDF.
    pub allowed_mime_types: Vec<String>,
}

impl Default for FileLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            allowed_mime_types: DEFAULT_ALLOWED_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Configuration for a [`crate::Verifier`].
///
/// # Example
/// ```rust
/// use dochub_verify::VerifierConfig;
/// use std::time::Duration;
///
/// let config = VerifierConfig::builder()
///     .endpoint("https://verify.example.com/analyze-images")
///     .max_bytes(5 * 1024 * 1024)
///     .timeout(Duration::from_secs(20))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct VerifierConfig {
    /// Extraction service URL the multipart form is POSTed to.
    pub endpoint: String,

    /// Size and type limits for staged files.
    pub limits: FileLimits,

    /// Deadline for one submission, covering connect, upload and response
    /// body. On expiry the request is dropped. Default: 30 s.
    pub timeout: Duration,

    /// Value of the `prompt` form field. Default: empty, which lets the
    /// service apply its own extraction prompt.
    pub prompt: String,

    /// Accept the older `lastname` / `dob` response keys. Default: false.
    pub legacy_aliases: bool,

    /// Download timeout for URL inputs in seconds, used by
    /// [`crate::Verifier::load_documents`]. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional submission progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            limits: FileLimits::default(),
            timeout: Duration::from_secs(30),
            prompt: String::new(),
            legacy_aliases: false,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for VerifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierConfig")
            .field("endpoint", &self.endpoint)
            .field("limits", &self.limits)
            .field("timeout", &self.timeout)
            .field("prompt", &self.prompt)
            .field("legacy_aliases", &self.legacy_aliases)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn SubmissionProgressCallback>"),
            )
            .finish()
    }
}

impl VerifierConfig {
    /// Create a new builder for `VerifierConfig`.
    pub fn builder() -> VerifierConfigBuilder {
        VerifierConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults, with the endpoint taken from `DOCHUB_ENDPOINT` when set.
    pub fn from_env() -> Result<Self, VerifyError> {
        let mut builder = Self::builder();
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                builder = builder.endpoint(endpoint.trim());
            }
        }
        builder.build()
    }
}

/// Builder for [`VerifierConfig`].
#[derive(Debug)]
pub struct VerifierConfigBuilder {
    config: VerifierConfig,
}

impl VerifierConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn max_bytes(mut self, n: u64) -> Self {
        self.config.limits.max_bytes = n;
        self
    }

    pub fn allowed_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.limits.allowed_mime_types = types
            .into_iter()
            .map(|t| Into::<String>::into(t).trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    pub fn limits(mut self, limits: FileLimits) -> Self {
        self.config.limits = limits;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout = Duration::from_secs(secs);
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = prompt.into();
        self
    }

    pub fn legacy_aliases(mut self, v: bool) -> Self {
        self.config.legacy_aliases = v;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<VerifierConfig, VerifyError> {
        let c = &self.config;
        match reqwest::Url::parse(&c.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(VerifyError::InvalidConfig(format!(
                    "endpoint must use http or https, got '{}'",
                    url.scheme()
                )))
            }
            Err(e) => {
                return Err(VerifyError::InvalidConfig(format!(
                    "endpoint '{}' is not a valid URL: {}",
                    c.endpoint, e
                )))
            }
        }
        if c.limits.max_bytes == 0 {
            return Err(VerifyError::InvalidConfig(
                "max_bytes must be ≥ 1".into(),
            ));
        }
        if c.limits.allowed_mime_types.is_empty() {
            return Err(VerifyError::InvalidConfig(
                "at least one allowed MIME type is required".into(),
            ));
        }
        if c.timeout.is_zero() {
            return Err(VerifyError::InvalidConfig(
                "timeout must be greater than zero".into(),
            ));
        }
        Ok(self.config)
    }
}
