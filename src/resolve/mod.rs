//! Resource resolution: locality classification and fetching.
//!
//! A reference is remote when it starts with `http://`, `https://`, or `//`
//! (fetched over https); everything else is a local filesystem path. Each
//! reference is fetched at most once per occurrence, with no retries and no
//! caching.

use std::time::Duration;

use crate::error::{BundleError, BundleResult};

/// Whole-request timeout for remote fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest response-body snippet carried in a non-2xx lookup error.
const SNIPPET_LEN: usize = 100;

/// Report whether a reference points at a network address rather than the
/// local filesystem.
#[must_use]
pub fn is_remote(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://") || path.starts_with("//")
}

/// Infer a MIME type from a path's file extension.
#[must_use]
pub fn mime_for_path(path: &str) -> Option<&'static str> {
    mime_guess::from_path(path).first_raw()
}

/// Fetches the bytes behind asset references, local or remote.
pub struct Resolver {
    client: reqwest::blocking::Client,
}

impl Resolver {
    /// Build a resolver with its HTTP client configured for the 5 s
    /// whole-request timeout.
    pub fn new() -> BundleResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| BundleError::Document(format!("could not build HTTP client: {e}")))?;
        Ok(Resolver { client })
    }

    /// Fetch the raw bytes behind a reference. All I/O failures come back as
    /// [`BundleError::Lookup`]; callers never see raw I/O errors.
    pub fn fetch(&self, path: &str) -> BundleResult<Vec<u8>> {
        if is_remote(path) {
            self.fetch_remote(path)
        } else {
            Self::fetch_local(path)
        }
    }

    fn fetch_local(path: &str) -> BundleResult<Vec<u8>> {
        // Absolute references resolve against the working directory.
        let local = if path.starts_with('/') {
            format!(".{path}")
        } else {
            path.to_string()
        };
        std::fs::read(&local).map_err(|e| BundleError::lookup(path, e))
    }

    fn fetch_remote(&self, path: &str) -> BundleResult<Vec<u8>> {
        // Protocol-relative references are fetched over https.
        let url = if let Some(rest) = path.strip_prefix("//") {
            format!("https://{rest}")
        } else {
            path.to_string()
        };

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| BundleError::lookup(path, e))?;
        let status = response.status();
        let body = response.bytes().map_err(|e| BundleError::lookup(path, e))?;

        if !status.is_success() {
            let snippet: String = String::from_utf8_lossy(&body)
                .chars()
                .take(SNIPPET_LEN)
                .collect();
            return Err(BundleError::lookup(path, format!("{status}: {snippet}")));
        }
        Ok(body.to_vec())
    }
}
