//! Where dictionary text comes from.
//!
//! [`DictionarySource`] is the seam between the dictionary manager and the
//! network. [`HttpSource`] is the production implementation: one HTTPS GET
//! per attempt, with the status and size checked before the body is
//! accepted. Tests plug in their own sources.

use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;

use crate::error::LoadError;
use wordshape_core::error::ValidationError;

/// Produces the raw text of a word list.
#[async_trait]
pub trait DictionarySource: Send + Sync {
    /// Fetch the body at `url`, refusing anything over `max_size` bytes.
    async fn fetch(&self, url: &Url, max_size: u64) -> Result<String, LoadError>;
}

/// Parse `url` and require a secure scheme and a host.
///
/// A bad URL is a configuration problem, so the error is never retried.
pub fn validate_source_url(url: &str) -> Result<Url, LoadError> {
    let parsed = Url::parse(url.trim()).map_err(|e| LoadError::InvalidSource {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if parsed.scheme() != "https" {
        return Err(LoadError::InvalidSource {
            url: url.to_string(),
            reason: format!("scheme \"{}\" is not allowed, use https", parsed.scheme()),
        });
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(LoadError::InvalidSource {
            url: url.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(parsed)
}

/// Fetches word lists over HTTPS with `reqwest`.
pub struct HttpSource {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<Self, LoadError> {
        Self::with_builder(reqwest::Client::builder(), timeout)
    }

    fn with_builder(builder: reqwest::ClientBuilder, timeout: Duration) -> Result<Self, LoadError> {
        let client = builder
            .timeout(timeout)
            .user_agent(concat!("wordshape/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LoadError::Network(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    fn map_err(&self, e: reqwest::Error) -> LoadError {
        if e.is_timeout() {
            LoadError::Timeout {
                ms: self.timeout.as_millis() as u64,
            }
        } else if let Some(status) = e.status() {
            LoadError::HttpStatus {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            LoadError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl DictionarySource for HttpSource {
    async fn fetch(&self, url: &Url, max_size: u64) -> Result<String, LoadError> {
        let mut response = self
            .client
            .get(url.clone())
            .header("Accept", "text/plain")
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(len) = response.content_length() {
            if len > max_size {
                return Err(LoadError::TooLarge {
                    size: len,
                    limit: max_size,
                });
            }
        }

        // Content-Length may be absent or wrong, so the limit is enforced
        // while reading as well.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.map_err(e))? {
            if (body.len() + chunk.len()) as u64 > max_size {
                return Err(LoadError::TooLarge {
                    size: (body.len() + chunk.len()) as u64,
                    limit: max_size,
                });
            }
            body.extend_from_slice(&chunk);
        }

        String::from_utf8(body).map_err(|e| {
            LoadError::Validation(ValidationError::ContentEncoding {
                reason: format!("body is not UTF-8: {}", e.utf8_error()),
            })
        })
    }
}
