//! Search transport

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Errors from a [`Fetch`] implementation
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP client error, including non-success status codes
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Retrieves the raw bytes of a search response
///
/// Timeouts and cancellation are up to the implementation; the pipeline
/// makes exactly one call per row and never retries.
pub trait Fetch {
    fn fetch(&self, url: &Url, headers: &BTreeMap<String, String>) -> Result<Vec<u8>, FetchError>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn fetch(&self, url: &Url, headers: &BTreeMap<String, String>) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(url, headers)
    }
}

/// Blocking HTTP GET
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Client with an optional request timeout
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(concat!("xlquery/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Use an already configured client
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &Url, headers: &BTreeMap<String, String>) -> Result<Vec<u8>, FetchError> {
        let mut request = self.client.get(url.clone());
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}
