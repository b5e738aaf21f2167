//! Shared HTTP transport for gateway adapters.
//!
//! One pooled `reqwest::Client` is reused across every gateway; each
//! adapter holds its own view with the per-gateway timeout applied.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Transport-level failure: connect, timeout, or an unreadable body.
///
/// Non-2xx statuses are not errors here; vendors encode failure in the
/// response body and each adapter decides what it means.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct HttpError(#[from] reqwest::Error);

impl HttpError {
    /// Whether the request timed out.
    pub fn is_timeout(&self) -> bool {
        self.0.is_timeout()
    }
}

/// HTTP client handed to gateway adapters.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client with the given default per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// A view over the same pooled connections with a different timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            client: self.client.clone(),
            timeout,
        }
    }

    /// The per-request timeout this view applies.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET expecting a JSON body.
    pub async fn get_json(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<Value, HttpError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await?;
        Ok(resp.json().await?)
    }

    /// GET returning the raw body (plain-text vendors).
    pub async fn get_text(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<String, HttpError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await?;
        Ok(resp.text().await?)
    }

    /// POST a form, expecting a JSON body.
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<Value, HttpError> {
        let mut req = self.client.post(url).form(form).timeout(self.timeout);
        for (key, value) in headers {
            req = req.header(key.as_str(), value.as_str());
        }
        Ok(req.send().await?.json().await?)
    }

    /// POST a pre-serialized body byte-for-byte, expecting a JSON body.
    ///
    /// Canonical-request signing schemes hash the exact payload, so the
    /// signed string must be the one sent; callers serialize once and
    /// pass both the signature headers and the body here.
    pub async fn post_raw(
        &self,
        url: &str,
        body: String,
        headers: &[(String, String)],
    ) -> Result<Value, HttpError> {
        let mut req = self.client.post(url).body(body).timeout(self.timeout);
        for (key, value) in headers {
            req = req.header(key.as_str(), value.as_str());
        }
        Ok(req.send().await?.json().await?)
    }
}
