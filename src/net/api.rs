//! HTTP client for the `/api/data` record service.
//!
//! DESIGN
//! ======
//! `RecordApi` is the seam between the record store and the network so the
//! store can be driven by an in-memory fake in tests. `HttpRecordApi` is the
//! `reqwest` implementation.
//!
//! ERROR HANDLING
//! ==============
//! Non-2xx responses keep their status and raw body text; nothing is parsed
//! out of rejection bodies. Everything else (connect, timeout, body decode)
//! collapses into `ApiError::Transport` with the underlying message.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::time::Duration;

use reqwest::{Method, Url};
use tracing::{debug, warn};

use super::types::{Record, RecordFields, UpdateBody, WireRecord};
use crate::config::ApiTimeouts;

const DATA_PATH: &str = "/api/data";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The service answered with a non-success status.
    #[error("{status} - {body}")]
    Remote { status: u16, body: String },
    /// The request never produced a usable response.
    #[error("network error: {0}")]
    Transport(String),
}

/// Remote operations the record store depends on.
#[async_trait::async_trait]
pub trait RecordApi: Send + Sync {
    /// `GET /api/data`. Incomplete entries are already filtered out.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the body is not a listing.
    async fn list(&self) -> Result<Vec<Record>, ApiError>;

    /// `POST /api/data`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on a non-2xx status or transport failure.
    async fn create(&self, record: &Record) -> Result<(), ApiError>;

    /// `PUT /api/data/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on a non-2xx status or transport failure.
    async fn update(&self, id: &str, fields: &RecordFields) -> Result<(), ApiError>;

    /// `DELETE /api/data/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on a non-2xx status or transport failure.
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}

pub struct HttpRecordApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRecordApi {
    /// Build a client against `base_url` (trailing slashes ignored).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeouts: ApiTimeouts) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, method: Method, url: Url, body: Option<serde_json::Value>) -> Result<String, ApiError> {
        let path = url.path().to_owned();
        let request = self.http.request(method.clone(), url);
        let request = if let Some(json) = body { request.json(&json) } else { request };

        let response = request.send().await.map_err(|e| {
            warn!(%method, %path, error = %e, "record api request failed");
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        debug!(%method, %path, status = status.as_u16(), "record api response");

        if !status.is_success() {
            return Err(ApiError::Remote { status: status.as_u16(), body: text });
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl RecordApi for HttpRecordApi {
    async fn list(&self) -> Result<Vec<Record>, ApiError> {
        let url = data_url(&self.base_url, None)?;
        let text = self.send(Method::GET, url, None).await?;
        parse_listing(&text)
    }

    async fn create(&self, record: &Record) -> Result<(), ApiError> {
        let url = data_url(&self.base_url, None)?;
        let body = serde_json::to_value(record).map_err(|e| ApiError::Transport(e.to_string()))?;
        self.send(Method::POST, url, Some(body)).await?;
        Ok(())
    }

    async fn update(&self, id: &str, fields: &RecordFields) -> Result<(), ApiError> {
        let url = data_url(&self.base_url, Some(id))?;
        let body = serde_json::to_value(UpdateBody { data: fields }).map_err(|e| ApiError::Transport(e.to_string()))?;
        self.send(Method::PUT, url, Some(body)).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let url = data_url(&self.base_url, Some(id))?;
        self.send(Method::DELETE, url, None).await?;
        Ok(())
    }
}

/// Build `{base}/api/data` or `{base}/api/data/{id}` with `id` percent-encoded.
pub(crate) fn data_url(base_url: &str, id: Option<&str>) -> Result<Url, ApiError> {
    let raw = format!("{}{DATA_PATH}", base_url.trim_end_matches('/'));
    let mut url = Url::parse(&raw).map_err(|e| ApiError::Transport(format!("invalid base URL {base_url}: {e}")))?;
    if let Some(id) = id {
        url.path_segments_mut()
            .map_err(|()| ApiError::Transport(format!("invalid base URL {base_url}")))?
            .push(id);
    }
    Ok(url)
}

/// Decode a listing body, dropping entries that lack a required field.
pub(crate) fn parse_listing(text: &str) -> Result<Vec<Record>, ApiError> {
    let entries: Vec<WireRecord> =
        serde_json::from_str(text).map_err(|e| ApiError::Transport(format!("invalid listing: {e}")))?;
    let total = entries.len();
    let records: Vec<Record> = entries.into_iter().filter_map(WireRecord::into_record).collect();
    if records.len() < total {
        warn!(dropped = total - records.len(), "listing contained incomplete records");
    }
    Ok(records)
}
