//! REST client for the scan backend

use std::time::Duration;

use async_trait::async_trait;
use canscan_core::{
    ClearedResults, ReportDocument, ReportResult, ReportService, ScanRequest, StoredResult,
    StoredResultList, TransportKind,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Result, ScanClientError};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Live scan endpoint for the stream transport
pub const STREAM_PATH: &str = "/api/scan/stream";
/// Live scan endpoint for the socket transport
pub const SOCKET_PATH: &str = "/api/scan/ws";

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(alias = "detail")]
    error: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Build the live scan URL for a request, switching to `ws`/`wss` for sockets
pub fn live_scan_url(base_url: &Url, request: &ScanRequest) -> Result<Url> {
    let path = match request.transport {
        TransportKind::Stream => STREAM_PATH,
        TransportKind::Socket => SOCKET_PATH,
    };
    let mut url = base_url.join(path)?;
    url.query_pairs_mut()
        .append_pair("interface", &request.interface_name)
        .append_pair("simulate", request.simulate_flag());

    if request.transport == TransportKind::Socket {
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme).map_err(|_| {
            ScanClientError::ParseError(format!("Cannot use {} scheme for {}", scheme, url))
        })?;
    }

    Ok(url)
}

/// Scan backend REST client
///
/// Covers the request/response side of the backend: health, report and the
/// results history. Live scans go through [`ScanController`](crate::ScanController).
#[derive(Debug, Clone)]
pub struct ScanClient {
    client: Client,
    streaming_client: Client,
    base_url: Url,
}

impl ScanClient {
    /// Create a new scan client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the scan backend (e.g., "http://localhost:8000")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new scan client with custom timeouts
    ///
    /// `timeout` bounds plain requests only. Live streams are opened with a
    /// client that has the connect timeout and no overall deadline.
    pub fn with_config(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        let streaming_client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        let base_url = Url::parse(base_url)?;

        Ok(Self {
            client,
            streaming_client,
            base_url,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// HTTP client used for live streams (no overall timeout)
    pub fn streaming_client(&self) -> &Client {
        &self.streaming_client
    }

    /// Live scan URL for a request on this backend
    pub fn live_scan_url(&self, request: &ScanRequest) -> Result<Url> {
        live_scan_url(&self.base_url, request)
    }

    // =========================================================================
    // Health Check
    // =========================================================================

    /// Check backend health, returning the reported status
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<String> {
        let url = self.base_url.join("/health")?;
        let response = self.client.get(url).send().await?;
        self.handle_response::<HealthResponse>(response)
            .await
            .map(|r| r.status)
    }

    // =========================================================================
    // Report
    // =========================================================================

    /// Fetch the generated report (markdown)
    #[instrument(skip(self))]
    pub async fn get_report(&self) -> Result<String> {
        let url = self.base_url.join("/api/report")?;
        debug!("Fetching report from {}", url);

        let response = self.client.get(url).send().await?;
        self.handle_response::<ReportDocument>(response)
            .await
            .map(|r| r.report)
    }

    // =========================================================================
    // Results History
    // =========================================================================

    /// List stored results, newest first
    #[instrument(skip(self))]
    pub async fn list_results(&self) -> Result<Vec<StoredResult>> {
        let url = self.base_url.join("/api/results")?;

        let response = self.client.get(url).send().await?;
        self.handle_response::<StoredResultList>(response)
            .await
            .map(|r| r.results)
    }

    /// Clear the results store, returning the number of removed rows
    #[instrument(skip(self))]
    pub async fn clear_results(&self) -> Result<u64> {
        let url = self.base_url.join("/api/results")?;

        let response = self.client.delete(url).send().await?;
        self.handle_response::<ClearedResults>(response)
            .await
            .map(|r| r.cleared)
    }

    // =========================================================================
    // Helper Methods
    // =========================================================================

    /// Handle response and deserialize JSON
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ScanClientError::ParseError(e.to_string()))
        } else {
            Err(self.extract_error_from_status(response, status).await)
        }
    }

    async fn extract_error_from_status(
        &self,
        response: reqwest::Response,
        status: StatusCode,
    ) -> ScanClientError {
        let message = match response.json::<ErrorResponse>().await {
            Ok(err) => err.message.unwrap_or(err.error),
            Err(_) => format!("HTTP {}", status),
        };

        match status {
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ScanClientError::Timeout,
            _ => ScanClientError::server_error(status.as_u16(), message),
        }
    }
}

#[async_trait]
impl ReportService for ScanClient {
    async fn fetch(&self) -> ReportResult<String> {
        self.get_report().await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ScanClient::new("http://localhost:8000");
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let client = ScanClient::new("not a url");
        assert!(client.is_err());
    }

    #[test]
    fn test_stream_url() {
        let client = ScanClient::new("http://localhost:8000").unwrap();
        let request = ScanRequest::new("vcan0", TransportKind::Stream).with_simulate(true);
        let url = client.live_scan_url(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/scan/stream?interface=vcan0&simulate=1"
        );
    }

    #[test]
    fn test_socket_url_switches_scheme() {
        let client = ScanClient::new("https://scanner.local:8443").unwrap();
        let request = ScanRequest::new("can1", TransportKind::Socket);
        let url = client.live_scan_url(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "wss://scanner.local:8443/api/scan/ws?interface=can1&simulate=0"
        );
    }
}
