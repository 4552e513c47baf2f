//! HTTP client implementation

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::errors::PluginError;

/// HTTP client options
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Timeout of a whole request
    pub timeout: Duration,

    /// Disable TLS certificate validation
    pub insecure_skip_verify: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            insecure_skip_verify: false,
        }
    }
}

/// Raw response of a remote call
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    /// Map the status code onto the error taxonomy
    ///
    /// 2xx passes, 4xx is a rejected request, anything else means the service
    /// is unavailable.
    pub fn error_for_status(self, what: &str) -> Result<Self, PluginError> {
        if self.status.is_success() {
            return Ok(self);
        }
        if self.status.is_client_error() {
            error!("{} rejected: {} - {}", what, self.status, self.body);
            return Err(PluginError::RequestRejected {
                status: self.status.as_u16(),
                body: self.body,
            });
        }
        warn!("{} failed: {}", what, self.status);
        Err(PluginError::ServiceUnavailable(format!(
            "{} failed (HTTP status {})",
            what,
            self.status.as_u16()
        )))
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, PluginError> {
        serde_json::from_str(&self.body)
            .map_err(|e| PluginError::Protocol(format!("unable to decode response body: {}", e)))
    }
}

/// HTTP client for a remote deployment service
///
/// Stateless between calls and safe to share across tasks.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base: url::Url,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, options: &ClientOptions) -> Result<Self, PluginError> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| PluginError::Configuration(format!("invalid URL '{}': {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PluginError::Configuration(format!(
                "unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }

        if options.insecure_skip_verify {
            warn!("TLS certificate validation disabled for {}", base_url);
        }

        let client = Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.insecure_skip_verify)
            .build()
            .map_err(|e| PluginError::Configuration(format!("unable to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base: parsed,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a request on `path`, relative to the base URL
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        self.client.request(method, url)
    }

    /// Build an URL below the base, percent-encoding every segment
    ///
    /// A segment holding `/` or a space stays a single path segment.
    pub fn url_for(&self, segments: &[&str]) -> Result<url::Url, PluginError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                PluginError::Configuration(format!("'{}' cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a request on the path made of `segments`
    pub fn request_segments(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<RequestBuilder, PluginError> {
        let url = self.url_for(segments)?;
        debug!("{} {}", method, url);
        Ok(self.client.request(method, url))
    }

    /// Send a request and read the whole body
    ///
    /// Transport failures are reported as `ServiceUnavailable`.
    pub async fn execute(&self, request: RequestBuilder) -> Result<RawResponse, PluginError> {
        let response = request.send().await.map_err(|e| {
            error!("HTTP request failed: {}", e);
            PluginError::ServiceUnavailable(format!("request failed: {}", e))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            PluginError::ServiceUnavailable(format!("unable to read response body: {}", e))
        })?;

        Ok(RawResponse { status, body })
    }
}
