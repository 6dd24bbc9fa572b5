//! HTTP exchange with the OCSP responder
//!
//! [`OcspTransport`] is the seam between the validation pipeline and the
//! network. [`HttpTransport`] is the production implementation; tests drive
//! the pipeline with in-process responders.

use crate::config::TransportConfig;
use crate::error::OcspError;
use std::io::Read;
use std::time::Duration;
use tracing::{debug, error, warn};

const OCSP_REQUEST_CONTENT_TYPE: &str = "application/ocsp-request";
const OCSP_RESPONSE_CONTENT_TYPE: &str = "application/ocsp-response";

/// Sends a DER OCSP request and returns the raw response body
pub trait OcspTransport: Send + Sync {
    fn exchange(&self, url: &str, request: &[u8]) -> Result<Vec<u8>, OcspError>;
}

impl<F> OcspTransport for F
where
    F: Fn(&str, &[u8]) -> Result<Vec<u8>, OcspError> + Send + Sync,
{
    fn exchange(&self, url: &str, request: &[u8]) -> Result<Vec<u8>, OcspError> {
        self(url, request)
    }
}

/// Blocking HTTP POST transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// HTTP client (reused for connection pooling)
    http_client: reqwest::blocking::Client,
    max_response_size: usize,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, OcspError> {
        let http_client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.read_timeout_secs))
            .build()
            .map_err(|e| {
                OcspError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            max_response_size: config.max_response_size_bytes,
        })
    }
}

impl OcspTransport for HttpTransport {
    fn exchange(&self, url: &str, request: &[u8]) -> Result<Vec<u8>, OcspError> {
        debug!(url, request_len = request.len(), "Sending OCSP request");

        let response = self
            .http_client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, OCSP_REQUEST_CONTENT_TYPE)
            .header(reqwest::header::ACCEPT, OCSP_RESPONSE_CONTENT_TYPE)
            .body(request.to_vec())
            .send()
            .map_err(|e| OcspError::transport(None, format!("OCSP HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown");
            error!(url, status = status.as_u16(), reason, "OCSP responder returned HTTP error");
            return Err(OcspError::transport(
                Some(status.as_u16()),
                format!("OCSP responder returned HTTP {} {}", status.as_u16(), reason),
            ));
        }

        if let Some(content_type) = response.headers().get(reqwest::header::CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or_default();
            if !content_type.contains(OCSP_RESPONSE_CONTENT_TYPE) {
                warn!(url, content_type, "Unexpected OCSP response Content-Type");
            }
        }

        // Read one byte past the limit to detect oversized bodies
        let mut body = Vec::new();
        response
            .take((self.max_response_size as u64).saturating_add(1))
            .read_to_end(&mut body)
            .map_err(|e| {
                OcspError::transport(
                    Some(status.as_u16()),
                    format!("Failed to read OCSP response body: {}", e),
                )
            })?;

        if body.len() > self.max_response_size {
            return Err(OcspError::transport(
                Some(status.as_u16()),
                format!(
                    "OCSP response too large: more than {} bytes",
                    self.max_response_size
                ),
            ));
        }

        debug!(url, response_len = body.len(), "Received OCSP response");
        Ok(body)
    }
}
