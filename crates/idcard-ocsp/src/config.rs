use crate::error::OcspError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use x509_parser::prelude::*;

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// TCP connect timeout in seconds (default: 5)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout in seconds (default: 10)
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Largest accepted response body (default: 1 MiB)
    #[serde(default = "default_max_response_size_bytes")]
    pub max_response_size_bytes: usize,
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_read_timeout_secs() -> u64 {
    10
}

fn default_max_response_size_bytes() -> usize {
    1024 * 1024
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            max_response_size_bytes: default_max_response_size_bytes(),
        }
    }
}

/// OCSP validation configuration
///
/// Trusted responder certificates are keyed by the common name the responder
/// puts in its ResponderID.
#[derive(Debug, Clone)]
pub struct OcspConfiguration {
    /// Responder endpoint (http or https)
    pub service_url: String,

    /// Responder CN -> DER certificate
    pub trusted_certificates: HashMap<String, Vec<u8>>,

    /// Tolerated clock difference with the responder, in seconds
    pub accepted_clock_skew_secs: u64,

    /// How long after producedAt a response stays acceptable, in seconds
    pub response_lifetime_secs: u64,

    pub transport: TransportConfig,
}

impl OcspConfiguration {
    /// Configuration with no trusted responders and zero tolerances
    pub fn new(service_url: impl Into<String>) -> Self {
        OcspConfiguration {
            service_url: service_url.into(),
            trusted_certificates: HashMap::new(),
            accepted_clock_skew_secs: 0,
            response_lifetime_secs: 0,
            transport: TransportConfig::default(),
        }
    }

    pub fn with_clock_skew(mut self, secs: u64) -> Self {
        self.accepted_clock_skew_secs = secs;
        self
    }

    pub fn with_response_lifetime(mut self, secs: u64) -> Self {
        self.response_lifetime_secs = secs;
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Trust `certificate` for responders named `common_name`
    pub fn trust_certificate(mut self, common_name: impl Into<String>, certificate: Vec<u8>) -> Self {
        self.trusted_certificates.insert(common_name.into(), certificate);
        self
    }

    /// Trust a DER certificate under its own subject CN
    pub fn with_trusted_certificate(self, certificate: Vec<u8>) -> Result<Self, OcspError> {
        let common_name = subject_common_name(&certificate)?;
        Ok(self.trust_certificate(common_name, certificate))
    }

    /// Trusted certificate for a responder CN
    pub fn trusted_certificate(&self, common_name: &str) -> Option<&[u8]> {
        self.trusted_certificates
            .get(common_name)
            .map(|certificate| certificate.as_slice())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), OcspError> {
        if self.service_url.is_empty() {
            return Err(OcspError::Configuration(
                "OCSP service URL cannot be empty".to_string(),
            ));
        }

        let url = reqwest::Url::parse(&self.service_url).map_err(|e| {
            OcspError::Configuration(format!(
                "Invalid OCSP service URL {}: {}",
                self.service_url, e
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(OcspError::Configuration(format!(
                "OCSP service URL must be http or https: {}",
                self.service_url
            )));
        }

        if self.trusted_certificates.is_empty() {
            return Err(OcspError::Configuration(
                "No trusted OCSP responder certificates configured".to_string(),
            ));
        }

        if self.transport.connect_timeout_secs == 0 {
            return Err(OcspError::Configuration(
                "Connect timeout cannot be 0".to_string(),
            ));
        }

        if self.transport.read_timeout_secs == 0 {
            return Err(OcspError::Configuration(
                "Read timeout cannot be 0".to_string(),
            ));
        }

        if self.transport.max_response_size_bytes == 0 {
            return Err(OcspError::Configuration(
                "Maximum response size cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// First CN of a DER certificate's subject
pub fn subject_common_name(certificate: &[u8]) -> Result<String, OcspError> {
    let (_, cert) = parse_x509_certificate(certificate).map_err(|e| {
        OcspError::Configuration(format!("Failed to parse trusted certificate: {}", e))
    })?;

    let common_name = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string);

    common_name.ok_or_else(|| {
        OcspError::Configuration(format!(
            "Trusted certificate {} has no common name",
            cert.subject()
        ))
    })
}
