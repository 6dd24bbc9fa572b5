//! OCSP validation pipeline
//!
//! Stages run in a fixed order and each one is a hard gate:
//!
//! 1. Certificate identity and nonce
//! 2. Request building and exchange
//! 3. Response parsing
//! 4. Nonce echo check
//! 5. Freshness check
//! 6. Responder trust and signature check
//! 7. Single response lookup and status interpretation

use crate::cert_id::CertificateIdentity;
use crate::config::OcspConfiguration;
use crate::error::OcspError;
use crate::freshness;
use crate::nonce::{self, Nonce};
use crate::provider;
use crate::request::OcspRequestBuilder;
use crate::response::ParsedResponse;
use crate::signature;
use crate::status;
use crate::transport::{HttpTransport, OcspTransport};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Validates end-entity certificates against an OCSP responder
#[derive(Debug, Clone)]
pub struct OcspValidator<T = HttpTransport> {
    transport: T,
}

impl OcspValidator<HttpTransport> {
    /// Validator using the HTTP transport settings from `config`
    pub fn from_config(config: &OcspConfiguration) -> Result<Self, OcspError> {
        Ok(Self::new(HttpTransport::new(&config.transport)?))
    }
}

impl<T: OcspTransport> OcspValidator<T> {
    pub fn new(transport: T) -> Self {
        provider::ensure_crypto_provider();
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Validate `subject` (issued by `issuer`) against the current time
    ///
    /// Both certificates are DER-encoded. Returns `Ok(())` only when a
    /// trusted, fresh, correctly signed response reports GOOD.
    pub fn validate(
        &self,
        subject: &[u8],
        issuer: &[u8],
        config: &OcspConfiguration,
    ) -> Result<(), OcspError> {
        self.validate_at(subject, issuer, config, Utc::now())
    }

    /// Same as [`validate`](Self::validate) with an explicit clock
    pub fn validate_at(
        &self,
        subject: &[u8],
        issuer: &[u8],
        config: &OcspConfiguration,
        now: DateTime<Utc>,
    ) -> Result<(), OcspError> {
        if subject.is_empty() {
            return Err(OcspError::Configuration(
                "Subject certificate is empty".to_string(),
            ));
        }
        if issuer.is_empty() {
            return Err(OcspError::Configuration(
                "Issuer certificate is empty".to_string(),
            ));
        }
        config.validate()?;

        let identity = CertificateIdentity::for_certificates(subject, issuer)?;
        let nonce = Nonce::generate();
        debug!(?identity, ?nonce, "Built OCSP certificate identity");

        let request = OcspRequestBuilder::new(identity.clone())
            .with_nonce(nonce.clone())
            .build();

        let body = self.transport.exchange(&config.service_url, &request)?;
        let response = ParsedResponse::parse(&body)?;
        debug!(
            produced_at = %response.produced_at,
            responses = response.responses.len(),
            "Parsed OCSP response"
        );

        let result = check_response(&response, &identity, &nonce, config, now);
        match &result {
            Ok(()) => info!(url = %config.service_url, "Certificate status is GOOD"),
            Err(e) if e.is_revocation() => {
                warn!(url = %config.service_url, error = %e, "Certificate failed OCSP check")
            }
            Err(e) => warn!(url = %config.service_url, error = %e, "OCSP response rejected"),
        }
        result
    }
}

fn check_response(
    response: &ParsedResponse,
    identity: &CertificateIdentity,
    nonce: &Nonce,
    config: &OcspConfiguration,
    now: DateTime<Utc>,
) -> Result<(), OcspError> {
    nonce::verify_echo(nonce, response)?;
    freshness::check_produced_at(
        response.produced_at,
        config.accepted_clock_skew_secs,
        config.response_lifetime_secs,
        now,
    )?;
    signature::verify_responder(response, config, now)?;

    let single = status::find_single_response(response, identity)?;
    status::interpret(&single.status)
}

/// Validate over HTTP using the transport settings from `config`
pub fn validate(subject: &[u8], issuer: &[u8], config: &OcspConfiguration) -> Result<(), OcspError> {
    OcspValidator::from_config(config)?.validate(subject, issuer, config)
}
