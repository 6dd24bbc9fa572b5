//! OCSP Revocation Validation for Smart-Card Certificates
//!
//! This crate checks the revocation status of an end-entity certificate
//! against an OCSP responder as defined in RFC 6960.
//!
//! # Features
//!
//! - SHA-1 CertID derivation from subject and issuer certificates
//! - Unsigned single-certificate requests with a critical 128-bit nonce
//! - Blocking HTTP POST transport with timeouts and a response size limit
//! - Nonce echo, producedAt freshness and responder signature checks
//! - Allow-list of trusted responder certificates keyed by common name
//!
//! # Example
//!
//! ```no_run
//! use idcard_ocsp::{OcspConfiguration, OcspValidator, RevocationStatus};
//!
//! # fn run(subject: &[u8], issuer: &[u8], responder: Vec<u8>) -> Result<(), idcard_ocsp::OcspError> {
//! let config = OcspConfiguration::new("http://demo.sk.ee/ocsp")
//!     .with_trusted_certificate(responder)?
//!     .with_clock_skew(2)
//!     .with_response_lifetime(900);
//!
//! let validator = OcspValidator::from_config(&config)?;
//! match validator.validate(subject, issuer, &config) {
//!     Ok(()) => println!("certificate is good"),
//!     Err(e) if e.revocation_status() == Some(RevocationStatus::Revoked) => {
//!         println!("certificate is revoked")
//!     }
//!     Err(e) => println!("cannot validate: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

pub mod cert_id;
pub mod config;
pub mod der;
pub mod error;
pub mod freshness;
pub mod nonce;
pub mod provider;
pub mod request;
pub mod response;
pub mod signature;
pub mod status;
pub mod transport;
pub mod validator;

pub use cert_id::CertificateIdentity;
pub use config::{subject_common_name, OcspConfiguration, TransportConfig};
pub use error::{OcspError, RevocationStatus, ValidationFailure};
pub use nonce::{Nonce, NONCE_LENGTH, OCSP_NONCE_OID};
pub use provider::ensure_crypto_provider;
pub use request::{DecodedRequest, OcspRequestBuilder};
pub use response::{
    CertificateStatus, Extension, OcspResponseStatus, ParsedResponse, ResponderId,
    SingleResponse,
};
pub use transport::{HttpTransport, OcspTransport};
pub use validator::{validate, OcspValidator};
