//! OCSP nonce generation and echo verification (RFC 6960 Section 4.4.1)
//!
//! The nonce binds a response to the request that triggered it. It travels as
//! the `id-pkix-ocsp-nonce` extension whose `extnValue` wraps a DER OCTET
//! STRING of the random bytes; a non-replaying responder copies that
//! extension value into its response unchanged.

use crate::der;
use crate::error::{OcspError, ValidationFailure};
use crate::response::ParsedResponse;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use tracing::debug;
use x509_parser::oid_registry::asn1_rs::{oid, Oid};

/// id-pkix-ocsp-nonce
pub const OCSP_NONCE_OID: Oid<'static> = oid!(1.3.6.1.5.5.7.48.1.2);

/// Nonce length in bytes (128 bits)
pub const NONCE_LENGTH: usize = 16;

/// Per-request anti-replay token
#[derive(Clone, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_LENGTH]);

impl Nonce {
    /// Draw a fresh nonce from the operating system CSPRNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; NONCE_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LENGTH] {
        &self.0
    }

    /// Contents of the extension's `extnValue` OCTET STRING
    pub fn extension_value(&self) -> Vec<u8> {
        der::octet_string(&self.0)
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({})", hex::encode(self.0))
    }
}

/// Require the response to echo `sent` byte-for-byte
pub fn verify_echo(sent: &Nonce, response: &ParsedResponse) -> Result<(), OcspError> {
    let received = response
        .extension(&OCSP_NONCE_OID)
        .ok_or(ValidationFailure::MissingNonce)?;

    if received.value != sent.extension_value() {
        debug!(
            expected = %hex::encode(sent.extension_value()),
            received = %hex::encode(&received.value),
            "OCSP nonce mismatch"
        );
        return Err(ValidationFailure::NonceMismatch.into());
    }

    Ok(())
}
