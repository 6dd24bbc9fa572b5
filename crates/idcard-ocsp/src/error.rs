//! OCSP validation error types
//!
//! Every stage of the validation pipeline reports failure through [`OcspError`].
//! Only [`OcspError::Revoked`] is an expected, non-bug outcome; callers should
//! treat every other variant as "cannot validate" and deny access.

use chrono::{DateTime, Utc};
use std::fmt;

/// Errors that can occur while validating a certificate over OCSP
#[derive(Debug, thiserror::Error)]
pub enum OcspError {
    /// Invalid or undecodable caller input (raised before any network I/O)
    #[error("OCSP configuration error: {0}")]
    Configuration(String),

    /// HTTP exchange with the responder failed
    #[error("OCSP transport error: {message}")]
    Transport {
        /// HTTP status code, when the responder answered at all
        status: Option<u16>,
        /// Human-readable description
        message: String,
    },

    /// Response bytes could not be decoded or carry unexpected values
    #[error("OCSP protocol error: {0}")]
    Protocol(String),

    /// Response failed a nonce, freshness, trust or signature check
    #[error("OCSP response validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    /// Responder reported the certificate as revoked or unknown
    #[error("Certificate status is {0}")]
    Revoked(RevocationStatus),
}

impl OcspError {
    /// Status carried by a revocation failure, `None` for every other kind
    pub fn revocation_status(&self) -> Option<RevocationStatus> {
        match self {
            OcspError::Revoked(status) => Some(*status),
            _ => None,
        }
    }

    /// `true` if the responder answered authoritatively with REVOKED or UNKNOWN
    pub fn is_revocation(&self) -> bool {
        self.revocation_status().is_some()
    }

    pub(crate) fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        OcspError::Transport {
            status,
            message: message.into(),
        }
    }
}

/// Negative certificate status reported by a trusted responder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RevocationStatus {
    /// Certificate has been revoked
    Revoked,
    /// Responder does not know the certificate
    Unknown,
}

impl fmt::Display for RevocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevocationStatus::Revoked => f.write_str("REVOKED"),
            RevocationStatus::Unknown => f.write_str("UNKNOWN"),
        }
    }
}

/// Reasons a syntactically valid response is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    /// Response does not carry the nonce extension
    #[error("missing nonce")]
    MissingNonce,

    /// Echoed nonce differs from the one sent
    #[error("nonce mismatch")]
    NonceMismatch,

    /// producedAt is older than the accepted window
    #[error("stale response: producedAt={produced_at}, oldest accepted={oldest_accepted}")]
    Stale {
        produced_at: DateTime<Utc>,
        oldest_accepted: DateTime<Utc>,
    },

    /// producedAt lies beyond the accepted clock skew
    #[error("future-dated response: producedAt={produced_at}, latest accepted={latest_accepted}")]
    FutureDated {
        produced_at: DateTime<Utc>,
        latest_accepted: DateTime<Utc>,
    },

    /// Responder common name could not be derived from the ResponderID
    #[error("unable to resolve responder CN: {0}")]
    UnresolvableResponder(String),

    /// Responder CN is not in the trusted certificate map
    #[error("unknown responder: {0}")]
    UnknownResponder(String),

    /// Trusted responder certificate is not yet valid
    #[error("responder certificate for {common_name} not valid before {not_before}")]
    ResponderCertificateNotYetValid {
        common_name: String,
        not_before: DateTime<Utc>,
    },

    /// Trusted responder certificate has expired
    #[error("responder certificate for {common_name} expired at {not_after}")]
    ResponderCertificateExpired {
        common_name: String,
        not_after: DateTime<Utc>,
    },

    /// Trusted responder certificate could not be decoded
    #[error("invalid trusted certificate for {0}")]
    InvalidTrustedCertificate(String),

    /// Signature or key algorithm is not supported
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedSignatureAlgorithm(String),

    /// Signature does not verify against the trusted responder key
    #[error("invalid signature")]
    InvalidSignature,

    /// No single response matches the requested certificate identity
    #[error("no single response matches the requested certificate")]
    NoMatchingResponse,
}
