//! Single response lookup and certificate status interpretation

use crate::cert_id::CertificateIdentity;
use crate::error::{OcspError, RevocationStatus, ValidationFailure};
use crate::response::{CertificateStatus, ParsedResponse, SingleResponse};
use tracing::warn;

/// First single response whose CertID equals `identity`
pub fn find_single_response<'a>(
    response: &'a ParsedResponse,
    identity: &CertificateIdentity,
) -> Result<&'a SingleResponse, OcspError> {
    response
        .responses
        .iter()
        .find(|single| single.cert_id == *identity)
        .ok_or_else(|| {
            warn!(
                requested = ?identity,
                returned = response.responses.len(),
                "No OCSP single response matches the requested certificate"
            );
            ValidationFailure::NoMatchingResponse.into()
        })
}

/// Map a certificate status to the validation outcome
pub fn interpret(status: &CertificateStatus) -> Result<(), OcspError> {
    match status {
        CertificateStatus::Good => Ok(()),
        CertificateStatus::Revoked {
            revocation_time,
            reason,
        } => {
            warn!(%revocation_time, ?reason, "Certificate is revoked");
            Err(OcspError::Revoked(RevocationStatus::Revoked))
        }
        CertificateStatus::Unknown => {
            warn!("Certificate status is unknown to the responder");
            Err(OcspError::Revoked(RevocationStatus::Unknown))
        }
        CertificateStatus::Unrecognized(tag) => Err(OcspError::Protocol(format!(
            "Unrecognized certificate status tag [{}]",
            tag
        ))),
    }
}
