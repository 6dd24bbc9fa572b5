//! Responder trust and response signature verification
//!
//! The responder is identified by the common name in its byName ResponderID
//! and must be present in the configured trust map. Certificates embedded in
//! the response are never consulted.

use crate::config::OcspConfiguration;
use crate::error::{OcspError, ValidationFailure};
use crate::response::{ParsedResponse, ResponderId};
use chrono::{DateTime, TimeZone, Utc};
use ring::signature::{self, UnparsedPublicKey, VerificationAlgorithm};
use tracing::{debug, warn};
use x509_parser::oid_registry::asn1_rs::{oid, Oid};
use x509_parser::prelude::*;

const RSA_ENCRYPTION: Oid<'static> = oid!(1.2.840.113549.1.1.1);
const EC_PUBLIC_KEY: Oid<'static> = oid!(1.2.840.10045.2.1);
const ED25519: Oid<'static> = oid!(1.3.101.112);

const SHA1_WITH_RSA: Oid<'static> = oid!(1.2.840.113549.1.1.5);
const SHA256_WITH_RSA: Oid<'static> = oid!(1.2.840.113549.1.1.11);
const SHA384_WITH_RSA: Oid<'static> = oid!(1.2.840.113549.1.1.12);
const SHA512_WITH_RSA: Oid<'static> = oid!(1.2.840.113549.1.1.13);
const ECDSA_WITH_SHA256: Oid<'static> = oid!(1.2.840.10045.4.3.2);
const ECDSA_WITH_SHA384: Oid<'static> = oid!(1.2.840.10045.4.3.3);

/// namedCurve parameters of an id-ecPublicKey SPKI
const SECP256R1: Oid<'static> = oid!(1.2.840.10045.3.1.7);
const SECP384R1: Oid<'static> = oid!(1.3.132.0.34);

/// Common name of the responder that signed `response`
pub fn responder_common_name(responder_id: &ResponderId) -> Result<String, OcspError> {
    let raw_name = match responder_id {
        ResponderId::ByName(raw) => raw,
        ResponderId::ByKey(hash) => {
            return Err(ValidationFailure::UnresolvableResponder(format!(
                "responder identified by key hash {}",
                hex::encode(hash)
            ))
            .into())
        }
    };

    let (_, name) = X509Name::from_der(raw_name).map_err(|e| {
        ValidationFailure::UnresolvableResponder(format!("undecodable responder name: {}", e))
    })?;

    let common_name = name
        .iter_common_name()
        .next()
        .ok_or_else(|| {
            ValidationFailure::UnresolvableResponder(format!("no CN in responder name {}", name))
        })?
        .as_str()
        .map_err(|e| {
            ValidationFailure::UnresolvableResponder(format!("unreadable responder CN: {}", e))
        })?;

    Ok(common_name.to_string())
}

/// Check the responder is trusted and its signature covers the response
pub fn verify_responder(
    response: &ParsedResponse,
    config: &OcspConfiguration,
    now: DateTime<Utc>,
) -> Result<(), OcspError> {
    let common_name = responder_common_name(&response.responder_id)?;

    let trusted = config.trusted_certificate(&common_name).ok_or_else(|| {
        warn!(responder = %common_name, "OCSP responder is not trusted");
        ValidationFailure::UnknownResponder(common_name.clone())
    })?;

    let (_, certificate) = parse_x509_certificate(trusted)
        .map_err(|_| ValidationFailure::InvalidTrustedCertificate(common_name.clone()))?;

    check_validity(&certificate, &common_name, now)?;
    verify_signature(&certificate, response)?;

    debug!(responder = %common_name, "OCSP response signature verified");
    Ok(())
}

fn check_validity(
    certificate: &X509Certificate<'_>,
    common_name: &str,
    now: DateTime<Utc>,
) -> Result<(), OcspError> {
    let validity = certificate.validity();
    let not_before = to_utc(validity.not_before.timestamp(), common_name)?;
    let not_after = to_utc(validity.not_after.timestamp(), common_name)?;

    if now < not_before {
        return Err(ValidationFailure::ResponderCertificateNotYetValid {
            common_name: common_name.to_string(),
            not_before,
        }
        .into());
    }

    if now > not_after {
        return Err(ValidationFailure::ResponderCertificateExpired {
            common_name: common_name.to_string(),
            not_after,
        }
        .into());
    }

    Ok(())
}

fn to_utc(timestamp: i64, common_name: &str) -> Result<DateTime<Utc>, OcspError> {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .ok_or_else(|| ValidationFailure::InvalidTrustedCertificate(common_name.to_string()).into())
}

fn verify_signature(
    certificate: &X509Certificate<'_>,
    response: &ParsedResponse,
) -> Result<(), OcspError> {
    let spki = certificate.public_key();
    let key = &*spki.subject_public_key.data;
    let curve = spki
        .algorithm
        .parameters
        .as_ref()
        .and_then(|params| params.as_oid().ok());
    let algorithm = verification_algorithm(
        &response.signature_algorithm,
        &spki.algorithm.algorithm,
        curve.as_ref(),
    )?;

    UnparsedPublicKey::new(algorithm, key)
        .verify(&response.tbs_response_data, &response.signature)
        .map_err(|_| {
            warn!("OCSP response signature does not verify");
            ValidationFailure::InvalidSignature.into()
        })
}

/// Map the signature algorithm and responder key type to a ring verifier
///
/// EC keys are matched on the SPKI namedCurve, not on the point size.
fn verification_algorithm(
    signature_algorithm: &Oid<'_>,
    key_algorithm: &Oid<'_>,
    curve: Option<&Oid<'_>>,
) -> Result<&'static dyn VerificationAlgorithm, OcspError> {
    let unsupported = || -> OcspError {
        let curve = curve
            .map(|c| format!(" on curve {}", c.to_id_string()))
            .unwrap_or_default();
        ValidationFailure::UnsupportedSignatureAlgorithm(format!(
            "{} with {} key{}",
            signature_algorithm.to_id_string(),
            key_algorithm.to_id_string(),
            curve
        ))
        .into()
    };

    let is_rsa = *key_algorithm == RSA_ENCRYPTION;
    let is_ec = *key_algorithm == EC_PUBLIC_KEY;

    let algorithm: &'static dyn VerificationAlgorithm = match signature_algorithm {
        alg if *alg == SHA1_WITH_RSA && is_rsa => {
            &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY
        }
        alg if *alg == SHA256_WITH_RSA && is_rsa => &signature::RSA_PKCS1_2048_8192_SHA256,
        alg if *alg == SHA384_WITH_RSA && is_rsa => &signature::RSA_PKCS1_2048_8192_SHA384,
        alg if *alg == SHA512_WITH_RSA && is_rsa => &signature::RSA_PKCS1_2048_8192_SHA512,
        alg if *alg == ECDSA_WITH_SHA256 && is_ec => match curve {
            Some(c) if *c == SECP256R1 => &signature::ECDSA_P256_SHA256_ASN1,
            Some(c) if *c == SECP384R1 => &signature::ECDSA_P384_SHA256_ASN1,
            _ => return Err(unsupported()),
        },
        alg if *alg == ECDSA_WITH_SHA384 && is_ec => match curve {
            Some(c) if *c == SECP256R1 => &signature::ECDSA_P256_SHA384_ASN1,
            Some(c) if *c == SECP384R1 => &signature::ECDSA_P384_SHA384_ASN1,
            _ => return Err(unsupported()),
        },
        alg if *alg == ED25519 && *key_algorithm == ED25519 => &signature::ED25519,
        _ => return Err(unsupported()),
    };

    Ok(algorithm)
}
