//! OCSP response parsing (RFC 6960 Section 4.2)
//!
//! ```asn1
//! OCSPResponse ::= SEQUENCE {
//!     responseStatus      OCSPResponseStatus,
//!     responseBytes       [0] EXPLICIT ResponseBytes OPTIONAL
//! }
//!
//! ResponseBytes ::= SEQUENCE {
//!     responseType        OBJECT IDENTIFIER,
//!     response            OCTET STRING
//! }
//!
//! BasicOCSPResponse ::= SEQUENCE {
//!     tbsResponseData     ResponseData,
//!     signatureAlgorithm  AlgorithmIdentifier,
//!     signature           BIT STRING,
//!     certs               [0] EXPLICIT SEQUENCE OF Certificate OPTIONAL
//! }
//!
//! ResponseData ::= SEQUENCE {
//!     version             [0] EXPLICIT Version DEFAULT v1,
//!     responderID         ResponderID,
//!     producedAt          GeneralizedTime,
//!     responses           SEQUENCE OF SingleResponse,
//!     responseExtensions  [1] EXPLICIT Extensions OPTIONAL
//! }
//!
//! ResponderID ::= CHOICE {
//!     byName              [1] Name,
//!     byKey               [2] KeyHash
//! }
//!
//! SingleResponse ::= SEQUENCE {
//!     certID              CertID,
//!     certStatus          CertStatus,
//!     thisUpdate          GeneralizedTime,
//!     nextUpdate          [0] EXPLICIT GeneralizedTime OPTIONAL,
//!     singleExtensions    [1] EXPLICIT Extensions OPTIONAL
//! }
//!
//! CertStatus ::= CHOICE {
//!     good                [0] IMPLICIT NULL,
//!     revoked             [1] IMPLICIT RevokedInfo,
//!     unknown             [2] IMPLICIT UnknownInfo
//! }
//! ```
//!
//! Parsing is purely structural: nothing here is trusted until the nonce,
//! freshness and signature checks have passed.

use crate::cert_id::CertificateIdentity;
use crate::der::{
    Element, TAG_BIT_STRING, TAG_BOOLEAN, TAG_ENUMERATED, TAG_OCTET_STRING, TAG_SEQUENCE,
};
use crate::error::OcspError;
use chrono::{DateTime, Utc};
use x509_parser::oid_registry::asn1_rs::{oid, Class, Oid};

/// id-pkix-ocsp-basic
pub const OCSP_BASIC_RESPONSE_OID: Oid<'static> = oid!(1.3.6.1.5.5.7.48.1.1);

/// OCSP response status (RFC 6960 Section 4.2.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcspResponseStatus {
    /// Response has valid confirmations
    Successful = 0,
    /// Illegal confirmation request
    MalformedRequest = 1,
    /// Internal error in issuer
    InternalError = 2,
    /// Try again later
    TryLater = 3,
    /// Must sign the request
    SigRequired = 5,
    /// Request unauthorized
    Unauthorized = 6,
}

impl OcspResponseStatus {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Successful),
            1 => Some(Self::MalformedRequest),
            2 => Some(Self::InternalError),
            3 => Some(Self::TryLater),
            5 => Some(Self::SigRequired),
            6 => Some(Self::Unauthorized),
            _ => None,
        }
    }
}

/// Certificate status carried by a single response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateStatus {
    /// Certificate is not revoked
    Good,
    /// Certificate has been revoked
    Revoked {
        revocation_time: DateTime<Utc>,
        /// CRLReason code, if the responder supplied one
        reason: Option<u8>,
    },
    /// Responder does not know the certificate
    Unknown,
    /// CertStatus CHOICE alternative outside RFC 6960
    Unrecognized(u32),
}

/// Identity of the responder that signed the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderId {
    /// DER encoding of the responder's Name
    ByName(Vec<u8>),
    /// SHA-1 hash of the responder's public key
    ByKey(Vec<u8>),
}

/// X.509 extension as carried in OCSP messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub oid: Oid<'static>,
    pub critical: bool,
    /// Contents of the extnValue OCTET STRING
    pub value: Vec<u8>,
}

impl Extension {
    /// Decode `Extensions ::= SEQUENCE OF Extension`
    pub(crate) fn parse_list(element: Element<'_>) -> Result<Vec<Self>, OcspError> {
        let list = element.require(TAG_SEQUENCE, "Extensions")?;
        let mut extensions = Vec::new();

        for ext in list.children() {
            let ext = ext?.require(TAG_SEQUENCE, "Extension")?;
            let mut items = ext.children();

            let oid = items.next_element("extnID")?.to_oid("extnID")?;
            let mut next = items.next_element("extnValue")?;
            let mut critical = false;
            if next.is_universal(TAG_BOOLEAN) {
                critical = next.to_bool("critical")?;
                next = items.next_element("extnValue")?;
            }
            let value = next.require(TAG_OCTET_STRING, "extnValue")?.data().to_vec();

            extensions.push(Extension {
                oid,
                critical,
                value,
            });
        }

        Ok(extensions)
    }
}

/// Status statement about one certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleResponse {
    pub cert_id: CertificateIdentity,
    pub status: CertificateStatus,
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
}

/// Decoded BasicOCSPResponse
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub responder_id: ResponderId,
    pub produced_at: DateTime<Utc>,
    pub responses: Vec<SingleResponse>,
    pub extensions: Vec<Extension>,
    /// DER of tbsResponseData, the signed content
    pub tbs_response_data: Vec<u8>,
    pub signature_algorithm: Oid<'static>,
    pub signature: Vec<u8>,
    /// Certificates embedded by the responder (not used for trust)
    pub certs: Vec<Vec<u8>>,
}

impl ParsedResponse {
    /// Parse a DER-encoded OCSPResponse
    ///
    /// Fails with [`OcspError::Protocol`] if the bytes are malformed, the
    /// responseStatus is not `successful`, or the response type is not
    /// `id-pkix-ocsp-basic`.
    pub fn parse(der_bytes: &[u8]) -> Result<Self, OcspError> {
        let ocsp_response =
            Element::parse_exact(der_bytes, "OCSPResponse")?.require(TAG_SEQUENCE, "OCSPResponse")?;
        let mut items = ocsp_response.children();

        let status_value = items
            .next_element("responseStatus")?
            .require(TAG_ENUMERATED, "responseStatus")?
            .to_u32("responseStatus")?;
        let status = OcspResponseStatus::from_u32(status_value).ok_or_else(|| {
            OcspError::Protocol(format!("Unknown OCSP response status: {}", status_value))
        })?;

        if status != OcspResponseStatus::Successful {
            return Err(OcspError::Protocol(format!(
                "OCSP responder returned error status: {:?}",
                status
            )));
        }

        let response_bytes = items
            .next_if_context(0, "responseBytes")?
            .ok_or_else(|| OcspError::Protocol("OCSP response missing responseBytes".to_string()))?
            .unwrap_explicit("ResponseBytes")?
            .require(TAG_SEQUENCE, "ResponseBytes")?;
        let mut response_bytes = response_bytes.children();

        let response_type = response_bytes
            .next_element("responseType")?
            .to_oid("responseType")?;
        if response_type != OCSP_BASIC_RESPONSE_OID {
            return Err(OcspError::Protocol(format!(
                "Unsupported OCSP response type: {}",
                response_type.to_id_string()
            )));
        }

        let basic = response_bytes
            .next_element("response")?
            .require(TAG_OCTET_STRING, "response")?;

        Self::parse_basic(basic.data())
    }

    /// Parse the BasicOCSPResponse carried inside responseBytes
    pub fn parse_basic(der_bytes: &[u8]) -> Result<Self, OcspError> {
        let basic = Element::parse_exact(der_bytes, "BasicOCSPResponse")?
            .require(TAG_SEQUENCE, "BasicOCSPResponse")?;
        let mut items = basic.children();

        let tbs = items
            .next_element("tbsResponseData")?
            .require(TAG_SEQUENCE, "tbsResponseData")?;

        let signature_algorithm = items
            .next_element("signatureAlgorithm")?
            .require(TAG_SEQUENCE, "signatureAlgorithm")?
            .children()
            .next_element("signatureAlgorithm OID")?
            .to_oid("signatureAlgorithm")?;

        let signature = items
            .next_element("signature")?
            .require(TAG_BIT_STRING, "signature")?
            .to_bit_string("signature")?
            .to_vec();

        let mut certs = Vec::new();
        if let Some(tagged) = items.next_if_context(0, "certs")? {
            let list = tagged.unwrap_explicit("certs")?.require(TAG_SEQUENCE, "certs")?;
            for cert in list.children() {
                certs.push(cert?.raw.to_vec());
            }
        }

        let mut data = tbs.children();
        data.next_if_context(0, "version")?;

        let responder_id = parse_responder_id(data.next_element("responderID")?)?;
        let produced_at = data.next_element("producedAt")?.to_time("producedAt")?;

        let responses_seq = data
            .next_element("responses")?
            .require(TAG_SEQUENCE, "responses")?;
        let mut responses = Vec::new();
        for single in responses_seq.children() {
            responses.push(parse_single_response(single?)?);
        }

        let extensions = match data.next_if_context(1, "responseExtensions")? {
            Some(tagged) => Extension::parse_list(tagged.unwrap_explicit("responseExtensions")?)?,
            None => Vec::new(),
        };

        Ok(Self {
            responder_id,
            produced_at,
            responses,
            extensions,
            tbs_response_data: tbs.raw.to_vec(),
            signature_algorithm,
            signature,
            certs,
        })
    }

    /// Look up a response extension by OID
    pub fn extension(&self, oid: &Oid<'_>) -> Option<&Extension> {
        self.extensions.iter().find(|ext| ext.oid == *oid)
    }
}

fn parse_responder_id(element: Element<'_>) -> Result<ResponderId, OcspError> {
    if element.is_context(1) {
        let name = element
            .unwrap_explicit("responderID byName")?
            .require(TAG_SEQUENCE, "responderID byName")?;
        Ok(ResponderId::ByName(name.raw.to_vec()))
    } else if element.is_context(2) {
        let key_hash = element
            .unwrap_explicit("responderID byKey")?
            .require(TAG_OCTET_STRING, "responderID byKey")?;
        Ok(ResponderId::ByKey(key_hash.data().to_vec()))
    } else {
        Err(OcspError::Protocol(
            "responderID is neither byName nor byKey".to_string(),
        ))
    }
}

fn parse_single_response(element: Element<'_>) -> Result<SingleResponse, OcspError> {
    let single = element.require(TAG_SEQUENCE, "SingleResponse")?;
    let mut items = single.children();

    let cert_id = CertificateIdentity::from_element(items.next_element("certID")?)?;
    let status = parse_cert_status(items.next_element("certStatus")?)?;
    let this_update = items.next_element("thisUpdate")?.to_time("thisUpdate")?;
    let next_update = match items.next_if_context(0, "nextUpdate")? {
        Some(tagged) => Some(tagged.unwrap_explicit("nextUpdate")?.to_time("nextUpdate")?),
        None => None,
    };

    Ok(SingleResponse {
        cert_id,
        status,
        this_update,
        next_update,
    })
}

/// Decode the CertStatus CHOICE
///
/// Context tags outside `[0]..[2]` are kept as [`CertificateStatus::Unrecognized`]
/// so the status interpreter decides how to treat them.
fn parse_cert_status(element: Element<'_>) -> Result<CertificateStatus, OcspError> {
    if element.is_context(0) {
        Ok(CertificateStatus::Good)
    } else if element.is_context(1) {
        // RevokedInfo ::= SEQUENCE {
        //     revocationTime      GeneralizedTime,
        //     revocationReason    [0] EXPLICIT CRLReason OPTIONAL
        // }
        let mut items = element.children();
        let revocation_time = items
            .next_element("revocationTime")?
            .to_time("revocationTime")?;
        let reason = match items.next_if_context(0, "revocationReason")? {
            Some(tagged) => {
                let code = tagged
                    .unwrap_explicit("revocationReason")?
                    .require(TAG_ENUMERATED, "revocationReason")?
                    .to_u32("revocationReason")?;
                u8::try_from(code).ok()
            }
            None => None,
        };
        Ok(CertificateStatus::Revoked {
            revocation_time,
            reason,
        })
    } else if element.is_context(2) {
        Ok(CertificateStatus::Unknown)
    } else if element.any.header.class() == Class::ContextSpecific {
        Ok(CertificateStatus::Unrecognized(element.any.header.tag().0))
    } else {
        Err(OcspError::Protocol(format!(
            "certStatus has unexpected tag {}",
            element.any.header.tag().0
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::der;
    use chrono::TimeZone;

    fn identity() -> CertificateIdentity {
        CertificateIdentity::from_parts(vec![0x01; 20], vec![0x02; 20], &[0x07])
    }

    fn produced_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn single(status: Vec<u8>) -> Vec<u8> {
        der::sequence(&[identity().to_der(), status, der::generalized_time(produced_at())].concat())
    }

    fn basic(responder: Vec<u8>, singles: &[Vec<u8>], extensions: Option<Vec<u8>>) -> Vec<u8> {
        let mut tbs = [
            responder,
            der::generalized_time(produced_at()),
            der::sequence(&singles.concat()),
        ]
        .concat();
        if let Some(ext) = extensions {
            tbs.extend_from_slice(&der::explicit_context(1, &ext));
        }
        der::sequence(
            &[
                der::sequence(&tbs),
                der::sequence(&[der::oid(&[1, 2, 840, 10045, 4, 3, 2])].concat()),
                der::bit_string(&[0xAB; 8]),
            ]
            .concat(),
        )
    }

    fn wrap(basic: &[u8]) -> Vec<u8> {
        let response_bytes = der::sequence(
            &[der::oid(&[1, 3, 6, 1, 5, 5, 7, 48, 1, 1]), der::octet_string(basic)].concat(),
        );
        der::sequence(&[der::enumerated(0), der::explicit_context(0, &response_bytes)].concat())
    }

    fn by_name() -> Vec<u8> {
        // Name with a single CN attribute
        let cn = der::sequence(&[der::oid(&[2, 5, 4, 3]), der::tlv(0x0C, b"TEST OCSP")].concat());
        der::explicit_context(1, &der::sequence(&der::tlv(0x31, &cn)))
    }

    #[test]
    fn test_ocsp_response_status_conversion() {
        assert_eq!(
            OcspResponseStatus::from_u32(0),
            Some(OcspResponseStatus::Successful)
        );
        assert_eq!(
            OcspResponseStatus::from_u32(6),
            Some(OcspResponseStatus::Unauthorized)
        );
        assert_eq!(OcspResponseStatus::from_u32(4), None);
        assert_eq!(OcspResponseStatus::from_u32(99), None);
    }

    #[test]
    fn test_parse_good_response() {
        let nonce_ext = der::sequence(
            &der::sequence(
                &[
                    der::oid(&[1, 3, 6, 1, 5, 5, 7, 48, 1, 2]),
                    der::octet_string(&der::octet_string(&[0x55; 16])),
                ]
                .concat(),
            ),
        );
        let basic = basic(
            by_name(),
            &[single(der::implicit_context(0, &[]))],
            Some(nonce_ext),
        );
        let parsed = ParsedResponse::parse(&wrap(&basic)).unwrap();

        assert!(matches!(parsed.responder_id, ResponderId::ByName(_)));
        assert_eq!(parsed.produced_at, produced_at());
        assert_eq!(parsed.responses.len(), 1);
        assert_eq!(parsed.responses[0].cert_id, identity());
        assert_eq!(parsed.responses[0].status, CertificateStatus::Good);
        assert_eq!(parsed.signature, vec![0xAB; 8]);
        assert_eq!(parsed.signature_algorithm.to_id_string(), "1.2.840.10045.4.3.2");

        let nonce = parsed
            .extension(&crate::nonce::OCSP_NONCE_OID)
            .unwrap();
        assert!(!nonce.critical);
        assert_eq!(nonce.value, der::octet_string(&[0x55; 16]));
    }

    #[test]
    fn test_tbs_response_data_is_exact_signed_bytes() {
        let basic = basic(by_name(), &[single(der::implicit_context(0, &[]))], None);
        let parsed = ParsedResponse::parse_basic(&basic).unwrap();

        let tbs = der::sequence(
            &[
                by_name(),
                der::generalized_time(produced_at()),
                der::sequence(&single(der::implicit_context(0, &[]))),
            ]
            .concat(),
        );
        assert_eq!(parsed.tbs_response_data, tbs);
        assert!(basic.windows(tbs.len()).any(|window| window == tbs.as_slice()));
    }

    #[test]
    fn test_parse_revoked_with_reason() {
        let revoked_at = Utc.with_ymd_and_hms(2023, 12, 24, 18, 0, 0).unwrap();
        let revoked_info = [
            der::generalized_time(revoked_at),
            der::explicit_context(0, &der::enumerated(1)),
        ]
        .concat();
        let basic = basic(by_name(), &[single(der::tlv(0xA1, &revoked_info))], None);
        let parsed = ParsedResponse::parse_basic(&basic).unwrap();

        assert_eq!(
            parsed.responses[0].status,
            CertificateStatus::Revoked {
                revocation_time: revoked_at,
                reason: Some(1),
            }
        );
    }

    #[test]
    fn test_parse_unknown_and_unrecognized_status() {
        let basic = basic(
            by_name(),
            &[
                single(der::implicit_context(2, &[])),
                single(der::implicit_context(5, &[])),
            ],
            None,
        );
        let parsed = ParsedResponse::parse_basic(&basic).unwrap();

        assert_eq!(parsed.responses[0].status, CertificateStatus::Unknown);
        assert_eq!(parsed.responses[1].status, CertificateStatus::Unrecognized(5));
    }

    #[test]
    fn test_parse_responder_by_key() {
        let responder = der::explicit_context(2, &der::octet_string(&[0x33; 20]));
        let basic = basic(responder, &[single(der::implicit_context(0, &[]))], None);
        let parsed = ParsedResponse::parse_basic(&basic).unwrap();

        assert_eq!(parsed.responder_id, ResponderId::ByKey(vec![0x33; 20]));
    }

    #[test]
    fn test_non_successful_status_is_protocol_error() {
        let response = der::sequence(&der::enumerated(3));
        let err = ParsedResponse::parse(&response).unwrap_err();

        assert!(matches!(err, OcspError::Protocol(ref msg) if msg.contains("TryLater")));
    }

    #[test]
    fn test_missing_response_bytes() {
        let response = der::sequence(&der::enumerated(0));
        assert!(matches!(
            ParsedResponse::parse(&response),
            Err(OcspError::Protocol(_))
        ));
    }

    #[test]
    fn test_unsupported_response_type() {
        let response_bytes = der::sequence(
            &[der::oid(&[1, 2, 3, 4]), der::octet_string(&[0x30, 0x00])].concat(),
        );
        let response =
            der::sequence(&[der::enumerated(0), der::explicit_context(0, &response_bytes)].concat());

        let err = ParsedResponse::parse(&response).unwrap_err();
        assert!(matches!(err, OcspError::Protocol(ref msg) if msg.contains("1.2.3.4")));
    }

    #[test]
    fn test_garbage_is_protocol_error() {
        for bytes in [&b""[..], &b"<html>503</html>"[..], &[0x30, 0x05, 0x0A][..]] {
            assert!(matches!(
                ParsedResponse::parse(bytes),
                Err(OcspError::Protocol(_))
            ));
        }
    }
}
