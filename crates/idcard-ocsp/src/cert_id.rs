//! OCSP CertID construction (RFC 6960 Section 4.1.1)
//!
//! ```asn1
//! CertID ::= SEQUENCE {
//!     hashAlgorithm       AlgorithmIdentifier,
//!     issuerNameHash      OCTET STRING,
//!     issuerKeyHash       OCTET STRING,
//!     serialNumber        CertificateSerialNumber
//! }
//! ```
//!
//! The identity is always derived with SHA-1, the digest every OCSP profile
//! in use for smart-card certificates requires.

use crate::der::{self, Element, TAG_INTEGER, TAG_OCTET_STRING, TAG_SEQUENCE};
use crate::error::OcspError;
use sha1::{Digest, Sha1};
use std::fmt;
use x509_parser::oid_registry::asn1_rs::{oid, Oid};
use x509_parser::prelude::*;

const SHA1_OID: Oid<'static> = oid!(1.3.14.3.2.26);

/// Identifier matching an OCSP request entry to its single response
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CertificateIdentity {
    hash_algorithm: Oid<'static>,
    issuer_name_hash: Vec<u8>,
    issuer_key_hash: Vec<u8>,
    serial_number: Vec<u8>,
}

impl CertificateIdentity {
    /// Derive the identity of `subject` as issued by `issuer`
    ///
    /// Both certificates are DER-encoded. The name hash covers the DER of the
    /// issuer's subject Name, the key hash covers the issuer's
    /// subjectPublicKey BIT STRING value.
    pub fn for_certificates(subject: &[u8], issuer: &[u8]) -> Result<Self, OcspError> {
        let (_, subject_cert) = parse_x509_certificate(subject).map_err(|e| {
            OcspError::Configuration(format!("Failed to parse subject certificate: {}", e))
        })?;
        let (_, issuer_cert) = parse_x509_certificate(issuer).map_err(|e| {
            OcspError::Configuration(format!("Failed to parse issuer certificate: {}", e))
        })?;

        Ok(Self::from_parts(
            Sha1::digest(issuer_cert.subject().as_raw()).to_vec(),
            Sha1::digest(&*issuer_cert.public_key().subject_public_key.data).to_vec(),
            subject_cert.raw_serial(),
        ))
    }

    /// Build an identity from precomputed SHA-1 hashes and a serial number
    pub fn from_parts(issuer_name_hash: Vec<u8>, issuer_key_hash: Vec<u8>, serial: &[u8]) -> Self {
        Self {
            hash_algorithm: SHA1_OID,
            issuer_name_hash,
            issuer_key_hash,
            serial_number: der::strip_leading_zeros(serial).to_vec(),
        }
    }

    pub fn issuer_name_hash(&self) -> &[u8] {
        &self.issuer_name_hash
    }

    pub fn issuer_key_hash(&self) -> &[u8] {
        &self.issuer_key_hash
    }

    /// Serial number magnitude without leading zero octets
    pub fn serial_number(&self) -> &[u8] {
        &self.serial_number
    }

    /// Dotted form of the hash algorithm OID
    pub fn hash_algorithm(&self) -> String {
        self.hash_algorithm.to_id_string()
    }

    /// DER encoding of the CertID
    pub fn to_der(&self) -> Vec<u8> {
        let hash_algo = der::sequence(
            &[
                der::tlv(0x06, self.hash_algorithm.as_bytes()),
                der::null(),
            ]
            .concat(),
        );

        der::sequence(
            &[
                hash_algo,
                der::octet_string(&self.issuer_name_hash),
                der::octet_string(&self.issuer_key_hash),
                der::integer(&self.serial_number),
            ]
            .concat(),
        )
    }

    /// Decode a CertID as carried in requests and single responses
    pub(crate) fn from_element(element: Element<'_>) -> Result<Self, OcspError> {
        let cert_id = element.require(TAG_SEQUENCE, "CertID")?;
        let mut items = cert_id.children();

        let algorithm = items
            .next_element("CertID hashAlgorithm")?
            .require(TAG_SEQUENCE, "CertID hashAlgorithm")?;
        let hash_algorithm = algorithm
            .children()
            .next_element("hashAlgorithm OID")?
            .to_oid("hashAlgorithm")?;

        let issuer_name_hash = items
            .next_element("issuerNameHash")?
            .require(TAG_OCTET_STRING, "issuerNameHash")?
            .data()
            .to_vec();
        let issuer_key_hash = items
            .next_element("issuerKeyHash")?
            .require(TAG_OCTET_STRING, "issuerKeyHash")?
            .data()
            .to_vec();
        let serial = items
            .next_element("serialNumber")?
            .require(TAG_INTEGER, "serialNumber")?;

        Ok(Self {
            hash_algorithm,
            issuer_name_hash,
            issuer_key_hash,
            serial_number: der::strip_leading_zeros(serial.data()).to_vec(),
        })
    }
}

impl fmt::Debug for CertificateIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateIdentity")
            .field("hash_algorithm", &self.hash_algorithm.to_id_string())
            .field("issuer_name_hash", &hex::encode(&self.issuer_name_hash))
            .field("issuer_key_hash", &hex::encode(&self.issuer_key_hash))
            .field("serial_number", &hex::encode(&self.serial_number))
            .finish()
    }
}
