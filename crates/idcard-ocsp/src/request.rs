//! OCSP request building (RFC 6960 Section 4.1)
//!
//! ```asn1
//! OCSPRequest ::= SEQUENCE {
//!     tbsRequest          TBSRequest,
//!     optionalSignature   [0] EXPLICIT Signature OPTIONAL
//! }
//!
//! TBSRequest ::= SEQUENCE {
//!     version             [0] EXPLICIT Version DEFAULT v1,
//!     requestorName       [1] EXPLICIT GeneralName OPTIONAL,
//!     requestList         SEQUENCE OF Request,
//!     requestExtensions   [2] EXPLICIT Extensions OPTIONAL
//! }
//!
//! Request ::= SEQUENCE {
//!     reqCert                     CertID,
//!     singleRequestExtensions     [0] EXPLICIT Extensions OPTIONAL
//! }
//! ```
//!
//! Requests are unsigned and cover a single certificate.

use crate::cert_id::CertificateIdentity;
use crate::der::{self, Element, TAG_OCTET_STRING, TAG_SEQUENCE};
use crate::error::OcspError;
use crate::nonce::{Nonce, OCSP_NONCE_OID};
use crate::response::Extension;

/// Builds a DER-encoded single-certificate OCSP request
#[derive(Debug, Clone)]
pub struct OcspRequestBuilder {
    identity: CertificateIdentity,
    nonce: Option<Nonce>,
}

impl OcspRequestBuilder {
    pub fn new(identity: CertificateIdentity) -> Self {
        Self {
            identity,
            nonce: None,
        }
    }

    /// Attach a nonce as a critical request extension
    pub fn with_nonce(mut self, nonce: Nonce) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Build the OCSPRequest from the inside out
    pub fn build(&self) -> Vec<u8> {
        let request = der::sequence(&self.identity.to_der());
        let request_list = der::sequence(&request);

        let mut tbs_content = request_list;
        if let Some(ref nonce) = self.nonce {
            tbs_content.extend_from_slice(&der::explicit_context(2, &nonce_extensions(nonce)));
        }
        let tbs_request = der::sequence(&tbs_content);

        // Unsigned: no optionalSignature
        der::sequence(&tbs_request)
    }
}

/// Extensions ::= SEQUENCE OF Extension, holding only the critical nonce
fn nonce_extensions(nonce: &Nonce) -> Vec<u8> {
    let extension = der::sequence(
        &[
            der::tlv(0x06, OCSP_NONCE_OID.as_bytes()),
            der::boolean(true),
            der::octet_string(&nonce.extension_value()),
        ]
        .concat(),
    );
    der::sequence(&extension)
}

/// Decoded view of an OCSP request
///
/// Responder-side counterpart of [`OcspRequestBuilder`], used to inspect
/// what was put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRequest {
    /// CertIDs from the requestList, in order
    pub identities: Vec<CertificateIdentity>,
    /// requestExtensions, in order
    pub extensions: Vec<Extension>,
}

impl DecodedRequest {
    /// Decode a DER OCSPRequest
    pub fn parse(der_bytes: &[u8]) -> Result<Self, OcspError> {
        let request =
            Element::parse_exact(der_bytes, "OCSPRequest")?.require(TAG_SEQUENCE, "OCSPRequest")?;
        let tbs = request
            .children()
            .next_element("tbsRequest")?
            .require(TAG_SEQUENCE, "tbsRequest")?;

        let mut items = tbs.children();
        items.next_if_context(0, "version")?;
        items.next_if_context(1, "requestorName")?;

        let request_list = items
            .next_element("requestList")?
            .require(TAG_SEQUENCE, "requestList")?;
        let mut identities = Vec::new();
        for entry in request_list.children() {
            let entry = entry?.require(TAG_SEQUENCE, "Request")?;
            let cert_id = entry.children().next_element("reqCert")?;
            identities.push(CertificateIdentity::from_element(cert_id)?);
        }

        let extensions = match items.next_if_context(2, "requestExtensions")? {
            Some(tagged) => Extension::parse_list(tagged.unwrap_explicit("requestExtensions")?)?,
            None => Vec::new(),
        };

        Ok(Self {
            identities,
            extensions,
        })
    }

    /// The nonce extension, if present
    pub fn nonce(&self) -> Option<&Extension> {
        self.extensions.iter().find(|ext| ext.oid == OCSP_NONCE_OID)
    }

    /// Raw nonce bytes inside the nonce extension's OCTET STRING wrapper
    pub fn nonce_bytes(&self) -> Option<Vec<u8>> {
        let extension = self.nonce()?;
        let inner = Element::parse_exact(&extension.value, "nonce").ok()?;
        inner
            .is_universal(TAG_OCTET_STRING)
            .then(|| inner.data().to_vec())
    }
}
