//! Shared fixtures: a locally generated PKI and an in-process OCSP responder

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use idcard_ocsp::der;
use idcard_ocsp::{
    CertificateIdentity, DecodedRequest, Nonce, OcspConfiguration, OcspError, OcspRequestBuilder,
    OcspTransport,
};
use rcgen::{
    date_time_ymd, BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    SerialNumber,
};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};
use std::sync::Mutex;
use x509_parser::prelude::*;

pub const RESPONDER_CN: &str = "TEST of SK OCSP RESPONDER 2020";
pub const CLOCK_SKEW_SECS: u64 = 60;
pub const RESPONSE_LIFETIME_SECS: u64 = 900;

/// Issuer CA, an end-entity certificate and an OCSP responder certificate
pub struct Pki {
    pub issuer: Vec<u8>,
    pub subject: Vec<u8>,
    pub responder_certificate: Vec<u8>,
    /// PKCS#8 of the responder signing key
    pub responder_key: Vec<u8>,
}

impl Pki {
    pub fn generate() -> Self {
        Self::generate_with_responder_validity(None)
    }

    /// Responder certificate valid from `not_before` to `not_after` as (y, m, d)
    pub fn generate_with_responder_validity(
        validity: Option<((i32, u8, u8), (i32, u8, u8))>,
    ) -> Self {
        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.distinguished_name = DistinguishedName::new();
        ca_params
            .distinguished_name
            .push(DnType::CommonName, "TEST of ESTEID2018");
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let subject_key = KeyPair::generate().unwrap();
        let mut subject_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        subject_params.distinguished_name = DistinguishedName::new();
        subject_params
            .distinguished_name
            .push(DnType::CommonName, "JÕEORG,JAAK-KRISTJAN,38001085718");
        subject_params.serial_number = Some(SerialNumber::from_slice(&[0x00, 0x9E, 0x21, 0x47]));
        let subject = subject_params
            .signed_by(&subject_key, &ca_cert, &ca_key)
            .unwrap();

        let responder_key = KeyPair::generate().unwrap();
        let mut responder_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        responder_params.distinguished_name = DistinguishedName::new();
        responder_params
            .distinguished_name
            .push(DnType::CommonName, RESPONDER_CN);
        if let Some(((by, bm, bd), (ay, am, ad))) = validity {
            responder_params.not_before = date_time_ymd(by, bm, bd);
            responder_params.not_after = date_time_ymd(ay, am, ad);
        }
        let responder = responder_params
            .signed_by(&responder_key, &ca_cert, &ca_key)
            .unwrap();

        Pki {
            issuer: ca_cert.der().to_vec(),
            subject: subject.der().to_vec(),
            responder_certificate: responder.der().to_vec(),
            responder_key: responder_key.serialize_der(),
        }
    }

    /// Configuration trusting this PKI's responder
    pub fn config(&self) -> OcspConfiguration {
        OcspConfiguration::new("http://ocsp.test.invalid/ocsp")
            .with_trusted_certificate(self.responder_certificate.clone())
            .unwrap()
            .with_clock_skew(CLOCK_SKEW_SECS)
            .with_response_lifetime(RESPONSE_LIFETIME_SECS)
    }

    pub fn identity(&self) -> CertificateIdentity {
        CertificateIdentity::for_certificates(&self.subject, &self.issuer).unwrap()
    }

    pub fn responder(&self) -> TestResponder {
        let (_, cert) = parse_x509_certificate(&self.responder_certificate).unwrap();
        TestResponder {
            signing_key: self.responder_key.clone(),
            responder_name: cert.subject().as_raw().to_vec(),
            embedded_certificate: self.responder_certificate.clone(),
            status: Status::Good,
            produced_at: None,
            nonce: NonceMode::Echo,
            serial_override: None,
            by_key: false,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Good,
    Revoked,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonceMode {
    /// Copy the request nonce extension value
    Echo,
    /// Leave the nonce extension out
    Omit,
    /// Put these bytes in the nonce extension instead
    Replace(Vec<u8>),
    /// Echo the request nonce with its last byte flipped
    FlipLastByte,
}

/// OCSP responder answering in-process
pub struct TestResponder {
    signing_key: Vec<u8>,
    responder_name: Vec<u8>,
    embedded_certificate: Vec<u8>,
    pub status: Status,
    /// Fixed producedAt, `None` for the current time
    pub produced_at: Option<DateTime<Utc>>,
    pub nonce: NonceMode,
    /// Answer for this serial instead of the requested one
    pub serial_override: Option<Vec<u8>>,
    /// Identify by key hash instead of by name
    pub by_key: bool,
    pub requests: Mutex<Vec<DecodedRequest>>,
}

impl TestResponder {
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_nonce(mut self, nonce: NonceMode) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn produced_at(mut self, produced_at: DateTime<Utc>) -> Self {
        self.produced_at = Some(produced_at);
        self
    }

    /// Sign with a different key and embed a certificate for it
    pub fn signed_by(mut self, other: &Pki) -> Self {
        self.signing_key = other.responder_key.clone();
        self.embedded_certificate = other.responder_certificate.clone();
        self
    }

    pub fn recorded_requests(&self) -> Vec<DecodedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Answer a request for `pki`'s subject made outside any validator
    pub fn exchange_once(&self, pki: &Pki) -> Vec<u8> {
        let request = OcspRequestBuilder::new(pki.identity())
            .with_nonce(Nonce::generate())
            .build();
        self.respond(&request).unwrap()
    }

    fn respond(&self, request: &[u8]) -> Result<Vec<u8>, OcspError> {
        let decoded = DecodedRequest::parse(request)?;
        let requested = decoded
            .identities
            .first()
            .cloned()
            .ok_or_else(|| OcspError::Protocol("empty requestList".to_string()))?;
        let identity = match &self.serial_override {
            Some(serial) => CertificateIdentity::from_parts(
                requested.issuer_name_hash().to_vec(),
                requested.issuer_key_hash().to_vec(),
                serial,
            ),
            None => requested,
        };

        let produced_at = self
            .produced_at
            .unwrap_or_else(|| Utc::now() - Duration::seconds(1));

        let cert_status = match self.status {
            Status::Good => der::implicit_context(0, &[]),
            Status::Revoked => der::tlv(
                0xA1,
                &[
                    der::generalized_time(produced_at - Duration::days(1)),
                    der::explicit_context(0, &der::enumerated(1)),
                ]
                .concat(),
            ),
            Status::Unknown => der::implicit_context(2, &[]),
        };
        let single = der::sequence(
            &[
                identity.to_der(),
                cert_status,
                der::generalized_time(produced_at),
                der::explicit_context(0, &der::generalized_time(produced_at + Duration::hours(12))),
            ]
            .concat(),
        );

        let responder_id = if self.by_key {
            der::explicit_context(2, &der::octet_string(&[0x42; 20]))
        } else {
            der::explicit_context(1, &self.responder_name)
        };

        let mut tbs = [
            responder_id,
            der::generalized_time(produced_at),
            der::sequence(&single),
        ]
        .concat();

        let nonce_value = match &self.nonce {
            NonceMode::Echo => decoded.nonce().map(|ext| ext.value.clone()),
            NonceMode::Omit => None,
            NonceMode::Replace(bytes) => Some(der::octet_string(bytes)),
            NonceMode::FlipLastByte => decoded.nonce().map(|ext| {
                let mut value = ext.value.clone();
                if let Some(last) = value.last_mut() {
                    *last ^= 0x01;
                }
                value
            }),
        };
        if let Some(value) = nonce_value {
            let extension = der::sequence(
                &[
                    der::oid(&[1, 3, 6, 1, 5, 5, 7, 48, 1, 2]),
                    der::octet_string(&value),
                ]
                .concat(),
            );
            tbs.extend_from_slice(&der::explicit_context(1, &der::sequence(&extension)));
        }
        let tbs_response_data = der::sequence(&tbs);

        let rng = SystemRandom::new();
        let key = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &self.signing_key, &rng)
            .map_err(|e| OcspError::Protocol(format!("bad test key: {}", e)))?;
        let signature = key
            .sign(&rng, &tbs_response_data)
            .map_err(|e| OcspError::Protocol(format!("signing failed: {}", e)))?;

        let basic = der::sequence(
            &[
                tbs_response_data,
                der::sequence(&der::oid(&[1, 2, 840, 10045, 4, 3, 2])),
                der::bit_string(signature.as_ref()),
                der::explicit_context(0, &der::sequence(&self.embedded_certificate)),
            ]
            .concat(),
        );

        self.requests.lock().unwrap().push(decoded);
        Ok(ocsp_response(&basic))
    }
}

impl OcspTransport for TestResponder {
    fn exchange(&self, _url: &str, request: &[u8]) -> Result<Vec<u8>, OcspError> {
        self.respond(request)
    }
}

/// Wrap a BasicOCSPResponse in a successful OCSPResponse
pub fn ocsp_response(basic: &[u8]) -> Vec<u8> {
    let response_bytes = der::sequence(
        &[
            der::oid(&[1, 3, 6, 1, 5, 5, 7, 48, 1, 1]),
            der::octet_string(basic),
        ]
        .concat(),
    );
    der::sequence(&[der::enumerated(0), der::explicit_context(0, &response_bytes)].concat())
}
