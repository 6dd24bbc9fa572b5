//! Minimal DER encoding and decoding helpers
//!
//! Encoding builds the handful of RFC 6960 structures this crate emits.
//! Decoding walks TLV elements with `asn1-rs` and keeps the raw encoding of
//! each element so signed content can be verified byte-for-byte.

use crate::error::OcspError;
use chrono::{DateTime, TimeZone, Utc};
use std::borrow::Cow;
use x509_parser::oid_registry::asn1_rs::{Any, Class, FromDer, Oid};

pub const TAG_BOOLEAN: u32 = 1;
pub const TAG_INTEGER: u32 = 2;
pub const TAG_BIT_STRING: u32 = 3;
pub const TAG_OCTET_STRING: u32 = 4;
pub const TAG_NULL: u32 = 5;
pub const TAG_OID: u32 = 6;
pub const TAG_ENUMERATED: u32 = 10;
pub const TAG_SEQUENCE: u32 = 16;
pub const TAG_GENERALIZED_TIME: u32 = 24;

// ============================================================================
// Encoding
// ============================================================================

/// Encode a SEQUENCE
pub fn sequence(contents: &[u8]) -> Vec<u8> {
    tlv(0x30, contents)
}

/// Encode an OCTET STRING
pub fn octet_string(contents: &[u8]) -> Vec<u8> {
    tlv(0x04, contents)
}

/// Encode a BOOLEAN
pub fn boolean(value: bool) -> Vec<u8> {
    tlv(0x01, &[if value { 0xFF } else { 0x00 }])
}

/// Encode an unsigned big-endian INTEGER
pub fn integer(value: &[u8]) -> Vec<u8> {
    let mut int_value = strip_leading_zeros(value).to_vec();
    if int_value.first().is_some_and(|b| b & 0x80 != 0) {
        int_value.insert(0, 0x00);
    }
    tlv(0x02, &int_value)
}

/// Encode a small ENUMERATED value
pub fn enumerated(value: u8) -> Vec<u8> {
    if value & 0x80 != 0 {
        tlv(0x0A, &[0x00, value])
    } else {
        tlv(0x0A, &[value])
    }
}

/// Encode a BIT STRING with no unused bits
pub fn bit_string(contents: &[u8]) -> Vec<u8> {
    let mut value = Vec::with_capacity(contents.len() + 1);
    value.push(0x00);
    value.extend_from_slice(contents);
    tlv(0x03, &value)
}

/// Encode an OBJECT IDENTIFIER from its arcs
pub fn oid(components: &[u64]) -> Vec<u8> {
    if components.len() < 2 {
        return tlv(0x06, &[]);
    }

    // First two arcs share one subidentifier
    let mut encoded = encode_base128(40 * components[0] + components[1]);
    for &component in &components[2..] {
        encoded.extend_from_slice(&encode_base128(component));
    }

    tlv(0x06, &encoded)
}

/// Encode NULL
pub fn null() -> Vec<u8> {
    vec![0x05, 0x00]
}

/// Encode a GeneralizedTime with second precision
pub fn generalized_time(time: DateTime<Utc>) -> Vec<u8> {
    tlv(0x18, time.format("%Y%m%d%H%M%SZ").to_string().as_bytes())
}

/// Encode a context-specific constructed (EXPLICIT) tag
pub fn explicit_context(tag: u8, contents: &[u8]) -> Vec<u8> {
    tlv(0xA0 | tag, contents)
}

/// Encode a context-specific primitive (IMPLICIT) tag
pub fn implicit_context(tag: u8, contents: &[u8]) -> Vec<u8> {
    tlv(0x80 | tag, contents)
}

/// Encode Tag-Length-Value
pub fn tlv(tag: u8, contents: &[u8]) -> Vec<u8> {
    let mut result = vec![tag];
    result.extend_from_slice(&length(contents.len()));
    result.extend_from_slice(contents);
    result
}

fn length(length: usize) -> Vec<u8> {
    if length < 128 {
        return vec![length as u8];
    }

    let mut length_bytes = Vec::new();
    let mut len = length;
    while len > 0 {
        length_bytes.insert(0, (len & 0xFF) as u8);
        len >>= 8;
    }
    let mut result = vec![0x80 | length_bytes.len() as u8];
    result.extend_from_slice(&length_bytes);
    result
}

fn encode_base128(mut value: u64) -> Vec<u8> {
    let mut result = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        result.insert(0, (value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    result
}

/// Drop redundant leading zero octets, keeping at least one
pub fn strip_leading_zeros(value: &[u8]) -> &[u8] {
    let first_nonzero = value.iter().position(|&b| b != 0);
    match first_nonzero {
        Some(idx) => &value[idx..],
        None if value.is_empty() => value,
        None => &value[value.len() - 1..],
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// One decoded TLV element together with its full encoding
#[derive(Debug, Clone)]
pub(crate) struct Element<'a> {
    pub any: Any<'a>,
    pub raw: &'a [u8],
}

impl<'a> Element<'a> {
    /// Decode exactly one element, rejecting trailing bytes
    pub fn parse_exact(input: &'a [u8], what: &str) -> Result<Self, OcspError> {
        let (element, rest) = Self::parse(input, what)?;
        if !rest.is_empty() {
            return Err(OcspError::Protocol(format!(
                "{} followed by {} trailing bytes",
                what,
                rest.len()
            )));
        }
        Ok(element)
    }

    /// Decode the first element of `input`, returning the remaining bytes
    pub fn parse(input: &'a [u8], what: &str) -> Result<(Self, &'a [u8]), OcspError> {
        let (rest, any) = Any::from_der(input)
            .map_err(|e| OcspError::Protocol(format!("Failed to parse {}: {:?}", what, e)))?;
        let raw = &input[..input.len() - rest.len()];
        Ok((Self { any, raw }, rest))
    }

    pub fn data(&self) -> &'a [u8] {
        self.any.data
    }

    pub fn is_universal(&self, tag: u32) -> bool {
        self.any.header.class() == Class::Universal && self.any.header.tag().0 == tag
    }

    pub fn is_context(&self, tag: u32) -> bool {
        self.any.header.class() == Class::ContextSpecific && self.any.header.tag().0 == tag
    }

    /// Require a universal tag
    pub fn require(self, tag: u32, what: &str) -> Result<Self, OcspError> {
        if self.is_universal(tag) {
            Ok(self)
        } else {
            Err(OcspError::Protocol(format!(
                "{} has unexpected tag {:?}/{}",
                what,
                self.any.header.class(),
                self.any.header.tag().0
            )))
        }
    }

    /// Iterate over the children of a constructed element
    pub fn children(&self) -> Items<'a> {
        Items {
            rest: self.any.data,
        }
    }

    /// Decode the single element wrapped by an EXPLICIT tag
    pub fn unwrap_explicit(&self, what: &str) -> Result<Element<'a>, OcspError> {
        Element::parse_exact(self.any.data, what)
    }

    pub fn to_oid(&self, what: &str) -> Result<Oid<'static>, OcspError> {
        if !self.is_universal(TAG_OID) || self.any.data.is_empty() {
            return Err(OcspError::Protocol(format!("{} is not an OID", what)));
        }
        Ok(Oid::new(Cow::Owned(self.any.data.to_vec())))
    }

    pub fn to_bool(&self, what: &str) -> Result<bool, OcspError> {
        match (self.is_universal(TAG_BOOLEAN), self.any.data) {
            (true, [0x00]) => Ok(false),
            (true, [0xFF]) => Ok(true),
            _ => Err(OcspError::Protocol(format!("{} is not a DER BOOLEAN", what))),
        }
    }

    /// Small non-negative INTEGER or ENUMERATED value
    pub fn to_u32(&self, what: &str) -> Result<u32, OcspError> {
        let bytes = self.any.data;
        if bytes.is_empty() || bytes.len() > 5 || bytes[0] & 0x80 != 0 {
            return Err(OcspError::Protocol(format!("{} is out of range", what)));
        }
        let value = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        u32::try_from(value).map_err(|_| OcspError::Protocol(format!("{} is out of range", what)))
    }

    pub fn to_time(&self, what: &str) -> Result<DateTime<Utc>, OcspError> {
        if !self.is_universal(TAG_GENERALIZED_TIME) {
            return Err(OcspError::Protocol(format!("{} is not a GeneralizedTime", what)));
        }
        let text = std::str::from_utf8(self.any.data)
            .map_err(|_| OcspError::Protocol(format!("{} is not ASCII", what)))?;
        parse_generalized_time(text)
    }

    /// BIT STRING payload, requiring zero unused bits
    pub fn to_bit_string(&self, what: &str) -> Result<&'a [u8], OcspError> {
        match self.any.data.split_first() {
            Some((&0, bits)) if self.is_universal(TAG_BIT_STRING) => Ok(bits),
            _ => Err(OcspError::Protocol(format!(
                "{} is not an octet-aligned BIT STRING",
                what
            ))),
        }
    }
}

/// Sequential reader over the children of a constructed element
#[derive(Debug, Clone)]
pub(crate) struct Items<'a> {
    rest: &'a [u8],
}

impl<'a> Items<'a> {
    /// Next mandatory element
    pub fn next_element(&mut self, what: &str) -> Result<Element<'a>, OcspError> {
        if self.rest.is_empty() {
            return Err(OcspError::Protocol(format!("missing {}", what)));
        }
        let (element, rest) = Element::parse(self.rest, what)?;
        self.rest = rest;
        Ok(element)
    }

    /// Consume the next element only if it carries context tag `[tag]`
    pub fn next_if_context(
        &mut self,
        tag: u32,
        what: &str,
    ) -> Result<Option<Element<'a>>, OcspError> {
        if self.rest.is_empty() {
            return Ok(None);
        }
        let (element, rest) = Element::parse(self.rest, what)?;
        if element.is_context(tag) {
            self.rest = rest;
            Ok(Some(element))
        } else {
            Ok(None)
        }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }
}

impl<'a> Iterator for Items<'a> {
    type Item = Result<Element<'a>, OcspError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            None
        } else {
            let result = self.next_element("element");
            if result.is_err() {
                self.rest = &[];
            }
            Some(result)
        }
    }
}

/// Parse ASN.1 GeneralizedTime (`YYYYMMDDHHMMSS[.fff]Z`) to UTC
pub fn parse_generalized_time(time_str: &str) -> Result<DateTime<Utc>, OcspError> {
    let naive = chrono::NaiveDateTime::parse_from_str(time_str, "%Y%m%d%H%M%SZ")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(time_str, "%Y%m%d%H%M%S%.fZ"))
        .map_err(|e| {
            OcspError::Protocol(format!(
                "Failed to parse GeneralizedTime '{}': {}",
                time_str, e
            ))
        })?;

    Ok(Utc.from_utc_datetime(&naive))
}
