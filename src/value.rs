//! SNMP value types.
//!
//! The `Value` enum represents all SNMP data types including exceptions.
//! Its `Display` form is the printable rendering probes match and report
//! on; [`Value::as_octets`] is the raw form used for opaque payloads.

use std::fmt::{self, Write as _};

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::internal::{DecodeErrorKind, WireError, WireResult};
use crate::oid::Oid;
use bytes::Bytes;

/// SNMP value.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
    /// INTEGER (ASN.1 primitive, signed 32-bit)
    Integer(i32),

    /// OCTET STRING (arbitrary bytes).
    OctetString(Bytes),

    /// NULL
    Null,

    /// OBJECT IDENTIFIER
    ObjectIdentifier(Oid),

    /// IpAddress (4 bytes, big-endian)
    IpAddress([u8; 4]),

    /// Counter32 (unsigned 32-bit, wrapping)
    Counter32(u32),

    /// Gauge32 / Unsigned32 (unsigned 32-bit, non-wrapping)
    Gauge32(u32),

    /// TimeTicks (hundredths of seconds)
    TimeTicks(u32),

    /// Opaque (arbitrary bytes, commonly a nested BER value such as a float)
    Opaque(Bytes),

    /// Counter64 (unsigned 64-bit, wrapping). SNMPv2c/v3 only.
    Counter64(u64),

    /// noSuchObject exception
    NoSuchObject,

    /// noSuchInstance exception
    NoSuchInstance,

    /// endOfMibView exception, the normal end of a GETNEXT walk
    EndOfMibView,

    /// Unknown/unrecognized value type (for forward compatibility)
    Unknown { tag: u8, data: Bytes },
}

impl Value {
    /// Whether this is one of the three v2 exception values.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    /// Try to get as i32.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as u64 (any unsigned numeric type widens).
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(u64::from(*v)),
            Value::Counter64(v) => Some(*v),
            Value::Integer(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Try to get as UTF-8 text (OCTET STRING only).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::OctetString(data) => std::str::from_utf8(data).ok(),
            _ => None,
        }
    }

    /// Raw octets of the value.
    ///
    /// String-like types (OCTET STRING, Opaque, IpAddress, unknown tags)
    /// yield their content bytes unchanged. Other types have no octet form
    /// of their own and yield the bytes of their printable rendering.
    pub fn as_octets(&self) -> Bytes {
        match self {
            Value::OctetString(data) | Value::Opaque(data) | Value::Unknown { data, .. } => {
                data.clone()
            }
            Value::IpAddress(addr) => Bytes::copy_from_slice(addr),
            other => Bytes::from(other.to_string()),
        }
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            Value::Integer(v) => buf.push_integer(*v),
            Value::OctetString(data) => buf.push_octet_string(data),
            Value::Null => buf.push_null(),
            Value::ObjectIdentifier(oid) => buf.push_oid(oid),
            Value::IpAddress(addr) => buf.push_primitive(tag::application::IP_ADDRESS, addr),
            Value::Counter32(v) => buf.push_unsigned32(tag::application::COUNTER32, *v),
            Value::Gauge32(v) => buf.push_unsigned32(tag::application::GAUGE32, *v),
            Value::TimeTicks(v) => buf.push_unsigned32(tag::application::TIMETICKS, *v),
            Value::Opaque(data) => buf.push_primitive(tag::application::OPAQUE, data),
            Value::Counter64(v) => buf.push_counter64(*v),
            Value::NoSuchObject => buf.push_primitive(tag::context::NO_SUCH_OBJECT, &[]),
            Value::NoSuchInstance => buf.push_primitive(tag::context::NO_SUCH_INSTANCE, &[]),
            Value::EndOfMibView => buf.push_primitive(tag::context::END_OF_MIB_VIEW, &[]),
            Value::Unknown { tag: t, data } => buf.push_primitive(*t, data),
        }
    }

    /// Decode from BER.
    pub(crate) fn decode(decoder: &mut Decoder) -> WireResult<Self> {
        let at = decoder.offset();
        let tag = decoder.read_tag()?;
        let len = decoder.read_length()?;

        let value = match tag {
            tag::universal::INTEGER => Value::Integer(decoder.read_integer_value(len)?),
            tag::universal::OCTET_STRING => Value::OctetString(decoder.read_bytes(len)?),
            tag::universal::NULL => {
                if len != 0 {
                    return Err(WireError::decode(at, DecodeErrorKind::InvalidNull));
                }
                Value::Null
            }
            tag::universal::OBJECT_IDENTIFIER => {
                Value::ObjectIdentifier(decoder.read_oid_value(len)?)
            }
            tag::application::IP_ADDRESS => {
                if len != 4 {
                    return Err(WireError::decode(
                        at,
                        DecodeErrorKind::InvalidIpAddressLength { length: len },
                    ));
                }
                let data = decoder.read_bytes(4)?;
                Value::IpAddress([data[0], data[1], data[2], data[3]])
            }
            tag::application::COUNTER32 => Value::Counter32(decoder.read_unsigned32_value(len)?),
            tag::application::GAUGE32 => Value::Gauge32(decoder.read_unsigned32_value(len)?),
            tag::application::TIMETICKS => Value::TimeTicks(decoder.read_unsigned32_value(len)?),
            tag::application::OPAQUE => Value::Opaque(decoder.read_bytes(len)?),
            tag::application::COUNTER64 => Value::Counter64(decoder.read_integer64_value(len)?),
            tag::context::NO_SUCH_OBJECT
            | tag::context::NO_SUCH_INSTANCE
            | tag::context::END_OF_MIB_VIEW => {
                // Content is meaningless; some agents send a stray byte anyway.
                decoder.read_bytes(len)?;
                match tag {
                    tag::context::NO_SUCH_OBJECT => Value::NoSuchObject,
                    tag::context::NO_SUCH_INSTANCE => Value::NoSuchInstance,
                    _ => Value::EndOfMibView,
                }
            }
            _ => Value::Unknown {
                tag,
                data: decoder.read_bytes(len)?,
            },
        };
        Ok(value)
    }
}

/// Lowercase hex with a `0x` prefix.
pub(crate) fn hex_string(data: &[u8]) -> String {
    let mut out = String::with_capacity(2 + data.len() * 2);
    out.push_str("0x");
    for byte in data {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Whether an OCTET STRING should be rendered as text.
fn is_printable(data: &[u8]) -> bool {
    match std::str::from_utf8(data) {
        Ok(s) => s.chars().all(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t')),
        Err(_) => false,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::OctetString(data) if is_printable(data) => {
                f.write_str(&String::from_utf8_lossy(data))
            }
            Value::OctetString(data) | Value::Opaque(data) => f.write_str(&hex_string(data)),
            Value::Null => Ok(()),
            Value::ObjectIdentifier(oid) => write!(f, "{}", oid),
            Value::IpAddress(addr) => {
                write!(f, "{}.{}.{}.{}", addr[0], addr[1], addr[2], addr[3])
            }
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => write!(f, "{}", v),
            Value::Counter64(v) => write!(f, "{}", v),
            Value::NoSuchObject => write!(f, "noSuchObject"),
            Value::NoSuchInstance => write!(f, "noSuchInstance"),
            Value::EndOfMibView => write!(f, "endOfMibView"),
            Value::Unknown { data, .. } => f.write_str(&hex_string(data)),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::OctetString(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<Oid> for Value {
    fn from(oid: Oid) -> Self {
        Value::ObjectIdentifier(oid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Value {
        Value::decode(&mut Decoder::from_slice(bytes)).unwrap()
    }

    #[test]
    fn opaque_renders_as_lowercase_hex() {
        let value = decode(&[0x44, 0x07, 0x9F, 0x78, 0x04, 0x42, 0x34, 0x00, 0x00]);
        assert_eq!(value.to_string(), "0x9f780442340000");
        assert_eq!(&value.as_octets()[..], &[0x9F, 0x78, 0x04, 0x42, 0x34, 0x00, 0x00]);
    }

    #[test]
    fn octet_string_text_or_hex() {
        assert_eq!(Value::from("eth0").to_string(), "eth0");
        let binary = Value::OctetString(Bytes::from_static(&[0x00, 0x1B, 0xFF]));
        assert_eq!(binary.to_string(), "0x001bff");
    }

    #[test]
    fn numeric_types_render_plain() {
        assert_eq!(decode(&[0x43, 0x02, 0x01, 0x00]).to_string(), "256");
        assert_eq!(decode(&[0x41, 0x01, 0x2A]).to_string(), "42");
        assert_eq!(decode(&[0x40, 0x04, 10, 0, 0, 1]).to_string(), "10.0.0.1");
        assert_eq!(decode(&[0x02, 0x01, 0xD3]).to_string(), "-45");
    }

    #[test]
    fn exceptions_decode_even_with_content() {
        assert_eq!(decode(&[0x82, 0x00]), Value::EndOfMibView);
        assert_eq!(decode(&[0x80, 0x01, 0x00]), Value::NoSuchObject);
        assert!(decode(&[0x81, 0x00]).is_exception());
    }

    #[test]
    fn encode_matches_decode() {
        let values = [
            Value::Integer(-7),
            Value::Gauge32(u32::MAX),
            Value::Counter64(1 << 40),
            Value::Opaque(Bytes::from_static(&[0x9F, 0x78])),
            Value::EndOfMibView,
        ];
        for value in values {
            let mut buf = EncodeBuf::new();
            value.encode(&mut buf);
            assert_eq!(decode(&buf.finish()), value);
        }
    }

    #[test]
    fn as_octets_of_numeric_is_printable_form() {
        assert_eq!(&Value::Integer(45).as_octets()[..], b"45");
    }
}
