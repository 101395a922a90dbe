//! Opaque-wrapped floats.
//!
//! net-snmp's UCD-SNMP-MIB (and agents copying it) returns floats as an
//! Opaque whose content is itself a BER value: the two-byte application
//! tag `9f 78`, a length of 4, then an IEEE-754 single in network order.
//! Printed as hex that is `0x9f7804xxxxxxxx`.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::value::hex_string;

/// Printable prefix identifying an opaque float.
pub const OPAQUE_FLOAT_PREFIX: &str = "0x9f78";

/// Tag plus the only valid length byte.
const OPAQUE_FLOAT_HEADER: &str = "0x9f7804";

/// Decode the printable hex form of an opaque float.
///
/// ```
/// use snmp_probe::opaque::decode_float;
///
/// assert_eq!(decode_float("0x9f780442340000").unwrap(), 45.0);
/// assert!(decode_float("45").is_err());
/// ```
pub fn decode_float(value: &str) -> Result<f32> {
    let format_error = || Error::Format {
        value: value.to_string(),
    };

    if !value.starts_with(OPAQUE_FLOAT_PREFIX) {
        return Err(format_error());
    }
    let payload = value
        .strip_prefix(OPAQUE_FLOAT_HEADER)
        .filter(|hex| hex.len() == 8 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(format_error)?;

    let mut bytes = [0u8; 4];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&payload[2 * i..2 * i + 2], 16).map_err(|_| format_error())?;
    }
    Ok(f32::from_be_bytes(bytes))
}

/// Decode an opaque float from the raw Opaque content octets.
pub fn decode_float_octets(raw: &[u8]) -> Result<f32> {
    decode_float(&hex_string(raw))
}

/// Opaque content octets carrying `value`.
pub fn encode_float(value: f32) -> Bytes {
    let mut out = Vec::with_capacity(7);
    out.extend_from_slice(&[0x9f, 0x78, 0x04]);
    out.extend_from_slice(&value.to_be_bytes());
    Bytes::from(out)
}
