//! BER decoding.
//!
//! Zero-copy decoding using `Bytes` to avoid allocations.

use super::length::decode_length;
use super::tag;
use crate::error::internal::{DecodeErrorKind, WireError, WireResult};
use crate::oid::Oid;
use bytes::Bytes;

/// BER decoder that reads from a byte buffer.
///
/// Sub-decoders produced by [`read_sequence`](Self::read_sequence) keep
/// track of their position in the enclosing message so error offsets stay
/// meaningful.
pub struct Decoder {
    data: Bytes,
    offset: usize,
    base: usize,
}

impl Decoder {
    /// Create a new decoder from bytes.
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            offset: 0,
            base: 0,
        }
    }

    /// Create a decoder from a byte slice (copies the data).
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    fn error(&self, kind: DecodeErrorKind) -> WireError {
        WireError::decode(self.base + self.offset, kind)
    }

    /// Current offset within this decoder.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Position within the outermost buffer this decoder was split from.
    pub(crate) fn position(&self) -> usize {
        self.base + self.offset
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Check if we've reached the end.
    pub fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Peek at the next tag without consuming it.
    pub fn peek_tag(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    /// Read a tag byte.
    pub(crate) fn read_tag(&mut self) -> WireResult<u8> {
        let tag = self
            .peek_tag()
            .ok_or_else(|| self.error(DecodeErrorKind::TruncatedData))?;
        self.offset += 1;
        Ok(tag)
    }

    /// Read a length.
    pub(crate) fn read_length(&mut self) -> WireResult<usize> {
        let (len, consumed) = decode_length(&self.data[self.offset..], self.base + self.offset)?;
        self.offset += consumed;
        Ok(len)
    }

    /// Read raw bytes without copying.
    pub(crate) fn read_bytes(&mut self, len: usize) -> WireResult<Bytes> {
        if self.offset.saturating_add(len) > self.data.len() {
            return Err(self.error(DecodeErrorKind::InsufficientData {
                needed: len,
                available: self.remaining(),
            }));
        }
        let bytes = self.data.slice(self.offset..self.offset + len);
        self.offset += len;
        Ok(bytes)
    }

    /// Read and expect a specific tag, returning the content length.
    pub(crate) fn expect_tag(&mut self, expected: u8) -> WireResult<usize> {
        let actual = self.read_tag()?;
        if actual != expected {
            self.offset -= 1;
            return Err(self.error(DecodeErrorKind::UnexpectedTag { expected, actual }));
        }
        self.read_length()
    }

    /// Read a BER integer (signed).
    pub(crate) fn read_integer(&mut self) -> WireResult<i32> {
        let len = self.expect_tag(tag::universal::INTEGER)?;
        self.read_integer_value(len)
    }

    /// Read integer content given its length.
    ///
    /// Values wider than 4 bytes are truncated to their leading 4 bytes,
    /// as net-snmp does.
    pub(crate) fn read_integer_value(&mut self, len: usize) -> WireResult<i32> {
        if len == 0 {
            return Err(self.error(DecodeErrorKind::ZeroLengthInteger));
        }
        if len > 4 {
            tracing::warn!(target: "snmp_probe::ber", { snmp.offset = self.base + self.offset, length = len }, "integer too long, truncating to 4 bytes");
        }
        let bytes = self.read_bytes(len)?;
        let seed: i32 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
        Ok(bytes
            .iter()
            .take(4)
            .fold(seed, |acc, &b| (acc << 8) | b as i32))
    }

    /// Read unsigned 32-bit content given its length.
    pub(crate) fn read_unsigned32_value(&mut self, len: usize) -> WireResult<u32> {
        if len == 0 {
            return Err(self.error(DecodeErrorKind::ZeroLengthInteger));
        }
        let bytes = self.read_bytes(len)?;
        // A 5-byte form carries a leading 0x00 sign octet.
        Ok(bytes
            .iter()
            .take(5)
            .fold(0u64, |acc, &b| (acc << 8) | b as u64) as u32)
    }

    /// Read Counter64 content given its length.
    pub(crate) fn read_integer64_value(&mut self, len: usize) -> WireResult<u64> {
        if len == 0 {
            return Err(self.error(DecodeErrorKind::ZeroLengthInteger));
        }
        if len > 9 {
            return Err(self.error(DecodeErrorKind::Integer64TooLong { length: len }));
        }
        let bytes = self.read_bytes(len)?;
        Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }

    /// Read an OCTET STRING.
    pub(crate) fn read_octet_string(&mut self) -> WireResult<Bytes> {
        let len = self.expect_tag(tag::universal::OCTET_STRING)?;
        self.read_bytes(len)
    }

    /// Read an OBJECT IDENTIFIER.
    pub(crate) fn read_oid(&mut self) -> WireResult<Oid> {
        let len = self.expect_tag(tag::universal::OBJECT_IDENTIFIER)?;
        self.read_oid_value(len)
    }

    /// Read OID content given its length.
    pub(crate) fn read_oid_value(&mut self, len: usize) -> WireResult<Oid> {
        let at = self.base + self.offset;
        let bytes = self.read_bytes(len)?;
        Oid::from_ber(&bytes).map_err(|kind| WireError::decode(at, kind))
    }

    /// Read a SEQUENCE, returning a decoder for its contents.
    pub(crate) fn read_sequence(&mut self) -> WireResult<Decoder> {
        self.read_constructed(tag::universal::SEQUENCE)
    }

    /// Read a constructed type with a specific tag, returning a decoder for its contents.
    pub(crate) fn read_constructed(&mut self, expected_tag: u8) -> WireResult<Decoder> {
        let len = self.expect_tag(expected_tag)?;
        let base = self.base + self.offset;
        let data = self.read_bytes(len)?;
        Ok(Decoder {
            data,
            offset: 0,
            base,
        })
    }

    /// Skip a TLV (tag-length-value) without parsing.
    pub(crate) fn skip_tlv(&mut self) -> WireResult<()> {
        self.read_tag()?;
        let len = self.read_length()?;
        let end = self.offset.saturating_add(len);
        if end > self.data.len() {
            return Err(self.error(DecodeErrorKind::TlvOverflow));
        }
        self.offset = end;
        Ok(())
    }

    /// Get the underlying bytes for the entire buffer.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }
}
