//! Community-based SNMP message format (v1/v2c).
//!
//! `SEQUENCE { version INTEGER, community OCTET STRING, pdu PDU }`, with
//! version 0 for v1 and 1 for v2c.

use crate::ber::{Decoder, EncodeBuf};
use crate::error::Result;
use crate::error::internal::{DecodeErrorKind, WireError, WireResult};
use crate::pdu::Pdu;
use crate::version::{CommunityVersion, Version};
use bytes::Bytes;

/// Community-based SNMP message (v1/v2c).
#[derive(Debug, Clone)]
pub struct CommunityMessage {
    /// SNMP version (V1 or V2c)
    pub version: CommunityVersion,
    /// Community string
    pub community: Bytes,
    /// Protocol data unit
    pub pdu: Pdu,
}

impl CommunityMessage {
    /// Create a new community message.
    pub fn new(version: CommunityVersion, community: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self {
            version,
            community: community.into(),
            pdu,
        }
    }

    /// Encode to BER.
    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.community);
            buf.push_integer(self.version.model());
        });
        buf.finish()
    }

    /// Decode from BER.
    pub fn decode(data: Bytes) -> Result<Self> {
        Ok(Self::decode_wire(data)?)
    }

    pub(crate) fn decode_wire(data: Bytes) -> WireResult<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;

        let at = seq.offset();
        let raw = seq.read_integer()?;
        let version = match Version::from_i32(raw) {
            Some(Version::V1) => CommunityVersion::V1,
            Some(Version::V2c) => CommunityVersion::V2c,
            _ => return Err(WireError::decode(at, DecodeErrorKind::UnknownVersion(raw))),
        };

        let community = seq.read_octet_string()?;
        let pdu = Pdu::decode(&mut seq)?;

        Ok(CommunityMessage {
            version,
            community,
            pdu,
        })
    }
}
