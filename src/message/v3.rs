//! SNMPv3 message format (RFC 3412).
//!
//! ```text
//! SEQUENCE {
//!     INTEGER version (3)
//!     SEQUENCE msgGlobalData { msgID, msgMaxSize, msgFlags, msgSecurityModel }
//!     OCTET STRING msgSecurityParameters (USM-encoded)
//!     msgData (ScopedPDU, or an encrypted OCTET STRING under authPriv)
//! }
//! ```

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf};
use crate::error::internal::{DecodeErrorKind, WireError, WireResult};
use crate::pdu::{Pdu, PduType};

/// The only security model a probe speaks: USM (RFC 3414).
const SECURITY_MODEL_USM: i32 = 3;

/// SNMPv3 security level, ordered from least to most secure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecurityLevel {
    NoAuthNoPriv,
    AuthNoPriv,
    AuthPriv,
}

impl SecurityLevel {
    /// Decode from msgFlags bits. Privacy without authentication is invalid.
    pub fn from_flags(flags: u8) -> Option<Self> {
        match (flags & 0x01 != 0, flags & 0x02 != 0) {
            (false, false) => Some(Self::NoAuthNoPriv),
            (true, false) => Some(Self::AuthNoPriv),
            (true, true) => Some(Self::AuthPriv),
            (false, true) => None,
        }
    }

    /// Encode to msgFlags bits (without the reportable flag).
    pub fn to_flags(self) -> u8 {
        match self {
            Self::NoAuthNoPriv => 0x00,
            Self::AuthNoPriv => 0x01,
            Self::AuthPriv => 0x03,
        }
    }

    pub fn requires_auth(self) -> bool {
        self >= Self::AuthNoPriv
    }

    pub fn requires_priv(self) -> bool {
        self == Self::AuthPriv
    }
}

/// Message flags (RFC 3412 Section 6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgFlags {
    pub security_level: SecurityLevel,
    /// Whether the receiver may answer with a Report PDU
    pub reportable: bool,
}

impl MsgFlags {
    pub fn new(security_level: SecurityLevel, reportable: bool) -> Self {
        Self {
            security_level,
            reportable,
        }
    }

    pub(crate) fn from_byte(byte: u8, offset: usize) -> WireResult<Self> {
        let security_level = SecurityLevel::from_flags(byte)
            .ok_or_else(|| WireError::decode(offset, DecodeErrorKind::InvalidMsgFlags))?;
        Ok(Self {
            security_level,
            reportable: byte & 0x04 != 0,
        })
    }

    pub fn to_byte(self) -> u8 {
        let reportable = if self.reportable { 0x04 } else { 0x00 };
        self.security_level.to_flags() | reportable
    }
}

/// Message header (msgGlobalData).
#[derive(Debug, Clone)]
pub struct MsgGlobalData {
    pub msg_id: i32,
    pub msg_max_size: i32,
    pub msg_flags: MsgFlags,
}

impl MsgGlobalData {
    pub fn new(msg_id: i32, msg_flags: MsgFlags) -> Self {
        Self {
            msg_id,
            msg_max_size: super::MSG_MAX_SIZE,
            msg_flags,
        }
    }

    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_sequence(|buf| {
            buf.push_integer(SECURITY_MODEL_USM);
            buf.push_octet_string(&[self.msg_flags.to_byte()]);
            buf.push_integer(self.msg_max_size);
            buf.push_integer(self.msg_id);
        });
    }

    pub(crate) fn decode(decoder: &mut Decoder) -> WireResult<Self> {
        let mut seq = decoder.read_sequence()?;
        let msg_id = seq.read_integer()?;
        let msg_max_size = seq.read_integer()?;

        let at = seq.offset();
        let flags = seq.read_octet_string()?;
        let [byte] = flags[..] else {
            return Err(WireError::decode(at, DecodeErrorKind::InvalidMsgFlags));
        };
        let msg_flags = MsgFlags::from_byte(byte, at)?;

        let at = seq.offset();
        let model = seq.read_integer()?;
        if model != SECURITY_MODEL_USM {
            return Err(WireError::decode(
                at,
                DecodeErrorKind::UnknownSecurityModel(model),
            ));
        }

        Ok(Self {
            msg_id,
            msg_max_size,
            msg_flags,
        })
    }
}

/// Scoped PDU (contextEngineID + contextName + PDU).
#[derive(Debug, Clone)]
pub struct ScopedPdu {
    pub context_engine_id: Bytes,
    pub context_name: Bytes,
    pub pdu: Pdu,
}

impl ScopedPdu {
    /// Scope `pdu` to the default (empty-named) context of `engine_id`.
    pub fn new(context_engine_id: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self {
            context_engine_id: context_engine_id.into(),
            context_name: Bytes::new(),
            pdu,
        }
    }

    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.context_name);
            buf.push_octet_string(&self.context_engine_id);
        });
    }

    /// Encode on its own, as the plaintext handed to the privacy layer.
    pub fn encode_to_bytes(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        self.encode(&mut buf);
        buf.finish()
    }

    pub(crate) fn decode(decoder: &mut Decoder) -> WireResult<Self> {
        let mut seq = decoder.read_sequence()?;
        let context_engine_id = seq.read_octet_string()?;
        let context_name = seq.read_octet_string()?;
        let pdu = Pdu::decode(&mut seq)?;
        Ok(Self {
            context_engine_id,
            context_name,
            pdu,
        })
    }
}

/// Message data payload.
#[derive(Debug, Clone)]
pub enum V3MessageData {
    /// Plaintext scoped PDU (noAuthNoPriv or authNoPriv)
    Plaintext(ScopedPdu),
    /// Encrypted scoped PDU (authPriv), raw ciphertext
    Encrypted(Bytes),
}

/// SNMPv3 message.
#[derive(Debug, Clone)]
pub struct V3Message {
    pub global_data: MsgGlobalData,
    /// USM security parameters, still BER-encoded
    pub security_params: Bytes,
    pub data: V3MessageData,
}

impl V3Message {
    pub fn msg_id(&self) -> i32 {
        self.global_data.msg_id
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.global_data.msg_flags.security_level
    }

    /// Encode to BER.
    ///
    /// Authenticated messages are encoded with a zeroed 12-byte
    /// authentication placeholder; the USM layer patches the HMAC in place
    /// afterwards.
    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            match &self.data {
                V3MessageData::Plaintext(scoped) => scoped.encode(buf),
                V3MessageData::Encrypted(ciphertext) => buf.push_octet_string(ciphertext),
            }
            buf.push_octet_string(&self.security_params);
            self.global_data.encode(buf);
            buf.push_integer(3);
        });
        buf.finish()
    }

    /// Decode from BER.
    ///
    /// Encrypted payloads are returned as [`V3MessageData::Encrypted`]; the
    /// caller decrypts them.
    pub(crate) fn decode(data: Bytes) -> WireResult<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;

        let at = seq.offset();
        let version = seq.read_integer()?;
        if version != 3 {
            return Err(WireError::decode(at, DecodeErrorKind::UnknownVersion(version)));
        }

        let global_data = MsgGlobalData::decode(&mut seq)?;
        let security_params = seq.read_octet_string()?;

        let data = if global_data.msg_flags.security_level.requires_priv() {
            let at = seq.offset();
            if seq.peek_tag() != Some(crate::ber::tag::universal::OCTET_STRING) {
                return Err(WireError::decode(at, DecodeErrorKind::ExpectedEncryption));
            }
            V3MessageData::Encrypted(seq.read_octet_string()?)
        } else {
            V3MessageData::Plaintext(ScopedPdu::decode(&mut seq)?)
        };

        Ok(Self {
            global_data,
            security_params,
            data,
        })
    }

    /// Engine discovery probe (RFC 3414 Section 4).
    ///
    /// An unauthenticated, reportable GET with no bindings and empty USM
    /// parameters; the agent answers with a Report carrying its engine ID,
    /// boots and time.
    pub fn discovery_request(msg_id: i32) -> Self {
        let global_data =
            MsgGlobalData::new(msg_id, MsgFlags::new(SecurityLevel::NoAuthNoPriv, true));
        let security_params = crate::v3::UsmSecurityParams::empty().encode();
        let pdu = Pdu::request(PduType::GetRequest, msg_id, &[]);
        Self {
            global_data,
            security_params,
            data: V3MessageData::Plaintext(ScopedPdu::new(Bytes::new(), pdu)),
        }
    }
}
