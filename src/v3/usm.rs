//! USM security parameters (RFC 3414 Section 2.4).
//!
//! ```text
//! UsmSecurityParameters ::= SEQUENCE {
//!     msgAuthoritativeEngineID     OCTET STRING,
//!     msgAuthoritativeEngineBoots  INTEGER (0..2147483647),
//!     msgAuthoritativeEngineTime   INTEGER (0..2147483647),
//!     msgUserName                  OCTET STRING (SIZE(0..32)),
//!     msgAuthenticationParameters  OCTET STRING,
//!     msgPrivacyParameters         OCTET STRING
//! }
//! ```

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::internal::{AuthErrorKind, DecodeErrorKind, WireError, WireResult};

/// USM security parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsmSecurityParams {
    pub engine_id: Bytes,
    pub engine_boots: u32,
    pub engine_time: u32,
    pub username: Bytes,
    /// HMAC digest, or empty when unauthenticated
    pub auth_params: Bytes,
    /// Privacy salt, or empty when unencrypted
    pub priv_params: Bytes,
}

impl UsmSecurityParams {
    pub fn new(
        engine_id: impl Into<Bytes>,
        engine_boots: u32,
        engine_time: u32,
        username: impl Into<Bytes>,
    ) -> Self {
        Self {
            engine_id: engine_id.into(),
            engine_boots,
            engine_time,
            username: username.into(),
            ..Self::default()
        }
    }

    /// Parameters of a discovery request: everything empty or zero.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Zero-filled auth params, overwritten with the HMAC once the whole
    /// message has been encoded.
    pub fn with_auth_placeholder(mut self, mac_len: usize) -> Self {
        self.auth_params = Bytes::from(vec![0u8; mac_len]);
        self
    }

    pub fn with_priv_params(mut self, priv_params: impl Into<Bytes>) -> Self {
        self.priv_params = priv_params.into();
        self
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            buf.push_octet_string(&self.priv_params);
            buf.push_octet_string(&self.auth_params);
            buf.push_octet_string(&self.username);
            buf.push_unsigned32(tag::universal::INTEGER, self.engine_time);
            buf.push_unsigned32(tag::universal::INTEGER, self.engine_boots);
            buf.push_octet_string(&self.engine_id);
        });
        buf.finish()
    }

    pub(crate) fn decode(data: Bytes) -> WireResult<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;

        let engine_id = seq.read_octet_string()?;
        let engine_boots = read_non_negative(&mut seq)?;
        let engine_time = read_non_negative(&mut seq)?;
        let username = seq.read_octet_string()?;
        let auth_params = seq.read_octet_string()?;
        let priv_params = seq.read_octet_string()?;

        Ok(Self {
            engine_id,
            engine_boots,
            engine_time,
            username,
            auth_params,
            priv_params,
        })
    }

    /// Locate msgAuthenticationParameters inside a whole encoded v3 message.
    ///
    /// Returns `(offset, length)` of the parameter's content octets.
    pub(crate) fn find_auth_params(message: &Bytes) -> WireResult<(usize, usize)> {
        let not_found = |_| WireError::auth(AuthErrorKind::AuthParamsNotFound);

        let mut decoder = Decoder::new(message.clone());
        let mut msg = decoder.read_sequence().map_err(not_found)?;
        msg.skip_tlv().map_err(not_found)?; // version
        msg.skip_tlv().map_err(not_found)?; // msgGlobalData

        let mut wrapper = msg
            .read_constructed(tag::universal::OCTET_STRING)
            .map_err(not_found)?;
        let mut usm = wrapper.read_sequence().map_err(not_found)?;
        for _ in 0..4 {
            // engineID, boots, time, userName
            usm.skip_tlv().map_err(not_found)?;
        }

        let len = usm
            .expect_tag(tag::universal::OCTET_STRING)
            .map_err(not_found)?;
        Ok((usm.position(), len))
    }
}

fn read_non_negative(seq: &mut Decoder) -> WireResult<u32> {
    let at = seq.position();
    let value = seq.read_integer()?;
    u32::try_from(value)
        .map_err(|_| WireError::decode(at, DecodeErrorKind::NegativeEngineCounter(value)))
}
