//! Key derivation and HMAC authentication (RFC 3414).
//!
//! Deriving a master key hashes a megabyte of repeated password, so the
//! engine keeps master keys around and only re-runs localization when it
//! meets a new engine ID.

use digest::{Digest, KeyInit, Mac};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::AuthProtocol;
use crate::error::internal::{AuthErrorKind, WireError, WireResult};

/// Shortest password net-snmp will accept.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const EXPANSION_SIZE: usize = 1_048_576;

/// Password-derived key, not yet bound to an engine (RFC 3414 A.2.1).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: AuthProtocol,
}

impl MasterKey {
    /// Hash a 1 MiB repetition of `password`.
    pub fn from_password(protocol: AuthProtocol, password: &[u8]) -> Self {
        if password.len() < MIN_PASSWORD_LENGTH {
            tracing::warn!(target: "snmp_probe::usm", { password_len = password.len(), min_len = MIN_PASSWORD_LENGTH }, "SNMPv3 password is shorter than net-snmp accepts");
        }
        let key = match protocol {
            AuthProtocol::Md5 => expand::<md5::Md5>(password),
            AuthProtocol::Sha1 => expand::<sha1::Sha1>(password),
        };
        Self { key, protocol }
    }

    pub fn protocol(&self) -> AuthProtocol {
        self.protocol
    }

    /// Bind the key to an authoritative engine (RFC 3414 A.2.2):
    /// `H(master || engine_id || master)`.
    pub fn localize(&self, engine_id: &[u8]) -> LocalizedKey {
        let key = match self.protocol {
            AuthProtocol::Md5 => localize::<md5::Md5>(&self.key, engine_id),
            AuthProtocol::Sha1 => localize::<sha1::Sha1>(&self.key, engine_id),
        };
        LocalizedKey {
            key,
            protocol: self.protocol,
        }
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

fn expand<D: Digest>(password: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return vec![0u8; <D as Digest>::output_size()];
    }

    // Hash in 64-byte chunks, cycling through the password.
    let mut hasher = D::new();
    let mut chunk = [0u8; 64];
    let mut cycle = password.iter().cycle();
    for _ in 0..EXPANSION_SIZE / chunk.len() {
        for (slot, byte) in chunk.iter_mut().zip(&mut cycle) {
            *slot = *byte;
        }
        hasher.update(chunk);
    }
    chunk.zeroize();
    hasher.finalize().to_vec()
}

fn localize<D: Digest>(master: &[u8], engine_id: &[u8]) -> Vec<u8> {
    let mut hasher = D::new();
    hasher.update(master);
    hasher.update(engine_id);
    hasher.update(master);
    hasher.finalize().to_vec()
}

/// Key bound to one authoritative engine ID.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LocalizedKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: AuthProtocol,
}

impl LocalizedKey {
    /// Derive directly from a password. Prefer [`MasterKey::localize`] when
    /// the same password is used against several engines.
    pub fn from_password(protocol: AuthProtocol, password: &[u8], engine_id: &[u8]) -> Self {
        MasterKey::from_password(protocol, password).localize(engine_id)
    }

    pub fn protocol(&self) -> AuthProtocol {
        self.protocol
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// HMAC over `data`, truncated to 96 bits.
    pub fn compute_hmac(&self, data: &[u8]) -> Vec<u8> {
        let full = match self.protocol {
            AuthProtocol::Md5 => hmac_digest::<hmac::Hmac<md5::Md5>>(&self.key, data),
            AuthProtocol::Sha1 => hmac_digest::<hmac::Hmac<sha1::Sha1>>(&self.key, data),
        };
        full[..self.protocol.mac_len()].to_vec()
    }

    /// Constant-time check of a received MAC.
    pub fn verify_hmac(&self, data: &[u8], received: &[u8]) -> bool {
        let computed = self.compute_hmac(data);
        computed.len() == received.len() && bool::from(computed.ct_eq(received))
    }
}

impl std::fmt::Debug for LocalizedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalizedKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

fn hmac_digest<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC takes keys of any length, so the Err arm never fires.
    let Ok(mut mac) = <M as KeyInit>::new_from_slice(key) else {
        return Vec::new();
    };
    Mac::update(&mut mac, data);
    mac.finalize().into_bytes().to_vec()
}

/// Overwrite the zeroed placeholder at `offset` with the message HMAC.
pub(crate) fn authenticate_message(
    key: &LocalizedKey,
    message: &mut [u8],
    offset: usize,
    len: usize,
) -> WireResult<()> {
    let mac = key.compute_hmac(message);
    if mac.len() != len {
        return Err(WireError::auth(AuthErrorKind::WrongMacLength {
            expected: mac.len(),
            actual: len,
        }));
    }
    message[offset..offset + len].copy_from_slice(&mac);
    Ok(())
}

/// Verify an incoming message whose MAC sits at `offset`.
pub(crate) fn verify_message(
    key: &LocalizedKey,
    message: &[u8],
    offset: usize,
    len: usize,
) -> WireResult<()> {
    let expected = key.protocol().mac_len();
    if len != expected {
        return Err(WireError::auth(AuthErrorKind::WrongMacLength {
            expected,
            actual: len,
        }));
    }
    let received = &message[offset..offset + len];
    let mut zeroed = message.to_vec();
    zeroed[offset..offset + len].fill(0);

    if key.verify_hmac(&zeroed, received) {
        Ok(())
    } else {
        Err(WireError::auth(AuthErrorKind::HmacMismatch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    const ENGINE_ID: &str = "000000000000000000000002";

    // RFC 3414 Appendix A.3.1
    #[test]
    fn test_md5_key_localization_vector() {
        let master = MasterKey::from_password(AuthProtocol::Md5, b"maplesyrup");
        assert_eq!(master.key, hex("9faf3283884e92834ebc9847d8edd963"));
        let local = master.localize(&hex(ENGINE_ID));
        assert_eq!(local.as_bytes(), &hex("526f5eed9fcce26f8964c2930787d82b")[..]);
    }

    // RFC 3414 Appendix A.3.2
    #[test]
    fn test_sha1_key_localization_vector() {
        let master = MasterKey::from_password(AuthProtocol::Sha1, b"maplesyrup");
        assert_eq!(master.key, hex("9fb5cc0381497b3793528939ff788d5d79145211"));
        let local = master.localize(&hex(ENGINE_ID));
        assert_eq!(
            local.as_bytes(),
            &hex("6695febc9288e36282235fc7151f128497b38f3f")[..]
        );
    }

    #[test]
    fn test_authenticate_then_verify() {
        let key = LocalizedKey::from_password(AuthProtocol::Sha1, b"authpassword", b"engine");
        let mut message = b"header............|............trailer".to_vec();
        message[19..31].fill(0);

        authenticate_message(&key, &mut message, 19, 12).unwrap();
        assert_ne!(&message[19..31], &[0u8; 12]);
        verify_message(&key, &message, 19, 12).unwrap();

        message[0] ^= 0x01;
        assert_eq!(
            verify_message(&key, &message, 19, 12),
            Err(WireError::Auth(AuthErrorKind::HmacMismatch))
        );
    }

    #[test]
    fn test_wrong_mac_length_rejected() {
        let key = LocalizedKey::from_password(AuthProtocol::Md5, b"authpassword", b"engine");
        let message = [0u8; 32];
        assert!(matches!(
            verify_message(&key, &message, 0, 16),
            Err(WireError::Auth(AuthErrorKind::WrongMacLength { .. }))
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = LocalizedKey::from_password(AuthProtocol::Md5, b"maplesyrup", b"e");
        assert!(format!("{:?}", key).contains("REDACTED"));
    }
}
