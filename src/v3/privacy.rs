//! Scoped PDU encryption (RFC 3414 Section 8, RFC 3826).
//!
//! The privacy key is localized exactly like an authentication key, using
//! the authentication protocol's hash over the privacy password.

use bytes::Bytes;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::auth::LocalizedKey;
use super::PrivProtocol;
use crate::error::internal::{CryptoErrorKind, WireError, WireResult};

/// Privacy key plus the per-key salt counter.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: PrivProtocol,
    #[zeroize(skip)]
    salt: u64,
}

impl PrivKey {
    /// Wrap a localized key, seeding the salt counter from the OS RNG.
    pub(crate) fn new(protocol: PrivProtocol, localized: &LocalizedKey) -> WireResult<Self> {
        let bytes = localized.as_bytes();
        if bytes.len() < protocol.key_len() {
            return Err(WireError::crypto(CryptoErrorKind::InvalidKeyLength));
        }
        let mut seed = [0u8; 8];
        getrandom::fill(&mut seed)
            .map_err(|_| WireError::crypto(CryptoErrorKind::SaltUnavailable))?;
        Ok(Self {
            key: bytes[..protocol.key_len()].to_vec(),
            protocol,
            salt: u64::from_ne_bytes(seed),
        })
    }

    pub fn protocol(&self) -> PrivProtocol {
        self.protocol
    }

    fn next_salt(&mut self) -> u64 {
        self.salt = self.salt.wrapping_add(1);
        // net-snmp never hands out a zero salt
        if self.salt == 0 {
            self.salt = 1;
        }
        self.salt
    }

    /// Encrypt a serialized scoped PDU, returning `(ciphertext, privParameters)`.
    pub(crate) fn encrypt(
        &mut self,
        plaintext: &[u8],
        engine_boots: u32,
        engine_time: u32,
    ) -> WireResult<(Bytes, Bytes)> {
        let salt = self.next_salt();
        match self.protocol {
            PrivProtocol::Des => {
                let mut salt_bytes = [0u8; 8];
                salt_bytes[..4].copy_from_slice(&engine_boots.to_be_bytes());
                salt_bytes[4..].copy_from_slice(&(salt as u32).to_be_bytes());
                let ciphertext = self.des_encrypt(plaintext, &salt_bytes)?;
                Ok((ciphertext, Bytes::copy_from_slice(&salt_bytes)))
            }
            PrivProtocol::Aes128 => {
                let salt_bytes = salt.to_be_bytes();
                let mut buffer = plaintext.to_vec();
                self.aes_apply(&mut buffer, engine_boots, engine_time, &salt_bytes, true)?;
                Ok((Bytes::from(buffer), Bytes::copy_from_slice(&salt_bytes)))
            }
        }
    }

    /// Decrypt an encrypted scoped PDU using the received privParameters.
    ///
    /// DES output may carry trailing padding; the BER decoder ignores it.
    pub(crate) fn decrypt(
        &self,
        ciphertext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        priv_params: &[u8],
    ) -> WireResult<Bytes> {
        let Ok(salt) = <[u8; 8]>::try_from(priv_params) else {
            return Err(WireError::crypto(CryptoErrorKind::InvalidPrivParamsLength {
                expected: self.protocol.salt_len(),
                actual: priv_params.len(),
            }));
        };
        match self.protocol {
            PrivProtocol::Des => self.des_decrypt(ciphertext, &salt),
            PrivProtocol::Aes128 => {
                let mut buffer = ciphertext.to_vec();
                self.aes_apply(&mut buffer, engine_boots, engine_time, &salt, false)?;
                Ok(Bytes::from(buffer))
            }
        }
    }

    /// IV = pre-IV (second half of the key) XOR salt.
    fn des_iv(&self, salt: &[u8; 8]) -> [u8; 8] {
        let mut iv = [0u8; 8];
        for (i, byte) in iv.iter_mut().enumerate() {
            *byte = self.key[8 + i] ^ salt[i];
        }
        iv
    }

    fn des_encrypt(&self, plaintext: &[u8], salt: &[u8; 8]) -> WireResult<Bytes> {
        use cbc::cipher::block_padding::NoPadding;
        use cbc::cipher::{BlockEncryptMut, KeyIvInit};
        type DesCbc = cbc::Encryptor<des::Des>;

        let padded_len = plaintext.len().div_ceil(8).max(1) * 8;
        let mut buffer = vec![0u8; padded_len];
        buffer[..plaintext.len()].copy_from_slice(plaintext);

        let cipher = DesCbc::new_from_slices(&self.key[..8], &self.des_iv(salt))
            .map_err(|_| WireError::crypto(CryptoErrorKind::InvalidKeyLength))?;
        let ciphertext = cipher
            .encrypt_padded_mut::<NoPadding>(&mut buffer, padded_len)
            .map_err(|_| {
                WireError::crypto(CryptoErrorKind::InvalidCiphertextLength {
                    length: padded_len,
                    block_size: 8,
                })
            })?;
        Ok(Bytes::copy_from_slice(ciphertext))
    }

    fn des_decrypt(&self, ciphertext: &[u8], salt: &[u8; 8]) -> WireResult<Bytes> {
        use cbc::cipher::block_padding::NoPadding;
        use cbc::cipher::{BlockDecryptMut, KeyIvInit};
        type DesCbc = cbc::Decryptor<des::Des>;

        let invalid = || {
            WireError::crypto(CryptoErrorKind::InvalidCiphertextLength {
                length: ciphertext.len(),
                block_size: 8,
            })
        };
        if ciphertext.is_empty() || !ciphertext.len().is_multiple_of(8) {
            return Err(invalid());
        }

        let cipher = DesCbc::new_from_slices(&self.key[..8], &self.des_iv(salt))
            .map_err(|_| WireError::crypto(CryptoErrorKind::InvalidKeyLength))?;
        let mut buffer = ciphertext.to_vec();
        let plaintext = cipher
            .decrypt_padded_mut::<NoPadding>(&mut buffer)
            .map_err(|_| invalid())?;
        Ok(Bytes::copy_from_slice(plaintext))
    }

    /// AES-128-CFB with IV = boots || time || salt (concatenated, not XORed).
    fn aes_apply(
        &self,
        buffer: &mut [u8],
        engine_boots: u32,
        engine_time: u32,
        salt: &[u8; 8],
        encrypt: bool,
    ) -> WireResult<()> {
        use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};

        let mut iv = [0u8; 16];
        iv[..4].copy_from_slice(&engine_boots.to_be_bytes());
        iv[4..8].copy_from_slice(&engine_time.to_be_bytes());
        iv[8..].copy_from_slice(salt);

        let bad_key = |_| WireError::crypto(CryptoErrorKind::InvalidKeyLength);
        if encrypt {
            cfb_mode::Encryptor::<aes::Aes128>::new_from_slices(&self.key[..16], &iv)
                .map_err(bad_key)?
                .encrypt(buffer);
        } else {
            cfb_mode::Decryptor::<aes::Aes128>::new_from_slices(&self.key[..16], &iv)
                .map_err(bad_key)?
                .decrypt(buffer);
        }
        Ok(())
    }
}

impl std::fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}
