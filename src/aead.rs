//! Authenticated encryption providers.
//!
//! Two families are offered, selected by [`AeadKind`]: AES-GCM (with a
//! caller-chosen 128/192/256-bit key, per [`AesKeySize`]) and
//! ChaCha20-Poly1305 (always 256-bit). Both use a 96-bit nonce, generated at
//! random when the caller supplies none. `decrypt` authenticates the
//! ciphertext and any associated data before returning plaintext; any
//! tampering with ciphertext, nonce, or AAD surfaces as
//! `AuthenticationFailure`.

use aes_gcm::{Aes128Gcm, Aes192Gcm, Aes256Gcm};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305,
};
use rand::RngCore;

use crate::{CryptoError, Result, NONCE_LEN};

/// Behavior every AEAD backend must provide.
pub trait AeadProvider {
    /// The symmetric key length this backend requires, in bytes.
    fn key_len() -> usize;

    /// Encrypt `plaintext` under `key`, authenticating `aad`. Generates a
    /// fresh random nonce when `nonce` is `None`; returns the nonce used
    /// alongside the ciphertext so the caller can deliver it to the peer.
    fn encrypt(
        plaintext: &[u8],
        key: &[u8],
        nonce: Option<[u8; NONCE_LEN]>,
        aad: Option<&[u8]>,
    ) -> Result<(Vec<u8>, [u8; NONCE_LEN])>;

    /// Decrypt and authenticate `ciphertext` under `key`/`nonce`/`aad`.
    fn decrypt(
        ciphertext: &[u8],
        key: &[u8],
        nonce: &[u8; NONCE_LEN],
        aad: Option<&[u8]>,
    ) -> Result<Vec<u8>>;
}

fn random_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

fn payload<'a>(msg: &'a [u8], aad: Option<&'a [u8]>) -> Payload<'a, 'a> {
    Payload {
        msg,
        aad: aad.unwrap_or(b""),
    }
}

/// AES-128-GCM.
pub struct AesGcm128;

impl AeadProvider for AesGcm128 {
    fn key_len() -> usize {
        16
    }

    fn encrypt(
        plaintext: &[u8],
        key: &[u8],
        nonce: Option<[u8; NONCE_LEN]>,
        aad: Option<&[u8]>,
    ) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
        if key.len() != Self::key_len() {
            return Err(CryptoError::ConfigurationError(format!(
                "AES-128-GCM requires a {}-byte key, got {}",
                Self::key_len(),
                key.len()
            )));
        }
        let nonce = nonce.unwrap_or_else(random_nonce);
        let cipher = Aes128Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::ConfigurationError("invalid AES-128-GCM key".into()))?;
        let ciphertext = cipher
            .encrypt((&nonce).into(), payload(plaintext, aad))
            .map_err(|_| CryptoError::AuthenticationFailure("AES-128-GCM encrypt failed".into()))?;
        Ok((ciphertext, nonce))
    }

    fn decrypt(
        ciphertext: &[u8],
        key: &[u8],
        nonce: &[u8; NONCE_LEN],
        aad: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        if key.len() != Self::key_len() {
            return Err(CryptoError::ConfigurationError(format!(
                "AES-128-GCM requires a {}-byte key, got {}",
                Self::key_len(),
                key.len()
            )));
        }
        let cipher = Aes128Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::ConfigurationError("invalid AES-128-GCM key".into()))?;
        cipher
            .decrypt(nonce.into(), payload(ciphertext, aad))
            .map_err(|_| CryptoError::AuthenticationFailure("AES-128-GCM authentication failed".into()))
    }
}

/// AES-192-GCM.
pub struct AesGcm192;

impl AeadProvider for AesGcm192 {
    fn key_len() -> usize {
        24
    }

    fn encrypt(
        plaintext: &[u8],
        key: &[u8],
        nonce: Option<[u8; NONCE_LEN]>,
        aad: Option<&[u8]>,
    ) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
        if key.len() != Self::key_len() {
            return Err(CryptoError::ConfigurationError(format!(
                "AES-192-GCM requires a {}-byte key, got {}",
                Self::key_len(),
                key.len()
            )));
        }
        let nonce = nonce.unwrap_or_else(random_nonce);
        let cipher = Aes192Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::ConfigurationError("invalid AES-192-GCM key".into()))?;
        let ciphertext = cipher
            .encrypt((&nonce).into(), payload(plaintext, aad))
            .map_err(|_| CryptoError::AuthenticationFailure("AES-192-GCM encrypt failed".into()))?;
        Ok((ciphertext, nonce))
    }

    fn decrypt(
        ciphertext: &[u8],
        key: &[u8],
        nonce: &[u8; NONCE_LEN],
        aad: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        if key.len() != Self::key_len() {
            return Err(CryptoError::ConfigurationError(format!(
                "AES-192-GCM requires a {}-byte key, got {}",
                Self::key_len(),
                key.len()
            )));
        }
        let cipher = Aes192Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::ConfigurationError("invalid AES-192-GCM key".into()))?;
        cipher
            .decrypt(nonce.into(), payload(ciphertext, aad))
            .map_err(|_| CryptoError::AuthenticationFailure("AES-192-GCM authentication failed".into()))
    }
}

/// AES-256-GCM.
pub struct AesGcm256;

impl AeadProvider for AesGcm256 {
    fn key_len() -> usize {
        32
    }

    fn encrypt(
        plaintext: &[u8],
        key: &[u8],
        nonce: Option<[u8; NONCE_LEN]>,
        aad: Option<&[u8]>,
    ) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
        if key.len() != Self::key_len() {
            return Err(CryptoError::ConfigurationError(format!(
                "AES-256-GCM requires a {}-byte key, got {}",
                Self::key_len(),
                key.len()
            )));
        }
        let nonce = nonce.unwrap_or_else(random_nonce);
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::ConfigurationError("invalid AES-256-GCM key".into()))?;
        let ciphertext = cipher
            .encrypt((&nonce).into(), payload(plaintext, aad))
            .map_err(|_| CryptoError::AuthenticationFailure("AES-256-GCM encrypt failed".into()))?;
        Ok((ciphertext, nonce))
    }

    fn decrypt(
        ciphertext: &[u8],
        key: &[u8],
        nonce: &[u8; NONCE_LEN],
        aad: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        if key.len() != Self::key_len() {
            return Err(CryptoError::ConfigurationError(format!(
                "AES-256-GCM requires a {}-byte key, got {}",
                Self::key_len(),
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::ConfigurationError("invalid AES-256-GCM key".into()))?;
        cipher
            .decrypt(nonce.into(), payload(ciphertext, aad))
            .map_err(|_| CryptoError::AuthenticationFailure("AES-256-GCM authentication failed".into()))
    }
}

/// ChaCha20-Poly1305.
pub struct ChaCha20;

impl AeadProvider for ChaCha20 {
    fn key_len() -> usize {
        32
    }

    fn encrypt(
        plaintext: &[u8],
        key: &[u8],
        nonce: Option<[u8; NONCE_LEN]>,
        aad: Option<&[u8]>,
    ) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
        if key.len() != Self::key_len() {
            return Err(CryptoError::ConfigurationError(format!(
                "ChaCha20-Poly1305 requires a {}-byte key, got {}",
                Self::key_len(),
                key.len()
            )));
        }
        let nonce = nonce.unwrap_or_else(random_nonce);
        let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| {
            CryptoError::ConfigurationError("invalid ChaCha20-Poly1305 key".into())
        })?;
        let ciphertext = cipher
            .encrypt((&nonce).into(), payload(plaintext, aad))
            .map_err(|_| {
                CryptoError::AuthenticationFailure("ChaCha20-Poly1305 encrypt failed".into())
            })?;
        Ok((ciphertext, nonce))
    }

    fn decrypt(
        ciphertext: &[u8],
        key: &[u8],
        nonce: &[u8; NONCE_LEN],
        aad: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        if key.len() != Self::key_len() {
            return Err(CryptoError::ConfigurationError(format!(
                "ChaCha20-Poly1305 requires a {}-byte key, got {}",
                Self::key_len(),
                key.len()
            )));
        }
        let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| {
            CryptoError::ConfigurationError("invalid ChaCha20-Poly1305 key".into())
        })?;
        cipher
            .decrypt(nonce.into(), payload(ciphertext, aad))
            .map_err(|_| {
                CryptoError::AuthenticationFailure("ChaCha20-Poly1305 authentication failed".into())
            })
    }
}

/// AES-GCM key size, in bytes: 16 (AES-128), 24 (AES-192), or 32 (AES-256).
/// Selected independently of the AEAD family via [`AeadKind::AesGcm`],
/// matching spec.md §6's `symmetric_key_size` configuration input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AesKeySize {
    /// 128-bit key.
    Bits128,
    /// 192-bit key.
    Bits192,
    /// 256-bit key.
    Bits256,
}

impl AesKeySize {
    /// This key size in bytes.
    pub fn key_len(self) -> usize {
        match self {
            AesKeySize::Bits128 => AesGcm128::key_len(),
            AesKeySize::Bits192 => AesGcm192::key_len(),
            AesKeySize::Bits256 => AesGcm256::key_len(),
        }
    }
}

/// Closed selector for the AEAD backend, chosen once at
/// [`crate::session::SessionConfig`] construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadKind {
    /// AES-GCM at the given key size.
    AesGcm(AesKeySize),
    /// ChaCha20-Poly1305 (always 256-bit).
    ChaCha20,
}

impl AeadKind {
    /// The symmetric key length this backend requires, in bytes.
    pub fn key_len(self) -> usize {
        match self {
            AeadKind::AesGcm(size) => size.key_len(),
            AeadKind::ChaCha20 => ChaCha20::key_len(),
        }
    }

    /// Encrypt using whichever backend this variant names.
    pub fn encrypt(
        self,
        plaintext: &[u8],
        key: &[u8],
        nonce: Option<[u8; NONCE_LEN]>,
        aad: Option<&[u8]>,
    ) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
        match self {
            AeadKind::AesGcm(AesKeySize::Bits128) => AesGcm128::encrypt(plaintext, key, nonce, aad),
            AeadKind::AesGcm(AesKeySize::Bits192) => AesGcm192::encrypt(plaintext, key, nonce, aad),
            AeadKind::AesGcm(AesKeySize::Bits256) => AesGcm256::encrypt(plaintext, key, nonce, aad),
            AeadKind::ChaCha20 => ChaCha20::encrypt(plaintext, key, nonce, aad),
        }
    }

    /// Decrypt using whichever backend this variant names.
    pub fn decrypt(
        self,
        ciphertext: &[u8],
        key: &[u8],
        nonce: &[u8; NONCE_LEN],
        aad: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        match self {
            AeadKind::AesGcm(AesKeySize::Bits128) => AesGcm128::decrypt(ciphertext, key, nonce, aad),
            AeadKind::AesGcm(AesKeySize::Bits192) => AesGcm192::decrypt(ciphertext, key, nonce, aad),
            AeadKind::AesGcm(AesKeySize::Bits256) => AesGcm256::decrypt(ciphertext, key, nonce, aad),
            AeadKind::ChaCha20 => ChaCha20::decrypt(ciphertext, key, nonce, aad),
        }
    }
}
