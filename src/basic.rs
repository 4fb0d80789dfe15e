//! Basic session: a single shared key derived from a one-shot KEM handshake.
//!
//! The minimal profile — one handshake, one derived key, AEAD in and out for
//! the lifetime of the session. It provides confidentiality but none of the
//! forward secrecy [`crate::ratchet::TripleRatchet`] gives; use it when a
//! coarser, cheaper profile is acceptable.

use rand::RngCore;
use zeroize::Zeroizing;

use crate::aead::{AeadKind, AesKeySize};
use crate::kdf::KdfKind;
use crate::{CryptoError, Result, NONCE_LEN};

/// State for the one-shot-KEM session profile.
pub struct BasicSession {
    kdf: KdfKind,
    aead: AeadKind,
    session_id: [u8; 16],
    encryption_key: Option<Zeroizing<Vec<u8>>>,
    handshake_done: bool,
}

impl BasicSession {
    /// Create a session with no key yet; `handshake_done` is false until
    /// [`BasicSession::complete_with_shared_secret`] runs.
    pub fn new(kdf: KdfKind, aead: AeadKind) -> Self {
        let mut session_id = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut session_id);
        Self {
            kdf,
            aead,
            session_id,
            encryption_key: None,
            handshake_done: false,
        }
    }

    /// This session's random 16-byte identifier.
    pub fn session_id(&self) -> [u8; 16] {
        self.session_id
    }

    /// Whether the handshake has completed and encrypt/decrypt are usable.
    pub fn handshake_done(&self) -> bool {
        self.handshake_done
    }

    /// Derive `session_keys["encryption"]` from a KEM shared secret and mark
    /// the handshake complete.
    pub fn complete_with_shared_secret(&mut self, shared_secret: &[u8]) -> Result<()> {
        let key = self
            .kdf
            .derive(shared_secret, self.aead.key_len(), None, None)?;
        self.encryption_key = Some(key);
        self.handshake_done = true;
        Ok(())
    }

    /// Replace the encryption key with one freshly derived from `ikm` via the
    /// configured KDF, without touching `handshake_done`. Used by
    /// [`crate::session::SessionManager::rotate_session_key`] — a coarse
    /// emergency re-key, not a source of forward secrecy.
    pub fn rotate_key(&mut self, ikm: &[u8]) -> Result<()> {
        let key = self.kdf.derive(ikm, self.aead.key_len(), None, None)?;
        self.encryption_key = Some(key);
        Ok(())
    }

    /// Encrypt `plaintext` under the session's encryption key.
    pub fn encrypt(&self, plaintext: &[u8], aad: Option<&[u8]>) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
        let key = self.require_key()?;
        self.aead.encrypt(plaintext, key, None, aad)
    }

    /// Decrypt `ciphertext` under the session's encryption key.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        nonce: &[u8; NONCE_LEN],
        aad: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let key = self.require_key()?;
        self.aead.decrypt(ciphertext, key, nonce, aad)
    }

    fn require_key(&self) -> Result<&[u8]> {
        if !self.handshake_done {
            return Err(CryptoError::SessionNotReady);
        }
        match &self.encryption_key {
            Some(key) if key.len() == self.aead.key_len() => Ok(key.as_slice()),
            Some(key) => Err(CryptoError::ConfigurationError(format!(
                "encryption key length {} does not match AEAD requirement {}",
                key.len(),
                self.aead.key_len()
            ))),
            None => Err(CryptoError::SessionNotReady),
        }
    }
}
