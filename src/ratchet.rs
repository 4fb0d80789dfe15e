//! Triple ratchet: signed KEM handshake plus a Double-Ratchet-style chain
//! advance, giving forward secrecy and per-message sender authenticity
//! against a quantum adversary.
//!
//! Unlike the classic Double Ratchet, the asymmetric step here is a single
//! KEM handshake at session start, not a fresh Diffie-Hellman per message:
//! once `send_chain_key`/`recv_chain_key` are seeded from the handshake's
//! shared secret, each direction advances independently by hashing its own
//! chain key forward. [`TripleRatchet::rekey`] is the only way to fold in
//! fresh KEM material later, and it is never invoked automatically.

use std::collections::{HashMap, VecDeque};

use zeroize::Zeroizing;

use crate::aead::{AeadKind, AesKeySize};
use crate::kdf::KdfKind;
use crate::kem::{KemCiphertext, KemProvider, KemPublicKey, KemSecretKey, Kyber1024};
use crate::signature::{Dilithium3, SignPublicKey, SignSecretKey, Signature, SignatureProvider};
use crate::{CryptoError, Result, NONCE_LEN};

/// Maximum number of out-of-order message keys retained for later delivery.
/// The oldest entry is dropped once this bound is exceeded.
const SKIPPED_KEY_CACHE_LIMIT: usize = 1024;

/// The ciphertext and signature exchanged to establish a ratchet.
pub struct HandshakeMessage {
    /// The KEM ciphertext encapsulated against the responder's public key.
    pub ciphertext: KemCiphertext,
    /// The initiator's signature over `ciphertext`'s bytes, binding the
    /// handshake to the initiator's long-lived identity.
    pub signature: Signature,
}

/// A single ratcheted message: ciphertext, nonce, chain position, and the
/// signature binding it to the sender's identity.
pub struct RatchetMessage {
    /// Position in the sender's chain; lets the receiver detect gaps and
    /// replays.
    pub message_number: u64,
    /// AEAD ciphertext.
    pub ciphertext: Vec<u8>,
    /// AEAD nonce used for `ciphertext`.
    pub nonce: [u8; NONCE_LEN],
    /// Signature over `ciphertext`, verified before any decryption attempt.
    pub signature: Signature,
}

/// State for the forward-secret ratchet profile.
pub struct TripleRatchet {
    kdf: KdfKind,
    aead: AeadKind,
    root_key: Option<Zeroizing<Vec<u8>>>,
    send_chain_key: Option<Zeroizing<Vec<u8>>>,
    recv_chain_key: Option<Zeroizing<Vec<u8>>>,
    send_message_number: u64,
    recv_message_number: u64,
    skipped_message_keys: HashMap<u64, Zeroizing<Vec<u8>>>,
    skipped_order: VecDeque<u64>,
    handshake_done: bool,
}

impl TripleRatchet {
    /// An empty ratchet with no chain keys yet.
    pub fn new(kdf: KdfKind, aead: AeadKind) -> Self {
        Self {
            kdf,
            aead,
            root_key: None,
            send_chain_key: None,
            recv_chain_key: None,
            send_message_number: 0,
            recv_message_number: 0,
            skipped_message_keys: HashMap::new(),
            skipped_order: VecDeque::new(),
            handshake_done: false,
        }
    }

    /// Whether the handshake has completed and the chains are seeded.
    pub fn handshake_done(&self) -> bool {
        self.handshake_done
    }

    /// This side's next outgoing chain position.
    pub fn send_message_number(&self) -> u64 {
        self.send_message_number
    }

    /// This side's next expected incoming chain position.
    pub fn recv_message_number(&self) -> u64 {
        self.recv_message_number
    }

    /// Act as the initiator: encapsulate against the peer's KEM public key,
    /// sign the resulting ciphertext, and seed both chains from the shared
    /// secret.
    pub fn initiate(
        kdf: KdfKind,
        aead: AeadKind,
        peer_kem_public: &KemPublicKey,
        sign_secret: &SignSecretKey,
    ) -> Result<(Self, HandshakeMessage)> {
        tracing::debug!(target: "crypto::ratchet", "initiating triple ratchet handshake");
        let (ciphertext, shared_secret) = Kyber1024::encapsulate(peer_kem_public)?;
        let signature = Dilithium3::sign(ciphertext.as_bytes(), sign_secret);
        let mut ratchet = Self::new(kdf, aead);
        ratchet.seed_chains(&shared_secret)?;
        tracing::debug!(target: "crypto::ratchet", "triple ratchet chains seeded as initiator");
        Ok((ratchet, HandshakeMessage { ciphertext, signature }))
    }

    /// Act as the responder: verify the initiator's signature over the
    /// handshake ciphertext, decapsulate it, and seed both chains from the
    /// recovered shared secret.
    pub fn complete_handshake(
        &mut self,
        message: &HandshakeMessage,
        own_kem_secret: &KemSecretKey,
        peer_sign_public: &SignPublicKey,
    ) -> Result<()> {
        if !Dilithium3::verify(message.ciphertext.as_bytes(), &message.signature, peer_sign_public) {
            tracing::warn!(target: "crypto::ratchet", "handshake signature failed to verify");
            return Err(CryptoError::AuthenticationFailure(
                "triple ratchet handshake signature did not verify".into(),
            ));
        }
        let shared_secret = Kyber1024::decapsulate(&message.ciphertext, own_kem_secret)?;
        self.seed_chains(&shared_secret)?;
        tracing::debug!(target: "crypto::ratchet", "triple ratchet chains seeded as responder");
        Ok(())
    }

    fn seed_chains(&mut self, shared_secret: &[u8]) -> Result<()> {
        let root_key = self
            .kdf
            .derive(shared_secret, self.aead.key_len(), None, Some(b"triple-ratchet-root"))?;
        self.send_chain_key = Some(root_key.clone());
        self.recv_chain_key = Some(root_key.clone());
        self.root_key = Some(root_key);
        self.handshake_done = true;
        Ok(())
    }

    /// Manually fold fresh KEM material into the root key, replacing both
    /// chains and resetting both message counters and the skipped-key cache.
    /// Never invoked automatically; callers decide when a re-key is due.
    pub fn rekey(&mut self, fresh_shared_secret: &[u8]) -> Result<()> {
        let root_key = self.root_key.as_ref().ok_or(CryptoError::SessionNotReady)?;
        let mut combined = root_key.to_vec();
        combined.extend_from_slice(fresh_shared_secret);
        let new_root = self
            .kdf
            .derive(&combined, self.aead.key_len(), None, Some(b"triple-ratchet-rekey"))?;
        self.send_chain_key = Some(new_root.clone());
        self.recv_chain_key = Some(new_root.clone());
        self.root_key = Some(new_root);
        self.send_message_number = 0;
        self.recv_message_number = 0;
        self.skipped_message_keys.clear();
        self.skipped_order.clear();
        tracing::debug!(target: "crypto::ratchet", "manual rekey: root and both chains reset");
        Ok(())
    }

    /// The message N key is the chain key's current value; advancing to
    /// message N+1 means replacing it with `KDF(chain_key, aead_key_len)`.
    /// Matching this order bit-for-bit on both ends is what keeps sender and
    /// receiver in lockstep.
    fn chain_advance(&self, chain_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.kdf.derive(chain_key, self.aead.key_len(), None, Some(b"triple-ratchet-chain"))
    }

    /// Encrypt `plaintext`, sign the ciphertext, and advance the send chain.
    pub fn ratchet_encrypt(
        &mut self,
        plaintext: &[u8],
        sign_secret: &SignSecretKey,
        aad: Option<&[u8]>,
    ) -> Result<RatchetMessage> {
        if !self.handshake_done {
            return Err(CryptoError::SessionNotReady);
        }
        let chain_key = self.send_chain_key.as_ref().ok_or(CryptoError::SessionNotReady)?.clone();
        let next_chain_key = self.chain_advance(&chain_key)?;
        let (ciphertext, nonce) = self.aead.encrypt(plaintext, &chain_key, None, aad)?;
        let signature = Dilithium3::sign(&ciphertext, sign_secret);
        let message_number = self.send_message_number;

        self.send_chain_key = Some(next_chain_key);
        self.send_message_number += 1;

        tracing::trace!(
            target: "crypto::ratchet",
            msg_num = message_number,
            "send chain advanced"
        );

        Ok(RatchetMessage {
            message_number,
            ciphertext,
            nonce,
            signature,
        })
    }

    /// Verify, decrypt, and advance the receive chain for an incoming
    /// message. Messages arriving ahead of the expected position derive and
    /// cache the intervening keys; messages behind it are served from that
    /// cache or rejected as a replay.
    pub fn ratchet_decrypt(
        &mut self,
        message: &RatchetMessage,
        peer_sign_public: &SignPublicKey,
        aad: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        if !self.handshake_done {
            return Err(CryptoError::SessionNotReady);
        }
        if !Dilithium3::verify(&message.ciphertext, &message.signature, peer_sign_public) {
            tracing::warn!(
                target: "crypto::ratchet",
                msg_num = message.message_number,
                "message signature failed to verify"
            );
            return Err(CryptoError::AuthenticationFailure(
                "ratchet message signature did not verify".into(),
            ));
        }

        if message.message_number < self.recv_message_number {
            // Peek, don't remove: a failed decrypt here (tampered ciphertext)
            // must leave the cache intact so a later unmodified retransmission
            // can still be recovered.
            let key = self.skipped_message_keys.get(&message.message_number).ok_or_else(|| {
                tracing::warn!(
                    target: "crypto::ratchet",
                    msg_num = message.message_number,
                    recv_message_number = self.recv_message_number,
                    "replay or stale out-of-order message rejected"
                );
                CryptoError::AuthenticationFailure(format!(
                    "message {} already consumed or evicted from the skipped-key cache",
                    message.message_number
                ))
            })?;
            let plaintext = self.aead.decrypt(&message.ciphertext, key, &message.nonce, aad)?;
            self.skipped_message_keys.remove(&message.message_number);
            self.skipped_order.retain(|n| *n != message.message_number);
            tracing::trace!(
                target: "crypto::ratchet",
                msg_num = message.message_number,
                "out-of-order message recovered from skipped-key cache"
            );
            return Ok(plaintext);
        }

        // Bound the gap before deriving anything: an attacker-chosen
        // message_number (e.g. u64::MAX) must not force unbounded KDF
        // derivation ahead of the AEAD tag check below.
        if message.message_number - self.recv_message_number > SKIPPED_KEY_CACHE_LIMIT as u64 {
            tracing::warn!(
                target: "crypto::ratchet",
                msg_num = message.message_number,
                recv_message_number = self.recv_message_number,
                "rejected message_number too far ahead of the receive chain"
            );
            return Err(CryptoError::AuthenticationFailure(format!(
                "message {} is more than {} positions ahead of the receive chain",
                message.message_number, SKIPPED_KEY_CACHE_LIMIT
            )));
        }

        // Derive every intervening chain key into a scratch buffer first;
        // nothing on `self` is mutated until the target message's AEAD tag
        // has actually verified, so a failed decrypt leaves recv state and
        // the skipped-key cache exactly as they were.
        let mut chain_key = self
            .recv_chain_key
            .clone()
            .ok_or(CryptoError::SessionNotReady)?;
        let mut derived = Vec::new();
        let mut number = self.recv_message_number;
        while number < message.message_number {
            let next_chain_key = self.chain_advance(&chain_key)?;
            derived.push((number, chain_key));
            chain_key = next_chain_key;
            number += 1;
        }
        let next_chain_key = self.chain_advance(&chain_key)?;
        let plaintext = self.aead.decrypt(&message.ciphertext, &chain_key, &message.nonce, aad)?;

        for (skipped_number, skipped_key) in derived {
            self.cache_skipped_key(skipped_number, skipped_key);
        }
        self.recv_chain_key = Some(next_chain_key);
        self.recv_message_number = message.message_number + 1;
        tracing::trace!(
            target: "crypto::ratchet",
            msg_num = message.message_number,
            "recv chain advanced"
        );
        Ok(plaintext)
    }

    fn cache_skipped_key(&mut self, message_number: u64, key: Zeroizing<Vec<u8>>) {
        if self.skipped_message_keys.len() >= SKIPPED_KEY_CACHE_LIMIT {
            if let Some(oldest) = self.skipped_order.pop_front() {
                self.skipped_message_keys.remove(&oldest);
            }
        }
        self.skipped_order.push_back(message_number);
        self.skipped_message_keys.insert(message_number, key);
    }
}
