//! Session Manager: owns identity material and the active session, mediates
//! every external call, and selects which session profile and which
//! providers back it.

use rand::RngCore;
use zeroize::Zeroizing;

use crate::aead::{AeadKind, AesKeySize};
use crate::basic::BasicSession;
use crate::identity::{Identity, PeerIdentity};
use crate::kdf::KdfKind;
use crate::kem::{KemCiphertext, KemPublicKey, Kyber1024, KemProvider};
use crate::ratchet::{HandshakeMessage, RatchetMessage, TripleRatchet};
use crate::signature::{Dilithium3, Signature, SignPublicKey, SignatureProvider};
use crate::{CryptoError, Result, NONCE_LEN};

/// Which session profile a [`SessionManager`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// [`BasicSession`]: one handshake, one stable key.
    Basic,
    /// [`TripleRatchet`]: forward-secret chain, per-message signatures.
    Triple,
}

/// Construction-time choice of KDF, AEAD, and session profile. Immutable for
/// the lifetime of the [`SessionManager`] it configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Key derivation backend.
    pub kdf: KdfKind,
    /// Authenticated encryption backend.
    pub aead: AeadKind,
    /// Basic vs triple-ratchet session profile.
    pub mode: SessionMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            kdf: KdfKind::Sha3,
            aead: AeadKind::AesGcm(AesKeySize::Bits256),
            mode: SessionMode::Basic,
        }
    }
}

/// What [`SessionManager::init_session`] returns: either the local public
/// key to publish (responder) or a handshake value to send (initiator).
/// Which accessor is valid depends on which role was taken, mirroring the
/// two distinct return shapes the session engine's handshake produces.
pub enum HandshakeInit {
    /// No peer key was supplied: this side is the responder. Holds the
    /// local KEM public key to publish.
    Responder(KemPublicKey),
    /// A peer key was supplied: this side is the initiator, already
    /// encapsulated. Holds the ciphertext to send.
    Initiator(KemCiphertext),
    /// Triple-ratchet initiator output: ciphertext plus the signature
    /// binding it to this side's identity.
    TripleInitiator(HandshakeMessage),
}

impl HandshakeInit {
    /// Unwrap the responder's public key, or fail if this is an initiator
    /// result.
    pub fn into_public_key(self) -> Result<KemPublicKey> {
        match self {
            HandshakeInit::Responder(pk) => Ok(pk),
            _ => Err(CryptoError::InvalidArgument(
                "handshake result holds a ciphertext, not a public key".into(),
            )),
        }
    }

    /// Unwrap the initiator's KEM ciphertext, or fail if this is a
    /// responder result or a triple-ratchet result.
    pub fn into_ciphertext(self) -> Result<KemCiphertext> {
        match self {
            HandshakeInit::Initiator(ct) => Ok(ct),
            _ => Err(CryptoError::InvalidArgument(
                "handshake result does not hold a basic-session ciphertext".into(),
            )),
        }
    }

    /// Unwrap the signed triple-ratchet handshake message, or fail
    /// otherwise.
    pub fn into_handshake_message(self) -> Result<HandshakeMessage> {
        match self {
            HandshakeInit::TripleInitiator(msg) => Ok(msg),
            _ => Err(CryptoError::InvalidArgument(
                "handshake result does not hold a triple-ratchet handshake message".into(),
            )),
        }
    }
}

/// Owns identity material and the currently active session; the only type
/// applications need to touch directly.
pub struct SessionManager {
    config: SessionConfig,
    identity: Identity,
    peer: PeerIdentity,
    basic: Option<BasicSession>,
    ratchet: Option<TripleRatchet>,
}

impl SessionManager {
    /// Generate fresh identity keys and an empty session under `config`.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            identity: Identity::generate(),
            peer: PeerIdentity::new(),
            basic: None,
            ratchet: None,
        }
    }

    /// This manager's long-lived identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The remote peer's cached public keys.
    pub fn peer(&self) -> &PeerIdentity {
        &self.peer
    }

    /// Record the peer's KEM public key, needed to initiate a handshake.
    pub fn set_peer_kem_public(&mut self, key: KemPublicKey) {
        self.peer.set_kem_public(key);
    }

    /// Record the peer's signature public key, needed to verify incoming
    /// signed messages.
    pub fn set_peer_sign_public(&mut self, key: SignPublicKey) {
        self.peer.set_sign_public(key);
    }

    /// Start a basic session. With no peer key, returns the local KEM
    /// public key to publish (responder path). With a peer key, encapsulates
    /// against it, derives the encryption key, and returns the ciphertext to
    /// send (initiator path).
    pub fn init_session(&mut self, peer_kem_public: Option<&KemPublicKey>) -> Result<HandshakeInit> {
        let mut session = BasicSession::new(self.config.kdf, self.config.aead);
        match peer_kem_public {
            Some(peer_pk) => {
                tracing::debug!(target: "crypto::session", "basic handshake started as initiator");
                self.peer.set_kem_public(peer_pk.clone());
                let (ciphertext, shared_secret) = Kyber1024::encapsulate(peer_pk)?;
                session.complete_with_shared_secret(&shared_secret)?;
                self.basic = Some(session);
                tracing::debug!(target: "crypto::session", "basic handshake complete as initiator");
                Ok(HandshakeInit::Initiator(ciphertext))
            }
            None => {
                self.basic = Some(session);
                tracing::debug!(target: "crypto::session", "published KEM public key as responder");
                Ok(HandshakeInit::Responder(self.identity.kem_public().clone()))
            }
        }
    }

    /// Responder path: decapsulate the initiator's ciphertext under the
    /// local KEM secret key and complete the basic session.
    pub fn complete_handshake(&mut self, kem_ciphertext: &KemCiphertext) -> Result<()> {
        let shared_secret = Kyber1024::decapsulate(kem_ciphertext, self.identity.kem_secret())?;
        let session = self.basic.get_or_insert_with(|| {
            BasicSession::new(self.config.kdf, self.config.aead)
        });
        session.complete_with_shared_secret(&shared_secret)?;
        tracing::debug!(target: "crypto::session", "basic handshake complete as responder");
        Ok(())
    }

    /// Encrypt under the active basic session.
    pub fn encrypt(&self, plaintext: &[u8], aad: Option<&[u8]>) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
        self.basic_session()?.encrypt(plaintext, aad)
    }

    /// Decrypt under the active basic session.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        nonce: &[u8; NONCE_LEN],
        aad: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        self.basic_session()?.decrypt(ciphertext, nonce, aad)
    }

    /// Sign a message with this manager's own signature secret key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Dilithium3::sign(message, self.identity.sign_secret())
    }

    /// Verify a signature. When `public_key` is omitted, falls back to the
    /// peer's cached signature public key, failing with `InvalidArgument` if
    /// neither is available.
    pub fn verify(
        &self,
        message: &[u8],
        signature: &Signature,
        public_key: Option<&SignPublicKey>,
    ) -> Result<bool> {
        let key = public_key.or_else(|| self.peer.sign_public()).ok_or_else(|| {
            CryptoError::InvalidArgument("no signature public key available to verify against".into())
        })?;
        Ok(Dilithium3::verify(message, signature, key))
    }

    /// Coarse emergency re-key for the basic session: derive a new
    /// encryption key from fresh random input keying material. Provides no
    /// forward secrecy; use the triple ratchet for that.
    pub fn rotate_session_key(&mut self) -> Result<()> {
        let mut ikm = Zeroizing::new(vec![0u8; 32]);
        rand::thread_rng().fill_bytes(&mut ikm);
        self.basic_session_mut()?.rotate_key(&ikm)?;
        tracing::debug!(target: "crypto::session", "basic session key rotated (coarse re-key, no forward secrecy)");
        Ok(())
    }

    fn basic_session(&self) -> Result<&BasicSession> {
        self.basic.as_ref().ok_or(CryptoError::SessionNotReady)
    }

    fn basic_session_mut(&mut self) -> Result<&mut BasicSession> {
        self.basic.as_mut().ok_or(CryptoError::SessionNotReady)
    }

    fn ratchet_mut(&mut self) -> &mut TripleRatchet {
        self.ratchet
            .get_or_insert_with(|| TripleRatchet::new(self.config.kdf, self.config.aead))
    }

    /// Triple-ratchet initiator path: encapsulate against and record the
    /// peer's KEM and signature public keys, producing a signed handshake
    /// message to send.
    pub fn triple_ratchet_init(
        &mut self,
        peer_kem_public: &KemPublicKey,
        peer_sign_public: &SignPublicKey,
    ) -> Result<HandshakeInit> {
        self.peer.set_kem_public(peer_kem_public.clone());
        self.peer.set_sign_public(peer_sign_public.clone());
        let (ratchet, message) = TripleRatchet::initiate(
            self.config.kdf,
            self.config.aead,
            peer_kem_public,
            self.identity.sign_secret(),
        )?;
        self.ratchet = Some(ratchet);
        tracing::debug!(target: "crypto::session", "triple ratchet session manager initiated as initiator");
        Ok(HandshakeInit::TripleInitiator(message))
    }

    /// Triple-ratchet responder path: verify and decapsulate the
    /// initiator's handshake message against `peer_sign_public`, seeding
    /// both chains.
    pub fn triple_ratchet_complete_handshake(
        &mut self,
        message: &HandshakeMessage,
        peer_sign_public: &SignPublicKey,
    ) -> Result<()> {
        self.peer.set_sign_public(peer_sign_public.clone());
        let kdf = self.config.kdf;
        let aead = self.config.aead;
        let ratchet = self.ratchet.get_or_insert_with(|| TripleRatchet::new(kdf, aead));
        ratchet.complete_handshake(message, self.identity.kem_secret(), peer_sign_public)
    }

    /// Encrypt and advance the send chain of the active triple ratchet.
    pub fn triple_ratchet_encrypt(
        &mut self,
        plaintext: &[u8],
        aad: Option<&[u8]>,
    ) -> Result<RatchetMessage> {
        let kdf = self.config.kdf;
        let aead = self.config.aead;
        let ratchet = self.ratchet.get_or_insert_with(|| TripleRatchet::new(kdf, aead));
        ratchet.ratchet_encrypt(plaintext, self.identity.sign_secret(), aad)
    }

    /// Verify, decrypt, and advance the receive chain of the active triple
    /// ratchet.
    pub fn triple_ratchet_decrypt(
        &mut self,
        message: &RatchetMessage,
        aad: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let peer_sign_public = self
            .peer
            .sign_public()
            .ok_or_else(|| {
                CryptoError::InvalidArgument("peer signature public key is not set".into())
            })?
            .clone();
        self.ratchet_mut().ratchet_decrypt(message, &peer_sign_public, aad)
    }

    /// The active triple ratchet's next expected incoming chain position.
    /// Mirrors [`SessionManager::triple_ratchet_encrypt`]/`decrypt`'s
    /// get-or-insert: reading this before any handshake lazily creates an
    /// empty ratchet, so it reports 0 rather than failing.
    pub fn triple_ratchet_recv_message_number(&mut self) -> u64 {
        self.ratchet_mut().recv_message_number()
    }
}

#[cfg(any(test, feature = "self-test"))]
impl SessionManager {
    /// Self-test-only affordance: seed `session_keys["encryption"]` with
    /// random bytes and mark the basic session ready without running a
    /// handshake. Never reachable outside `cfg(test)` or the `self-test`
    /// feature — production callers must always go through
    /// [`SessionManager::init_session`] / [`SessionManager::complete_handshake`].
    pub fn self_test_seed_basic_session(&mut self) -> Result<()> {
        let mut ikm = Zeroizing::new(vec![0u8; 32]);
        rand::thread_rng().fill_bytes(&mut ikm);
        let mut session = BasicSession::new(self.config.kdf, self.config.aead);
        session.complete_with_shared_secret(&ikm)?;
        self.basic = Some(session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_round_trip_s1() {
        let mut bob = SessionManager::new(SessionConfig::default());
        let bob_pub = bob.init_session(None).unwrap().into_public_key().unwrap();

        let mut alice = SessionManager::new(SessionConfig::default());
        let ct = alice
            .init_session(Some(&bob_pub))
            .unwrap()
            .into_ciphertext()
            .unwrap();

        bob.complete_handshake(&ct).unwrap();

        let (ciphertext, nonce) = alice.encrypt(b"hello", None).unwrap();
        let plaintext = bob.decrypt(&ciphertext, &nonce, None).unwrap();
        assert_eq!(plaintext, b"hello");
    }

    #[test]
    fn signature_sign_and_verify_s2() {
        let alice = SessionManager::new(SessionConfig::default());
        let sig = alice.sign(b"msg");
        assert!(alice.verify(b"msg", &sig, Some(alice.identity().sign_public())).unwrap());

        let mut tampered_bytes = sig.as_bytes().to_vec();
        let last = tampered_bytes.len() - 1;
        tampered_bytes[last] ^= 0xFF;
        let tampered = Signature::from_bytes(&tampered_bytes).unwrap();
        assert!(!alice.verify(b"msg", &tampered, Some(alice.identity().sign_public())).unwrap());
    }

    #[test]
    fn encrypt_before_handshake_fails_with_session_not_ready() {
        let alice = SessionManager::new(SessionConfig::default());
        assert!(matches!(
            alice.encrypt(b"hi", None),
            Err(CryptoError::SessionNotReady)
        ));
    }

    #[test]
    fn triple_ratchet_five_message_flow_s3() {
        let mut alice = SessionManager::new(SessionConfig {
            mode: SessionMode::Triple,
            ..SessionConfig::default()
        });
        let mut bob = SessionManager::new(SessionConfig {
            mode: SessionMode::Triple,
            ..SessionConfig::default()
        });

        let bob_kem_pub = bob.identity().kem_public().clone();
        let bob_sign_pub = bob.identity().sign_public().clone();
        let alice_sign_pub = alice.identity().sign_public().clone();

        let handshake = alice
            .triple_ratchet_init(&bob_kem_pub, &bob_sign_pub)
            .unwrap()
            .into_handshake_message()
            .unwrap();
        bob.triple_ratchet_complete_handshake(&handshake, &alice_sign_pub)
            .unwrap();

        for n in 0..5u8 {
            let plaintext = format!("msg{n}").into_bytes();
            let msg = alice.triple_ratchet_encrypt(&plaintext, None).unwrap();
            assert_eq!(msg.message_number, n as u64);
            let out = bob.triple_ratchet_decrypt(&msg, None).unwrap();
            assert_eq!(out, plaintext);
        }
    }

    #[test]
    fn triple_ratchet_replay_is_rejected_s4() {
        let mut alice = SessionManager::new(SessionConfig {
            mode: SessionMode::Triple,
            ..SessionConfig::default()
        });
        let mut bob = SessionManager::new(SessionConfig {
            mode: SessionMode::Triple,
            ..SessionConfig::default()
        });
        let bob_kem_pub = bob.identity().kem_public().clone();
        let bob_sign_pub = bob.identity().sign_public().clone();
        let alice_sign_pub = alice.identity().sign_public().clone();
        let handshake = alice
            .triple_ratchet_init(&bob_kem_pub, &bob_sign_pub)
            .unwrap()
            .into_handshake_message()
            .unwrap();
        bob.triple_ratchet_complete_handshake(&handshake, &alice_sign_pub)
            .unwrap();

        let msg = alice.triple_ratchet_encrypt(b"msg0", None).unwrap();
        bob.triple_ratchet_decrypt(&msg, None).unwrap();
        assert!(matches!(
            bob.triple_ratchet_decrypt(&msg, None),
            Err(CryptoError::AuthenticationFailure(_))
        ));
    }

    #[test]
    fn aad_mismatch_fails_decrypt_s6() {
        let mut bob = SessionManager::new(SessionConfig::default());
        let bob_pub = bob.init_session(None).unwrap().into_public_key().unwrap();
        let mut alice = SessionManager::new(SessionConfig::default());
        let ct = alice
            .init_session(Some(&bob_pub))
            .unwrap()
            .into_ciphertext()
            .unwrap();
        bob.complete_handshake(&ct).unwrap();

        let (ciphertext, nonce) = alice.encrypt(b"hello", Some(b"ctx1")).unwrap();
        assert!(matches!(
            bob.decrypt(&ciphertext, &nonce, Some(b"ctx2")),
            Err(CryptoError::AuthenticationFailure(_))
        ));
    }

    #[test]
    fn two_session_managers_are_independent_s11() {
        let mut bob = SessionManager::new(SessionConfig::default());
        let bob_pub = bob.init_session(None).unwrap().into_public_key().unwrap();
        let mut alice = SessionManager::new(SessionConfig::default());
        alice.init_session(Some(&bob_pub)).unwrap();

        let mut mallory = SessionManager::new(SessionConfig::default());
        let mallory_pub = mallory.init_session(None).unwrap().into_public_key().unwrap();
        assert_ne!(mallory_pub.as_bytes(), bob_pub.as_bytes());
    }

    #[test]
    fn self_test_seed_marks_basic_session_ready() {
        let mut alice = SessionManager::new(SessionConfig::default());
        alice.self_test_seed_basic_session().unwrap();
        let (ct, nonce) = alice.encrypt(b"hi", None).unwrap();
        assert_eq!(alice.decrypt(&ct, &nonce, None).unwrap(), b"hi");
    }
}
