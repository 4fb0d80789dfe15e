//! Long-lived identity material and the peer identity cache.

use crate::kem::{KemPublicKey, KemSecretKey, Kyber1024, KemProvider};
use crate::signature::{Dilithium3, SignPublicKey, SignSecretKey, SignatureProvider};

/// A party's own KEM and signature keypairs.
///
/// Generated once at [`crate::session::SessionManager`] construction and
/// immutable thereafter; private halves never leave this struct's owner.
pub struct Identity {
    kem_public: KemPublicKey,
    kem_secret: KemSecretKey,
    sign_public: SignPublicKey,
    sign_secret: SignSecretKey,
}

impl Identity {
    /// Generate a fresh KEM keypair and a fresh signature keypair.
    pub fn generate() -> Self {
        let (kem_public, kem_secret) = Kyber1024::generate_keypair();
        let (sign_public, sign_secret) = Dilithium3::generate_keypair();
        Self {
            kem_public,
            kem_secret,
            sign_public,
            sign_secret,
        }
    }

    /// This identity's KEM public key.
    pub fn kem_public(&self) -> &KemPublicKey {
        &self.kem_public
    }

    /// This identity's KEM secret key.
    pub fn kem_secret(&self) -> &KemSecretKey {
        &self.kem_secret
    }

    /// This identity's signature public key.
    pub fn sign_public(&self) -> &SignPublicKey {
        &self.sign_public
    }

    /// This identity's signature secret key.
    pub fn sign_secret(&self) -> &SignSecretKey {
        &self.sign_secret
    }
}

/// The remote peer's public keys, each unset until learned.
///
/// To initiate a handshake, `kem_public` must be set. To verify an incoming
/// signed message, `sign_public` must be set (unless the caller supplies one
/// explicitly for that single call).
#[derive(Default)]
pub struct PeerIdentity {
    kem_public: Option<KemPublicKey>,
    sign_public: Option<SignPublicKey>,
}

impl PeerIdentity {
    /// An empty peer identity cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the peer's KEM public key.
    pub fn set_kem_public(&mut self, key: KemPublicKey) {
        self.kem_public = Some(key);
    }

    /// Record the peer's signature public key.
    pub fn set_sign_public(&mut self, key: SignPublicKey) {
        self.sign_public = Some(key);
    }

    /// The peer's KEM public key, if known.
    pub fn kem_public(&self) -> Option<&KemPublicKey> {
        self.kem_public.as_ref()
    }

    /// The peer's signature public key, if known.
    pub fn sign_public(&self) -> Option<&SignPublicKey> {
        self.sign_public.as_ref()
    }
}
