//! Digital signature provider.
//!
//! The default backend is ML-DSA-65 (Dilithium3), NIST FIPS 204. `verify`
//! returns `bool` by contract — it never raises, even for malformed
//! signatures or public keys, which are simply treated as not verifying.

use pqcrypto_dilithium::dilithium3;
use pqcrypto_traits::sign::{
    DetachedSignature as _, PublicKey as _, SecretKey as _,
};

use crate::{CryptoError, Result};

/// A signature public key, opaque outside this module.
#[derive(Clone)]
pub struct SignPublicKey(dilithium3::PublicKey);

/// A signature secret key.
pub struct SignSecretKey(dilithium3::SecretKey);

/// A detached signature over a message.
#[derive(Clone)]
pub struct Signature(dilithium3::DetachedSignature);

impl SignPublicKey {
    /// Borrow the raw bytes of this public key.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Parse a public key from its fixed-length byte encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        dilithium3::PublicKey::from_bytes(bytes)
            .map(SignPublicKey)
            .map_err(|_| {
                CryptoError::InvalidArgument(format!(
                    "signature public key must be {} bytes, got {}",
                    dilithium3::public_key_bytes(),
                    bytes.len()
                ))
            })
    }
}

impl Signature {
    /// Borrow the raw bytes of this signature.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Parse a signature from its byte encoding. A length mismatch is an
    /// `InvalidArgument`, not an authentication failure — it means the caller
    /// handed us something that cannot possibly be a signature.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        dilithium3::DetachedSignature::from_bytes(bytes)
            .map(Signature)
            .map_err(|_| {
                CryptoError::InvalidArgument(format!(
                    "signature must be {} bytes, got {}",
                    dilithium3::signature_bytes(),
                    bytes.len()
                ))
            })
    }
}

/// Behavior every signature backend must provide.
pub trait SignatureProvider {
    /// Generate a fresh signing keypair.
    fn generate_keypair() -> (SignPublicKey, SignSecretKey);

    /// Sign a message with the local secret key.
    fn sign(message: &[u8], secret_key: &SignSecretKey) -> Signature;

    /// Verify a signature over a message against a public key. Returns
    /// `false` — never an error — for a bit-flip in any of message,
    /// signature, or public key.
    fn verify(message: &[u8], signature: &Signature, public_key: &SignPublicKey) -> bool;
}

/// ML-DSA-65 (Dilithium3) provider.
pub struct Dilithium3;

impl SignatureProvider for Dilithium3 {
    fn generate_keypair() -> (SignPublicKey, SignSecretKey) {
        let (pk, sk) = dilithium3::keypair();
        (SignPublicKey(pk), SignSecretKey(sk))
    }

    fn sign(message: &[u8], secret_key: &SignSecretKey) -> Signature {
        Signature(dilithium3::detached_sign(message, &secret_key.0))
    }

    fn verify(message: &[u8], signature: &Signature, public_key: &SignPublicKey) -> bool {
        dilithium3::verify_detached_signature(&signature.0, message, &public_key.0).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_a_genuine_signature() {
        let (pk, sk) = Dilithium3::generate_keypair();
        let msg = b"triple ratchet handshake ciphertext";
        let sig = Dilithium3::sign(msg, &sk);
        assert!(Dilithium3::verify(msg, &sig, &pk));
    }

    #[test]
    fn verify_rejects_a_tampered_message() {
        let (pk, sk) = Dilithium3::generate_keypair();
        let sig = Dilithium3::sign(b"original", &sk);
        assert!(!Dilithium3::verify(b"tampered!", &sig, &pk));
    }

    #[test]
    fn verify_rejects_a_tampered_signature() {
        let (pk, sk) = Dilithium3::generate_keypair();
        let msg = b"original";
        let sig = Dilithium3::sign(msg, &sk);
        let mut bytes = sig.as_bytes().to_vec();
        bytes[0] ^= 0xFF;
        let tampered = Signature::from_bytes(&bytes).unwrap();
        assert!(!Dilithium3::verify(msg, &tampered, &pk));
    }

    #[test]
    fn verify_rejects_a_foreign_public_key() {
        let (_pk_a, sk_a) = Dilithium3::generate_keypair();
        let (pk_b, _sk_b) = Dilithium3::generate_keypair();
        let msg = b"original";
        let sig = Dilithium3::sign(msg, &sk_a);
        assert!(!Dilithium3::verify(msg, &sig, &pk_b));
    }

    #[test]
    fn malformed_signature_bytes_are_rejected_as_invalid_argument() {
        let bytes = vec![0u8; 4];
        assert!(matches!(
            Signature::from_bytes(&bytes),
            Err(CryptoError::InvalidArgument(_))
        ));
    }
}
