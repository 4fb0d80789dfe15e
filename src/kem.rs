//! Key Encapsulation Mechanism provider.
//!
//! The default backend is ML-KEM-1024 (Kyber-1024), NIST security category 5.
//! Per spec, KEM is "fail-closed": a corrupted ciphertext or the wrong secret
//! key produces a different, deterministic-pseudorandom shared secret rather
//! than an error. Callers rely on downstream AEAD authentication to detect
//! this; this provider never tries to detect it itself.

use pqcrypto_kyber::kyber1024;
use pqcrypto_traits::kem::{
    Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _,
};
use zeroize::Zeroizing;

use crate::{CryptoError, Result};

/// A KEM public key, opaque outside this module.
#[derive(Clone)]
pub struct KemPublicKey(kyber1024::PublicKey);

/// A KEM secret key. `pqcrypto-kyber` zeroizes its own secret key storage on
/// drop; this wrapper never copies the bytes out except into the
/// `Zeroizing`-wrapped shared secret returned by `decapsulate`.
pub struct KemSecretKey(kyber1024::SecretKey);

/// A KEM ciphertext produced by `encapsulate`.
#[derive(Clone)]
pub struct KemCiphertext(kyber1024::Ciphertext);

impl KemPublicKey {
    /// Borrow the raw bytes of this public key.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Parse a public key from its fixed-length byte encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        kyber1024::PublicKey::from_bytes(bytes)
            .map(KemPublicKey)
            .map_err(|_| {
                CryptoError::InvalidArgument(format!(
                    "KEM public key must be {} bytes, got {}",
                    kyber1024::public_key_bytes(),
                    bytes.len()
                ))
            })
    }
}

impl KemCiphertext {
    /// Borrow the raw bytes of this ciphertext.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Parse a ciphertext from its fixed-length byte encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        kyber1024::Ciphertext::from_bytes(bytes)
            .map(KemCiphertext)
            .map_err(|_| {
                CryptoError::InvalidArgument(format!(
                    "KEM ciphertext must be {} bytes, got {}",
                    kyber1024::ciphertext_bytes(),
                    bytes.len()
                ))
            })
    }
}

/// Behavior every KEM backend must provide.
pub trait KemProvider {
    /// Generate a fresh keypair.
    fn generate_keypair() -> (KemPublicKey, KemSecretKey);

    /// Encapsulate against a peer's public key, producing a ciphertext and
    /// the shared secret only the holder of the matching secret key can
    /// recover.
    fn encapsulate(public_key: &KemPublicKey) -> Result<(KemCiphertext, Zeroizing<Vec<u8>>)>;

    /// Recover the shared secret from a ciphertext using the local secret
    /// key. Never fails on a mismatched key or tampered ciphertext — it
    /// silently returns an unrelated shared secret, per the KEM fail-closed
    /// contract.
    fn decapsulate(
        ciphertext: &KemCiphertext,
        secret_key: &KemSecretKey,
    ) -> Result<Zeroizing<Vec<u8>>>;
}

/// ML-KEM-1024 (Kyber-1024) provider.
pub struct Kyber1024;

impl KemProvider for Kyber1024 {
    fn generate_keypair() -> (KemPublicKey, KemSecretKey) {
        let (pk, sk) = kyber1024::keypair();
        (KemPublicKey(pk), KemSecretKey(sk))
    }

    fn encapsulate(public_key: &KemPublicKey) -> Result<(KemCiphertext, Zeroizing<Vec<u8>>)> {
        let (ss, ct) = kyber1024::encapsulate(&public_key.0);
        if ss.as_bytes().len() != kyber1024::shared_secret_bytes() {
            return Err(CryptoError::Corruption(
                "KEM encapsulate produced a shared secret of unexpected length".into(),
            ));
        }
        Ok((KemCiphertext(ct), Zeroizing::new(ss.as_bytes().to_vec())))
    }

    fn decapsulate(
        ciphertext: &KemCiphertext,
        secret_key: &KemSecretKey,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let ss = kyber1024::decapsulate(&ciphertext.0, &secret_key.0);
        if ss.as_bytes().len() != kyber1024::shared_secret_bytes() {
            return Err(CryptoError::Corruption(
                "KEM decapsulate produced a shared secret of unexpected length".into(),
            ));
        }
        Ok(Zeroizing::new(ss.as_bytes().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_recovers_shared_secret() {
        let (pk, sk) = Kyber1024::generate_keypair();
        let (ct, ss_sender) = Kyber1024::encapsulate(&pk).unwrap();
        let ss_receiver = Kyber1024::decapsulate(&ct, &sk).unwrap();
        assert_eq!(ss_sender.as_slice(), ss_receiver.as_slice());
    }

    #[test]
    fn wrong_secret_key_yields_different_secret() {
        let (pk, _sk) = Kyber1024::generate_keypair();
        let (_pk2, sk2) = Kyber1024::generate_keypair();
        let (ct, ss_sender) = Kyber1024::encapsulate(&pk).unwrap();
        let ss_wrong = Kyber1024::decapsulate(&ct, &sk2).unwrap();
        assert_ne!(ss_sender.as_slice(), ss_wrong.as_slice());
    }

    #[test]
    fn public_key_round_trips_through_bytes() {
        let (pk, _sk) = Kyber1024::generate_keypair();
        let bytes = pk.as_bytes().to_vec();
        let pk2 = KemPublicKey::from_bytes(&bytes).unwrap();
        assert_eq!(pk.as_bytes(), pk2.as_bytes());
    }

    #[test]
    fn malformed_public_key_bytes_are_rejected() {
        let bytes = vec![0u8; 3];
        assert!(matches!(
            KemPublicKey::from_bytes(&bytes),
            Err(CryptoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn independent_keypairs_yield_independent_secrets() {
        let (pk_a, _) = Kyber1024::generate_keypair();
        let (pk_b, _) = Kyber1024::generate_keypair();
        let (_, ss_a) = Kyber1024::encapsulate(&pk_a).unwrap();
        let (_, ss_b) = Kyber1024::encapsulate(&pk_b).unwrap();
        assert_ne!(ss_a.as_slice(), ss_b.as_slice());
    }
}
