//! Key derivation providers.
//!
//! Two variants are offered, selected by [`KdfKind`]: HKDF-SHA3-256 (RFC 5869
//! expand/extract) and a direct SHAKE-256 XOF. Both take optional salt/info;
//! when omitted, HKDF-SHA3-256 falls back to the fixed default salt/info
//! below so two peers that never agreed on one still derive interoperable
//! keys.

use hkdf::Hkdf;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{Sha3_256, Shake256};
use zeroize::Zeroizing;

use crate::{CryptoError, Result};

/// Default salt used by HKDF-SHA3-256 when the caller supplies none.
pub const DEFAULT_SALT: &[u8] = b"kyberium_default_salt";

/// Default info used by HKDF-SHA3-256 when the caller supplies none.
pub const DEFAULT_INFO: &[u8] = b"kyberium_default_info";

/// Behavior every KDF backend must provide.
pub trait KdfProvider {
    /// Derive `length` bytes of key material from `ikm`, an optional salt,
    /// and optional context info.
    fn derive(
        ikm: &[u8],
        length: usize,
        salt: Option<&[u8]>,
        info: Option<&[u8]>,
    ) -> Result<Zeroizing<Vec<u8>>>;
}

/// HKDF-SHA3-256, per RFC 5869.
pub struct HkdfSha3;

impl KdfProvider for HkdfSha3 {
    fn derive(
        ikm: &[u8],
        length: usize,
        salt: Option<&[u8]>,
        info: Option<&[u8]>,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let salt = salt.unwrap_or(DEFAULT_SALT);
        let info = info.unwrap_or(DEFAULT_INFO);

        let hk = Hkdf::<Sha3_256>::new(Some(salt), ikm);
        let mut okm = Zeroizing::new(vec![0u8; length]);
        hk.expand(info, &mut okm).map_err(|_| {
            CryptoError::ConfigurationError(format!(
                "HKDF-SHA3-256 cannot produce {length} bytes of output"
            ))
        })?;
        Ok(okm)
    }
}

/// SHAKE-256, used directly as an XOF rather than through HMAC expansion:
/// `SHAKE256(salt || ikm || info, length)`.
pub struct Shake256Kdf;

impl KdfProvider for Shake256Kdf {
    fn derive(
        ikm: &[u8],
        length: usize,
        salt: Option<&[u8]>,
        info: Option<&[u8]>,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let mut hasher = Shake256::default();
        if let Some(salt) = salt {
            hasher.update(salt);
        }
        hasher.update(ikm);
        if let Some(info) = info {
            hasher.update(info);
        }

        let mut reader = hasher.finalize_xof();
        let mut okm = Zeroizing::new(vec![0u8; length]);
        reader.read(&mut okm);
        Ok(okm)
    }
}

/// Closed selector for the KDF backend, chosen once at [`crate::session::SessionConfig`]
/// construction. Dispatch is monomorphized through [`KdfProvider`], never an
/// open `dyn` or string match past this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfKind {
    /// HKDF-SHA3-256.
    Sha3,
    /// SHAKE-256 XOF.
    Shake256,
}

impl KdfKind {
    /// Derive key material using whichever backend this variant names.
    pub fn derive(
        self,
        ikm: &[u8],
        length: usize,
        salt: Option<&[u8]>,
        info: Option<&[u8]>,
    ) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            KdfKind::Sha3 => HkdfSha3::derive(ikm, length, salt, info),
            KdfKind::Shake256 => Shake256Kdf::derive(ikm, length, salt, info),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hkdf_sha3_is_deterministic() {
        let a = HkdfSha3::derive(b"ikm", 32, None, None).unwrap();
        let b = HkdfSha3::derive(b"ikm", 32, None, None).unwrap();
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn hkdf_sha3_differs_with_different_info() {
        let a = HkdfSha3::derive(b"ikm", 32, None, Some(b"a")).unwrap();
        let b = HkdfSha3::derive(b"ikm", 32, None, Some(b"b")).unwrap();
        assert_ne!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn shake256_is_deterministic_and_length_correct() {
        let a = Shake256Kdf::derive(b"ikm", 48, Some(b"salt"), Some(b"info")).unwrap();
        let b = Shake256Kdf::derive(b"ikm", 48, Some(b"salt"), Some(b"info")).unwrap();
        assert_eq!(a.len(), 48);
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn the_two_backends_disagree() {
        let a = KdfKind::Sha3.derive(b"ikm", 32, None, None).unwrap();
        let b = KdfKind::Shake256.derive(b"ikm", 32, None, None).unwrap();
        assert_ne!(a.as_slice(), b.as_slice());
    }
}
