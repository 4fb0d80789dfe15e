//! # Post-quantum triple-ratchet session engine
//!
//! A confidential, mutually-authenticated channel built entirely on
//! NIST-standardized post-quantum primitives:
//!
//! - **ML-KEM-1024** (Kyber-1024) for key encapsulation
//! - **ML-DSA-65** (Dilithium3) for per-message signatures
//! - **HKDF-SHA3-256** / **SHAKE-256** for key derivation
//! - **AES-GCM** (128/192/256-bit key) / **ChaCha20-Poly1305** for
//!   authenticated encryption
//!
//! Two session profiles are offered. [`basic::BasicSession`] is a single
//! shared key derived from a one-shot KEM handshake. [`ratchet::TripleRatchet`]
//! combines a signed KEM handshake with a Double-Ratchet-style chain advance
//! and a per-message signature, giving forward secrecy and sender
//! authenticity against a quantum adversary. [`session::SessionManager`] owns
//! identity material and mediates both profiles behind one API.
//!
//! ## Scope
//!
//! This crate is the cryptographic core only: it does not transport bytes
//! between peers, persist state, discover peers, or implement group
//! messaging. Callers own the session values and thread them through
//! whatever transport and storage their application needs.
//!
//! ## Safety
//!
//! This crate forbids all unsafe code.
//!
//! ## Example
//!
//! ```
//! use triframe_crypto::session::{SessionConfig, SessionManager};
//!
//! let mut bob = SessionManager::new(SessionConfig::default());
//! let bob_pub = bob.init_session(None).unwrap().into_public_key().unwrap();
//!
//! let mut alice = SessionManager::new(SessionConfig::default());
//! let ct = alice.init_session(Some(&bob_pub)).unwrap().into_ciphertext().unwrap();
//!
//! bob.complete_handshake(&ct).unwrap();
//!
//! let (ciphertext, nonce) = alice.encrypt(b"hello", None).unwrap();
//! let plaintext = bob.decrypt(&ciphertext, &nonce, None).unwrap();
//! assert_eq!(plaintext, b"hello");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod aead;
pub mod basic;
pub mod envelope;
pub mod identity;
pub mod kdf;
pub mod kem;
pub mod ratchet;
pub mod session;
pub mod signature;

use thiserror::Error;

/// Errors surfaced by any operation in this crate.
///
/// Every error propagates to the caller unchanged; a failed operation never
/// leaves partially-applied state. `verify` is the one exception to this
/// taxonomy: by contract it returns a `bool`, not a `Result`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Wrong length, wrong type, or a required peer key that hasn't been set.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `encrypt`/`decrypt`/`sign` called before the handshake completed.
    #[error("session is not ready: handshake incomplete")]
    SessionNotReady,

    /// AEAD tag mismatch, signature verification failure, or a KEM output of
    /// unexpected length.
    #[error("authentication failure: {0}")]
    AuthenticationFailure(String),

    /// A provider produced output of unexpected length. Should be
    /// unreachable with conformant primitives; surfaced defensively.
    #[error("corrupted provider output: {0}")]
    Corruption(String),

    /// Unknown KDF/AEAD selector, or an unsupported AEAD key size.
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Length in bytes of the AEAD nonce used everywhere in this crate (96 bits).
pub const NONCE_LEN: usize = 12;
