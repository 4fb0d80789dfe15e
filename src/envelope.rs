//! Wire-shaped envelope types for the external interfaces of §6.
//!
//! These are NOT part of the core contract — §6 is explicit that transport
//! framing and wire serialization belong to the outer application — but a
//! caller handing a handshake or message value to any transport needs a
//! serializable shape to hex/JSON-encode. `HandshakeEnvelope` and
//! `MessageEnvelope` are that shape: plain byte vectors, `derive`d
//! `Serialize`/`Deserialize`, with fallible conversions to and from the
//! opaque in-memory types the rest of the crate works with.

use serde::{Deserialize, Serialize};

use crate::kem::KemCiphertext;
use crate::ratchet::{HandshakeMessage, RatchetMessage};
use crate::signature::{SignPublicKey, Signature};
use crate::{CryptoError, Result, NONCE_LEN};

/// `handshake_init` frame contents (§6): a triple-ratchet handshake message
/// plus the initiator's signature public key, ready to hex/JSON-encode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeEnvelope {
    /// KEM ciphertext encapsulated against the responder's public key.
    pub kem_ciphertext: Vec<u8>,
    /// Signature over `kem_ciphertext` under the initiator's identity.
    pub kem_signature: Vec<u8>,
    /// The initiator's signature public key, so the responder can verify
    /// without a prior out-of-band exchange.
    pub sign_public_key: Vec<u8>,
}

impl HandshakeEnvelope {
    /// Flatten a handshake message and the sender's signature public key
    /// into their wire representation.
    pub fn from_parts(message: &HandshakeMessage, sign_public_key: &SignPublicKey) -> Self {
        Self {
            kem_ciphertext: message.ciphertext.as_bytes().to_vec(),
            kem_signature: message.signature.as_bytes().to_vec(),
            sign_public_key: sign_public_key.as_bytes().to_vec(),
        }
    }

    /// Parse the wire bytes back into a [`HandshakeMessage`] and the
    /// sender's signature public key. Fails with `InvalidArgument` if any
    /// field is not the algorithm-fixed length.
    pub fn into_parts(&self) -> Result<(HandshakeMessage, SignPublicKey)> {
        let ciphertext = KemCiphertext::from_bytes(&self.kem_ciphertext)?;
        let signature = Signature::from_bytes(&self.kem_signature)?;
        let sign_public_key = SignPublicKey::from_bytes(&self.sign_public_key)?;
        Ok((HandshakeMessage { ciphertext, signature }, sign_public_key))
    }
}

/// `encrypted_message` frame contents (§6): a single ratcheted message plus
/// the sender's signature public key, ready to hex/JSON-encode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// AEAD ciphertext.
    pub ciphertext: Vec<u8>,
    /// AEAD nonce used for `ciphertext`.
    pub nonce: [u8; NONCE_LEN],
    /// Signature over `ciphertext`.
    pub signature: Vec<u8>,
    /// Position in the sender's chain.
    pub msg_num: u64,
    /// The sender's signature public key.
    pub sign_public_key: Vec<u8>,
}

impl MessageEnvelope {
    /// Flatten a ratchet message and the sender's signature public key into
    /// their wire representation.
    pub fn from_parts(message: &RatchetMessage, sign_public_key: &SignPublicKey) -> Self {
        Self {
            ciphertext: message.ciphertext.clone(),
            nonce: message.nonce,
            signature: message.signature.as_bytes().to_vec(),
            msg_num: message.message_number,
            sign_public_key: sign_public_key.as_bytes().to_vec(),
        }
    }

    /// Parse the wire bytes back into a [`RatchetMessage`] and the sender's
    /// signature public key. Fails with `InvalidArgument` if any field is
    /// not the algorithm-fixed length.
    pub fn into_parts(&self) -> Result<(RatchetMessage, SignPublicKey)> {
        let signature = Signature::from_bytes(&self.signature)?;
        let sign_public_key = SignPublicKey::from_bytes(&self.sign_public_key)?;
        Ok((
            RatchetMessage {
                message_number: self.msg_num,
                ciphertext: self.ciphertext.clone(),
                nonce: self.nonce,
                signature,
            },
            sign_public_key,
        ))
    }
}
