//! # Shared-Secret Encryption
//!
//! Composes ECDH over secp256k1 with the symmetric cipher: encrypt data so
//! that only the holder of a specific public key's private half can read it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ENCRYPT-FOR FLOW                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  my private key  ×  their public key                                   │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  shared point (33-byte compressed; symmetric:                          │
//! │                ECDH(skA, pkB) == ECDH(skB, pkA))                        │
//! │                 │                                                       │
//! │                 ▼  drop parity byte                                     │
//! │  32-byte secret (the point's x-coordinate)                             │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  Blowfish-CFB key/IV derivation  →  ciphertext (same length)           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The shared secret is stable for a key pair: this primitive alone is not
//! a ratchet. Callers needing per-message uniqueness must mix in message
//! context at a higher layer. The secret is never logged or persisted.

use zeroize::ZeroizeOnDrop;

use crate::crypto::cipher;
use crate::crypto::keys::{compress_public, public_key_from_bytes, KeyPair, PUBLIC_KEY_SIZE};
use crate::error::{Error, Result};

/// A 33-byte compressed ECDH point shared by two key pairs
///
/// Ephemeral by design: derive, use for one cipher operation, drop.
/// Memory is zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct SharedSecret {
    point: [u8; PUBLIC_KEY_SIZE],
}

impl SharedSecret {
    /// Derive the shared point between my private key and their public key
    pub fn derive(my_keys: &KeyPair, their_public: &[u8]) -> Result<Self> {
        let public = public_key_from_bytes(their_public)?;
        let scalar = my_keys.secret_key().to_nonzero_scalar();
        let shared = public.to_projective() * *scalar;
        // A nonzero scalar times a valid point cannot hit the identity.
        let shared = k256::PublicKey::from_affine(shared.to_affine())
            .map_err(|_| Error::Internal("ECDH produced the identity point".into()))?;
        Ok(Self {
            point: compress_public(&shared),
        })
    }

    /// The compressed point bytes
    pub fn point_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.point
    }

    /// The 32-byte cipher secret: the point's x-coordinate
    /// (the compressed encoding minus its parity byte)
    pub fn cipher_secret(&self) -> [u8; cipher::SECRET_SIZE] {
        let mut secret = [0u8; cipher::SECRET_SIZE];
        secret.copy_from_slice(&self.point[1..]);
        secret
    }
}

/// Encrypt data for the holder of `their_public`
pub fn encrypt_for(data: &[u8], my_keys: &KeyPair, their_public: &[u8]) -> Result<Vec<u8>> {
    let shared = SharedSecret::derive(my_keys, their_public)?;
    cipher::encrypt(data, &shared.cipher_secret())
}

/// Decrypt data sent by the holder of `their_public`
pub fn decrypt_from(data: &[u8], my_keys: &KeyPair, their_public: &[u8]) -> Result<Vec<u8>> {
    let shared = SharedSecret::derive(my_keys, their_public)?;
    cipher::decrypt(data, &shared.cipher_secret())
}

// ============================================================================
// TESTS
// ============================================================================
