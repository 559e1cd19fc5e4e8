//! # Stealth Addresses
//!
//! One-time receiving addresses: a sender who knows only a recipient's
//! long-lived ("meta") public key can mint a fresh address for them that an
//! observer cannot link to the recipient or to any other stealth address.
//! The recipient reproduces the same address from the sender's ephemeral
//! public key alone.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       STEALTH DERIVATION                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   SENDER                                RECIPIENT                       │
//! │   ──────                                ─────────                       │
//! │   fresh ephemeral pair (e, E)                                           │
//! │   S  = ECDH(e, M)        ◄── same point ──►   S  = ECDH(m, E)          │
//! │   h  = SHA-256(S) mod n                       h  = SHA-256(S) mod n    │
//! │   P  = M · h                                  P  = M · h               │
//! │   addr = keccak(P)[12..]                      addr = keccak(P)[12..]   │
//! │                                                                         │
//! │   publishes E alongside addr;                 needs only E to claim    │
//! │   e is discarded after derivation             the address as its own   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! (M, m) is the recipient's meta key pair. Unlinkability comes from the
//! fresh ephemeral scalar per derivation: two stealth addresses for the
//! same recipient share no visible relation.

use k256::elliptic_curve::ops::Reduce;
use k256::{PublicKey, Scalar, U256};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use tracing::trace;

use crate::crypto::keys::{compress_public, public_key_from_bytes, PUBLIC_KEY_SIZE};
use crate::crypto::{Address, KeyPair, SharedSecret};
use crate::error::{Error, Result};

/// A one-time address with the material needed to claim it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StealthAddress {
    /// The derived one-time address
    pub address: Address,
    /// The stealth public key the address hashes
    #[serde(with = "key_hex")]
    pub stealth_public_key: [u8; PUBLIC_KEY_SIZE],
    /// The sender's ephemeral public key; published so the recipient can
    /// re-derive the address
    #[serde(with = "key_hex")]
    pub ephemeral_public_key: [u8; PUBLIC_KEY_SIZE],
}

impl StealthAddress {
    /// Mint a fresh stealth address for the holder of `recipient_meta_public`
    ///
    /// Generates a new ephemeral key pair per call; the ephemeral private
    /// scalar is dropped (and zeroized) before returning.
    pub fn generate(recipient_meta_public: &[u8]) -> Result<Self> {
        let ephemeral = KeyPair::generate();
        let shared = SharedSecret::derive(&ephemeral, recipient_meta_public)?;
        let tweak = tweak_scalar(shared.point_bytes())?;

        let meta = public_key_from_bytes(recipient_meta_public)?;
        let stealth_public = apply_tweak(&meta, &tweak)?;
        let address = Address::from_public(&stealth_public);
        trace!(%address, "stealth address minted");

        Ok(Self {
            address,
            stealth_public_key: compress_public(&stealth_public),
            ephemeral_public_key: ephemeral.public_bytes(),
        })
    }

    /// Re-derive the stealth address on the recipient side
    ///
    /// `meta_keys` is the recipient's long-lived pair; `ephemeral_public`
    /// is the sender's published ephemeral key. Produces the same address
    /// the sender minted.
    pub fn recover(meta_keys: &KeyPair, ephemeral_public: &[u8]) -> Result<Self> {
        let shared = SharedSecret::derive(meta_keys, ephemeral_public)?;
        let tweak = tweak_scalar(shared.point_bytes())?;

        let stealth_public = apply_tweak(meta_keys.public_key(), &tweak)?;
        let address = Address::from_public(&stealth_public);

        let mut ephemeral_bytes = [0u8; PUBLIC_KEY_SIZE];
        ephemeral_bytes.copy_from_slice(&compress_public(&public_key_from_bytes(
            ephemeral_public,
        )?));

        Ok(Self {
            address,
            stealth_public_key: compress_public(&stealth_public),
            ephemeral_public_key: ephemeral_bytes,
        })
    }
}

/// Hash the shared point to a curve scalar
fn tweak_scalar(shared_point: &[u8; PUBLIC_KEY_SIZE]) -> Result<Scalar> {
    let hashed = Sha256::digest(shared_point);
    let scalar = <Scalar as Reduce<U256>>::reduce(U256::from_be_slice(&hashed));
    if bool::from(scalar.is_zero()) {
        // Reachable only if SHA-256 output reduces to zero mod n.
        return Err(Error::KeyDerivationFailed(
            "Stealth tweak reduced to zero".into(),
        ));
    }
    Ok(scalar)
}

/// Multiply the meta public key by the tweak scalar
fn apply_tweak(meta: &PublicKey, tweak: &Scalar) -> Result<PublicKey> {
    let point = meta.to_projective() * tweak;
    PublicKey::from_affine(point.to_affine())
        .map_err(|_| Error::KeyDerivationFailed("Stealth point is the identity".into()))
}

/// Serde helper for compressed keys as hex
mod key_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 33], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 33], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("Invalid key length"))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_recovers_same_address() {
        let recipient = KeyPair::generate();

        let minted = StealthAddress::generate(&recipient.public_bytes()).unwrap();
        let recovered =
            StealthAddress::recover(&recipient, &minted.ephemeral_public_key).unwrap();

        assert_eq!(minted.address, recovered.address);
        assert_eq!(minted.stealth_public_key, recovered.stealth_public_key);
    }

    #[test]
    fn test_addresses_are_unlinkable() {
        let recipient = KeyPair::generate();

        let a = StealthAddress::generate(&recipient.public_bytes()).unwrap();
        let b = StealthAddress::generate(&recipient.public_bytes()).unwrap();

        assert_ne!(a.address, b.address);
        assert_ne!(a.ephemeral_public_key, b.ephemeral_public_key);
        // Neither equals the recipient's own address.
        assert_ne!(a.address, recipient.address());
        assert_ne!(b.address, recipient.address());
    }

    #[test]
    fn test_wrong_recipient_derives_different_address() {
        let recipient = KeyPair::generate();
        let other = KeyPair::generate();

        let minted = StealthAddress::generate(&recipient.public_bytes()).unwrap();
        let wrong = StealthAddress::recover(&other, &minted.ephemeral_public_key).unwrap();

        assert_ne!(minted.address, wrong.address);
    }

    #[test]
    fn test_rejects_malformed_meta_key() {
        assert!(StealthAddress::generate(&[0u8; 33]).is_err());
        assert!(StealthAddress::generate(&[0u8; 12]).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let recipient = KeyPair::generate();
        let minted = StealthAddress::generate(&recipient.public_bytes()).unwrap();

        let json = serde_json::to_string(&minted).unwrap();
        let restored: StealthAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(minted, restored);
    }
}
