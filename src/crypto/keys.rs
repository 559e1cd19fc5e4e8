//! # Key Management
//!
//! Key-pair lifecycle for a Kestrel identity: generation, deterministic
//! derivation, the 65-byte combined export format, and address derivation.
//!
//! ## Key Material
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY MATERIAL                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Private key     32 bytes   secp256k1 scalar in (0, n)                 │
//! │  Public key      33 bytes   compressed point (parity ‖ x)              │
//! │  Combined key    65 bytes   private ‖ public — canonical export form   │
//! │  Address         20 bytes   Keccak-256(x ‖ y)[12..32], hex with 0x     │
//! │                                                                         │
//! │  Invariant: public = G · private, checked on every import.             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One secp256k1 key pair serves signing (recoverable ECDSA), the QR
//! handshake, message encryption (ECDH), and stealth address recovery.
//! The combined form is what the vault stores and what account export
//! produces, conventionally transported as base64 text.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use sha3::Keccak256;
use zeroize::Zeroize;

use crate::crypto::encoding;
use crate::error::{Error, Result};

/// Size of a private key in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Size of a compressed public key in bytes (parity prefix + x-coordinate)
pub const PUBLIC_KEY_SIZE: usize = 33;

/// Size of the combined export form (private ‖ public)
pub const COMBINED_KEY_SIZE: usize = PRIVATE_KEY_SIZE + PUBLIC_KEY_SIZE;

/// Size of an address in bytes
pub const ADDRESS_SIZE: usize = 20;

/// Domain tag for deterministic key derivation from seed material
const SEED_DOMAIN: &[u8] = b"kestrel-identity-v1";

/// A secp256k1 key pair owned by the account holder
///
/// ## Security
///
/// - The private scalar lives inside [`k256::SecretKey`], which zeroizes
///   its memory when dropped.
/// - `secret_bytes()` exists for vault export only. Never log or transmit
///   its output.
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    ///
    /// Samples 32 bytes from the operating system CSPRNG and resamples
    /// until the scalar is non-zero and below the curve order. Rejection
    /// is astronomically rare for secp256k1 but handled explicitly.
    pub fn generate() -> Self {
        let mut candidate = [0u8; PRIVATE_KEY_SIZE];
        let secret = loop {
            OsRng.fill_bytes(&mut candidate);
            if let Ok(secret) = SecretKey::from_slice(&candidate) {
                break secret;
            }
        };
        candidate.zeroize();
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Derive a key pair deterministically from seed bytes
    ///
    /// The seed is typically a wallet signature over a fixed message, so
    /// the same wallet always reproduces the same messaging identity.
    /// The seed is hashed with a domain tag and a counter that bumps on
    /// the (negligible) chance the hash falls outside the scalar range.
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        if seed.is_empty() {
            return Err(Error::KeyDerivationFailed("Empty seed".into()));
        }
        for counter in 0u8..=255 {
            let mut hasher = Sha256::new();
            hasher.update(SEED_DOMAIN);
            hasher.update(seed);
            hasher.update([counter]);
            let digest = hasher.finalize();
            if let Ok(secret) = SecretKey::from_slice(&digest) {
                let public = secret.public_key();
                return Ok(Self { secret, public });
            }
        }
        // 256 consecutive out-of-range hashes cannot happen in practice.
        Err(Error::KeyDerivationFailed(
            "Seed exhausted derivation attempts".into(),
        ))
    }

    /// Reconstruct a key pair from raw private key bytes
    pub fn from_private_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PRIVATE_KEY_SIZE {
            return Err(Error::MalformedKey(format!(
                "Private key must be {} bytes, got {}",
                PRIVATE_KEY_SIZE,
                bytes.len()
            )));
        }
        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| Error::MalformedKey("Private key is not a valid scalar".into()))?;
        let public = secret.public_key();
        Ok(Self { secret, public })
    }

    /// Get the private key bytes (for vault storage only)
    pub fn secret_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.secret.to_bytes().into()
    }

    /// Get the compressed public key bytes
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        compress_public(&self.public)
    }

    /// Export as the 65-byte combined form: private ‖ public
    pub fn to_combined(&self) -> [u8; COMBINED_KEY_SIZE] {
        let mut out = [0u8; COMBINED_KEY_SIZE];
        out[..PRIVATE_KEY_SIZE].copy_from_slice(&self.secret_bytes());
        out[PRIVATE_KEY_SIZE..].copy_from_slice(&self.public_bytes());
        out
    }

    /// Import from the 65-byte combined form
    ///
    /// Fails with `MalformedKey` on wrong length, an invalid scalar, or a
    /// public half that does not match the private half.
    pub fn from_combined(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != COMBINED_KEY_SIZE {
            return Err(Error::MalformedKey(format!(
                "Combined key must be {} bytes, got {}",
                COMBINED_KEY_SIZE,
                bytes.len()
            )));
        }
        let pair = Self::from_private_bytes(&bytes[..PRIVATE_KEY_SIZE])?;
        if pair.public_bytes() != bytes[PRIVATE_KEY_SIZE..] {
            return Err(Error::MalformedKey(
                "Public half does not match the private key".into(),
            ));
        }
        Ok(pair)
    }

    /// Export the combined form as base64 text
    pub fn to_base64(&self) -> String {
        encoding::to_base64(&self.to_combined())
    }

    /// Import the combined form from base64 text
    pub fn from_base64(text: &str) -> Result<Self> {
        let bytes = encoding::from_base64(text)?;
        Self::from_combined(&bytes)
    }

    /// The address derived from this key pair's public key
    pub fn address(&self) -> Address {
        Address::from_public(&self.public)
    }

    /// Reference to the inner secret key (crate-internal use)
    pub(crate) fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Reference to the inner public key (crate-internal use)
    pub(crate) fn public_key(&self) -> &PublicKey {
        &self.public
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the private half.
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(self.public_bytes()))
            .finish_non_exhaustive()
    }
}

/// Parse and validate a compressed public key
pub fn public_key_from_bytes(bytes: &[u8]) -> Result<PublicKey> {
    if bytes.len() != PUBLIC_KEY_SIZE {
        return Err(Error::MalformedKey(format!(
            "Public key must be {} bytes, got {}",
            PUBLIC_KEY_SIZE,
            bytes.len()
        )));
    }
    PublicKey::from_sec1_bytes(bytes)
        .map_err(|_| Error::MalformedKey("Public key is not a point on the curve".into()))
}

/// Compress a public key to its 33-byte SEC1 form
pub(crate) fn compress_public(public: &PublicKey) -> [u8; PUBLIC_KEY_SIZE] {
    let point = public.to_encoded_point(true);
    let mut out = [0u8; PUBLIC_KEY_SIZE];
    out.copy_from_slice(point.as_bytes());
    out
}

/// A 20-byte account address derived from a public key
///
/// Keccak-256 over the uncompressed point coordinates (x ‖ y, without the
/// 0x04 prefix), keeping the last 20 bytes. Displayed as 0x-prefixed hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(#[serde(with = "address_bytes")] pub [u8; ADDRESS_SIZE]);

impl Address {
    /// Derive the address for a public key
    pub fn from_public(public: &PublicKey) -> Self {
        let point = public.to_encoded_point(false);
        let digest = Keccak256::digest(&point.as_bytes()[1..]);
        let mut out = [0u8; ADDRESS_SIZE];
        out.copy_from_slice(&digest[12..]);
        Self(out)
    }

    /// Derive the address for compressed public key bytes
    pub fn from_public_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_public(&public_key_from_bytes(bytes)?))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Serde helper for addresses as 0x-prefixed hex
mod address_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 20], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 20], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let stripped = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(stripped).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("Invalid address length"))
    }
}

// ============================================================================
// TESTS
// ============================================================================
