//! # Recoverable Signatures
//!
//! ECDSA over secp256k1 on 32-byte SHA-256 digests, with public-key
//! recovery. Recovery is what makes the QR handshake work: a signature plus
//! the signed digest is enough to reconstruct the signer's public key, so
//! two devices can authenticate each other without any prior key exchange.
//!
//! ## Signature Form
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   RECOVERABLE SIGNATURE (65 bytes)                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────────┬──────────────────┬──────────────┐                │
//! │  │   r (32 bytes)   │   s (32 bytes)   │ id (1 byte)  │                │
//! │  └──────────────────┴──────────────────┴──────────────┘                │
//! │                                                                         │
//! │  • 0 < r < n and 0 < s < n, enforced on every import                   │
//! │  • s is normalized to the lower half of the curve order ("low-S"),    │
//! │    with the recovery id adjusted to match                              │
//! │  • id ∈ 0..=3 selects which candidate point recovery yields           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Nonces are derived per RFC 6979 (HMAC-DRBG over the key and digest), so
//! signing the same digest with the same key always produces the same
//! signature. Randomized or naive nonces are never used — a single nonce
//! reuse leaks the private key.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{FieldBytes, PublicKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};

use crate::crypto::keys::{public_key_from_bytes, KeyPair, PUBLIC_KEY_SIZE};
use crate::error::{Error, Result};

/// A 32-byte SHA-256 digest
pub type Digest = [u8; 32];

/// Size of a recoverable signature in transport form
pub const SIGNATURE_SIZE: usize = 65;

/// Hash arbitrary bytes to a signing digest
pub fn digest(data: &[u8]) -> Digest {
    Sha256::digest(data).into()
}

/// An ECDSA signature carrying its recovery id
///
/// Always low-S normalized. The 65-byte transport form is `r ‖ s ‖ id`,
/// conventionally base64 on text channels.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    r: [u8; 32],
    s: [u8; 32],
    recovery_id: u8,
}

impl RecoverableSignature {
    /// Reassemble from the 65-byte transport form
    ///
    /// Fails with `InvalidSignature` if the length is wrong, r or s is
    /// outside (0, n), or the recovery id is not 0–3.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SIGNATURE_SIZE {
            return Err(Error::InvalidSignature(format!(
                "Signature must be {} bytes, got {}",
                SIGNATURE_SIZE,
                bytes.len()
            )));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        let recovery_id = bytes[64];

        let sig = Self { r, s, recovery_id };
        sig.to_ecdsa()?; // range-check r, s, and the id
        Ok(sig)
    }

    /// Serialize to the 65-byte transport form: r ‖ s ‖ recovery id
    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE] {
        let mut out = [0u8; SIGNATURE_SIZE];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.recovery_id;
        out
    }

    /// Encode the transport form as base64 text
    pub fn to_base64(&self) -> String {
        crate::crypto::encoding::to_base64(&self.to_bytes())
    }

    /// Decode the transport form from base64 text
    pub fn from_base64(text: &str) -> Result<Self> {
        Self::from_bytes(&crate::crypto::encoding::from_base64(text)?)
    }

    /// The recovery id (0–3)
    pub fn recovery_id(&self) -> u8 {
        self.recovery_id
    }

    /// Convert into the underlying ECDSA types, validating ranges
    fn to_ecdsa(&self) -> Result<(EcdsaSignature, RecoveryId)> {
        let sig =
            EcdsaSignature::from_scalars(FieldBytes::from(self.r), FieldBytes::from(self.s))
                .map_err(|_| {
                    Error::InvalidSignature("r or s is zero or exceeds the curve order".into())
                })?;
        let id = RecoveryId::from_byte(self.recovery_id)
            .ok_or_else(|| Error::InvalidSignature("Recovery id must be 0-3".into()))?;
        Ok((sig, id))
    }

    fn from_ecdsa(sig: &EcdsaSignature, id: RecoveryId) -> Self {
        let (r_bytes, s_bytes) = sig.split_bytes();
        Self {
            r: r_bytes.into(),
            s: s_bytes.into(),
            recovery_id: id.to_byte(),
        }
    }
}

impl std::fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecoverableSignature({})", hex::encode(self.to_bytes()))
    }
}

impl Serialize for RecoverableSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for RecoverableSignature {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(&text).map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Sign a 32-byte digest, producing a recoverable signature
///
/// Deterministic (RFC 6979) and low-S normalized, with the recovery bit
/// adjusted to match the normalization.
pub fn sign(digest: &Digest, keys: &KeyPair) -> Result<RecoverableSignature> {
    let signing_key = SigningKey::from(keys.secret_key());
    let (sig, id) = signing_key
        .sign_prehash_recoverable(digest)
        .map_err(|e| Error::Internal(format!("Signing failed: {}", e)))?;
    Ok(RecoverableSignature::from_ecdsa(&sig, id))
}

/// Verify a signature against a digest and a compressed public key
///
/// Returns `Ok(())` when valid, `VerificationFailed` when the signature
/// does not match, and `InvalidSignature`/`MalformedKey` on structurally
/// bad input.
pub fn verify(
    signature: &RecoverableSignature,
    digest: &Digest,
    public_key: &[u8],
) -> Result<()> {
    let (sig, _) = signature.to_ecdsa()?;
    let verifying_key = VerifyingKey::from(&public_key_from_bytes(public_key)?);
    verifying_key
        .verify_prehash(digest, &sig)
        .map_err(|_| Error::VerificationFailed)
}

/// Recover the signer's public key from a digest and signature
///
/// Fails with `RecoveryFailed` when no valid curve point corresponds to
/// the signature — it never silently yields a plausible but wrong key.
pub fn recover(digest: &Digest, signature: &RecoverableSignature) -> Result<PublicKey> {
    let (sig, id) = signature.to_ecdsa()?;
    let verifying_key = VerifyingKey::recover_from_prehash(digest, &sig, id)
        .map_err(|_| Error::RecoveryFailed)?;
    PublicKey::from_sec1_bytes(verifying_key.to_encoded_point(true).as_bytes())
        .map_err(|_| Error::RecoveryFailed)
}

/// Recover the signer's compressed public key bytes
pub fn recover_bytes(
    digest: &Digest,
    signature: &RecoverableSignature,
) -> Result<[u8; PUBLIC_KEY_SIZE]> {
    Ok(crate::crypto::keys::compress_public(&recover(
        digest, signature,
    )?))
}

// ============================================================================
// TESTS
// ============================================================================
