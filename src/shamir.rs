//! # Secret Sharing
//!
//! Shamir's scheme over GF(2⁸): split a secret (typically the 65-byte
//! combined key) into `total` shares such that any `threshold` of them
//! reconstruct it and any fewer reveal nothing.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       SPLIT / COMBINE                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   secret byte s → random polynomial  f(x) = s + a₁x + … + a_{k-1}x^{k-1}│
//! │   share i carries f(i) for every secret byte  (i = 1 … total)          │
//! │                                                                         │
//! │   combine: Lagrange interpolation at x = 0 over any k shares           │
//! │                                                                         │
//! │   ┌────────┬───────────┬─────────────────────────┐                     │
//! │   │ index  │ threshold │      data (|secret|)    │   share layout      │
//! │   │  1 B   │    1 B    │                         │                     │
//! │   └────────┴───────────┴─────────────────────────┘                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Arithmetic runs in GF(2⁸) with the AES reduction polynomial (0x11B),
//! byte-wise and independently per position, so shares are exactly as long
//! as the secret plus the two header bytes.
//!
//! Each share records the threshold it was split with: `combine` can then
//! fail loudly with `InsufficientShares` instead of silently interpolating
//! a wrong secret from too few points.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroize;

use crate::crypto::keys::{KeyPair, PUBLIC_KEY_SIZE};
use crate::crypto::{decrypt_from, encrypt_for, SharedSecret};
use crate::error::{Error, Result};

/// One share of a split secret
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    /// Evaluation point, 1-based (x = 0 is the secret itself)
    pub index: u8,
    /// The threshold this share was split with
    pub threshold: u8,
    /// One polynomial evaluation per secret byte
    #[serde(with = "data_hex")]
    pub data: Vec<u8>,
}

impl Share {
    /// Serialize to the transport form: index ‖ threshold ‖ data
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.data.len());
        out.push(self.index);
        out.push(self.threshold);
        out.extend_from_slice(&self.data);
        out
    }

    /// Parse the transport form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 3 {
            return Err(Error::InvalidShare("Share too short".into()));
        }
        let share = Self {
            index: bytes[0],
            threshold: bytes[1],
            data: bytes[2..].to_vec(),
        };
        if share.index == 0 {
            return Err(Error::InvalidShare("Share index must be non-zero".into()));
        }
        if share.threshold < 2 {
            return Err(Error::InvalidShare("Share threshold below minimum".into()));
        }
        Ok(share)
    }
}

impl std::fmt::Debug for Share {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Share data is secret-equivalent material; never print it.
        f.debug_struct("Share")
            .field("index", &self.index)
            .field("threshold", &self.threshold)
            .field("len", &self.data.len())
            .finish_non_exhaustive()
    }
}

/// Serde helper for share data as hex
mod data_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Split a secret into `total` shares, any `threshold` of which recover it
pub fn split(secret: &[u8], total: u8, threshold: u8) -> Result<Vec<Share>> {
    if secret.is_empty() {
        return Err(Error::InvalidShareConfig("Secret is empty".into()));
    }
    if threshold < 2 {
        return Err(Error::InvalidShareConfig(
            "Threshold must be at least 2".into(),
        ));
    }
    if total < threshold {
        return Err(Error::InvalidShareConfig(format!(
            "Total shares ({}) below threshold ({})",
            total, threshold
        )));
    }

    let mut shares: Vec<Share> = (1..=total)
        .map(|index| Share {
            index,
            threshold,
            data: Vec::with_capacity(secret.len()),
        })
        .collect();

    // Independent random polynomial per secret byte, constant term = byte.
    let mut coefficients = vec![0u8; threshold as usize];
    for &byte in secret {
        coefficients[0] = byte;
        OsRng.fill_bytes(&mut coefficients[1..]);
        for share in shares.iter_mut() {
            share.data.push(gf_eval(&coefficients, share.index));
        }
    }
    coefficients.zeroize();

    debug!(total, threshold, len = secret.len(), "secret split");
    Ok(shares)
}

/// Reconstruct the secret from shares
///
/// Needs at least as many distinct shares as the embedded threshold; extra
/// shares are accepted and all participate in the interpolation.
pub fn combine(shares: &[Share]) -> Result<Vec<u8>> {
    let first = shares
        .first()
        .ok_or_else(|| Error::InvalidShare("No shares provided".into()))?;

    let threshold = first.threshold;
    if threshold < 2 {
        return Err(Error::InvalidShare("Share threshold below minimum".into()));
    }
    let length = first.data.len();
    if length == 0 {
        return Err(Error::InvalidShare("Share carries no data".into()));
    }

    let mut seen = [false; 256];
    for share in shares {
        if share.index == 0 {
            return Err(Error::InvalidShare("Share index must be non-zero".into()));
        }
        if share.threshold != threshold {
            return Err(Error::InvalidShare(
                "Shares disagree on the threshold".into(),
            ));
        }
        if share.data.len() != length {
            return Err(Error::InvalidShare("Shares disagree on length".into()));
        }
        if seen[share.index as usize] {
            return Err(Error::InvalidShare(format!(
                "Duplicate share index {}",
                share.index
            )));
        }
        seen[share.index as usize] = true;
    }

    if shares.len() < threshold as usize {
        return Err(Error::InsufficientShares {
            needed: threshold,
            got: shares.len(),
        });
    }

    let mut secret = Vec::with_capacity(length);
    for position in 0..length {
        secret.push(gf_interpolate_at_zero(shares, position));
    }
    Ok(secret)
}

// ----------------------------------------------------------------------------
// Share envelopes
// ----------------------------------------------------------------------------

/// Encrypt a share so only the holder of `recipient_public` can open it
///
/// ECIES-style envelope: a fresh ephemeral public key (33 bytes) followed
/// by the share's transport form encrypted under the ECDH secret. Safe to
/// hand to a custodian over any channel.
pub fn encrypt_share(share: &Share, recipient_public: &[u8]) -> Result<Vec<u8>> {
    let ephemeral = KeyPair::generate();
    let ciphertext = encrypt_for(&share.to_bytes(), &ephemeral, recipient_public)?;

    let mut envelope = Vec::with_capacity(PUBLIC_KEY_SIZE + ciphertext.len());
    envelope.extend_from_slice(&ephemeral.public_bytes());
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Open a share envelope with the recipient's key pair
pub fn decrypt_share(envelope: &[u8], recipient_keys: &KeyPair) -> Result<Share> {
    if envelope.len() < PUBLIC_KEY_SIZE + 3 {
        return Err(Error::InvalidShare("Envelope too short".into()));
    }
    let (ephemeral_public, ciphertext) = envelope.split_at(PUBLIC_KEY_SIZE);
    // Validate the ephemeral key before keying the cipher with it.
    SharedSecret::derive(recipient_keys, ephemeral_public)?;
    let plaintext = decrypt_from(ciphertext, recipient_keys, ephemeral_public)?;
    Share::from_bytes(&plaintext)
}

// ----------------------------------------------------------------------------
// GF(2⁸) arithmetic, AES polynomial x⁸ + x⁴ + x³ + x + 1
// ----------------------------------------------------------------------------

/// Log/antilog tables over generator 3, built once at compile time
const GF_TABLES: ([u8; 256], [u8; 256]) = {
    let mut exp = [0u8; 256];
    let mut log = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 255 {
        exp[i] = x as u8;
        log[x as usize] = i as u8;
        // Multiply by the generator 3 = x + 1.
        x = (x << 1) ^ x;
        if x & 0x100 != 0 {
            x ^= 0x11B;
        }
        i += 1;
    }
    exp[255] = exp[0];
    (exp, log)
};

fn gf_mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let (exp, log) = (&GF_TABLES.0, &GF_TABLES.1);
    let sum = log[a as usize] as usize + log[b as usize] as usize;
    exp[sum % 255]
}

fn gf_div(a: u8, b: u8) -> u8 {
    // b = 0 cannot occur: divisors are differences of distinct indices.
    if a == 0 {
        return 0;
    }
    let (exp, log) = (&GF_TABLES.0, &GF_TABLES.1);
    let diff = 255 + log[a as usize] as usize - log[b as usize] as usize;
    exp[diff % 255]
}

/// Evaluate a polynomial at x via Horner's method
fn gf_eval(coefficients: &[u8], x: u8) -> u8 {
    let mut acc = 0u8;
    for &coefficient in coefficients.iter().rev() {
        acc = gf_mul(acc, x) ^ coefficient;
    }
    acc
}

/// Lagrange interpolation at x = 0 for one byte position
fn gf_interpolate_at_zero(shares: &[Share], position: usize) -> u8 {
    let mut secret = 0u8;
    for (i, share_i) in shares.iter().enumerate() {
        let mut basis = 1u8;
        for (j, share_j) in shares.iter().enumerate() {
            if i == j {
                continue;
            }
            // In GF(2⁸) subtraction is XOR, so (0 - xⱼ) is just xⱼ.
            basis = gf_mul(basis, gf_div(share_j.index, share_i.index ^ share_j.index));
        }
        secret ^= gf_mul(share_i.data[position], basis);
    }
    secret
}

// ============================================================================
// TESTS
// ============================================================================
