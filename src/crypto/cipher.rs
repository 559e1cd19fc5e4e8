//! # Symmetric Cipher
//!
//! Blowfish in cipher-feedback (CFB) streaming mode, keyed from a 32-byte
//! shared secret. This is the wire-compatible message cipher: peers must
//! agree on it bit-for-bit.
//!
//! ## Key and IV Derivation
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 SECRET → KEY/IV WINDOWS (fixed format)                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  secret (32 bytes)                                                     │
//! │  ┌────────────┬──────────────────────────┬────────────┐                │
//! │  │  [0..8)    │         [8..24)          │  [24..32)  │                │
//! │  └─────┬──────┴────────────┬─────────────┴─────┬──────┘                │
//! │        │                   │                   │                       │
//! │        │                   ▼                   │                       │
//! │        │        cipher key (16 bytes)          │                       │
//! │        │                                       │                       │
//! │        └──────────────── XOR ──────────────────┘                       │
//! │                           │                                            │
//! │                           ▼                                            │
//! │                    IV (8 bytes)                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The byte windows are a compatibility-mandated format inherited from the
//! deployed protocol, not a design choice. Do not "improve" the offsets.
//!
//! ## Why CFB?
//!
//! CFB turns the 64-bit-block cipher into a self-synchronizing stream
//! cipher: ciphertext length equals plaintext length with no padding, and
//! decryption runs the block cipher in the forward (encrypting) direction
//! for keystream generation.
//!
//! Blowfish key expansion (the key-dependent S-box/P-array setup) is the
//! expensive part of every operation. [`CipherKey`] pays it once and can be
//! reused across messages with the same secret; the free functions derive
//! per call. Reuse is purely a performance optimization, never a
//! correctness dependency.

use blowfish::Blowfish;
use cfb_mode::cipher::{AsyncStreamCipher, InnerIvInit, KeyInit};
use cfb_mode::{Decryptor, Encryptor};
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// Size of the shared secret input in bytes
pub const SECRET_SIZE: usize = 32;

/// Size of the derived Blowfish key in bytes
pub const CIPHER_KEY_SIZE: usize = 16;

/// Size of the derived IV in bytes (one Blowfish block)
pub const IV_SIZE: usize = 8;

/// Derive the cipher key and IV from a 32-byte secret
///
/// Key = bytes [8..24); IV = bytes [0..8) XOR [24..32), byte-wise.
/// Exact offsets are wire-compatibility-critical.
pub fn derive_key_iv(secret: &[u8; SECRET_SIZE]) -> ([u8; CIPHER_KEY_SIZE], [u8; IV_SIZE]) {
    let mut key = [0u8; CIPHER_KEY_SIZE];
    key.copy_from_slice(&secret[8..24]);

    let mut iv = [0u8; IV_SIZE];
    for i in 0..IV_SIZE {
        iv[i] = secret[i] ^ secret[24 + i];
    }

    (key, iv)
}

/// A derived cipher key with its Blowfish key schedule already expanded
///
/// Derive once per secret and reuse across messages to amortize key
/// expansion. Holds no plaintext key bytes after construction.
#[derive(Clone)]
pub struct CipherKey {
    cipher: Blowfish,
    iv: [u8; IV_SIZE],
}

impl CipherKey {
    /// Expand a 32-byte secret into a ready-to-use cipher key
    pub fn derive(secret: &[u8; SECRET_SIZE]) -> Result<Self> {
        let (mut key, iv) = derive_key_iv(secret);
        let cipher = Blowfish::new_from_slice(&key)
            .map_err(|_| Error::EncryptionFailed("Blowfish key setup failed".into()))?;
        key.zeroize();
        Ok(Self { cipher, iv })
    }

    /// Encrypt data in CFB mode; output length equals input length
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let enc = Encryptor::inner_iv_slice_init(self.cipher.clone(), &self.iv)
            .map_err(|_| Error::EncryptionFailed("Invalid IV length".into()))?;
        let mut buf = data.to_vec();
        enc.encrypt(&mut buf);
        Ok(buf)
    }

    /// Decrypt data in CFB mode; output length equals input length
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let dec = Decryptor::inner_iv_slice_init(self.cipher.clone(), &self.iv)
            .map_err(|_| Error::DecryptionFailed("Invalid IV length".into()))?;
        let mut buf = data.to_vec();
        dec.decrypt(&mut buf);
        Ok(buf)
    }
}

/// One-shot encrypt: derives the key schedule, encrypts, discards it
pub fn encrypt(data: &[u8], secret: &[u8; SECRET_SIZE]) -> Result<Vec<u8>> {
    CipherKey::derive(secret)?.encrypt(data)
}

/// One-shot decrypt: derives the key schedule, decrypts, discards it
pub fn decrypt(data: &[u8], secret: &[u8; SECRET_SIZE]) -> Result<Vec<u8>> {
    CipherKey::derive(secret)?.decrypt(data)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_secret() -> [u8; SECRET_SIZE] {
        let mut secret = [0u8; SECRET_SIZE];
        for (i, b) in secret.iter_mut().enumerate() {
            *b = i as u8;
        }
        secret
    }

    #[test]
    fn test_key_iv_windows() {
        let secret = test_secret();
        let (key, iv) = derive_key_iv(&secret);

        assert_eq!(key, secret[8..24]);
        for i in 0..IV_SIZE {
            assert_eq!(iv[i], secret[i] ^ secret[24 + i]);
        }
    }

    #[test]
    fn test_roundtrip() {
        let secret = test_secret();
        let plaintext = b"the quick brown fox jumps over the lazy dog";

        let ciphertext = encrypt(plaintext, &secret).unwrap();
        assert_ne!(&ciphertext[..], &plaintext[..]);

        let decrypted = decrypt(&ciphertext, &secret).unwrap();
        assert_eq!(&decrypted[..], &plaintext[..]);
    }

    #[test]
    fn test_length_preserved_no_padding() {
        let secret = test_secret();
        // Lengths straddling the 8-byte block size, including empty.
        for len in [0usize, 1, 7, 8, 9, 15, 16, 63, 64, 65, 1000] {
            let plaintext = vec![0xA5u8; len];
            let ciphertext = encrypt(&plaintext, &secret).unwrap();
            assert_eq!(ciphertext.len(), len, "length changed for len={}", len);
            assert_eq!(decrypt(&ciphertext, &secret).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_wrong_secret_garbles() {
        let plaintext = b"confidential";
        let ciphertext = encrypt(plaintext, &test_secret()).unwrap();

        let mut other = test_secret();
        other[12] ^= 0x01;
        let garbled = decrypt(&ciphertext, &other).unwrap();
        assert_ne!(&garbled[..], &plaintext[..]);
    }

    #[test]
    fn test_deterministic_for_same_secret() {
        // CFB with a secret-derived IV is deterministic per (secret, message);
        // per-message uniqueness is a higher-layer responsibility.
        let secret = test_secret();
        let a = encrypt(b"same input", &secret).unwrap();
        let b = encrypt(b"same input", &secret).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reused_cipher_key_matches_one_shot() {
        let secret = test_secret();
        let key = CipherKey::derive(&secret).unwrap();

        for msg in [&b"first"[..], b"second", b"third"] {
            let reused = key.encrypt(msg).unwrap();
            let oneshot = encrypt(msg, &secret).unwrap();
            assert_eq!(reused, oneshot);
            assert_eq!(key.decrypt(&reused).unwrap(), msg);
        }
    }
}
