//! # Cryptography Module
//!
//! All cryptographic primitives used by Kestrel Core.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  One secp256k1 key pair per identity                                   │
//! │  ──────────────────────────────────                                     │
//! │                                                                         │
//! │  ┌──────────────┐    sign / recover    ┌────────────────────────────┐  │
//! │  │              │─────────────────────►│ signing: recoverable ECDSA │  │
//! │  │   KeyPair    │                      │ (RFC 6979, low-S)          │  │
//! │  │  priv 32 B   │                      └────────────────────────────┘  │
//! │  │  pub  33 B   │    ECDH              ┌────────────────────────────┐  │
//! │  │              │─────────────────────►│ ecdh: shared point         │  │
//! │  └──────────────┘                      └─────────────┬──────────────┘  │
//! │                                                      │ x-coordinate    │
//! │                                                      ▼                 │
//! │                                        ┌────────────────────────────┐  │
//! │                                        │ cipher: Blowfish-CFB       │  │
//! │                                        │ (windowed key/IV, no pad)  │  │
//! │                                        └────────────────────────────┘  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose | Why |
//! |-----------|---------|-----|
//! | secp256k1 ECDSA + recovery | Identity proof without key exchange | Handshake authenticates via key recovery |
//! | secp256k1 ECDH | Shared secrets | Same curve as signing, one key pair |
//! | Blowfish-CFB | Message confidentiality | Wire-compatible streaming cipher, no padding |
//! | SHA-256 | Digests, key derivation | Standard, well-analyzed |
//! | Keccak-256 | Address derivation | 20-byte account identifiers |
//!
//! ## Security Considerations
//!
//! 1. **Key zeroization**: secret scalars and shared secrets are zeroized on drop
//! 2. **Deterministic nonces**: RFC 6979 — signing never consumes randomness
//! 3. **Secure random**: `rand::rngs::OsRng` for all key generation
//! 4. **No secret logging**: tracing output never includes key material

pub mod cipher;
pub mod ecdh;
pub mod encoding;
pub mod keys;
pub mod signing;

pub use cipher::{decrypt, derive_key_iv, encrypt, CipherKey};
pub use ecdh::{decrypt_from, encrypt_for, SharedSecret};
pub use keys::{Address, KeyPair, ADDRESS_SIZE, COMBINED_KEY_SIZE, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
pub use signing::{digest, recover, recover_bytes, sign, verify, Digest, RecoverableSignature, SIGNATURE_SIZE};
