//! # Kestrel Core
//!
//! Cryptographic identity and mutual-authentication core for an
//! end-to-end-encrypted messenger. One secp256k1 key pair per account
//! drives everything: signing, in-person QR authentication, shared-secret
//! encryption, stealth addresses, and social key recovery.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KESTREL CORE                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   ┌───────────┐      owns       ┌──────────────────────────────────┐   │
//! │   │  account  │────────────────►│  crypto                          │   │
//! │   │  + vault  │                 │  keys · signing · ecdh · cipher  │   │
//! │   └─────┬─────┘                 └───────┬──────────────────────────┘   │
//! │         │                               │                              │
//! │         │ authenticates via             │ built on                     │
//! │         ▼                               ▼                              │
//! │   ┌───────────┐                 ┌───────────┐    ┌───────────┐        │
//! │   │ handshake │                 │  stealth  │    │  shamir   │        │
//! │   │ QR mutual │                 │ one-time  │    │  social   │        │
//! │   │   auth    │                 │ addresses │    │ recovery  │        │
//! │   └───────────┘                 └───────────┘    └───────────┘        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use kestrel_core::{Account, Handshake, Absorbed};
//!
//! // Two devices, each with its own account.
//! let alice = Account::create("Alice");
//! let bob = Account::create("Bob");
//!
//! // Each runs a handshake state machine, rendering its payload as a QR
//! // code and absorbing payloads scanned off the peer's screen.
//! let mut a = Handshake::new(alice.keys(), alice.display_name());
//! let mut b = Handshake::new(bob.keys(), bob.display_name());
//!
//! let mut verified = None;
//! for _ in 0..4 {
//!     b.absorb(&a.payload().unwrap());
//!     if let Absorbed::Completed(peer) = a.absorb(&b.payload().unwrap()) {
//!         verified = Some(peer);
//!         break;
//!     }
//! }
//! assert_eq!(verified.unwrap().address, bob.address());
//! ```
//!
//! ## Design Notes
//!
//! - **Pure core, async edges.** State machines and crypto are synchronous
//!   and deterministic; only the scan session touches tokio.
//! - **No global state.** Accounts and derived cipher keys are plain values
//!   that callers own and pass around.
//! - **Secrets stay quiet.** Private keys, shared secrets, and share data
//!   are zeroized where possible and never logged or `Debug`-printed.

#![warn(missing_docs)]

pub mod account;
pub mod crypto;
pub mod error;
pub mod handshake;
pub mod shamir;
pub mod stealth;

pub use account::{Account, KeyStore, MemoryKeyStore};
pub use crypto::{
    digest, recover, recover_bytes, sign, verify, Address, CipherKey, KeyPair,
    RecoverableSignature, SharedSecret,
};
pub use error::{Error, Result};
pub use handshake::{
    Absorbed, CodeRenderer, FrameSource, Handshake, PeerIdentity, ScanSession, SessionConfig,
    SessionHandle,
};
pub use shamir::{combine, decrypt_share, encrypt_share, split, Share};
pub use stealth::StealthAddress;

/// Library version from Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_public_surface_composes() {
        // Account → signature → recovery → address, all through re-exports.
        let account = Account::create("Alice");
        let d = digest(b"smoke test");
        let sig = sign(&d, account.keys()).unwrap();
        let recovered = recover_bytes(&d, &sig).unwrap();
        assert_eq!(
            Address::from_public_bytes(&recovered).unwrap(),
            account.address()
        );
    }
}
