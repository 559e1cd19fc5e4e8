//! # Error Handling
//!
//! This module provides the error types for Kestrel Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Key Errors                                                        │
//! │  │   ├── MalformedKey          - Wrong-length or invalid key bytes     │
//! │  │   ├── Encoding              - Invalid hex/base64/base58 text        │
//! │  │   └── KeyDerivationFailed   - Seed could not yield a valid scalar   │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── EncryptionFailed      - Symmetric encryption failed           │
//! │  │   ├── DecryptionFailed      - Symmetric decryption failed           │
//! │  │   ├── InvalidSignature      - Structurally invalid signature        │
//! │  │   ├── VerificationFailed    - Signature did not verify              │
//! │  │   └── RecoveryFailed        - No public key recoverable             │
//! │  │                                                                      │
//! │  ├── Handshake Errors                                                  │
//! │  │   ├── FrameIgnored          - QR payload is not a protocol frame    │
//! │  │   └── SessionClosed         - Scan session already terminal         │
//! │  │                                                                      │
//! │  ├── Share Errors                                                      │
//! │  │   ├── InsufficientShares    - Below the reconstruction threshold    │
//! │  │   ├── InvalidShare          - Malformed or inconsistent share       │
//! │  │   └── InvalidShareConfig    - Bad (threshold, total) parameters     │
//! │  │                                                                      │
//! │  └── Vault Errors                                                      │
//! │      ├── VaultRead             - Failed to read from the key store     │
//! │      ├── VaultWrite            - Failed to write to the key store      │
//! │      └── VaultNotFound         - Item not found in the key store       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All cryptographic validation failures are local and non-retryable: the
//! caller must obtain new input. `FrameIgnored` is the one soft case — the
//! handshake discards the offending camera frame and waits for the next one.
//! No error here is ever downgraded in a way that lets unauthenticated key
//! material be used for encryption.

use thiserror::Error;

/// Result type alias for Kestrel Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Kestrel Core
///
/// Errors are categorized by module/domain to make handling clearer and to
/// provide meaningful messages to the application layer.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Key Errors (100-199)
    // ========================================================================
    /// Key bytes have the wrong length or do not describe a curve point
    #[error("Malformed key: {0}")]
    MalformedKey(String),

    /// Text is not valid hex, base64, or base58
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A seed could not be turned into a valid private scalar
    #[error("Failed to derive keys: {0}")]
    KeyDerivationFailed(String),

    // ========================================================================
    // Crypto Errors (200-299)
    // ========================================================================
    /// Symmetric encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Symmetric decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Signature bytes are structurally invalid (r/s out of range, bad id)
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Signature did not verify against the given digest and public key
    #[error("Signature verification failed")]
    VerificationFailed,

    /// No valid public key could be recovered from the signature
    #[error("Public key recovery failed")]
    RecoveryFailed,

    // ========================================================================
    // Handshake Errors (300-399)
    // ========================================================================
    /// A decoded QR payload does not carry the expected challenge prefix.
    /// Soft error: the frame is discarded and scanning continues.
    #[error("QR payload ignored: {0}")]
    FrameIgnored(String),

    /// The scan session has already completed or been stopped
    #[error("Scan session is closed")]
    SessionClosed,

    // ========================================================================
    // Share Errors (400-499)
    // ========================================================================
    /// Reconstruction was attempted with fewer shares than the threshold
    #[error("Insufficient shares: need {needed}, got {got}")]
    InsufficientShares {
        /// The threshold recorded in the shares
        needed: u8,
        /// The number of shares supplied
        got: usize,
    },

    /// A share is malformed or inconsistent with its siblings
    #[error("Invalid share: {0}")]
    InvalidShare(String),

    /// The (threshold, total) split parameters are unusable
    #[error("Invalid share configuration: {0}")]
    InvalidShareConfig(String),

    // ========================================================================
    // Vault Errors (500-599)
    // ========================================================================
    /// Failed to read from the external key store
    #[error("Failed to read from the vault: {0}")]
    VaultRead(String),

    /// Failed to write to the external key store
    #[error("Failed to write to the vault: {0}")]
    VaultWrite(String),

    /// Item not found in the external key store
    #[error("Not found in the vault: {0}")]
    VaultNotFound(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================
    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the numeric error code for the application layer
    ///
    /// Codes are organized by category:
    /// - 100-199: Keys and encodings
    /// - 200-299: Crypto
    /// - 300-399: Handshake
    /// - 400-499: Shares
    /// - 500-599: Vault
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Keys (100-199)
            Error::MalformedKey(_) => 100,
            Error::Encoding(_) => 101,
            Error::KeyDerivationFailed(_) => 102,

            // Crypto (200-299)
            Error::EncryptionFailed(_) => 200,
            Error::DecryptionFailed(_) => 201,
            Error::InvalidSignature(_) => 202,
            Error::VerificationFailed => 203,
            Error::RecoveryFailed => 204,

            // Handshake (300-399)
            Error::FrameIgnored(_) => 300,
            Error::SessionClosed => 301,

            // Shares (400-499)
            Error::InsufficientShares { .. } => 400,
            Error::InvalidShare(_) => 401,
            Error::InvalidShareConfig(_) => 402,

            // Vault (500-599)
            Error::VaultRead(_) => 500,
            Error::VaultWrite(_) => 501,
            Error::VaultNotFound(_) => 502,

            // Internal (900-999)
            Error::Internal(_) => 900,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors can be resolved by waiting for new input (the next
    /// camera frame) or by retrying the external store. Cryptographic
    /// validation failures are never recoverable — the caller must obtain
    /// fresh input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::FrameIgnored(_) | Error::VaultRead(_) | Error::VaultWrite(_)
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::MalformedKey("test".into()).code(), 100);
        assert_eq!(Error::EncryptionFailed("test".into()).code(), 200);
        assert_eq!(Error::FrameIgnored("test".into()).code(), 300);
        assert_eq!(
            Error::InsufficientShares { needed: 3, got: 2 }.code(),
            400
        );
        assert_eq!(Error::VaultRead("test".into()).code(), 500);
        assert_eq!(Error::Internal("test".into()).code(), 900);
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::FrameIgnored("noise".into()).is_recoverable());
        assert!(!Error::VerificationFailed.is_recoverable());
        assert!(!Error::RecoveryFailed.is_recoverable());
        assert!(!Error::InsufficientShares { needed: 3, got: 1 }.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = Error::InsufficientShares { needed: 3, got: 2 };
        assert_eq!(err.to_string(), "Insufficient shares: need 3, got 2");
    }
}
