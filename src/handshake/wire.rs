//! # QR Frame Wire Format
//!
//! The ASCII payload each device renders into its QR code during the mutual
//! handshake, and the parser for payloads decoded off the peer's screen.
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         QR FRAME LAYOUT                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────┬────────────────┬───────────────────┬──────────────────────┐  │
//! │  │ flag │   challenge    │    [signature]    │   [display name]     │  │
//! │  │ 1 ch │  18 ch base58  │   89 ch base58    │  base58, to end      │  │
//! │  └──────┴────────────────┴───────────────────┴──────────────────────┘  │
//! │                                                                         │
//! │  flag       '1' once this side has verified the peer, else '0'        │
//! │  challenge  13 bytes: 4-byte static prefix + 9 random bytes           │
//! │  signature  65-byte recoverable signature over peerChallenge ‖ name   │
//! │  name       UTF-8 display name; present exactly when signature is     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field boundaries are fixed-width: base58 output is pinned to its
//! worst-case width by '1'-padding (see [`crate::crypto::encoding`]), so
//! the parser can slice by character count. Signature and name appear only
//! once the renderer has observed the peer's challenge.
//!
//! Every parse failure is `FrameIgnored`: cameras deliver noisy, partial,
//! and foreign QR payloads constantly, and the protocol recovers by simply
//! waiting for the next frame.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::crypto::encoding::{from_base58, from_base58_fixed, to_base58, to_base58_fixed};
use crate::crypto::{RecoverableSignature, SIGNATURE_SIZE};
use crate::error::{Error, Result};

/// Static prefix identifying a Kestrel handshake challenge
pub const CHALLENGE_PREFIX: &[u8; 4] = b"khs1";

/// Random bytes appended to the prefix
pub const CHALLENGE_RANDOM_SIZE: usize = 9;

/// Total challenge length in bytes
pub const CHALLENGE_SIZE: usize = CHALLENGE_PREFIX.len() + CHALLENGE_RANDOM_SIZE;

/// Fixed base58 width of the challenge field (13 bytes worst case)
pub const CHALLENGE_WIDTH: usize = 18;

/// Fixed base58 width of the signature field (65 bytes worst case)
pub const SIGNATURE_WIDTH: usize = 89;

/// A handshake challenge: static prefix plus CSPRNG-fresh random bytes
///
/// The prefix lets the scanner discard QR codes that are not handshake
/// frames at all (URLs, boarding passes, the peer's lunch menu) without
/// touching protocol state.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Challenge([u8; CHALLENGE_SIZE]);

impl Challenge {
    /// Generate a fresh random challenge
    pub fn random() -> Self {
        let mut bytes = [0u8; CHALLENGE_SIZE];
        bytes[..CHALLENGE_PREFIX.len()].copy_from_slice(CHALLENGE_PREFIX);
        OsRng.fill_bytes(&mut bytes[CHALLENGE_PREFIX.len()..]);
        Self(bytes)
    }

    /// Encode as the fixed-width wire field
    pub fn encode(&self) -> String {
        // 13 bytes always fit in 18 base58 chars.
        to_base58_fixed(&self.0, CHALLENGE_WIDTH).unwrap_or_else(|_| "1".repeat(CHALLENGE_WIDTH))
    }

    /// Decode a wire field, rejecting anything without the static prefix
    pub fn decode(text: &str) -> Result<Self> {
        let bytes = from_base58_fixed(text, CHALLENGE_SIZE)
            .map_err(|_| Error::FrameIgnored("Challenge field is not base58".into()))?;
        if !bytes.starts_with(CHALLENGE_PREFIX) {
            return Err(Error::FrameIgnored(
                "Challenge does not carry the protocol prefix".into(),
            ));
        }
        let mut out = [0u8; CHALLENGE_SIZE];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    /// The raw challenge bytes
    pub fn as_bytes(&self) -> &[u8; CHALLENGE_SIZE] {
        &self.0
    }
}

/// One decoded (or to-be-rendered) handshake frame
#[derive(Clone, Debug, PartialEq)]
pub struct QrFrame {
    /// Whether the rendering side has verified its peer
    pub verified: bool,
    /// The rendering side's current challenge
    pub challenge: Challenge,
    /// Signature over (peer challenge ‖ own display name), once the peer's
    /// challenge has been observed
    pub signature: Option<RecoverableSignature>,
    /// The rendering side's display name, present exactly with `signature`
    pub display_name: Option<String>,
}

impl QrFrame {
    /// Encode into the ASCII payload to render as a QR code
    pub fn encode(&self) -> Result<String> {
        let mut out = String::with_capacity(1 + CHALLENGE_WIDTH + SIGNATURE_WIDTH + 32);
        out.push(if self.verified { '1' } else { '0' });
        out.push_str(&self.challenge.encode());
        if let (Some(signature), Some(name)) = (&self.signature, &self.display_name) {
            out.push_str(&to_base58_fixed(&signature.to_bytes(), SIGNATURE_WIDTH)?);
            out.push_str(&to_base58(name.as_bytes()));
        }
        Ok(out)
    }

    /// Parse a payload decoded from the peer's QR code
    ///
    /// Any malformed, truncated, or foreign payload fails with the soft
    /// `FrameIgnored` error; nothing is inferred from partial fields.
    pub fn decode(payload: &str) -> Result<Self> {
        let flag = match payload.get(0..1) {
            Some("0") => false,
            Some("1") => true,
            _ => {
                return Err(Error::FrameIgnored(
                    "Missing or invalid verified flag".into(),
                ))
            }
        };

        let challenge_text = payload
            .get(1..1 + CHALLENGE_WIDTH)
            .ok_or_else(|| Error::FrameIgnored("Payload shorter than a challenge".into()))?;
        let challenge = Challenge::decode(challenge_text)?;

        let rest = payload.get(1 + CHALLENGE_WIDTH..).unwrap_or("");
        if rest.is_empty() {
            return Ok(Self {
                verified: flag,
                challenge,
                signature: None,
                display_name: None,
            });
        }

        let signature_text = rest
            .get(..SIGNATURE_WIDTH)
            .ok_or_else(|| Error::FrameIgnored("Truncated signature field".into()))?;
        let signature_bytes = from_base58_fixed(signature_text, SIGNATURE_SIZE)
            .map_err(|_| Error::FrameIgnored("Signature field is not base58".into()))?;
        let signature = RecoverableSignature::from_bytes(&signature_bytes)
            .map_err(|_| Error::FrameIgnored("Signature field is structurally invalid".into()))?;

        let name_text = rest.get(SIGNATURE_WIDTH..).unwrap_or("");
        if name_text.is_empty() {
            return Err(Error::FrameIgnored("Signature without a display name".into()));
        }
        let name_bytes = from_base58(name_text)
            .map_err(|_| Error::FrameIgnored("Display name field is not base58".into()))?;
        let display_name = String::from_utf8(name_bytes)
            .map_err(|_| Error::FrameIgnored("Display name is not UTF-8".into()))?;

        Ok(Self {
            verified: flag,
            challenge,
            signature: Some(signature),
            display_name: Some(display_name),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{digest, sign, KeyPair};

    #[test]
    fn test_challenge_has_prefix_and_width() {
        let challenge = Challenge::random();
        assert!(challenge.as_bytes().starts_with(CHALLENGE_PREFIX));
        assert_eq!(challenge.encode().len(), CHALLENGE_WIDTH);
    }

    #[test]
    fn test_challenge_roundtrip() {
        let challenge = Challenge::random();
        let decoded = Challenge::decode(&challenge.encode()).unwrap();
        assert_eq!(challenge, decoded);
    }

    #[test]
    fn test_challenge_rejects_foreign_prefix() {
        let mut bytes = [0u8; CHALLENGE_SIZE];
        bytes[..4].copy_from_slice(b"http");
        let text = crate::crypto::encoding::to_base58_fixed(&bytes, CHALLENGE_WIDTH).unwrap();
        assert!(matches!(
            Challenge::decode(&text),
            Err(Error::FrameIgnored(_))
        ));
    }

    #[test]
    fn test_bare_frame_roundtrip() {
        let frame = QrFrame {
            verified: false,
            challenge: Challenge::random(),
            signature: None,
            display_name: None,
        };
        let payload = frame.encode().unwrap();
        assert_eq!(payload.len(), 1 + CHALLENGE_WIDTH);
        assert_eq!(QrFrame::decode(&payload).unwrap(), frame);
    }

    #[test]
    fn test_full_frame_roundtrip() {
        let keys = KeyPair::generate();
        let frame = QrFrame {
            verified: true,
            challenge: Challenge::random(),
            signature: Some(sign(&digest(b"peer challenge + name"), &keys).unwrap()),
            display_name: Some("Ada Lovelace".into()),
        };
        let payload = frame.encode().unwrap();
        assert_eq!(QrFrame::decode(&payload).unwrap(), frame);
    }

    #[test]
    fn test_decode_rejects_noise() {
        for payload in [
            "",
            "x",
            "2AAAAAAAAAAAAAAAAA",                 // bad flag
            "0short",                             // truncated challenge
            "https://example.com/menu",           // foreign QR code
            "0\u{1F980}AAAAAAAAAAAAAAAAA",        // non-ASCII where base58 expected
        ] {
            assert!(
                matches!(QrFrame::decode(payload), Err(Error::FrameIgnored(_))),
                "payload {:?} was not ignored",
                payload
            );
        }
    }

    #[test]
    fn test_decode_rejects_truncated_signature() {
        let frame = QrFrame {
            verified: false,
            challenge: Challenge::random(),
            signature: None,
            display_name: None,
        };
        let mut payload = frame.encode().unwrap();
        payload.push_str("abc"); // trailing junk too short for a signature
        assert!(matches!(
            QrFrame::decode(&payload),
            Err(Error::FrameIgnored(_))
        ));
    }

    #[test]
    fn test_decode_rejects_signature_without_name() {
        let keys = KeyPair::generate();
        let frame = QrFrame {
            verified: false,
            challenge: Challenge::random(),
            signature: Some(sign(&digest(b"d"), &keys).unwrap()),
            display_name: Some("Bob".into()),
        };
        let payload = frame.encode().unwrap();
        let truncated = &payload[..1 + CHALLENGE_WIDTH + SIGNATURE_WIDTH];
        assert!(matches!(
            QrFrame::decode(truncated),
            Err(Error::FrameIgnored(_))
        ));
    }
}
