//! # Mutual QR Handshake
//!
//! In-person mutual authentication: two devices face each other, each
//! rendering a QR code while scanning the peer's. No server, no network,
//! no prior key exchange — the recoverable signature in each frame is the
//! entire proof of identity.
//!
//! ## Protocol
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      HANDSHAKE STATE PROGRESSION                        │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   Device A                              Device B                        │
//! │   ────────                              ────────                        │
//! │   render  [0 ‖ chA]          ◄────►     render  [0 ‖ chB]              │
//! │                                                                         │
//! │   scan chB, sign(chB ‖ nameA)           scan chA, sign(chA ‖ nameB)    │
//! │   render  [0 ‖ chA ‖ sigA ‖ nameA]      render  [0 ‖ chB ‖ sigB ‖ ...] │
//! │                                                                         │
//! │   recover pkB from sigB over            recover pkA from sigA over     │
//! │   digest(chA ‖ nameB) → peer verified   digest(chB ‖ nameA)            │
//! │   render  [1 ‖ chA ‖ sigA ‖ nameA]      render  [1 ‖ chB ‖ ...]        │
//! │                                                                         │
//! │   see peer's flag = 1  →  COMPLETED     see peer's flag = 1 → COMPLETED│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each side signs the *peer's* challenge, so recovery on the scanning side
//! runs against its *own* challenge — a replayed frame from an earlier
//! session carries a signature over a challenge this session never issued
//! and recovers to garbage that fails verification.
//!
//! [`Handshake`] is the pure state machine: feed it scanned payloads, render
//! what it tells you. The async camera/display/timer plumbing lives in
//! [`session`].

pub mod session;
pub mod wire;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::crypto::keys::PUBLIC_KEY_SIZE;
use crate::crypto::{digest, recover_bytes, sign, Address, Digest, RecoverableSignature};
use crate::crypto::KeyPair;
use crate::error::Result;
use wire::{Challenge, QrFrame};

pub use session::{CodeRenderer, FrameSource, ScanSession, SessionConfig, SessionHandle};

/// The authenticated peer produced by a completed handshake
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerIdentity {
    /// The peer's account address
    pub address: Address,
    /// The peer's compressed public key, recovered from their signature
    #[serde(with = "public_key_hex")]
    pub public_key: [u8; PUBLIC_KEY_SIZE],
    /// The display name the peer signed
    pub display_name: String,
}

/// Serde helper for compressed public keys as hex
mod public_key_hex {
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
            .map_err(|_| serde::de::Error::custom("Invalid public key length"))
    }
}

/// Outcome of absorbing one scanned payload
#[derive(Debug, Clone, PartialEq)]
pub enum Absorbed {
    /// The frame was noise, a duplicate, or arrived after completion;
    /// nothing changed and the rendered code is still current
    Ignored,
    /// State advanced; re-render [`Handshake::payload`]
    Updated,
    /// Both sides have verified each other; render the final payload once
    /// so the peer can observe the raised flag, then stop scanning
    Completed(PeerIdentity),
}

/// The pure handshake state machine for one device
///
/// Holds this side's challenge for the lifetime of the session. Absorbing
/// frames never blocks and never touches I/O. After completion the state
/// machine is terminal: further frames are ignored. A new session means a
/// new `Handshake` with a fresh challenge.
pub struct Handshake {
    keys: KeyPair,
    display_name: String,
    challenge: Challenge,
    /// Signature over (peer challenge ‖ own name); set once the peer's
    /// challenge has been observed, re-signed if their challenge changes
    signature: Option<RecoverableSignature>,
    peer_challenge: Option<Challenge>,
    /// Set once a frame signature recovered to a valid key
    peer: Option<PeerIdentity>,
    /// Set once the peer's frame showed flag = 1 for the current exchange
    verified_by_peer: bool,
    completed: bool,
}

impl Handshake {
    /// Start a handshake with a fresh random challenge
    pub fn new(keys: &KeyPair, display_name: &str) -> Self {
        let challenge = Challenge::random();
        trace!(challenge = %challenge.encode(), "handshake started");
        Self {
            keys: keys.clone(),
            display_name: display_name.to_string(),
            challenge,
            signature: None,
            peer_challenge: None,
            peer: None,
            verified_by_peer: false,
            completed: false,
        }
    }

    /// This side's challenge
    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    /// Whether both sides have verified each other
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// The verified peer, once recovery has succeeded
    pub fn peer(&self) -> Option<&PeerIdentity> {
        self.peer.as_ref()
    }

    /// The payload to render as this side's QR code right now
    pub fn payload(&self) -> Result<String> {
        let frame = QrFrame {
            verified: self.peer.is_some(),
            challenge: self.challenge.clone(),
            signature: self.signature,
            display_name: self.signature.map(|_| self.display_name.clone()),
        };
        frame.encode()
    }

    /// Absorb one payload scanned off the peer's screen
    ///
    /// Malformed and foreign payloads are ignored without mutating state.
    /// Duplicates of already-absorbed frames are ignored. A frame carrying
    /// a challenge different from the one previously seen restarts the
    /// exchange from that challenge.
    pub fn absorb(&mut self, payload: &str) -> Absorbed {
        if self.completed {
            return Absorbed::Ignored;
        }

        let frame = match QrFrame::decode(payload) {
            Ok(frame) => frame,
            Err(e) => {
                trace!(error = %e, "scanned frame ignored");
                return Absorbed::Ignored;
            }
        };

        // Scanning our own reflection must not progress the exchange.
        if frame.challenge == self.challenge {
            trace!("scanned own challenge; ignoring");
            return Absorbed::Ignored;
        }

        let mut changed = false;

        // A new (or changed) peer challenge restarts the exchange: the old
        // verification flags refer to a challenge that no longer exists.
        if self.peer_challenge.as_ref() != Some(&frame.challenge) {
            if self.peer_challenge.is_some() {
                debug!("peer challenge changed; resetting verification state");
                self.peer = None;
                self.verified_by_peer = false;
            }
            self.peer_challenge = Some(frame.challenge.clone());
            match sign(&response_digest(&frame.challenge, &self.display_name), &self.keys) {
                Ok(signature) => self.signature = Some(signature),
                Err(e) => {
                    warn!(error = %e, "failed to sign peer challenge");
                    return Absorbed::Ignored;
                }
            }
            changed = true;
        }

        // Recover the peer from their signature over OUR challenge.
        if let (Some(signature), Some(name)) = (&frame.signature, &frame.display_name) {
            let stale = self
                .peer
                .as_ref()
                .map(|peer| peer.display_name != *name)
                .unwrap_or(true);
            if stale {
                match recover_bytes(&response_digest(&self.challenge, name), signature) {
                    Ok(public_key) => match Address::from_public_bytes(&public_key) {
                        Ok(address) => {
                            debug!(peer = %address, name = %name, "peer verified");
                            self.peer = Some(PeerIdentity {
                                address,
                                public_key,
                                display_name: name.clone(),
                            });
                            changed = true;
                        }
                        Err(e) => trace!(error = %e, "recovered key had no address"),
                    },
                    Err(e) => {
                        trace!(error = %e, "signature did not recover; frame ignored")
                    }
                }
            }
        }

        // The peer raising their flag only counts once we know who they are.
        if frame.verified && !self.verified_by_peer && self.peer.is_some() {
            debug!("peer confirmed verification of this side");
            self.verified_by_peer = true;
            changed = true;
        }

        if self.peer.is_some() && self.verified_by_peer {
            self.completed = true;
            // completed is terminal; unwrap-free because peer was just checked
            if let Some(peer) = self.peer.clone() {
                return Absorbed::Completed(peer);
            }
        }

        if changed {
            Absorbed::Updated
        } else {
            Absorbed::Ignored
        }
    }
}

impl std::fmt::Debug for Handshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handshake")
            .field("challenge", &self.challenge.encode())
            .field("peer", &self.peer)
            .field("verified_by_peer", &self.verified_by_peer)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

/// The digest each side signs: the peer's encoded challenge concatenated
/// with the signer's display name
fn response_digest(challenge: &Challenge, display_name: &str) -> Digest {
    let encoded = challenge.encode();
    let mut data = Vec::with_capacity(encoded.len() + display_name.len());
    data.extend_from_slice(encoded.as_bytes());
    data.extend_from_slice(display_name.as_bytes());
    digest(&data)
}

// ============================================================================
// TESTS
// ============================================================================
