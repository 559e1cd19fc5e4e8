//! # Scan Session
//!
//! The async boundary around the pure [`Handshake`](super::Handshake) state
//! machine: camera frames in, rendered QR payloads out, plus the countdown
//! and cancellation plumbing a real scan screen needs.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SESSION LIFECYCLE                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   run() ──► countdown (default 3 s, both users aim their devices)      │
//! │               │                                                         │
//! │               ▼                                                         │
//! │           fresh Handshake ──► render initial code                      │
//! │               │                                                         │
//! │               ▼                                                         │
//! │        ┌─► next_frame() ──► absorb ──► Updated? ──► re-render ──┐      │
//! │        └────────────────────────────────────────────────────────┘      │
//! │               │                                                         │
//! │               ├── Completed ──► render final code ──► Ok(Some(peer))   │
//! │               ├── camera closed ─────────────────────► Ok(None)        │
//! │               └── handle.stop() ─────────────────────► Ok(None)        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancellation discards all session state. The next `run` builds a new
//! state machine with a fresh challenge, so a cancelled session leaves
//! nothing replayable behind.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::account::Account;
use crate::error::Result;
use crate::handshake::{Absorbed, Handshake, PeerIdentity};

/// Source of payloads decoded from the camera's QR scanner
///
/// Implementations wrap whatever the platform camera yields. Returning
/// `None` means the camera closed and the session should end.
#[async_trait]
pub trait FrameSource: Send {
    /// The next decoded payload, or `None` when the camera closes
    async fn next_frame(&mut self) -> Option<String>;
}

/// Sink for the QR payload this device should currently display
///
/// Called once per state change; the implementation turns the payload into
/// an actual QR image on screen.
pub trait CodeRenderer: Send {
    /// Display `payload` as this device's QR code
    fn render(&mut self, payload: &str);
}

/// Scan session tuning
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delay before the exchange starts, giving both users time to aim
    pub countdown: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            countdown: Duration::from_secs(3),
        }
    }
}

/// Remote control for a running session; cancel from another task
#[derive(Clone)]
pub struct SessionHandle {
    stop: watch::Sender<bool>,
}

impl SessionHandle {
    /// Cancel the session; `run` returns `Ok(None)`
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }
}

/// One mutual-authentication scan session
pub struct ScanSession {
    config: SessionConfig,
    stop: watch::Receiver<bool>,
}

impl ScanSession {
    /// Create a session and the handle that can cancel it
    pub fn new(config: SessionConfig) -> (Self, SessionHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { config, stop: rx }, SessionHandle { stop: tx })
    }

    /// Run the session to completion, cancellation, or camera close
    ///
    /// Returns `Ok(Some(peer))` when both sides verified each other,
    /// `Ok(None)` on cancellation or camera close. Session state is
    /// dropped on every exit path.
    pub async fn run<F, R>(
        mut self,
        account: &Account,
        frames: &mut F,
        renderer: &mut R,
    ) -> Result<Option<PeerIdentity>>
    where
        F: FrameSource,
        R: CodeRenderer,
    {
        info!(countdown = ?self.config.countdown, "scan session starting");
        tokio::select! {
            _ = sleep(self.config.countdown) => {}
            _ = wait_for_stop(&mut self.stop) => {
                debug!("session cancelled during countdown");
                return Ok(None);
            }
        }

        let mut handshake = Handshake::new(account.keys(), account.display_name());
        renderer.render(&handshake.payload()?);

        loop {
            tokio::select! {
                _ = wait_for_stop(&mut self.stop) => {
                    info!("scan session cancelled; state discarded");
                    return Ok(None);
                }
                frame = frames.next_frame() => {
                    let Some(payload) = frame else {
                        debug!("frame source closed; session over");
                        return Ok(None);
                    };
                    match handshake.absorb(&payload) {
                        Absorbed::Ignored => {}
                        Absorbed::Updated => renderer.render(&handshake.payload()?),
                        Absorbed::Completed(peer) => {
                            // One final render so the peer can observe the
                            // raised flag and complete their own side.
                            renderer.render(&handshake.payload()?);
                            info!(peer = %peer.address, "handshake completed");
                            return Ok(Some(peer));
                        }
                    }
                }
            }
        }
    }
}

/// Resolve when the stop signal fires; never resolve if the handle is
/// dropped without stopping
async fn wait_for_stop(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow() {
            return;
        }
        if stop.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use tokio::sync::mpsc;

    struct ChannelFrames(mpsc::UnboundedReceiver<String>);

    #[async_trait]
    impl FrameSource for ChannelFrames {
        async fn next_frame(&mut self) -> Option<String> {
            self.0.recv().await
        }
    }

    /// Renderer that forwards each payload to the peer's frame source,
    /// like two phones pointed at each other.
    struct ChannelRenderer(mpsc::UnboundedSender<String>);

    impl CodeRenderer for ChannelRenderer {
        fn render(&mut self, payload: &str) {
            let _ = self.0.send(payload.to_string());
        }
    }

    fn instant_config() -> SessionConfig {
        SessionConfig {
            countdown: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_two_sessions_complete_mutually() {
        let alice = Account::new(KeyPair::generate(), "Alice");
        let bob = Account::new(KeyPair::generate(), "Bob");

        let (a_to_b_tx, a_to_b_rx) = mpsc::unbounded_channel();
        let (b_to_a_tx, b_to_a_rx) = mpsc::unbounded_channel();

        let (alice_session, _alice_handle) = ScanSession::new(instant_config());
        let (bob_session, _bob_handle) = ScanSession::new(instant_config());

        let alice_task = async {
            let mut frames = ChannelFrames(b_to_a_rx);
            let mut renderer = ChannelRenderer(a_to_b_tx);
            alice_session.run(&alice, &mut frames, &mut renderer).await
        };
        let bob_task = async {
            let mut frames = ChannelFrames(a_to_b_rx);
            let mut renderer = ChannelRenderer(b_to_a_tx);
            bob_session.run(&bob, &mut frames, &mut renderer).await
        };

        let (alice_result, bob_result) = tokio::join!(alice_task, bob_task);

        let alices_peer = alice_result.unwrap().expect("alice completed");
        let bobs_peer = bob_result.unwrap().expect("bob completed");

        assert_eq!(alices_peer.address, bob.address());
        assert_eq!(alices_peer.display_name, "Bob");
        assert_eq!(bobs_peer.address, alice.address());
        assert_eq!(bobs_peer.display_name, "Alice");
    }

    #[tokio::test]
    async fn test_stop_during_countdown_returns_none() {
        let account = Account::new(KeyPair::generate(), "Alice");
        let (session, handle) = ScanSession::new(SessionConfig {
            countdown: Duration::from_secs(60),
        });

        let (_tx, rx) = mpsc::unbounded_channel();
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let mut frames = ChannelFrames(rx);
        let mut renderer = ChannelRenderer(out_tx);

        handle.stop();
        let result = session.run(&account, &mut frames, &mut renderer).await;
        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stop_while_scanning_returns_none() {
        let account = Account::new(KeyPair::generate(), "Alice");
        let (session, handle) = ScanSession::new(instant_config());

        let (_frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let mut frames = ChannelFrames(frame_rx);
        let mut renderer = ChannelRenderer(out_tx);

        let run = tokio::spawn(async move {
            session.run(&account, &mut frames, &mut renderer).await
        });

        // Wait for the initial render so we know scanning has started.
        let initial = out_rx.recv().await.expect("initial render");
        assert!(initial.starts_with('0'));

        handle.stop();
        assert_eq!(run.await.unwrap().unwrap(), None);
    }

    #[tokio::test]
    async fn test_camera_close_returns_none() {
        let account = Account::new(KeyPair::generate(), "Alice");
        let (session, _handle) = ScanSession::new(instant_config());

        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let mut frames = ChannelFrames(frame_rx);
        let mut renderer = ChannelRenderer(out_tx);

        drop(frame_tx);
        let result = session.run(&account, &mut frames, &mut renderer).await;
        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test]
    async fn test_restart_uses_fresh_challenge() {
        let account = Account::new(KeyPair::generate(), "Alice");

        let mut initials = Vec::new();
        for _ in 0..2 {
            let (session, handle) = ScanSession::new(instant_config());
            let (_frame_tx, frame_rx) = mpsc::unbounded_channel();
            let (out_tx, mut out_rx) = mpsc::unbounded_channel();
            let mut frames = ChannelFrames(frame_rx);
            let mut renderer = ChannelRenderer(out_tx);

            let account = account.clone();
            let run = tokio::spawn(async move {
                session.run(&account, &mut frames, &mut renderer).await
            });
            initials.push(out_rx.recv().await.expect("initial render"));
            handle.stop();
            run.await.unwrap().unwrap();
        }

        assert_ne!(initials[0], initials[1]);
    }
}
