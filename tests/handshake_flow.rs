//! End-to-end handshake flows: two accounts authenticating each other
//! through the full stack, from raw state machines up to async sessions
//! wired together like two phones pointed at each other.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use kestrel_core::{
    Absorbed, Account, CodeRenderer, FrameSource, Handshake, ScanSession, SessionConfig,
};

struct ChannelFrames(mpsc::UnboundedReceiver<String>);

#[async_trait]
impl FrameSource for ChannelFrames {
    async fn next_frame(&mut self) -> Option<String> {
        self.0.recv().await
    }
}

struct ChannelRenderer(mpsc::UnboundedSender<String>);

impl CodeRenderer for ChannelRenderer {
    fn render(&mut self, payload: &str) {
        let _ = self.0.send(payload.to_string());
    }
}

#[test]
fn state_machines_reach_mutual_verification() {
    let alice = Account::create("Alice");
    let bob = Account::create("Bob");

    let mut a = Handshake::new(alice.keys(), alice.display_name());
    let mut b = Handshake::new(bob.keys(), bob.display_name());

    let mut alices_peer = None;
    let mut bobs_peer = None;
    for _ in 0..6 {
        if let Absorbed::Completed(peer) = b.absorb(&a.payload().unwrap()) {
            bobs_peer = Some(peer);
        }
        if let Absorbed::Completed(peer) = a.absorb(&b.payload().unwrap()) {
            alices_peer = Some(peer);
        }
        if alices_peer.is_some() && bobs_peer.is_some() {
            break;
        }
    }

    let alices_peer = alices_peer.expect("alice verified bob");
    let bobs_peer = bobs_peer.expect("bob verified alice");

    assert_eq!(alices_peer.address, bob.address());
    assert_eq!(alices_peer.public_key, bob.keys().public_bytes());
    assert_eq!(alices_peer.display_name, "Bob");
    assert_eq!(bobs_peer.address, alice.address());
    assert_eq!(bobs_peer.display_name, "Alice");
}

#[test]
fn noisy_camera_does_not_derail_the_exchange() {
    let alice = Account::create("Alice");
    let bob = Account::create("Bob");

    let mut a = Handshake::new(alice.keys(), alice.display_name());
    let mut b = Handshake::new(bob.keys(), bob.display_name());

    // Interleave real frames with junk and stale duplicates.
    let noise = [
        "",
        "WIFI:T:WPA;S:cafe;P:espresso;;",
        "0partial",
        "https://example.com/poster",
    ];

    let mut alices_peer = None;
    for round in 0..6 {
        for junk in &noise {
            assert!(!matches!(a.absorb(junk), Absorbed::Completed(_)));
        }
        b.absorb(&a.payload().unwrap());
        // Re-deliver Bob's frame several times, as a real camera would.
        let frame = b.payload().unwrap();
        for _ in 0..3 {
            if let Absorbed::Completed(peer) = a.absorb(&frame) {
                alices_peer = Some(peer);
            }
        }
        if alices_peer.is_some() {
            assert!(round >= 1);
            break;
        }
    }

    assert_eq!(alices_peer.expect("completed despite noise").address, bob.address());
}

#[test]
fn cancelled_exchange_restarts_with_fresh_state() {
    let alice = Account::create("Alice");
    let bob = Account::create("Bob");

    let mut a1 = Handshake::new(alice.keys(), alice.display_name());
    let mut b = Handshake::new(bob.keys(), bob.display_name());

    // Progress until Bob has verified Alice, then abandon Alice's side.
    a1.absorb(&b.payload().unwrap());
    b.absorb(&a1.payload().unwrap());
    assert!(b.peer().is_some());
    let abandoned_payload = a1.payload().unwrap();
    drop(a1);

    // A new session renders a different challenge, and Bob resets for it.
    let a2 = Handshake::new(alice.keys(), alice.display_name());
    assert_ne!(a2.payload().unwrap(), abandoned_payload);

    assert!(b.peer().is_some());
    b.absorb(&a2.payload().unwrap());
    assert!(b.peer().is_none(), "stale verification must be discarded");
}

#[tokio::test]
async fn sessions_complete_over_channels() {
    let alice = Account::create("Alice");
    let bob = Account::create("Bob");

    let (a_to_b_tx, a_to_b_rx) = mpsc::unbounded_channel();
    let (b_to_a_tx, b_to_a_rx) = mpsc::unbounded_channel();

    let config = SessionConfig {
        countdown: Duration::from_millis(10),
    };
    let (alice_session, _alice_handle) = ScanSession::new(config.clone());
    let (bob_session, _bob_handle) = ScanSession::new(config);

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
    assert_eq!(bobs_peer.address, alice.address());
}

#[tokio::test]
async fn session_cancellation_returns_cleanly() {
    let alice = Account::create("Alice");
    let (session, handle) = ScanSession::new(SessionConfig {
        countdown: Duration::from_millis(10),
    });

    let (frame_tx, frame_rx) = mpsc::unbounded_channel();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();

    let run = tokio::spawn(async move {
        let mut frames = ChannelFrames(frame_rx);
        let mut renderer = ChannelRenderer(out_tx);
        session.run(&alice, &mut frames, &mut renderer).await
    });

    // Session is live once the initial code is rendered.
    let initial = out_rx.recv().await.expect("initial render");
    assert!(initial.starts_with('0'));

    // Feed one junk frame, then cancel.
    frame_tx.send("not a handshake frame".into()).unwrap();
    handle.stop();

    assert_eq!(run.await.unwrap().unwrap(), None);
}
