//! Two in-process accounts authenticating each other over channels, standing
//! in for two phones pointed at each other.
//!
//! Run with: `cargo run --example handshake_demo`

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use kestrel_core::{Account, CodeRenderer, FrameSource, ScanSession, SessionConfig};

struct Camera(mpsc::UnboundedReceiver<String>);

#[async_trait]
impl FrameSource for Camera {
    async fn next_frame(&mut self) -> Option<String> {
        self.0.recv().await
    }
}

struct Screen {
    who: &'static str,
    to_peer: mpsc::UnboundedSender<String>,
}

impl CodeRenderer for Screen {
    fn render(&mut self, payload: &str) {
        println!("[{}] displaying {} chars: {}…", self.who, payload.len(), &payload[..12]);
        let _ = self.to_peer.send(payload.to_string());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let alice = Account::create("Alice");
    let bob = Account::create("Bob");
    println!("Alice is {}", alice.address());
    println!("Bob   is {}", bob.address());

    let (a_to_b_tx, a_to_b_rx) = mpsc::unbounded_channel();
    let (b_to_a_tx, b_to_a_rx) = mpsc::unbounded_channel();

    let config = SessionConfig {
        countdown: Duration::from_millis(100),
    };
    let (alice_session, _alice_handle) = ScanSession::new(config.clone());
    let (bob_session, _bob_handle) = ScanSession::new(config);

    let alice_task = async {
        let mut camera = Camera(b_to_a_rx);
        let mut screen = Screen { who: "alice", to_peer: a_to_b_tx };
        alice_session.run(&alice, &mut camera, &mut screen).await
    };
    let bob_task = async {
        let mut camera = Camera(a_to_b_rx);
        let mut screen = Screen { who: "bob", to_peer: b_to_a_tx };
        bob_session.run(&bob, &mut camera, &mut screen).await
    };

    let (alice_result, bob_result) = tokio::join!(alice_task, bob_task);

    match (alice_result, bob_result) {
        (Ok(Some(alices_peer)), Ok(Some(bobs_peer))) => {
            println!("Alice verified {} at {}", alices_peer.display_name, alices_peer.address);
            println!("Bob   verified {} at {}", bobs_peer.display_name, bobs_peer.address);
            assert_eq!(alices_peer.address, bob.address());
            assert_eq!(bobs_peer.address, alice.address());
            println!("mutual authentication complete");
        }
        other => println!("handshake did not complete: {:?}", other),
    }
}
