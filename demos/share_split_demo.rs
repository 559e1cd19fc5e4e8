//! Splitting an account's combined key into custodian shares and recovering
//! the account from a quorum of them.
//!
//! Run with: `cargo run --example share_split_demo`

use kestrel_core::{combine, decrypt_share, encrypt_share, split, Account, KeyPair};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let account = Account::create("Alice");
    println!("account {}", account.address());

    // Three custodians hold shares; any two can restore the account.
    let custodians: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
    let shares = split(&account.keys().to_combined(), 3, 2).expect("split");

    // Each share travels to its custodian inside an ECIES envelope.
    let envelopes: Vec<Vec<u8>> = shares
        .iter()
        .zip(&custodians)
        .map(|(share, custodian)| {
            encrypt_share(share, &custodian.public_bytes()).expect("envelope")
        })
        .collect();
    println!("issued {} encrypted shares", envelopes.len());

    // Later: custodians 0 and 2 come back.
    let returned = vec![
        decrypt_share(&envelopes[0], &custodians[0]).expect("open"),
        decrypt_share(&envelopes[2], &custodians[2]).expect("open"),
    ];

    let combined = combine(&returned).expect("combine");
    let restored = KeyPair::from_combined(&combined).expect("restore");
    assert_eq!(restored.address(), account.address());
    println!("recovered account {} from 2 of 3 shares", restored.address());

    // One share alone is not enough.
    let lone = vec![decrypt_share(&envelopes[1], &custodians[1]).expect("open")];
    assert!(combine(&lone).is_err());
    println!("a single share recovers nothing");
}
