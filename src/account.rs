//! # Account
//!
//! The explicit identity context every operation receives: a key pair plus
//! a display name. There is no process-wide "current account" — callers
//! own their `Account` values and pass them where needed, which keeps
//! multi-account and test scenarios trivial.
//!
//! Persistence goes through the [`KeyStore`] trait so the same account code
//! runs against the platform keychain in production and an in-memory map in
//! tests. The stored form is the base64 combined key (private ‖ public),
//! alongside the display name.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::crypto::{Address, KeyPair};
use crate::error::{Error, Result};

/// Vault key under which the combined key pair is stored
const VAULT_KEYS: &str = "identity.keys";

/// Vault key under which the display name is stored
const VAULT_NAME: &str = "identity.display_name";

/// A messaging identity: key pair plus display name
#[derive(Clone, Debug)]
pub struct Account {
    keys: KeyPair,
    display_name: String,
}

impl Account {
    /// Wrap an existing key pair as an account
    pub fn new(keys: KeyPair, display_name: impl Into<String>) -> Self {
        Self {
            keys,
            display_name: display_name.into(),
        }
    }

    /// Create a brand-new account with freshly generated keys
    pub fn create(display_name: impl Into<String>) -> Self {
        let account = Self::new(KeyPair::generate(), display_name);
        info!(address = %account.address(), "account created");
        account
    }

    /// Derive an account deterministically from seed material
    ///
    /// The same seed (typically a wallet signature over a fixed message)
    /// always reproduces the same account.
    pub fn from_seed(seed: &[u8], display_name: impl Into<String>) -> Result<Self> {
        Ok(Self::new(KeyPair::from_seed(seed)?, display_name))
    }

    /// This account's key pair
    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    /// This account's display name
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// This account's address
    pub fn address(&self) -> Address {
        self.keys.address()
    }

    /// Store the account in a vault
    pub fn persist(&self, store: &mut dyn KeyStore) -> Result<()> {
        store.set(VAULT_KEYS, self.keys.to_base64().as_bytes())?;
        store.set(VAULT_NAME, self.display_name.as_bytes())?;
        debug!(address = %self.address(), "account persisted");
        Ok(())
    }

    /// Restore a previously persisted account
    ///
    /// Fails with `VaultNotFound` when no account has been stored, and
    /// `MalformedKey` when the stored key material does not parse.
    pub fn restore(store: &dyn KeyStore) -> Result<Self> {
        let combined = store
            .get(VAULT_KEYS)?
            .ok_or_else(|| Error::VaultNotFound(VAULT_KEYS.into()))?;
        let combined = String::from_utf8(combined)
            .map_err(|_| Error::MalformedKey("Stored key is not base64 text".into()))?;
        let keys = KeyPair::from_base64(&combined)?;

        let display_name = match store.get(VAULT_NAME)? {
            Some(bytes) => String::from_utf8(bytes)
                .map_err(|_| Error::VaultRead("Stored display name is not UTF-8".into()))?,
            None => String::new(),
        };

        Ok(Self { keys, display_name })
    }

    /// Remove any persisted account from the vault
    pub fn clear(store: &mut dyn KeyStore) -> Result<()> {
        store.remove(VAULT_KEYS)?;
        store.remove(VAULT_NAME)?;
        info!("vault cleared");
        Ok(())
    }
}

/// Backing storage for account persistence
///
/// Implemented over the platform keychain in the host application;
/// [`MemoryKeyStore`] serves tests and ephemeral setups. Removing a key
/// that is not present is not an error.
pub trait KeyStore {
    /// Read a value, `None` when absent
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    /// Write a value, overwriting any existing one
    fn set(&mut self, key: &str, value: &[u8]) -> Result<()>;
    /// Delete a value if present
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory key store; contents vanish with the value
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryKeyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_distinct_accounts() {
        let a = Account::create("Alice");
        let b = Account::create("Bob");
        assert_ne!(a.address(), b.address());
        assert_eq!(a.display_name(), "Alice");
    }

    #[test]
    fn test_from_seed_reproducible() {
        let a = Account::from_seed(b"wallet signature", "Alice").unwrap();
        let b = Account::from_seed(b"wallet signature", "Alice").unwrap();
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn test_persist_restore_roundtrip() {
        let account = Account::create("Alice");
        let mut store = MemoryKeyStore::new();

        account.persist(&mut store).unwrap();
        let restored = Account::restore(&store).unwrap();

        assert_eq!(restored.address(), account.address());
        assert_eq!(restored.display_name(), "Alice");
        assert_eq!(
            restored.keys().secret_bytes(),
            account.keys().secret_bytes()
        );
    }

    #[test]
    fn test_restore_empty_vault_fails() {
        let store = MemoryKeyStore::new();
        assert!(matches!(
            Account::restore(&store),
            Err(Error::VaultNotFound(_))
        ));
    }

    #[test]
    fn test_restore_corrupt_key_fails() {
        let mut store = MemoryKeyStore::new();
        store.set(VAULT_KEYS, b"not base64 at all!").unwrap();
        assert!(Account::restore(&store).is_err());
    }

    #[test]
    fn test_clear_removes_account() {
        let account = Account::create("Alice");
        let mut store = MemoryKeyStore::new();

        account.persist(&mut store).unwrap();
        Account::clear(&mut store).unwrap();
        assert!(Account::restore(&store).is_err());

        // Clearing an already-empty vault is fine.
        Account::clear(&mut store).unwrap();
    }
}
