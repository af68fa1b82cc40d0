//! Secret store port - protected local persistence for TOTP secrets

use crate::domain::result::Result;

/// Key-value store for ticket secrets, keyed by event uuid
///
/// Implementations decide how secrets are protected at rest. Keys are
/// independent; no cross-key ordering is required.
pub trait SecretStore: Send + Sync {
    /// Store name (e.g., "duckdb", "memory")
    fn name(&self) -> &str;

    /// Insert or replace the secret for `key`
    fn put(&self, key: &str, secret: &str) -> Result<()>;

    /// Read the secret for `key`
    fn fetch(&self, key: &str) -> Result<Option<String>>;

    /// Remove the secret for `key`, reporting whether one existed
    fn delete(&self, key: &str) -> Result<bool>;
}
