//! Secret-store keying: Argon2id cost, salt and the `secrets.json` record

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

const KDF_NAME: &str = "argon2id";
const METADATA_VERSION: u32 = 1;
const SALT_LEN: usize = 16;

/// Argon2id cost parameters
///
/// Serialized field names match what `secrets.json` has always carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    pub time_cost: u32,
    /// KiB
    pub memory_cost: u32,
    pub parallelism: u32,
    /// Derived key length in bytes
    pub hash_len: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            time_cost: 3,
            memory_cost: 64 * 1024,
            parallelism: 4,
            hash_len: 32,
        }
    }
}

impl Argon2Params {
    /// Stretch `passphrase` into a database key
    pub fn derive_key(&self, passphrase: &str, salt: &[u8]) -> Result<Vec<u8>> {
        let params = argon2::Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(self.hash_len as usize),
        )
        .map_err(|e| Error::Encryption(format!("Invalid argon2 params: {}", e)))?;

        let mut key = vec![0u8; self.hash_len as usize];
        argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
            .hash_password_into(passphrase.as_bytes(), salt, &mut key)
            .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;
        Ok(key)
    }
}

/// Contents of `secrets.json`; never holds the passphrase or the key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionMetadata {
    pub encrypted: bool,
    /// Base64
    pub salt: String,
    pub algorithm: String,
    pub version: u32,
    pub argon2_params: Argon2Params,
}

impl EncryptionMetadata {
    /// Record for an encrypted store with a fresh random salt
    pub fn generate(argon2_params: Argon2Params) -> Self {
        let salt: [u8; SALT_LEN] = rand::thread_rng().gen();
        Self::new_encrypted(BASE64.encode(salt), argon2_params)
    }

    pub fn new_encrypted(salt: String, argon2_params: Argon2Params) -> Self {
        Self {
            encrypted: true,
            salt,
            algorithm: KDF_NAME.to_string(),
            version: METADATA_VERSION,
            argon2_params,
        }
    }

    /// Hex key for DuckDB's `ENCRYPTION_KEY`
    pub fn database_key(&self, passphrase: &str) -> Result<String> {
        if self.algorithm != KDF_NAME {
            return Err(Error::Encryption(format!(
                "Unsupported key derivation '{}'",
                self.algorithm
            )));
        }
        let salt = BASE64
            .decode(&self.salt)
            .map_err(|e| Error::Encryption(format!("Invalid salt: {}", e)))?;
        let key = self.argon2_params.derive_key(passphrase, &salt)?;
        Ok(hex::encode(key))
    }
}

/// What `DuckDbSecretStore::status` reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionStatus {
    pub encrypted: bool,
    pub algorithm: Option<String>,
    pub version: Option<u32>,
}

impl EncryptionStatus {
    pub fn unencrypted() -> Self {
        Self {
            encrypted: false,
            algorithm: None,
            version: None,
        }
    }
}

impl From<&EncryptionMetadata> for EncryptionStatus {
    fn from(meta: &EncryptionMetadata) -> Self {
        Self {
            encrypted: meta.encrypted,
            algorithm: Some(meta.algorithm.clone()),
            version: Some(meta.version),
        }
    }
}
