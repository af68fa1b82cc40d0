//! DuckDB secret store
//!
//! Secrets live in `secrets.duckdb` in the data directory. With a passphrase
//! the file is attached with DuckDB's native AES-GCM encryption; the key is
//! derived with Argon2id from the passphrase and a random salt kept in
//! `secrets.json` next to the database.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use duckdb::{params, Connection, OptionalExt};

use crate::domain::result::{Error, Result};
use crate::domain::{Argon2Params, EncryptionMetadata, EncryptionStatus};
use crate::ports::SecretStore;

const DB_FILE: &str = "secrets.duckdb";
const METADATA_FILE: &str = "secrets.json";

/// Maximum number of retries when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS totp_secrets (
        event_uuid VARCHAR PRIMARY KEY,
        secret VARCHAR NOT NULL,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );
";

fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("could not set lock on file")
}

/// Secret store backed by a local DuckDB file
pub struct DuckDbSecretStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    status: EncryptionStatus,
}

impl DuckDbSecretStore {
    /// Open or create the store in `dir`
    ///
    /// A passphrase is required once the store has been created encrypted,
    /// and refused for a store created without one.
    pub fn open(dir: &Path, passphrase: Option<&str>) -> Result<Self> {
        Self::open_with_params(dir, passphrase, Argon2Params::default())
    }

    /// Like [`open`](Self::open), with the key derivation cost used when a
    /// new encrypted store is created
    pub fn open_with_params(
        dir: &Path,
        passphrase: Option<&str>,
        params: Argon2Params,
    ) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let db_path = dir.join(DB_FILE);
        let metadata_path = dir.join(METADATA_FILE);

        let metadata = if metadata_path.exists() {
            let content = fs::read_to_string(&metadata_path)?;
            Some(serde_json::from_str::<EncryptionMetadata>(&content)?)
        } else {
            None
        };

        let (key_hex, status) = match (metadata, passphrase) {
            (Some(meta), Some(passphrase)) if meta.encrypted => {
                (Some(meta.database_key(passphrase)?), EncryptionStatus::from(&meta))
            }
            (Some(meta), None) if meta.encrypted => {
                return Err(Error::Encryption(
                    "Secret store is encrypted; a passphrase is required".to_string(),
                ));
            }
            (_, Some(passphrase)) => {
                if db_path.exists() {
                    return Err(Error::Encryption(
                        "Secret store was created without encryption".to_string(),
                    ));
                }
                let meta = EncryptionMetadata::generate(params);
                let key = meta.database_key(passphrase)?;
                fs::write(&metadata_path, serde_json::to_string_pretty(&meta)?)?;
                (Some(key), EncryptionStatus::from(&meta))
            }
            (_, None) => (None, EncryptionStatus::unencrypted()),
        };

        let conn = Self::open_with_retry(&db_path, key_hex.as_deref())?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            status,
        })
    }

    fn open_with_retry(db_path: &Path, key_hex: Option<&str>) -> Result<Connection> {
        let mut attempt = 0;
        loop {
            match Self::try_open_connection(db_path, key_hex) {
                Ok(conn) => return Ok(conn),
                Err(e) if attempt + 1 < MAX_RETRIES && is_retryable_error(&e.to_string()) => {
                    thread::sleep(Duration::from_millis(
                        INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt),
                    ));
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_open_connection(db_path: &Path, key_hex: Option<&str>) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        match key_hex {
            Some(key) => {
                let conn = Connection::open_in_memory_with_flags(config)?;
                conn.execute_batch(&format!(
                    "ATTACH {} AS secrets (ENCRYPTION_KEY {}); USE secrets;",
                    sql_literal(&db_path.display().to_string()),
                    sql_literal(key)
                ))
                .map_err(|e| {
                    Error::Encryption(format!("Could not open secret store (wrong passphrase?): {}", e))
                })?;
                Ok(conn)
            }
            None => Ok(Connection::open_with_flags(db_path, config)?),
        }
    }

    pub fn status(&self) -> &EncryptionStatus {
        &self.status
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))
    }
}

/// Quote a value as a SQL string literal, doubling embedded quotes
fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl SecretStore for DuckDbSecretStore {
    fn name(&self) -> &str {
        "duckdb"
    }

    fn put(&self, key: &str, secret: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO totp_secrets (event_uuid, secret, updated_at)
             VALUES (?, ?, CURRENT_TIMESTAMP)",
            params![key, secret],
        )?;
        Ok(())
    }

    fn fetch(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let secret = conn
            .query_row(
                "SELECT secret FROM totp_secrets WHERE event_uuid = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(secret)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM totp_secrets WHERE event_uuid = ?", params![key])?;
        Ok(deleted > 0)
    }
}
