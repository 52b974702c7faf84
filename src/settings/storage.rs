//! Encrypted settings storage using SQLite.

use super::encryption::{Sealed, SettingsCipher};
use super::{SettingsRecord, SettingsStore};
use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Settings storage backed by SQLite.
///
/// # Schema
/// ```sql
/// CREATE TABLE settings (
///     name        TEXT PRIMARY KEY,
///     label       TEXT NOT NULL,
///     value       TEXT NOT NULL,   -- Encrypted JSON record
///     value_nonce TEXT NOT NULL,   -- Nonce for value
///     created_at  TEXT NOT NULL,   -- ISO 8601 timestamp
///     updated_at  TEXT NOT NULL    -- ISO 8601 timestamp
/// );
/// ```
///
/// Records hold credentials and tokens, so the whole JSON value is sealed
/// with AES-256-GCM before it reaches disk.
pub struct SqliteSettingsStore {
    conn: Mutex<Connection>,
    cipher: SettingsCipher,
}

impl SqliteSettingsStore {
    /// Creates or opens a settings store.
    ///
    /// # Arguments
    /// * `db_path` - Path to SQLite database file (`":memory:"` for tests)
    /// * `encryption_key` - Base64-encoded 32-byte master key
    pub fn new<P: AsRef<Path>>(db_path: P, encryption_key: &str) -> Result<Self> {
        let cipher =
            SettingsCipher::from_base64_key(encryption_key).context("Invalid encryption key")?;

        let conn = Connection::open(db_path).context("Failed to open settings database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS settings (
                name        TEXT PRIMARY KEY,
                label       TEXT NOT NULL,
                value       TEXT NOT NULL,
                value_nonce TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );",
        )
        .context("Failed to create settings table")?;

        Ok(Self {
            conn: Mutex::new(conn),
            cipher,
        })
    }

    /// Returns the label a record was created with.
    pub fn label(&self, name: &str) -> Result<Option<String>> {
        self.lock()?
            .query_row(
                "SELECT label FROM settings WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read settings label")
    }

    /// Returns the stored (encrypted) value column, for inspection in tests
    /// and tooling.
    pub fn raw_value(&self, name: &str) -> Result<Option<String>> {
        self.lock()?
            .query_row(
                "SELECT value FROM settings WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read settings value")
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Settings database lock poisoned"))
    }

    fn seal_record(&self, record: &SettingsRecord) -> Result<Sealed> {
        let json = serde_json::to_string(record).context("Failed to serialize settings")?;
        self.cipher
            .seal(&json)
            .context("Failed to encrypt settings value")
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn get_by_name(&self, name: &str) -> Result<Option<SettingsRecord>> {
        let row: Option<(String, String)> = self
            .lock()?
            .query_row(
                "SELECT value, value_nonce FROM settings WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("Failed to query settings")?;

        let Some((ciphertext, nonce)) = row else {
            return Ok(None);
        };

        let json = self
            .cipher
            .open(&Sealed { ciphertext, nonce })
            .with_context(|| format!("Failed to decrypt settings '{}'", name))?;
        let record = serde_json::from_str(&json)
            .with_context(|| format!("Settings '{}' are not a valid record", name))?;
        Ok(Some(record))
    }

    fn set_by_name(&self, name: &str, record: &SettingsRecord) -> Result<()> {
        let sealed = self.seal_record(record)?;
        let now = Utc::now().to_rfc3339();

        // Upsert; the label of an existing row is kept.
        self.lock()?
            .execute(
                "INSERT INTO settings (name, label, value, value_nonce, created_at, updated_at)
                 VALUES (?1, ?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(name) DO UPDATE SET
                    value = excluded.value,
                    value_nonce = excluded.value_nonce,
                    updated_at = excluded.updated_at",
                params![name, sealed.ciphertext, sealed.nonce, now],
            )
            .context("Failed to store settings")?;

        Ok(())
    }

    fn add(&self, name: &str, record: &SettingsRecord, label: &str) -> Result<()> {
        let sealed = self.seal_record(record)?;
        let now = Utc::now().to_rfc3339();

        let inserted = self
            .lock()?
            .execute(
                "INSERT OR IGNORE INTO settings (name, label, value, value_nonce, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![name, label, sealed.ciphertext, sealed.nonce, now],
            )
            .context("Failed to add settings")?;

        if inserted == 0 {
            bail!("Settings '{}' already exist", name);
        }
        Ok(())
    }
}
