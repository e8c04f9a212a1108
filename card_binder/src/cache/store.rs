//! Persistent card record store
//!
//! Records live in a SQLite table keyed by `(card_name, set_code)`; image
//! bytes live next to the database as `images/<scryfall id>.jpg`. All queries
//! are parameterized.

use super::record::{CachedCardRecord, CardMetadata, FetchStatus};
use crate::card_key::CardKey;
use crate::error::{BinderError, Result};
use chrono::DateTime;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Database file name inside the home directory
pub const DB_FILE_NAME: &str = "card_binder.db";
/// Image directory name inside the home directory
pub const IMAGE_DIR_NAME: &str = "images";

/// Record counts for `cache stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub records: usize,
    pub resolved: usize,
    pub not_found: usize,
    pub with_image: usize,
}

/// SQLite-backed card record store plus image directory
pub struct CacheStore {
    conn: Connection,
    image_dir: PathBuf,
}

/// Create the `card_records` table if it does not exist
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS card_records (
            card_name TEXT NOT NULL,
            set_code TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL,
            metadata TEXT,
            image_file TEXT,
            fetched_at INTEGER NOT NULL,
            PRIMARY KEY (card_name, set_code)
        );

        CREATE INDEX IF NOT EXISTS idx_card_records_status ON card_records(status);
        ",
    )
}

impl CacheStore {
    /// Open (or create) the store under `home`
    pub fn open(home: &Path) -> Result<Self> {
        std::fs::create_dir_all(home)?;
        let image_dir = home.join(IMAGE_DIR_NAME);
        std::fs::create_dir_all(&image_dir)?;

        let db_path = home.join(DB_FILE_NAME);
        log::info!("Opening cache database: {:?}", db_path);
        let conn = Connection::open(&db_path)?;
        init_schema(&conn)?;
        crate::registry::init_schema(&conn)?;

        Ok(Self { conn, image_dir })
    }

    /// Underlying connection, shared with the binder registry
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn image_path(&self, file_name: &str) -> PathBuf {
        self.image_dir.join(file_name)
    }

    /// Look up the record for a key.
    ///
    /// Rows that cannot be decoded, or whose image file has gone missing, are
    /// reported as absent so the next resolve fetches them again.
    pub fn get(&self, key: &CardKey) -> Result<Option<CachedCardRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT status, metadata, image_file, fetched_at
                 FROM card_records
                 WHERE card_name = ?1 AND set_code = ?2",
                params![key.name(), key.set_column()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((status, metadata, image_file, fetched_at)) = row else {
            return Ok(None);
        };

        let Some(status) = FetchStatus::parse(&status) else {
            log::warn!("Ignoring cached record for {} with unknown status {:?}", key, status);
            return Ok(None);
        };
        let Some(fetched_at) = DateTime::from_timestamp(fetched_at, 0) else {
            log::warn!("Ignoring cached record for {} with invalid timestamp", key);
            return Ok(None);
        };
        let metadata: Option<CardMetadata> = match metadata {
            Some(json) => match serde_json::from_str(&json) {
                Ok(meta) => Some(meta),
                Err(e) => {
                    log::warn!("Ignoring cached record for {} with bad metadata: {}", key, e);
                    return Ok(None);
                }
            },
            None => None,
        };
        if status == FetchStatus::Resolved && metadata.is_none() {
            log::warn!("Ignoring resolved record for {} without metadata", key);
            return Ok(None);
        }
        if let Some(file) = &image_file {
            if !self.image_path(file).is_file() {
                log::warn!("Cached image {} for {} is missing", file, key);
                return Ok(None);
            }
        }

        Ok(Some(CachedCardRecord {
            key: key.clone(),
            metadata,
            image_file,
            fetched_at,
            status,
        }))
    }

    /// Insert or replace the record for its key.
    ///
    /// The image file is written before the row so a stored record never
    /// points at a missing image.
    pub fn put(&self, record: &CachedCardRecord, image: Option<&[u8]>) -> Result<()> {
        if record.status == FetchStatus::Error {
            return Err(BinderError::UnstorableRecord(record.key.clone()));
        }

        if let (Some(file), Some(bytes)) = (&record.image_file, image) {
            let path = self.image_path(file);
            let tmp = path.with_extension("jpg.tmp");
            std::fs::write(&tmp, bytes)?;
            std::fs::rename(&tmp, &path)?;
            log::debug!("Cached image {} ({} bytes)", file, bytes.len());
        }

        let metadata = record
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT OR REPLACE INTO card_records
             (card_name, set_code, status, metadata, image_file, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.key.name(),
                record.key.set_column(),
                record.status.as_str(),
                metadata,
                record.image_file,
                record.fetched_at.timestamp(),
            ],
        )?;
        Ok(())
    }

    /// Delete the record for a key; returns whether one existed.
    ///
    /// Image files are left in place since other keys may share them.
    pub fn remove(&self, key: &CardKey) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM card_records WHERE card_name = ?1 AND set_code = ?2",
            params![key.name(), key.set_column()],
        )?;
        Ok(deleted > 0)
    }

    /// Drop every not-found record
    pub fn clear_negative(&self) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM card_records WHERE status = ?1",
            params![FetchStatus::NotFound.as_str()],
        )?;
        log::info!("Cleared {} not-found records", deleted);
        Ok(deleted)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let (records, resolved, not_found, with_image): (i64, i64, i64, i64) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(status = 'resolved'), 0),
                    COALESCE(SUM(status = 'not_found'), 0),
                    COUNT(image_file)
             FROM card_records",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
        Ok(CacheStats {
            records: records as usize,
            resolved: resolved as usize,
            not_found: not_found as usize,
            with_image: with_image as usize,
        })
    }
}
