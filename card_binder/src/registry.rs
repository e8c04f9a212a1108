//! Registry of created binders
//!
//! Lives in the cache database so `list`, `show`, `edit` and `delete` work
//! across runs.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

/// Result type for registry operations
pub type DbResult<T> = rusqlite::Result<T>;

/// Id used when neither a name nor an id is given
pub const DEFAULT_BINDER_ID: &str = "default";

/// A binder view created earlier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinderRecord {
    pub id: String,
    pub name: String,
    /// Output directory the view was written to
    pub path: String,
    pub card_count: usize,
}

/// Create the `binders` table if it does not exist
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS binders (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            path TEXT NOT NULL,
            card_count INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )
}

/// Lowercase and replace anything outside `[a-z0-9_]` with `_`
pub fn sanitize_binder_id(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// First free id among `base`, `base_1`, `base_2`, ...
pub fn unique_binder_id(conn: &Connection, base: &str) -> DbResult<String> {
    let base = sanitize_binder_id(base);
    let mut candidate = base.clone();
    let mut n = 0;
    while get_binder(conn, &candidate)?.is_some() {
        n += 1;
        candidate = format!("{}_{}", base, n);
    }
    Ok(candidate)
}

/// Insert or replace a binder entry
pub fn save_binder(conn: &Connection, binder: &BinderRecord) -> DbResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO binders (id, name, path, card_count)
         VALUES (?1, ?2, ?3, ?4)",
        params![binder.id, binder.name, binder.path, binder.card_count as i64],
    )?;
    log::debug!("Registered binder `{}`", binder.id);
    Ok(())
}

fn binder_from_row(row: &rusqlite::Row<'_>) -> DbResult<BinderRecord> {
    Ok(BinderRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        card_count: row.get::<_, i64>(3)? as usize,
    })
}

pub fn get_binder(conn: &Connection, id: &str) -> DbResult<Option<BinderRecord>> {
    conn.query_row(
        "SELECT id, name, path, card_count FROM binders WHERE id = ?1",
        params![id],
        binder_from_row,
    )
    .optional()
}

/// All binders ordered by id
pub fn list_binders(conn: &Connection) -> DbResult<Vec<BinderRecord>> {
    let mut stmt = conn.prepare("SELECT id, name, path, card_count FROM binders ORDER BY id")?;
    let results: DbResult<Vec<BinderRecord>> = stmt.query_map([], binder_from_row)?.collect();
    results
}

/// Rewrite the entry stored under `old_id`, re-keying it when the id changed.
///
/// Returns whether an entry was updated.
pub fn update_binder(conn: &Connection, old_id: &str, binder: &BinderRecord) -> DbResult<bool> {
    let updated = conn.execute(
        "UPDATE binders SET id = ?1, name = ?2, path = ?3, card_count = ?4 WHERE id = ?5",
        params![
            binder.id,
            binder.name,
            binder.path,
            binder.card_count as i64,
            old_id
        ],
    )?;
    Ok(updated > 0)
}

/// Remove a binder entry; returns whether one existed
pub fn delete_binder(conn: &Connection, id: &str) -> DbResult<bool> {
    let deleted = conn.execute("DELETE FROM binders WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}
