//! Registry Store: the durable key/value contract of the TEL core.
//!
//! Six keyspaces, mirroring the validation pipeline:
//!
//! | Keyspace | Key | Value |
//! |---|---|---|
//! | raw events | `(registry_id, digest)` | canonical event bytes |
//! | awaiting-anchor | `(registry_id, sn)` | digest |
//! | confirmed TEL | `(registry_id, sn)` | digest |
//! | anchors | `digest` | controller couple (prefix ‖ seqner ‖ digest) |
//! | awaiting-signatures | `(registry_id, sn)` | digest |
//! | backer signatures | `(digest, backer index)` | indexed signature qb64 |
//!
//! All writes are idempotent: replaying a validation attempt reproduces the
//! same rows instead of duplicating them. Credential events share the same
//! keyspaces with the credential identifier in the `registry_id` column.

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

/// Errors produced by Registry Store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An underlying SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Stores the raw bytes of an event keyed by `(registry_id, digest)`.
///
/// Returns `true` if the row was inserted, `false` if it already existed.
/// Raw events are stored regardless of validation outcome so later retries
/// can re-validate without re-transmission.
pub fn put_raw_event(
    conn: &Connection,
    registry_id: &str,
    digest: &str,
    raw: &[u8],
) -> Result<bool, StoreError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO registry_events (registry_id, digest, raw) VALUES (?1, ?2, ?3)",
        params![registry_id, digest, raw],
    )?;
    Ok(inserted > 0)
}

/// Fetches the raw bytes of an event by `(registry_id, digest)`.
pub fn raw_event(
    conn: &Connection,
    registry_id: &str,
    digest: &str,
) -> Result<Option<Vec<u8>>, StoreError> {
    let raw = conn
        .query_row(
            "SELECT raw FROM registry_events WHERE registry_id = ?1 AND digest = ?2",
            params![registry_id, digest],
            |row| row.get(0),
        )
        .optional()?;
    Ok(raw)
}

/// Records that the event with `digest` at `(registry_id, sn)` is awaiting
/// anchor resolution.
pub fn set_awaiting_anchor(
    conn: &Connection,
    registry_id: &str,
    sn: u64,
    digest: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR IGNORE INTO anchor_escrow (registry_id, sn, digest) VALUES (?1, ?2, ?3)",
        params![registry_id, sn, digest],
    )?;
    Ok(())
}

/// Returns the digest awaiting anchor resolution at `(registry_id, sn)`.
pub fn awaiting_anchor(
    conn: &Connection,
    registry_id: &str,
    sn: u64,
) -> Result<Option<String>, StoreError> {
    let digest = conn
        .query_row(
            "SELECT digest FROM anchor_escrow WHERE registry_id = ?1 AND sn = ?2",
            params![registry_id, sn],
            |row| row.get(0),
        )
        .optional()?;
    Ok(digest)
}

/// Records that the event with `digest` at `(registry_id, sn)` is awaiting
/// its backer-signature threshold.
pub fn set_awaiting_sigs(
    conn: &Connection,
    registry_id: &str,
    sn: u64,
    digest: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR IGNORE INTO sig_escrow (registry_id, sn, digest) VALUES (?1, ?2, ?3)",
        params![registry_id, sn, digest],
    )?;
    Ok(())
}

/// Returns the digest awaiting backer signatures at `(registry_id, sn)`.
pub fn awaiting_sigs(
    conn: &Connection,
    registry_id: &str,
    sn: u64,
) -> Result<Option<String>, StoreError> {
    let digest = conn
        .query_row(
            "SELECT digest FROM sig_escrow WHERE registry_id = ?1 AND sn = ?2",
            params![registry_id, sn],
            |row| row.get(0),
        )
        .optional()?;
    Ok(digest)
}

/// Promotes `(registry_id, sn)` to the confirmed TEL index and clears any
/// escrow rows for that sequence number. Acceptance for a sequence number
/// is terminal, so an existing confirmed row is left untouched.
pub fn set_confirmed(
    conn: &Connection,
    registry_id: &str,
    sn: u64,
    digest: &str,
) -> Result<(), StoreError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT OR IGNORE INTO tel_index (registry_id, sn, digest) VALUES (?1, ?2, ?3)",
        params![registry_id, sn, digest],
    )?;
    tx.execute(
        "DELETE FROM anchor_escrow WHERE registry_id = ?1 AND sn = ?2",
        params![registry_id, sn],
    )?;
    tx.execute(
        "DELETE FROM sig_escrow WHERE registry_id = ?1 AND sn = ?2",
        params![registry_id, sn],
    )?;
    tx.commit()?;
    Ok(())
}

/// Returns the digest of the accepted event at `(registry_id, sn)`.
pub fn confirmed_digest(
    conn: &Connection,
    registry_id: &str,
    sn: u64,
) -> Result<Option<String>, StoreError> {
    let digest = conn
        .query_row(
            "SELECT digest FROM tel_index WHERE registry_id = ?1 AND sn = ?2",
            params![registry_id, sn],
            |row| row.get(0),
        )
        .optional()?;
    Ok(digest)
}

/// Returns the highest confirmed sequence number for a registry, if any.
pub fn last_confirmed_sn(conn: &Connection, registry_id: &str) -> Result<Option<u64>, StoreError> {
    let sn = conn
        .query_row(
            "SELECT MAX(sn) FROM tel_index WHERE registry_id = ?1",
            params![registry_id],
            |row| row.get::<_, Option<u64>>(0),
        )
        .optional()?
        .flatten();
    Ok(sn)
}

/// Records the resolved controller anchor couple for an event digest.
pub fn put_anchor_couple(
    conn: &Connection,
    digest: &str,
    couple: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR REPLACE INTO event_anchors (digest, couple) VALUES (?1, ?2)",
        params![digest, couple],
    )?;
    Ok(())
}

/// Returns the controller anchor couple recorded for an event digest.
pub fn anchor_couple(conn: &Connection, digest: &str) -> Result<Option<String>, StoreError> {
    let couple = conn
        .query_row(
            "SELECT couple FROM event_anchors WHERE digest = ?1",
            params![digest],
            |row| row.get(0),
        )
        .optional()?;
    Ok(couple)
}

/// Stores a validated backer signature, indexed by the backer's position
/// in the backer set at the time of the event.
pub fn add_backer_sig(
    conn: &Connection,
    digest: &str,
    idx: u32,
    sig: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR IGNORE INTO backer_sigs (digest, idx, sig) VALUES (?1, ?2, ?3)",
        params![digest, idx, sig],
    )?;
    Ok(())
}

/// Returns all stored backer signatures for an event digest, ordered by
/// backer index.
pub fn backer_sigs(conn: &Connection, digest: &str) -> Result<Vec<(u32, String)>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT idx, sig FROM backer_sigs WHERE digest = ?1 ORDER BY idx ASC")?;
    let sigs = stmt
        .query_map(params![digest], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sigs)
}
