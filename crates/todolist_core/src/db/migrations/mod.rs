//! Task store schema versions.
//!
//! Each step is an embedded SQL script; the version reached is stamped into
//! `PRAGMA user_version` inside the same transaction as the script, so a
//! crash leaves the store at the previous version.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// Embedded schema steps, strictly increasing by version.
const SCHEMA_STEPS: &[(u32, &str)] = &[(1, include_str!("0001_tasks.sql"))];

/// Schema version this binary writes and expects.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |(version, _)| *version)
}

/// Reads the schema version stamped on a connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Fails unless `conn` is exactly at [`latest_version`].
///
/// # Errors
/// - `SchemaBehind` for stores that still need migrating.
/// - `UnsupportedSchemaVersion` for stores written by a newer binary.
pub fn ensure_current(conn: &Connection) -> DbResult<()> {
    let db_version = current_user_version(conn)?;
    let expected = latest_version();
    if db_version < expected {
        return Err(DbError::SchemaBehind {
            db_version,
            expected,
        });
    }
    reject_newer(db_version, expected)
}

/// Brings the task store up to [`latest_version`].
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = current_user_version(conn)?;
    let target = latest_version();
    reject_newer(from, target)?;
    if from == target {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in SCHEMA_STEPS.iter().filter(|(version, _)| *version > from) {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from} to_version={target}");
    Ok(())
}

fn reject_newer(db_version: u32, latest_supported: u32) -> DbResult<()> {
    if db_version > latest_supported {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, ensure_current, latest_version};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn fresh_connection_is_behind_until_migrated() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            ensure_current(&conn),
            Err(DbError::SchemaBehind { db_version: 0, .. })
        ));

        apply_migrations(&mut conn).unwrap();
        ensure_current(&conn).unwrap();
    }

    #[test]
    fn newer_store_is_rejected_by_both_checks() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", latest_version() + 1)
            .unwrap();

        assert!(matches!(
            ensure_current(&conn),
            Err(DbError::UnsupportedSchemaVersion { .. })
        ));
        assert!(apply_migrations(&mut conn).is_err());
    }
}
