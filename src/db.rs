use crate::errors::{EngineError, EngineResult};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub type DbPool = Arc<Mutex<Connection>>;

/// Open an external store read-only. Both the ledger and the quote store
/// belong to other systems; the engine never writes to them.
pub fn open_read_only(path: &Path) -> EngineResult<DbPool> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| EngineError::Database(format!("open {}: {e}", path.display())))?;

    conn.busy_timeout(std::time::Duration::from_secs(10))?;

    tracing::info!("opened read-only store at {}", path.display());
    Ok(Arc::new(Mutex::new(conn)))
}

pub fn lock(db: &DbPool) -> EngineResult<MutexGuard<'_, Connection>> {
    db.lock().map_err(|e| EngineError::Database(format!("lock poisoned: {e}")))
}

/// Money columns may be stored as REAL, INTEGER, DECIMAL text, or NULL.
/// NULL and unparseable text read as 0.
pub fn value_as_f64(value: ValueRef<'_>) -> f64 {
    match value {
        ValueRef::Integer(i) => i as f64,
        ValueRef::Real(f) => f,
        ValueRef::Text(t) => std::str::from_utf8(t)
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .unwrap_or(0.0),
        ValueRef::Null | ValueRef::Blob(_) => 0.0,
    }
}

/// Identifiers such as WagerID may be INTEGER or TEXT depending on the store.
pub fn value_as_string(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Null => String::new(),
    }
}

/// Timestamps are compared as `YYYY-MM-DD HH:MM:SS` text inside SQLite.
pub fn sql_timestamp(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}
