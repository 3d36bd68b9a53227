use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use std::path::Path;
use std::time::Duration;

use crate::error::HubError;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Create a read-only SQLite connection pool for a bar store and ping it.
///
/// `timeout` bounds both pool checkout and SQLite's busy wait, so a locked or
/// slow store fails a query instead of stalling the request.
pub fn open_ro_pool(path: &Path, max_size: u32, timeout: Duration) -> Result<DbPool, HubError> {
    if !path.exists() {
        return Err(HubError::Connection(format!(
            "store not found: {}",
            path.display()
        )));
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
        | OpenFlags::SQLITE_OPEN_NO_MUTEX
        | OpenFlags::SQLITE_OPEN_URI;
    let manager = SqliteConnectionManager::file(path)
        .with_flags(flags)
        .with_init(move |c| c.busy_timeout(timeout));

    let pool = Pool::builder()
        .max_size(max_size)
        .connection_timeout(timeout)
        .build(manager)
        .map_err(|e| HubError::Connection(format!("{}: {e}", path.display())))?;

    // Touching sqlite_master forces the header read, so a file that is not a
    // database fails here rather than on the first partition query.
    let conn = pool
        .get()
        .map_err(|e| HubError::Connection(format!("{}: {e}", path.display())))?;
    conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
        .map_err(|e| HubError::Connection(format!("{}: {e}", path.display())))?;

    Ok(pool)
}
