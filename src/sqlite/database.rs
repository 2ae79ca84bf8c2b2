use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::lock::{Mutex, MutexGuard};
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use super::config::SqliteConfig;
use super::entity::Entity;
use super::error::{Error, Result};
use super::query::Query;

/// Shared handle to one open database file.
///
/// Clones refer to the same connection. All statements issued through a
/// handle run one after another on that connection.
///
/// The `async` methods only serialize access: they wait on the handle's
/// async lock, then run the blocking SQLite calls on the polling thread.
/// Nothing is moved to a worker pool, so on a multi-threaded runtime a long
/// batch occupies one executor thread until it finishes. Wrap such calls in
/// the runtime's blocking facility if that matters.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    connection: Mutex<Connection>,
}

impl Database {
    /// Opens `path` and applies `config`'s pragmas.
    pub(crate) fn open(path: &Path, config: &SqliteConfig) -> Result<Self> {
        let connection_error = |source| Error::Connection {
            path: path.to_path_buf(),
            source,
        };

        let mut flags = OpenFlags::default();
        if !config.create_if_missing {
            flags.remove(OpenFlags::SQLITE_OPEN_CREATE);
        }
        let connection = Connection::open_with_flags(path, flags).map_err(connection_error)?;
        configure(&connection, config).map_err(connection_error)?;

        info!(path = %path.display(), "opened sqlite database");
        Ok(Self {
            inner: Arc::new(Inner {
                path: path.to_path_buf(),
                connection: Mutex::new(connection),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// True when both handles share one connection.
    pub fn same_handle(a: &Database, b: &Database) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Starts a query over `E`'s table.
    pub fn query<E: Entity>(&self) -> Query<E> {
        Query::new(self.clone())
    }

    pub(crate) async fn connection(&self) -> MutexGuard<'_, Connection> {
        self.inner.connection.lock().await
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

fn configure(connection: &Connection, config: &SqliteConfig) -> rusqlite::Result<()> {
    connection.busy_timeout(config.busy_timeout())?;
    let journal_mode: String = connection.pragma_update_and_check(
        None,
        "journal_mode",
        config.journal_mode.as_pragma(),
        |row| row.get(0),
    )?;
    connection.pragma_update(None, "foreign_keys", config.foreign_keys)?;
    debug!(%journal_mode, foreign_keys = config.foreign_keys, "configured connection");
    Ok(())
}
