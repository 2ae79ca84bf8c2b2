//! Process-scoped cache of database handles keyed by file path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::config::SqliteConfig;
use super::database::Database;
use super::entity::Entity;
use super::error::Result;
use super::query::Query;

/// Hands out one shared [`Database`] per path.
///
/// Create one registry at startup and pass it by reference to whatever needs
/// database access. Paths are keyed exactly as given, so `users.db` and
/// `./users.db` are different entries.
#[derive(Debug, Default)]
pub struct Registry {
    config: SqliteConfig,
    handles: Mutex<HashMap<PathBuf, Database>>,
    /// Per-path open locks. Entries are never removed, so every caller for a
    /// path waits on the same gate.
    opening: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl Registry {
    pub fn new(config: SqliteConfig) -> Self {
        Self {
            config,
            handles: Mutex::new(HashMap::new()),
            opening: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Returns the handle for `path`, opening it on first use.
    ///
    /// Opens are single-flight per path: concurrent callers for one path wait
    /// on that path's gate and all get the same handle, while opens of other
    /// paths and lookups proceed. A failed open registers nothing.
    pub fn get_or_create(&self, path: impl AsRef<Path>) -> Result<Database> {
        let path = path.as_ref();
        if let Some(existing) = self.lookup(path) {
            return Ok(existing);
        }

        let gate = self.gate(path);
        let _opening = gate.lock();
        if let Some(existing) = self.lookup(path) {
            return Ok(existing);
        }

        let database = Database::open(path, &self.config)?;
        let mut handles = self.handles.lock();
        handles.insert(path.to_path_buf(), database.clone());
        debug!(path = %path.display(), handles = handles.len(), "registered database handle");
        Ok(database)
    }

    fn lookup(&self, path: &Path) -> Option<Database> {
        self.handles.lock().get(path).cloned()
    }

    fn gate(&self, path: &Path) -> Arc<Mutex<()>> {
        self.opening
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .clone()
    }

    /// Shortcut for `get_or_create(path)?.query::<E>()`.
    pub fn query_for<E: Entity>(&self, path: impl AsRef<Path>) -> Result<Query<E>> {
        Ok(self.get_or_create(path)?.query::<E>())
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.handles.lock().contains_key(path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_of_one_path_does_not_wait_on_another() {
        let dir = tempfile::TempDir::new().unwrap();
        let busy = dir.path().join("busy.db");
        let free = dir.path().join("free.db");
        let registry = Registry::default();

        let gate = registry.gate(&busy);
        let _held = gate.lock();

        let database = registry.get_or_create(&free).unwrap();
        assert!(Database::same_handle(
            &database,
            &registry.get_or_create(&free).unwrap()
        ));
        assert!(registry.contains(&free));
        assert!(!registry.contains(&busy));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn failed_open_leaves_gate_reusable() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("later").join("data.db");
        let registry = Registry::default();

        assert!(registry.get_or_create(&path).is_err());
        assert!(registry.is_empty());

        std::fs::create_dir(dir.path().join("later")).unwrap();
        let database = registry.get_or_create(&path).unwrap();
        assert!(Database::same_handle(
            &database,
            &registry.get_or_create(&path).unwrap()
        ));
        assert_eq!(registry.len(), 1);
    }
}
