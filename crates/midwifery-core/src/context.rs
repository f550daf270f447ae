//! Explicit application state handed to callers instead of ambient globals.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::auth::Session;
use crate::config::CoreConfig;
use crate::db::{Database, DbResult};
use crate::sync::{Connectivity, NetworkMonitor};

/// Everything a screen needs: the store, connectivity, config and who is
/// signed in.
pub struct AppContext {
    store: Arc<Mutex<Database>>,
    monitor: NetworkMonitor,
    config: CoreConfig,
    session: Mutex<Option<Session>>,
}

impl AppContext {
    /// Open the store at `config.database.path` (relative paths resolve
    /// against `data_dir`).
    pub fn open<P: AsRef<Path>>(
        data_dir: P,
        config: CoreConfig,
        connectivity: Connectivity,
    ) -> DbResult<Self> {
        let path = data_dir.as_ref().join(&config.database.path);
        let db = Database::open(&path)?;
        info!(path = %path.display(), ?connectivity, "app context opened");
        Ok(Self::with_database(db, config, connectivity))
    }

    /// Build a context around an already open store.
    pub fn with_database(db: Database, config: CoreConfig, connectivity: Connectivity) -> Self {
        let store = Arc::new(Mutex::new(db));
        let monitor = NetworkMonitor::new(Arc::clone(&store), config.sync.clone(), connectivity);
        Self {
            store,
            monitor,
            config,
            session: Mutex::new(None),
        }
    }

    /// Lock the store for a batch of operations.
    pub fn db(&self) -> Result<MutexGuard<'_, Database>, PoisonError<MutexGuard<'_, Database>>> {
        self.store.lock()
    }

    pub fn store(&self) -> Arc<Mutex<Database>> {
        Arc::clone(&self.store)
    }

    pub fn monitor(&self) -> &NetworkMonitor {
        &self.monitor
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn session(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_session(&self, session: Option<Session>) {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = session;
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    pub fn is_midwife(&self) -> bool {
        self.session().is_some_and(|s| s.is_midwife())
    }
}
