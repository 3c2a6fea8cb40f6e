//! Named connection registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::{OrmError, OrmResult};

/// Name used when a lookup passes an empty name.
pub const DEFAULT_CONNECTION: &str = "default";

fn resolve_name(name: &str) -> &str {
    if name.is_empty() { DEFAULT_CONNECTION } else { name }
}

/// Name → [`Connection`] map shared by the application.
///
/// An explicit value rather than process-wide state: create one at startup and pass it (or an
/// `Arc` of it) to whatever needs connections.
#[derive(Default)]
pub struct Registry {
    connections: RwLock<HashMap<String, Arc<Connection>>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("names", &self.names()).finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Connection>>> {
        self.connections.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Connection>>> {
        self.connections.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Open a connection from `config` and register it under `config.name`.
    pub async fn connect(&self, config: &ConnectionConfig) -> OrmResult<Arc<Connection>> {
        let conn = Arc::new(Connection::open(config).await?);
        self.add(Arc::clone(&conn));
        Ok(conn)
    }

    /// Register `conn` under its name. An existing entry is replaced and returned, not closed.
    pub fn add(&self, conn: Arc<Connection>) -> Option<Arc<Connection>> {
        let name = resolve_name(conn.name()).to_string();
        tracing::debug!(target: "sqlhydra.registry", name = %name, dialect = %conn.dialect(), "connection registered");
        let previous = self.write().insert(name.clone(), conn);
        if previous.is_some() {
            tracing::warn!(target: "sqlhydra.registry", name = %name, "replaced existing connection");
        }
        previous
    }

    /// Look up a connection. An empty name means [`DEFAULT_CONNECTION`].
    pub fn get(&self, name: &str) -> OrmResult<Arc<Connection>> {
        let name = resolve_name(name);
        self.read()
            .get(name)
            .cloned()
            .ok_or_else(|| OrmError::ConnectionNotFound(name.to_string()))
    }

    /// The [`DEFAULT_CONNECTION`].
    pub fn default_connection(&self) -> OrmResult<Arc<Connection>> {
        self.get(DEFAULT_CONNECTION)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(resolve_name(name))
    }

    /// Close and unregister a connection.
    ///
    /// The entry is kept when closing fails. The write lock is held throughout, so a
    /// concurrent [`add`](Self::add) under the same name lands after the removal.
    pub fn remove(&self, name: &str) -> OrmResult<()> {
        let name = resolve_name(name);
        let mut connections = self.write();
        let conn = connections
            .remove(name)
            .ok_or_else(|| OrmError::ConnectionNotFound(name.to_string()))?;
        if let Err(err) = conn.close() {
            connections.insert(name.to_string(), conn);
            return Err(err);
        }
        drop(connections);
        tracing::debug!(target: "sqlhydra.registry", name = %name, "connection removed");
        Ok(())
    }

    /// Close and unregister every connection, stopping at the first failure.
    pub fn remove_all(&self) -> OrmResult<()> {
        for name in self.names() {
            self.remove(&name)?;
        }
        Ok(())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::handle::{DatabaseHandle, ExecResult, TransactionHandle};
    use crate::record::Record;
    use crate::value::Value;
    use futures_util::future::BoxFuture;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Mutex};
    use std::thread;
    use std::time::Duration;

    struct ClosableHandle {
        closed: AtomicBool,
        fail: bool,
        closing: Mutex<Option<mpsc::Sender<()>>>,
    }

    impl DatabaseHandle for ClosableHandle {
        fn query<'a>(&'a self, _: &'a str, _: &'a [Value]) -> BoxFuture<'a, OrmResult<Vec<Record>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn execute<'a>(&'a self, _: &'a str, _: &'a [Value]) -> BoxFuture<'a, OrmResult<ExecResult>> {
            Box::pin(async { Ok(ExecResult::default()) })
        }

        fn begin(&self) -> BoxFuture<'_, OrmResult<Arc<dyn TransactionHandle>>> {
            Box::pin(async { Err(OrmError::execution("unsupported")) })
        }

        fn close(&self) -> OrmResult<()> {
            if self.fail {
                return Err(OrmError::execution("close failed"));
            }
            if let Some(tx) = self.closing.lock().unwrap().take() {
                let _ = tx.send(());
                thread::sleep(Duration::from_millis(50));
            }
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn conn(name: &str, fail: bool) -> (Arc<Connection>, Arc<ClosableHandle>) {
        let handle = Arc::new(ClosableHandle {
            closed: AtomicBool::new(false),
            fail,
            closing: Mutex::new(None),
        });
        let conn = Connection::from_handle(name, Dialect::Sqlite, handle.clone());
        (Arc::new(conn), handle)
    }

    #[test]
    fn empty_name_is_default() {
        let registry = Registry::new();
        registry.add(conn("default", false).0);
        assert_eq!(registry.get("").unwrap().name(), "default");
        assert!(registry.contains(""));
        assert!(registry.default_connection().is_ok());
    }

    #[test]
    fn missing_name_errors() {
        let registry = Registry::new();
        let err = registry.get("replica").unwrap_err();
        assert!(matches!(err, OrmError::ConnectionNotFound(ref n) if n == "replica"));
        assert!(matches!(registry.remove("replica"), Err(OrmError::ConnectionNotFound(_))));
    }

    #[test]
    fn add_replaces() {
        let registry = Registry::new();
        assert!(registry.add(conn("main", false).0).is_none());
        assert!(registry.add(conn("main", false).0).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_closes_handle() {
        let registry = Registry::new();
        let (c, handle) = conn("main", false);
        registry.add(c);
        registry.remove("main").unwrap();
        assert!(handle.closed.load(Ordering::SeqCst));
        assert!(registry.is_empty());
    }

    #[test]
    fn failed_close_keeps_entry() {
        let registry = Registry::new();
        registry.add(conn("a", false).0);
        registry.add(conn("b", true).0);
        registry.add(conn("c", false).0);
        assert!(registry.remove_all().is_err());
        assert_eq!(registry.names(), vec!["b", "c"]);
    }

    #[test]
    fn failed_remove_keeps_the_same_connection() {
        let registry = Registry::new();
        let (c, _) = conn("main", true);
        registry.add(Arc::clone(&c));
        assert!(registry.remove("main").is_err());
        assert!(Arc::ptr_eq(&registry.get("main").unwrap(), &c));
    }

    #[test]
    fn add_during_remove_is_not_lost() {
        let registry = Arc::new(Registry::new());
        let (old, handle) = conn("main", false);
        let (tx, rx) = mpsc::channel();
        *handle.closing.lock().unwrap() = Some(tx);
        registry.add(old);

        let (replacement, _) = conn("main", false);
        let adder = {
            let registry = Arc::clone(&registry);
            let replacement = Arc::clone(&replacement);
            thread::spawn(move || {
                rx.recv().unwrap();
                registry.add(replacement);
            })
        };
        registry.remove("main").unwrap();
        adder.join().unwrap();

        assert!(handle.closed.load(Ordering::SeqCst));
        assert!(Arc::ptr_eq(&registry.get("main").unwrap(), &replacement));
    }
}
