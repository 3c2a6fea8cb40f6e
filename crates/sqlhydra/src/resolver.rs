//! Dialect → connector resolution.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::config::ConnectionConfig;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::handle::DatabaseHandle;

/// Opens handles for one backend.
pub trait Connector: Send + Sync {
    fn connect<'a>(
        &'a self,
        config: &'a ConnectionConfig,
    ) -> BoxFuture<'a, OrmResult<Arc<dyn DatabaseHandle>>>;
}

/// A dialect the crate can compile for but has no driver for in this build.
struct Unavailable {
    dialect: Dialect,
    reason: &'static str,
}

impl Connector for Unavailable {
    fn connect<'a>(
        &'a self,
        _config: &'a ConnectionConfig,
    ) -> BoxFuture<'a, OrmResult<Arc<dyn DatabaseHandle>>> {
        Box::pin(async move {
            Err(OrmError::Config(format!(
                "no {} connector: {}",
                self.dialect, self.reason
            )))
        })
    }
}

fn unavailable(dialect: Dialect, reason: &'static str) -> Box<dyn Connector> {
    Box::new(Unavailable { dialect, reason })
}

/// Validate `config` and pick the connector for its dialect.
///
/// Statements for every dialect can be built regardless of which connectors are compiled in;
/// only connecting needs a driver.
pub fn resolve(config: &ConnectionConfig) -> OrmResult<(Dialect, Box<dyn Connector>)> {
    let dialect = config.validate()?;
    let connector: Box<dyn Connector> = match dialect {
        #[cfg(feature = "sqlite")]
        Dialect::Sqlite => Box::new(crate::backend::sqlite::SqliteConnector),
        #[cfg(not(feature = "sqlite"))]
        Dialect::Sqlite => unavailable(dialect, "the `sqlite` feature is disabled"),

        #[cfg(feature = "pool")]
        Dialect::Pgsql if config.param("pool").is_some_and(|v| v != "false") => {
            Box::new(crate::backend::pool::PoolConnector)
        }
        #[cfg(feature = "postgres")]
        Dialect::Pgsql => Box::new(crate::backend::postgres::PostgresConnector),
        #[cfg(not(feature = "postgres"))]
        Dialect::Pgsql => unavailable(dialect, "the `postgres` feature is disabled"),

        Dialect::Mysql | Dialect::Mssql => unavailable(dialect, "driver not bundled"),
    };
    tracing::debug!(
        target: "sqlhydra.registry",
        name = %config.name,
        dialect = %dialect,
        "connector resolved"
    );
    Ok((dialect, connector))
}
