//! Connection configuration.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::registry::DEFAULT_CONNECTION;
use serde::{Deserialize, Serialize};

/// Settings for one named connection.
///
/// Deserializable from any serde format, or assembled with the builder setters:
///
/// ```ignore
/// let config = ConnectionConfig::new("pgsql")
///     .host("localhost")
///     .user("app")
///     .database("blog")
///     .params("application_name=blog&connect_timeout=5");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Registry name.
    pub name: String,
    /// Dialect tag: `sqlite`, `mysql`, `pgsql` or `mssql`.
    pub driver: String,
    pub host: String,
    /// Falls back to the dialect's default port.
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    /// Database name, or the file path for sqlite (`:memory:` for an in-memory database).
    pub database: String,
    /// Extra `k=v&k=v` parameters.
    pub params: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CONNECTION.to_string(),
            driver: String::new(),
            host: String::new(),
            port: None,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            params: String::new(),
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration for the given driver tag.
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            ..Self::default()
        }
    }

    /// An sqlite configuration for a file path or `:memory:`.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new("sqlite").database(path)
    }

    /// Set the registry name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the user.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the database name (or sqlite path).
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set extra `k=v&k=v` parameters.
    pub fn params(mut self, params: impl Into<String>) -> Self {
        self.params = params.into();
        self
    }

    /// Resolve the driver tag.
    pub fn dialect(&self) -> OrmResult<Dialect> {
        if self.driver.trim().is_empty() {
            return Err(OrmError::Config("driver is required".into()));
        }
        self.driver.parse()
    }

    /// Configured port or the dialect default.
    pub fn effective_port(&self) -> Option<u16> {
        self.port
            .or_else(|| self.dialect().ok().and_then(|d| d.default_port()))
    }

    /// Parsed `params`, in order. Keys without `=` get an empty value.
    pub fn param_pairs(&self) -> Vec<(&str, &str)> {
        self.params
            .split('&')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| p.split_once('=').unwrap_or((p, "")))
            .collect()
    }

    /// Look up one parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.param_pairs()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Check the settings a connector needs.
    ///
    /// Host and user are required for every server backend; sqlite only needs a database path.
    pub fn validate(&self) -> OrmResult<Dialect> {
        let dialect = self.dialect()?;
        if dialect.requires_server() {
            if self.host.trim().is_empty() {
                return Err(OrmError::Config("host is required".into()));
            }
            if self.user.trim().is_empty() {
                return Err(OrmError::Config("user is required".into()));
            }
        }
        if self.database.trim().is_empty() {
            return Err(OrmError::Config("database name is required".into()));
        }
        Ok(dialect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports() {
        assert_eq!(ConnectionConfig::new("mysql").effective_port(), Some(3306));
        assert_eq!(ConnectionConfig::new("pgsql").effective_port(), Some(5432));
        assert_eq!(ConnectionConfig::new("mssql").effective_port(), Some(1433));
        assert_eq!(ConnectionConfig::new("pgsql").port(6432).effective_port(), Some(6432));
        assert_eq!(ConnectionConfig::sqlite(":memory:").effective_port(), None);
    }

    #[test]
    fn validate_requires_driver() {
        let err = ConnectionConfig::default().validate().unwrap_err();
        assert!(matches!(err, OrmError::Config(ref m) if m == "driver is required"));

        let err = ConnectionConfig::new("oracle").validate().unwrap_err();
        assert!(matches!(err, OrmError::UnsupportedDialect(_)));
    }

    #[test]
    fn validate_server_fields() {
        let err = ConnectionConfig::new("pgsql").database("app").validate().unwrap_err();
        assert!(matches!(err, OrmError::Config(ref m) if m == "host is required"));

        let err = ConnectionConfig::new("mysql")
            .host("db")
            .database("app")
            .validate()
            .unwrap_err();
        assert!(matches!(err, OrmError::Config(ref m) if m == "user is required"));

        let err = ConnectionConfig::new("mssql").host("db").user("sa").validate().unwrap_err();
        assert!(matches!(err, OrmError::Config(ref m) if m == "database name is required"));

        let dialect = ConnectionConfig::new("pgsql")
            .host("db")
            .user("app")
            .database("app")
            .validate()
            .unwrap();
        assert_eq!(dialect, Dialect::Pgsql);
    }

    #[test]
    fn sqlite_needs_only_database() {
        assert_eq!(ConnectionConfig::sqlite("app.db").validate().unwrap(), Dialect::Sqlite);
        assert!(ConnectionConfig::new("sqlite").validate().is_err());
    }

    #[test]
    fn params_parse() {
        let config = ConnectionConfig::new("pgsql").params("sslmode=disable&connect_timeout=5&flag");
        assert_eq!(
            config.param_pairs(),
            vec![("sslmode", "disable"), ("connect_timeout", "5"), ("flag", "")]
        );
        assert_eq!(config.param("connect_timeout"), Some("5"));
        assert_eq!(config.param("missing"), None);
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{"driver": "sqlite", "database": ":memory:"}"#).unwrap();
        assert_eq!(config.name, "default");
        assert_eq!(config.port, None);
        assert!(config.validate().is_ok());
    }
}
