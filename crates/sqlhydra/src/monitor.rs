//! SQL statement logging.
//!
//! Every statement the query builder runs is reported through `tracing` under the
//! `sqlhydra.sql` target, before execution, so it shows up even when the call fails. A slow
//! query threshold adds a WARN event after completion.

use std::time::Duration;

use tracing::Level;

use crate::dialect::Dialect;

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Dispatch a tracing event at a runtime-determined level.
macro_rules! emit_at_level {
    ($level:expr, $($field:tt)*) => {
        match $level {
            Level::ERROR => tracing::error!($($field)*),
            Level::WARN  => tracing::warn!($($field)*),
            Level::INFO  => tracing::info!($($field)*),
            Level::DEBUG => tracing::debug!($($field)*),
            Level::TRACE => tracing::trace!($($field)*),
        }
    };
}

/// `tracing` settings for executed SQL.
#[derive(Debug, Clone)]
pub struct SqlLogger {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes, on a char boundary). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    /// Statements slower than this are reported at WARN.
    pub slow_query_threshold: Option<Duration>,
}

impl Default for SqlLogger {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
            slow_query_threshold: None,
        }
    }
}

impl SqlLogger {
    /// Create a new logger with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Warn about statements slower than `threshold`.
    pub fn slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    pub(crate) fn before(&self, dialect: Dialect, sql: &str, param_count: usize, in_tx: bool) {
        let sql = self.truncate_sql(sql);
        emit_at_level!(
            self.level,
            target: "sqlhydra.sql",
            dialect = %dialect,
            in_tx,
            param_count,
            sql = %sql,
        );
    }

    pub(crate) fn after(&self, sql: &str, elapsed: Duration, failed: bool) {
        if self.slow_query_threshold.is_some_and(|threshold| elapsed > threshold) {
            tracing::warn!(
                target: "sqlhydra.sql",
                elapsed_ms = elapsed.as_millis() as u64,
                failed,
                sql = %self.truncate_sql(sql),
                "slow query",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_sql_bytes("SELECT 1", 100), "SELECT 1");
        assert_eq!(truncate_sql_bytes("héllo", 2), "h");
        assert_eq!(truncate_sql_bytes("héllo", 3), "hé");
    }

    #[test]
    fn truncated_sql_gets_ellipsis() {
        let logger = SqlLogger::new().max_sql_length(6);
        assert_eq!(logger.truncate_sql("SELECT * FROM t"), "SELECT...");
        assert_eq!(SqlLogger::new().no_truncate().truncate_sql("SELECT * FROM t"), "SELECT * FROM t");
    }
}
