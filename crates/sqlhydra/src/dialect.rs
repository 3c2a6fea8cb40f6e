//! SQL dialects and their rendering rules (the "statement flavor").
//!
//! A [`Dialect`] decides placeholder syntax, identifier quoting, paging syntax and how
//! operators without native support (`ILIKE`, `IS DISTINCT FROM`) are emulated.

use crate::error::{OrmError, OrmResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of supported backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Sqlite,
    Mysql,
    #[default]
    Pgsql,
    Mssql,
}

/// How `IS [NOT] DISTINCT FROM` is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistinctFrom {
    /// `a IS DISTINCT FROM b`
    Native,
    /// `NOT a <=> b` / `a <=> b`
    NullSafeEqual,
    /// `CASE WHEN ... END = 1`
    CaseExpression,
}

impl Dialect {
    /// Every supported dialect.
    pub const ALL: [Dialect; 4] = [Dialect::Sqlite, Dialect::Mysql, Dialect::Pgsql, Dialect::Mssql];

    /// The configuration tag of this dialect.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Mysql => "mysql",
            Dialect::Pgsql => "pgsql",
            Dialect::Mssql => "mssql",
        }
    }

    /// Placeholder for the `n`-th (1-based) argument.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Dialect::Sqlite | Dialect::Mysql => "?".to_string(),
            Dialect::Pgsql => format!("${n}"),
            Dialect::Mssql => format!("@p{n}"),
        }
    }

    /// Quote an identifier. Dotted names are quoted per segment; `*` is left alone.
    pub fn quote_ident(&self, ident: &str) -> String {
        ident
            .split('.')
            .map(|part| {
                if part == "*" {
                    return part.to_string();
                }
                match self {
                    Dialect::Mysql => format!("`{}`", part.replace('`', "``")),
                    Dialect::Mssql => format!("[{}]", part.replace(']', "]]")),
                    Dialect::Sqlite | Dialect::Pgsql => format!("\"{}\"", part.replace('"', "\"\"")),
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Whether `ILIKE` exists natively.
    pub fn supports_ilike(&self) -> bool {
        matches!(self, Dialect::Pgsql)
    }

    /// Rendering strategy for `IS [NOT] DISTINCT FROM`.
    pub fn distinct_from(&self) -> DistinctFrom {
        match self {
            Dialect::Pgsql | Dialect::Sqlite => DistinctFrom::Native,
            Dialect::Mysql => DistinctFrom::NullSafeEqual,
            Dialect::Mssql => DistinctFrom::CaseExpression,
        }
    }

    /// Default TCP port, `None` for file-based backends.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Dialect::Sqlite => None,
            Dialect::Mysql => Some(3306),
            Dialect::Pgsql => Some(5432),
            Dialect::Mssql => Some(1433),
        }
    }

    /// Whether a host/user pair is needed to connect.
    pub fn requires_server(&self) -> bool {
        !matches!(self, Dialect::Sqlite)
    }

    /// Append the LIMIT/OFFSET tail of a SELECT.
    ///
    /// SQL Server pages with `OFFSET .. FETCH`, which is only valid after an ORDER BY.
    pub(crate) fn push_limit_offset(
        &self,
        sql: &mut String,
        has_order: bool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) {
        match self {
            Dialect::Mssql => {
                if limit.is_none() && offset.is_none() {
                    return;
                }
                if !has_order {
                    sql.push_str(" ORDER BY (SELECT NULL)");
                }
                sql.push_str(&format!(" OFFSET {} ROWS", offset.unwrap_or(0)));
                if let Some(limit) = limit {
                    sql.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
                }
            }
            _ => {
                match (limit, self) {
                    (Some(limit), _) => sql.push_str(&format!(" LIMIT {limit}")),
                    // SQLite and MySQL only accept OFFSET after a LIMIT.
                    (None, Dialect::Sqlite) if offset.is_some() => sql.push_str(" LIMIT -1"),
                    (None, Dialect::Mysql) if offset.is_some() => {
                        sql.push_str(" LIMIT 18446744073709551615")
                    }
                    (None, _) => {}
                }
                if let Some(offset) = offset {
                    sql.push_str(&format!(" OFFSET {offset}"));
                }
            }
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = OrmError;

    fn from_str(s: &str) -> OrmResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "mysql" => Ok(Dialect::Mysql),
            "pgsql" => Ok(Dialect::Pgsql),
            "mssql" => Ok(Dialect::Mssql),
            _ => Err(OrmError::UnsupportedDialect(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_closed_set_only() {
        assert_eq!("sqlite".parse::<Dialect>().unwrap(), Dialect::Sqlite);
        assert_eq!("PGSQL".parse::<Dialect>().unwrap(), Dialect::Pgsql);
        assert!(matches!(
            "postgres".parse::<Dialect>(),
            Err(OrmError::UnsupportedDialect(tag)) if tag == "postgres"
        ));
        assert!("".parse::<Dialect>().is_err());
    }

    #[test]
    fn placeholders() {
        assert_eq!(Dialect::Sqlite.placeholder(3), "?");
        assert_eq!(Dialect::Mysql.placeholder(1), "?");
        assert_eq!(Dialect::Pgsql.placeholder(3), "$3");
        assert_eq!(Dialect::Mssql.placeholder(2), "@p2");
    }

    #[test]
    fn quoting() {
        assert_eq!(Dialect::Pgsql.quote_ident("users.id"), "\"users\".\"id\"");
        assert_eq!(Dialect::Mysql.quote_ident("users"), "`users`");
        assert_eq!(Dialect::Mssql.quote_ident("u.*"), "[u].*");
        assert_eq!(Dialect::Sqlite.quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn mssql_paging_requires_order() {
        let mut sql = String::from("SELECT * FROM users");
        Dialect::Mssql.push_limit_offset(&mut sql, false, Some(10), Some(20));
        assert_eq!(
            sql,
            "SELECT * FROM users ORDER BY (SELECT NULL) OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );

        let mut sql = String::from("SELECT * FROM users ORDER BY id");
        Dialect::Mssql.push_limit_offset(&mut sql, true, Some(1), None);
        assert_eq!(
            sql,
            "SELECT * FROM users ORDER BY id OFFSET 0 ROWS FETCH NEXT 1 ROWS ONLY"
        );
    }

    #[test]
    fn serde_uses_tags() {
        let json = serde_json::to_string(&Dialect::Pgsql).unwrap();
        assert_eq!(json, "\"pgsql\"");
        let back: Dialect = serde_json::from_str("\"mssql\"").unwrap();
        assert_eq!(back, Dialect::Mssql);
    }
}
