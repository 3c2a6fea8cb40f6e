//! CREATE TABLE builder.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// CREATE TABLE builder. Table and column names are quoted for the target dialect; column
/// definitions and constraints are passed through.
#[derive(Clone, Debug)]
pub struct CreateTableQb {
    dialect: Dialect,
    table: String,
    if_not_exists: bool,
    columns: Vec<(String, String)>,
    constraints: Vec<String>,
}

impl CreateTableQb {
    pub fn new(table: &str) -> Self {
        Self {
            dialect: Dialect::default(),
            table: table.trim().to_string(),
            if_not_exists: false,
            columns: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Render for `dialect`.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Skip creation when the table exists.
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Add a column with its type and modifiers, e.g. `("id", "INTEGER PRIMARY KEY")`.
    pub fn column(mut self, name: &str, definition: &str) -> Self {
        self.columns
            .push((name.to_string(), definition.trim().to_string()));
        self
    }

    /// Add a table constraint, e.g. `UNIQUE (email)`.
    pub fn constraint(mut self, constraint: &str) -> Self {
        self.constraints.push(constraint.to_string());
        self
    }

    /// Build SQL for the builder's dialect. The argument list is always empty.
    pub fn build(&self) -> OrmResult<(String, Vec<Value>)> {
        self.build_with_dialect(self.dialect)
    }

    /// Build SQL for `dialect`.
    ///
    /// SQL Server has no `IF NOT EXISTS` on CREATE TABLE; it is emulated with an
    /// `OBJECT_ID` check.
    pub fn build_with_dialect(&self, dialect: Dialect) -> OrmResult<(String, Vec<Value>)> {
        if self.table.is_empty() {
            return Err(OrmError::MissingTable);
        }
        if self.columns.is_empty() {
            return Err(OrmError::validation(format!(
                "CREATE TABLE {} requires at least one column",
                self.table
            )));
        }

        let mut defs: Vec<String> = self
            .columns
            .iter()
            .map(|(name, def)| {
                if def.is_empty() {
                    dialect.quote_ident(name)
                } else {
                    format!("{} {def}", dialect.quote_ident(name))
                }
            })
            .collect();
        defs.extend(self.constraints.iter().cloned());

        let table = dialect.quote_ident(&self.table);
        let body = format!("{table} ({})", defs.join(", "));
        let sql = match (self.if_not_exists, dialect) {
            (false, _) => format!("CREATE TABLE {body}"),
            (true, Dialect::Mssql) => format!(
                "IF OBJECT_ID(N'{}', N'U') IS NULL CREATE TABLE {body}",
                self.table.replace('\'', "''")
            ),
            (true, _) => format!("CREATE TABLE IF NOT EXISTS {body}"),
        };
        Ok((sql, Vec::new()))
    }

    /// Get the built SQL string (for debugging).
    pub fn to_sql(&self) -> OrmResult<String> {
        self.build().map(|(sql, _)| sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> CreateTableQb {
        CreateTableQb::new("users")
            .if_not_exists()
            .column("id", "INTEGER PRIMARY KEY")
            .column("name", "TEXT NOT NULL")
            .constraint("UNIQUE (name)")
    }

    #[test]
    fn test_create_table_quotes_per_dialect() {
        assert_eq!(
            users().build_with_dialect(Dialect::Sqlite).unwrap().0,
            "CREATE TABLE IF NOT EXISTS \"users\" (\"id\" INTEGER PRIMARY KEY, \"name\" TEXT NOT NULL, UNIQUE (name))"
        );
        assert_eq!(
            users().build_with_dialect(Dialect::Mysql).unwrap().0,
            "CREATE TABLE IF NOT EXISTS `users` (`id` INTEGER PRIMARY KEY, `name` TEXT NOT NULL, UNIQUE (name))"
        );
        assert_eq!(
            users().build_with_dialect(Dialect::Mssql).unwrap().0,
            "IF OBJECT_ID(N'users', N'U') IS NULL CREATE TABLE [users] ([id] INTEGER PRIMARY KEY, [name] TEXT NOT NULL, UNIQUE (name))"
        );
    }

    #[test]
    fn test_create_table_requires_columns() {
        assert!(matches!(
            CreateTableQb::new("").column("id", "INT").build(),
            Err(OrmError::MissingTable)
        ));
        assert!(matches!(
            CreateTableQb::new("t").build(),
            Err(OrmError::Validation(_))
        ));
    }
}
