//! Model schema descriptors.
//!
//! A [`ModelSchema`] records, once per model type, how struct fields map to columns and which
//! role each plays. `#[derive(Model)]` builds it lazily and caches it in a `OnceLock`, so
//! row mapping and primary-key lookup never re-inspect attributes at runtime.

use crate::error::{OrmError, OrmResult};
use crate::record::FromRecord;
use crate::value::Value;

/// The role a field plays in its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    PrimaryKey,
    Regular,
    /// Filled by the relation loader, not stored in a column.
    Relation,
}

/// One field of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub field: &'static str,
    pub column: &'static str,
    pub role: FieldRole,
}

impl FieldDef {
    pub const fn new(field: &'static str, column: &'static str, role: FieldRole) -> Self {
        Self {
            field,
            column,
            role,
        }
    }
}

/// Field → column → role mapping for a model type.
#[derive(Debug, Clone)]
pub struct ModelSchema {
    table: String,
    fields: Vec<FieldDef>,
}

impl ModelSchema {
    pub fn new(table: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            table: table.into(),
            fields,
        }
    }

    /// Table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// All fields, including relations.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// The `#[orm(id)]` field.
    pub fn primary_key(&self) -> OrmResult<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.role == FieldRole::PrimaryKey)
            .ok_or_else(|| OrmError::MissingPrimaryKey(self.table.clone()))
    }

    /// Stored columns (primary key and regular fields) in declaration order.
    pub fn columns(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.role != FieldRole::Relation)
            .map(|f| f.column)
            .collect()
    }

    /// Whether `column` is a stored column of this model.
    pub fn has_column(&self, column: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f.role != FieldRole::Relation && f.column == column)
    }

    /// Relation attachment keys declared on the model.
    pub fn relations(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.role == FieldRole::Relation)
            .map(|f| f.column)
            .collect()
    }

    /// Column backing a struct field.
    pub fn column_for(&self, field: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.column)
    }
}

/// A table-backed struct.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Model)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(id)]
///     id: i64,
///     #[orm(column = "user_name")]
///     name: String,
///     #[orm(relation)]
///     posts: Vec<Post>,
/// }
/// ```
pub trait Model: FromRecord + Send + Sync {
    /// Cached schema descriptor.
    fn schema() -> &'static ModelSchema;

    /// Stored column values in schema order.
    fn to_values(&self) -> Vec<(&'static str, Value)>;

    /// Table name.
    fn table_name() -> &'static str {
        Self::schema().table()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ModelSchema {
        ModelSchema::new(
            "users",
            vec![
                FieldDef::new("id", "id", FieldRole::PrimaryKey),
                FieldDef::new("name", "user_name", FieldRole::Regular),
                FieldDef::new("posts", "posts", FieldRole::Relation),
            ],
        )
    }

    #[test]
    fn columns_exclude_relations() {
        let schema = schema();
        assert_eq!(schema.columns(), vec!["id", "user_name"]);
        assert!(schema.has_column("user_name"));
        assert!(!schema.has_column("posts"));
        assert_eq!(schema.relations(), vec!["posts"]);
        assert_eq!(schema.column_for("name"), Some("user_name"));
        assert_eq!(schema.primary_key().unwrap().column, "id");
    }

    #[test]
    fn missing_primary_key() {
        let schema = ModelSchema::new("logs", vec![FieldDef::new("line", "line", FieldRole::Regular)]);
        assert!(matches!(
            schema.primary_key(),
            Err(OrmError::MissingPrimaryKey(table)) if table == "logs"
        ));
    }
}
