//! Relation descriptors for eager loading.
//!
//! A [`RelationSpec`] names a related table, how rows attach to their parent and, optionally,
//! one nested relation to load from the attached rows. Several specs can be passed side by side
//! to [`QueryBuilder::get`](crate::QueryBuilder::get); each owns its own nested chain.
//!
//! ```ignore
//! let users = qb
//!     .get(
//!         qb.select("users"),
//!         &[RelationSpec::has_many("posts")
//!             .columns(&["id", "title"])
//!             .with(RelationSpec::has_many("comments"))],
//!     )
//!     .await?;
//! ```

mod loader;

pub(crate) use loader::{load, parent_key_columns};

use std::fmt;
use std::str::FromStr;

use crate::error::{OrmError, OrmResult};
use crate::inflect::{plural, singular};
use crate::qb::{ExprGroup, Filter};

/// Relationship multiplicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Child row holds `<parent>_id`; attaches a single record.
    OneToOne,
    /// Child rows hold `<parent>_id`; attaches a list.
    OneToMany,
    /// Parent row holds `<child>_id`; attaches a single record.
    ManyToOne,
    /// Through a pivot table (or a child foreign key); attaches a list.
    ManyToMany,
}

impl Cardinality {
    /// Short tag: `o2o`, `o2m`, `m2o` or `m2m`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::OneToOne => "o2o",
            Cardinality::OneToMany => "o2m",
            Cardinality::ManyToOne => "m2o",
            Cardinality::ManyToMany => "m2m",
        }
    }

    /// Whether a parent receives at most one record.
    pub fn is_singular(&self) -> bool {
        matches!(self, Cardinality::OneToOne | Cardinality::ManyToOne)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cardinality {
    type Err = OrmError;

    fn from_str(s: &str) -> OrmResult<Self> {
        match s {
            "o2o" => Ok(Cardinality::OneToOne),
            "o2m" => Ok(Cardinality::OneToMany),
            "m2o" => Ok(Cardinality::ManyToOne),
            "m2m" => Ok(Cardinality::ManyToMany),
            other => Err(OrmError::validation(format!(
                "unsupported relation type: {other}"
            ))),
        }
    }
}

/// Pivot table for a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Through {
    pub table: String,
    /// Pivot column referencing the parent.
    pub parent_key: String,
    /// Pivot column referencing the child.
    pub child_key: String,
}

/// One eager-loaded relation.
#[derive(Debug, Clone)]
pub struct RelationSpec {
    table: String,
    cardinality: Cardinality,
    columns: Vec<String>,
    foreign_key: Option<String>,
    owner_key: String,
    key: Option<String>,
    through: Option<Through>,
    filter: ExprGroup,
    order_by: Vec<String>,
    nested: Option<Box<RelationSpec>>,
}

impl RelationSpec {
    pub fn new(cardinality: Cardinality, table: &str) -> Self {
        Self {
            table: table.to_string(),
            cardinality,
            columns: Vec::new(),
            foreign_key: None,
            owner_key: "id".to_string(),
            key: None,
            through: None,
            filter: ExprGroup::new(),
            order_by: Vec::new(),
            nested: None,
        }
    }

    pub fn has_one(table: &str) -> Self {
        Self::new(Cardinality::OneToOne, table)
    }

    pub fn has_many(table: &str) -> Self {
        Self::new(Cardinality::OneToMany, table)
    }

    pub fn belongs_to(table: &str) -> Self {
        Self::new(Cardinality::ManyToOne, table)
    }

    pub fn many_to_many(table: &str) -> Self {
        Self::new(Cardinality::ManyToMany, table)
    }

    /// Columns to load; the key columns the loader needs are added automatically.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Override the foreign key column.
    ///
    /// For has-one/has-many it lives on the child (default `<singular parent>_id`); for
    /// belongs-to it lives on the parent (default `<singular child>_id`).
    pub fn foreign_key(mut self, column: &str) -> Self {
        self.foreign_key = Some(column.to_string());
        self
    }

    /// Primary key column the foreign key points at (default `id`).
    pub fn owner_key(mut self, column: &str) -> Self {
        self.owner_key = column.to_string();
        self
    }

    /// Override the attachment key on the parent record.
    pub fn key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    /// Load a many-to-many relation through `pivot`.
    pub fn through(mut self, pivot: &str, parent_key: &str, child_key: &str) -> Self {
        self.through = Some(Through {
            table: pivot.to_string(),
            parent_key: parent_key.to_string(),
            child_key: child_key.to_string(),
        });
        self
    }

    /// Order the loaded rows within each parent.
    pub fn order_by(mut self, clause: &str) -> Self {
        self.order_by.push(clause.to_string());
        self
    }

    /// Load `nested` from the rows this relation attaches. Replaces a previous nested spec.
    pub fn with(mut self, nested: RelationSpec) -> Self {
        self.nested = Some(Box::new(nested));
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn nested(&self) -> Option<&RelationSpec> {
        self.nested.as_deref()
    }

    /// Attachment key: the explicit key, else the singular table name for to-one relations
    /// and the plural for to-many.
    pub fn attach_key(&self) -> String {
        match &self.key {
            Some(key) => key.clone(),
            None if self.cardinality.is_singular() => singular(&self.table),
            None => plural(&self.table),
        }
    }

    /// Foreign key column given the parent table.
    pub fn foreign_key_for(&self, parent_table: &str) -> String {
        if let Some(fk) = &self.foreign_key {
            return fk.clone();
        }
        let owner = match self.cardinality {
            Cardinality::ManyToOne => &self.table,
            _ => parent_table,
        };
        format!("{}_id", singular(owner))
    }
}

impl Filter for RelationSpec {
    fn where_group_mut(&mut self) -> &mut ExprGroup {
        &mut self.filter
    }
}
