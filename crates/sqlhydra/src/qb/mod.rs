//! Dialect-aware statement builders.
//!
//! # Features
//!
//! - **Expression layer**: AND/OR/NOT trees compiled into dialect fragments, with `ILIKE` and
//!   `IS DISTINCT FROM` emulated where a dialect lacks them
//! - **No string replacement**: placeholders are numbered as values are pushed
//! - **Shared capabilities**: WHERE and ORDER BY/LIMIT come from the [`Filter`] and
//!   [`Ordered`] traits, implemented once per builder
//!
//! # Usage
//!
//! ```ignore
//! use sqlhydra::qb::{self, Filter, Ordered};
//!
//! let (sql, args) = qb::select("users")
//!     .eq("status", "active")
//!     .order_by("created_at DESC")
//!     .limit(20)
//!     .dialect(Dialect::Sqlite)
//!     .build()?;
//!
//! qb::insert("users")
//!     .set("username", "alice")
//!     .set("email", "alice@example.com")
//!     .returning("id");
//!
//! qb::update("users").set("status", "inactive").eq("id", user_id);
//!
//! qb::delete("users").eq("id", user_id);
//! ```

mod alias;
mod create_table;
mod delete;
mod expr;
mod insert;
mod page;
mod param;
mod select;
mod statement;
mod traits;
mod update;

pub use create_table::CreateTableQb;
pub use delete::DeleteQb;
pub use expr::{Expr, ExprGroup, Op};
pub use insert::InsertQb;
pub use page::{DEFAULT_PER_PAGE, Page, normalize_page};
pub use param::ParamList;
pub use select::{JoinKind, SelectQb};
pub use statement::{Statement, StatementKind};
pub use traits::{Filter, OrderLimit, Ordered};
pub use update::UpdateQb;

/// Create a SELECT query builder for the given table.
///
/// # Example
/// ```ignore
/// let qb = sqlhydra::qb::select("users").eq("id", 1);
/// ```
pub fn select(table: &str) -> SelectQb {
    SelectQb::new(table)
}

/// Create an INSERT query builder for the given table.
pub fn insert(table: &str) -> InsertQb {
    InsertQb::new(table)
}

/// Create an UPDATE query builder for the given table.
pub fn update(table: &str) -> UpdateQb {
    UpdateQb::new(table)
}

/// Create a DELETE query builder for the given table.
///
/// There is no safety default: without a WHERE clause every row is deleted.
pub fn delete(table: &str) -> DeleteQb {
    DeleteQb::new(table)
}

/// Create a CREATE TABLE builder.
pub fn create_table(table: &str) -> CreateTableQb {
    CreateTableQb::new(table)
}

#[cfg(test)]
mod tests;
