//! # sqlhydra
//!
//! A dialect-agnostic SQL statement composer with multi-level eager loading.
//!
//! ## Features
//!
//! - **One builder, four dialects**: SQLite, MySQL, PostgreSQL and SQL Server placeholders,
//!   paging and operator emulation from the same statement
//! - **Eager loading**: has-one, has-many, belongs-to and many-to-many relations, nested to any
//!   depth, one query per level
//! - **Transactions**: a connection-scoped coordinator that commits on success and rolls back on
//!   error or panic
//! - **Named connections**: an explicit [`Registry`] instead of global state
//! - **Query logging**: every statement is reported through `tracing`
//!
//! ## Usage
//!
//! ```ignore
//! use sqlhydra::prelude::*;
//!
//! let registry = Registry::new();
//! let conn = registry.connect(&ConnectionConfig::sqlite(":memory:")).await?;
//! let qb = conn.query_builder();
//!
//! let users = qb
//!     .get(
//!         qb.select("users").eq("active", true).order_by("id"),
//!         &[RelationSpec::has_many("posts").with(RelationSpec::has_many("comments"))],
//!     )
//!     .await?;
//!
//! conn.transaction(|qb| async move {
//!     qb.execute(qb.update("users").set("active", false).eq("id", 1)).await?;
//!     qb.execute(qb.delete("sessions").eq("user_id", 1)).await
//! })
//! .await?;
//! ```

extern crate self as sqlhydra;

pub mod backend;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod handle;
pub mod inflect;
pub mod monitor;
pub mod prelude;
pub mod qb;
pub mod query_builder;
pub mod record;
pub mod registry;
pub mod relation;
pub mod resolver;
pub mod schema;
pub mod value;

pub use config::ConnectionConfig;
pub use connection::Connection;
pub use dialect::Dialect;
pub use error::{ErrorKind, OrmError, OrmResult};
pub use handle::{DatabaseHandle, ExecResult, TransactionHandle};
pub use monitor::SqlLogger;
pub use qb::{
    CreateTableQb, DeleteQb, Expr, ExprGroup, Filter, InsertQb, JoinKind, Op, Ordered, Page,
    SelectQb, Statement, StatementKind, UpdateQb,
};
pub use query_builder::QueryBuilder;
pub use record::{FromRecord, FromRelated, Record, Related};
pub use registry::{DEFAULT_CONNECTION, Registry};
pub use relation::{Cardinality, RelationSpec, Through};
pub use resolver::Connector;
pub use schema::{FieldDef, FieldRole, Model, ModelSchema};
pub use value::{FromValue, Value};

#[cfg(feature = "derive")]
pub use sqlhydra_derive::Model;
