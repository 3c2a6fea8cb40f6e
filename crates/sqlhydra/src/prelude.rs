//! Convenient imports for typical `sqlhydra` usage.
//!
//! ```ignore
//! use sqlhydra::prelude::*;
//! ```

pub use crate::{
    Cardinality, Connection, ConnectionConfig, Dialect, Expr, Filter, FromRecord, Model,
    OrmError, OrmResult, Ordered, QueryBuilder, Record, Registry, RelationSpec, Value,
};
