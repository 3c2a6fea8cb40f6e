//! Database handle implementations.
//!
//! Each backend is behind its cargo feature; statement building works without any of them.

#[cfg(feature = "pool")]
pub mod pool;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;
