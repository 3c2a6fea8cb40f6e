//! The statement sum type.

use std::fmt;

use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::qb::create_table::CreateTableQb;
use crate::qb::delete::DeleteQb;
use crate::qb::insert::InsertQb;
use crate::qb::select::SelectQb;
use crate::qb::update::UpdateQb;
use crate::value::Value;

/// Statement kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    CreateTable,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::CreateTable => "CREATE TABLE",
        })
    }
}

/// Any buildable statement.
#[derive(Debug, Clone)]
pub enum Statement {
    Select(SelectQb),
    Insert(InsertQb),
    Update(UpdateQb),
    Delete(DeleteQb),
    CreateTable(CreateTableQb),
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Select(_) => StatementKind::Select,
            Statement::Insert(_) => StatementKind::Insert,
            Statement::Update(_) => StatementKind::Update,
            Statement::Delete(_) => StatementKind::Delete,
            Statement::CreateTable(_) => StatementKind::CreateTable,
        }
    }

    /// Target table.
    pub fn table_name(&self) -> &str {
        match self {
            Statement::Select(qb) => qb.table_name(),
            Statement::Insert(qb) => qb.table_name(),
            Statement::Update(qb) => qb.table_name(),
            Statement::Delete(qb) => qb.table_name(),
            Statement::CreateTable(qb) => qb.table_name(),
        }
    }

    /// Build SQL and arguments with each builder's own dialect.
    pub fn build(&self) -> OrmResult<(String, Vec<Value>)> {
        match self {
            Statement::Select(qb) => qb.build(),
            Statement::Insert(qb) => qb.build(),
            Statement::Update(qb) => qb.build(),
            Statement::Delete(qb) => qb.build(),
            Statement::CreateTable(qb) => qb.build(),
        }
    }

    /// Build SQL and arguments for `dialect`.
    pub fn build_with_dialect(&self, dialect: Dialect) -> OrmResult<(String, Vec<Value>)> {
        match self {
            Statement::Select(qb) => qb.build_with_dialect(dialect),
            Statement::Insert(qb) => qb.build_with_dialect(dialect),
            Statement::Update(qb) => qb.build_with_dialect(dialect),
            Statement::Delete(qb) => qb.build_with_dialect(dialect),
            Statement::CreateTable(qb) => qb.build_with_dialect(dialect),
        }
    }
}

impl From<SelectQb> for Statement {
    fn from(qb: SelectQb) -> Self {
        Statement::Select(qb)
    }
}

impl From<InsertQb> for Statement {
    fn from(qb: InsertQb) -> Self {
        Statement::Insert(qb)
    }
}

impl From<UpdateQb> for Statement {
    fn from(qb: UpdateQb) -> Self {
        Statement::Update(qb)
    }
}

impl From<DeleteQb> for Statement {
    fn from(qb: DeleteQb) -> Self {
        Statement::Delete(qb)
    }
}

impl From<CreateTableQb> for Statement {
    fn from(qb: CreateTableQb) -> Self {
        Statement::CreateTable(qb)
    }
}
