//! SELECT query builder.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::qb::alias::{AliasMap, split_alias};
use crate::qb::expr::{Expr, ExprGroup};
use crate::qb::page::normalize_page;
use crate::qb::param::ParamList;
use crate::qb::traits::{Filter, OrderLimit, Ordered};
use crate::value::Value;

/// JOIN flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
        }
    }
}

#[derive(Clone, Debug)]
struct Join {
    kind: JoinKind,
    table: String,
    on: String,
}

/// SELECT query builder with expression-based WHERE/HAVING.
#[derive(Clone, Debug)]
pub struct SelectQb {
    dialect: Dialect,
    /// Table (optionally `table AS alias`)
    table: String,
    /// SELECT columns; empty renders `*`
    columns: Vec<String>,
    distinct: bool,
    joins: Vec<Join>,
    where_group: ExprGroup,
    group_by: Vec<String>,
    having_group: ExprGroup,
    order_limit: OrderLimit,
    offset: Option<i64>,
    aliases: AliasMap,
}

impl SelectQb {
    /// Create a new SELECT query builder for a table.
    pub fn new(table: &str) -> Self {
        let mut aliases = AliasMap::default();
        if split_alias(table).1.is_some() {
            aliases.register(table);
        }
        Self {
            dialect: Dialect::default(),
            table: table.trim().to_string(),
            columns: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            where_group: ExprGroup::new(),
            group_by: Vec::new(),
            having_group: ExprGroup::new(),
            order_limit: OrderLimit::default(),
            offset: None,
            aliases,
        }
    }

    /// Render for `dialect`.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Table name without any alias.
    pub fn table_name(&self) -> &str {
        split_alias(&self.table).0
    }

    // ==================== SELECT columns ====================

    /// Set SELECT columns (string form, supports complex expressions).
    pub fn select(mut self, cols: &str) -> Self {
        self.columns = vec![cols.to_string()];
        self
    }

    /// Set SELECT columns (array form).
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Append one SELECT column.
    pub fn add_select(mut self, col: &str) -> Self {
        self.columns.push(col.to_string());
        self
    }

    /// Requested columns; empty means `*`.
    pub fn selected_columns(&self) -> &[String] {
        &self.columns
    }

    /// Append each of `required` not already selected. A `*` projection is left alone.
    pub(crate) fn ensure_columns(mut self, required: &[String]) -> Self {
        if self.columns.is_empty() {
            return self;
        }
        let selected: Vec<String> = self
            .columns
            .iter()
            .flat_map(|entry| entry.split(','))
            .map(|col| col.trim().to_string())
            .collect();
        if selected.iter().any(|col| col == "*" || col.ends_with(".*")) {
            return self;
        }
        for col in required {
            let covered = selected.iter().any(|s| {
                s == col || s.ends_with(&format!(".{col}")) || s.ends_with(&format!(" {col}"))
            });
            if !covered {
                self.columns.push(col.clone());
            }
        }
        self
    }

    /// SELECT DISTINCT.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    // ==================== JOIN ====================

    /// Alias for `table` within this query, assigning one if needed.
    ///
    /// Use it to write ON/WHERE clauses before joining a table whose name shares its first
    /// letter with one already referenced.
    pub fn alias(&mut self, table: &str) -> String {
        self.aliases.register(table)
    }

    /// Add a JOIN.
    ///
    /// When `table` starts with the same letter as a table already referenced by this query,
    /// both get generated aliases (`u0`, `u1`, ...). `table.` qualifiers anywhere in the query
    /// (columns, ON, WHERE, GROUP BY, HAVING, ORDER BY) are rewritten to them. An explicit `table AS alias` is registered as given.
    pub fn join(mut self, kind: JoinKind, table: &str, on: &str) -> Self {
        let (name, explicit) = split_alias(table);
        if explicit.is_some() {
            self.aliases.register(table);
        } else if self.aliases.get(name).is_none() {
            let referenced: Vec<String> = self.referenced_tables().map(str::to_string).collect();
            if AliasMap::collides(name, referenced.iter().map(String::as_str)) {
                for other in &referenced {
                    if AliasMap::collides(name, [other.as_str()]) && self.aliases.get(other).is_none() {
                        self.aliases.register(other);
                    }
                }
                self.aliases.register(name);
            }
        }
        self.joins.push(Join {
            kind,
            table: table.trim().to_string(),
            on: on.to_string(),
        });
        self
    }

    /// Add INNER JOIN.
    pub fn inner_join(self, table: &str, on: &str) -> Self {
        self.join(JoinKind::Inner, table, on)
    }

    /// Add LEFT JOIN.
    pub fn left_join(self, table: &str, on: &str) -> Self {
        self.join(JoinKind::Left, table, on)
    }

    /// Add RIGHT JOIN.
    pub fn right_join(self, table: &str, on: &str) -> Self {
        self.join(JoinKind::Right, table, on)
    }

    /// Add FULL OUTER JOIN.
    pub fn full_join(self, table: &str, on: &str) -> Self {
        self.join(JoinKind::Full, table, on)
    }

    fn referenced_tables(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.table_name()).chain(self.joins.iter().map(|j| split_alias(&j.table).0))
    }

    // ==================== GROUP BY / HAVING ====================

    /// Add GROUP BY columns.
    pub fn group_by(mut self, cols: &str) -> Self {
        self.group_by.push(cols.to_string());
        self
    }

    /// Add a HAVING expression (ANDed).
    pub fn having(mut self, expr: Expr) -> Self {
        self.having_group.and_expr(expr);
        self
    }

    /// Add HAVING: expr > value
    pub fn having_gt(self, expr: &str, value: impl Into<Value>) -> Self {
        self.having(Expr::gt(expr, value))
    }

    /// Add HAVING: expr >= value
    pub fn having_gte(self, expr: &str, value: impl Into<Value>) -> Self {
        self.having(Expr::gte(expr, value))
    }

    /// Add HAVING: expr < value
    pub fn having_lt(self, expr: &str, value: impl Into<Value>) -> Self {
        self.having(Expr::lt(expr, value))
    }

    /// Add a HAVING template with `?` placeholders.
    pub fn having_template<T: Into<Value>>(
        self,
        sql: &str,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        self.having(Expr::template(sql, values))
    }

    // ==================== LIMIT / OFFSET ====================

    /// Set OFFSET.
    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }

    pub fn get_limit(&self) -> Option<i64> {
        self.order_limit.limit
    }

    pub fn get_offset(&self) -> Option<i64> {
        self.offset
    }

    /// Offset pagination. `page < 1` becomes 1 and `per_page < 1` becomes 10.
    pub fn page(mut self, page: i64, per_page: i64) -> Self {
        let (page, per_page) = normalize_page(page, per_page);
        self.order_limit.limit = Some(per_page);
        // Saturates for absurd page numbers; the query then simply returns no rows.
        self.offset = Some((page - 1).saturating_mul(per_page));
        self
    }

    /// Cursor pagination on `field`.
    ///
    /// An empty cursor (NULL or `""`) only limits the query to its first row under the
    /// existing ordering. Otherwise `"prev"` selects `field < cursor ORDER BY field DESC` and
    /// every other direction selects `field > cursor ORDER BY field ASC`, replacing any
    /// ORDER BY already set.
    // NOTE: the result is always capped at one row, whatever page size the caller wants. This
    // deviates from conventional cursor pagination and is kept until the intended page size is
    // clarified.
    pub fn cursor(mut self, cursor: impl Into<Value>, direction: &str, field: &str) -> Self {
        let cursor = cursor.into();
        if !cursor.is_empty() {
            self.order_limit.order.clear();
            if direction == "prev" {
                self.where_group.and_expr(Expr::lt(field, cursor));
                self.order_limit.order.push(format!("{field} DESC"));
            } else {
                self.where_group.and_expr(Expr::gt(field, cursor));
                self.order_limit.order.push(format!("{field} ASC"));
            }
        }
        self.order_limit.limit = Some(1);
        self
    }

    // ==================== Build ====================

    fn push_from(&self, sql: &mut String) {
        sql.push_str(" FROM ");
        sql.push_str(&self.aliases.render(&self.table));
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join.kind.as_sql());
            sql.push(' ');
            sql.push_str(&self.aliases.render(&join.table));
            sql.push_str(" ON ");
            sql.push_str(&self.aliases.qualify(&join.on));
        }
    }

    /// FROM, WHERE, GROUP BY and HAVING.
    fn push_body(&self, sql: &mut String, params: &mut ParamList) -> OrmResult<()> {
        self.push_from(sql);
        if let Some(where_sql) = self.where_group.compile(params)? {
            sql.push_str(" WHERE ");
            sql.push_str(&self.aliases.qualify(&where_sql));
        }
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.aliases.qualify(&self.group_by.join(", ")));
        }
        if let Some(having_sql) = self.having_group.compile(params)? {
            sql.push_str(" HAVING ");
            sql.push_str(&self.aliases.qualify(&having_sql));
        }
        Ok(())
    }

    fn projection(&self) -> String {
        let cols = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.aliases.qualify(&self.columns.join(", "))
        };
        if self.distinct {
            format!("DISTINCT {cols}")
        } else {
            cols
        }
    }

    /// Compile into SQL, pushing arguments into `params` (so it nests as a subquery).
    pub(crate) fn compile_into(&self, params: &mut ParamList) -> OrmResult<String> {
        if self.table_name().is_empty() {
            return Err(OrmError::MissingTable);
        }
        let mut sql = format!("SELECT {}", self.projection());
        self.push_body(&mut sql, params)?;
        let mut order = String::new();
        self.order_limit.push_order(&mut order);
        sql.push_str(&self.aliases.qualify(&order));
        params.dialect().push_limit_offset(
            &mut sql,
            self.order_limit.has_order(),
            self.order_limit.limit,
            self.offset,
        );
        Ok(sql)
    }

    /// Build SQL and arguments for the builder's dialect.
    pub fn build(&self) -> OrmResult<(String, Vec<Value>)> {
        self.build_with_dialect(self.dialect)
    }

    /// Build SQL and arguments for `dialect`.
    pub fn build_with_dialect(&self, dialect: Dialect) -> OrmResult<(String, Vec<Value>)> {
        let mut params = ParamList::new(dialect);
        let sql = self.compile_into(&mut params)?;
        Ok((sql, params.into_values()))
    }

    /// Build the matching COUNT query, ignoring ORDER BY/LIMIT/OFFSET.
    ///
    /// Grouped or DISTINCT queries are wrapped in a subquery so the count is over result rows.
    pub fn build_count_with_dialect(&self, dialect: Dialect) -> OrmResult<(String, Vec<Value>)> {
        if self.table_name().is_empty() {
            return Err(OrmError::MissingTable);
        }
        let mut params = ParamList::new(dialect);
        let sql = if !self.group_by.is_empty() || !self.having_group.is_empty() || self.distinct {
            let inner_cols = if self.distinct {
                self.projection()
            } else {
                "1".to_string()
            };
            let mut inner = format!("SELECT {inner_cols}");
            self.push_body(&mut inner, &mut params)?;
            format!("SELECT COUNT(*) FROM ({inner}) AS t")
        } else {
            let mut sql = "SELECT COUNT(*)".to_string();
            self.push_body(&mut sql, &mut params)?;
            sql
        };
        Ok((sql, params.into_values()))
    }

    /// COUNT query for the builder's dialect.
    pub fn build_count(&self) -> OrmResult<(String, Vec<Value>)> {
        self.build_count_with_dialect(self.dialect)
    }

    /// Get the built SQL string (for debugging).
    pub fn to_sql(&self) -> OrmResult<String> {
        self.build().map(|(sql, _)| sql)
    }
}

impl Filter for SelectQb {
    fn where_group_mut(&mut self) -> &mut ExprGroup {
        &mut self.where_group
    }
}

impl Ordered for SelectQb {
    fn order_limit_mut(&mut self) -> &mut OrderLimit {
        &mut self.order_limit
    }
}
