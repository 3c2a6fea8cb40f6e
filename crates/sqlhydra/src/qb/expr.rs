//! Condition compiler for WHERE/HAVING clauses.
//!
//! [`Expr`] is a predicate tree: leaves compare a column with bound values, combinators
//! (`And`/`Or`/`Not`) nest them. Compiling pushes every value into a [`ParamList`], which hands
//! back the placeholder for the target dialect, so numbering is correct without any string
//! rewriting. Operators a dialect lacks are emulated:
//!
//! - `ILIKE` outside PostgreSQL becomes `LOWER(col) LIKE LOWER(?)`.
//! - `IS DISTINCT FROM` becomes `NOT col <=> ?` on MySQL and a `CASE` expression on SQL Server.

use crate::dialect::DistinctFrom;
use crate::error::{OrmError, OrmResult};
use crate::qb::param::ParamList;
use crate::qb::select::SelectQb;
use crate::value::Value;

/// Leaf operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Like,
    ILike,
    NotLike,
    NotILike,
    IsNull,
    IsNotNull,
    Between,
    NotBetween,
    Exists,
    NotExists,
    Any,
    All,
    Some,
    IsDistinctFrom,
    IsNotDistinctFrom,
}

impl Op {
    /// SQL spelling of the operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "<>",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::In => "IN",
            Op::NotIn => "NOT IN",
            Op::Like => "LIKE",
            Op::ILike => "ILIKE",
            Op::NotLike => "NOT LIKE",
            Op::NotILike => "NOT ILIKE",
            Op::IsNull => "IS NULL",
            Op::IsNotNull => "IS NOT NULL",
            Op::Between => "BETWEEN",
            Op::NotBetween => "NOT BETWEEN",
            Op::Exists => "EXISTS",
            Op::NotExists => "NOT EXISTS",
            Op::Any => "ANY",
            Op::All => "ALL",
            Op::Some => "SOME",
            Op::IsDistinctFrom => "IS DISTINCT FROM",
            Op::IsNotDistinctFrom => "IS NOT DISTINCT FROM",
        }
    }

    fn is_comparison(&self) -> bool {
        matches!(
            self,
            Op::Eq
                | Op::Ne
                | Op::Gt
                | Op::Gte
                | Op::Lt
                | Op::Lte
                | Op::Like
                | Op::ILike
                | Op::NotLike
                | Op::NotILike
        )
    }
}

/// Expression node for building WHERE/HAVING clauses.
#[derive(Clone, Debug)]
pub enum Expr {
    /// All children must hold. Compiling an empty list is an error.
    And(Vec<Expr>),

    /// At least one child must hold. Compiling an empty list is an error.
    Or(Vec<Expr>),

    /// Negate the inner expression.
    Not(Box<Expr>),

    /// column op ?
    Compare { column: String, op: Op, value: Value },

    /// column IS [NOT] NULL
    NullCheck { column: String, is_null: bool },

    /// column [NOT] IN (?, ...)
    InList {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },

    /// column [NOT] BETWEEN ? AND ?
    Between {
        column: String,
        from: Value,
        to: Value,
        negated: bool,
    },

    /// [NOT] EXISTS (subquery)
    Exists { query: Box<SelectQb>, negated: bool },

    /// column op ANY|ALL|SOME (?, ...)
    Quantified {
        column: String,
        op: Op,
        quantifier: Op,
        values: Vec<Value>,
    },

    /// column IS [NOT] DISTINCT FROM ?
    DistinctFrom {
        column: String,
        value: Value,
        negated: bool,
    },

    /// SQL with `?` placeholders, renumbered for the target dialect.
    Template { sql: String, params: Vec<Value> },

    /// Raw SQL fragment without parameters.
    Raw(String),

    /// Always true (used for empty NOT IN lists).
    True,

    /// Always false (used for empty IN lists).
    False,
}

impl Expr {
    /// Create an AND expression from a list of expressions.
    pub fn and(exprs: Vec<Expr>) -> Self {
        Expr::And(exprs)
    }

    /// Create an OR expression from a list of expressions.
    pub fn or(exprs: Vec<Expr>) -> Self {
        Expr::Or(exprs)
    }

    /// Create a NOT expression.
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    fn compare(column: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Expr::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Op::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Op::Ne, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Op::Gt, value)
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Op::Gte, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Op::Lt, value)
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Op::Lte, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::compare(column, Op::Like, pattern)
    }

    /// Case-insensitive LIKE; emulated with `LOWER()` outside PostgreSQL.
    pub fn ilike(column: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::compare(column, Op::ILike, pattern)
    }

    pub fn not_like(column: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::compare(column, Op::NotLike, pattern)
    }

    pub fn not_ilike(column: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::compare(column, Op::NotILike, pattern)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: true,
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: false,
        }
    }

    /// `column IN (...)`; an empty list is always false.
    pub fn in_list<T: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Expr::False;
        }
        Expr::InList {
            column: column.into(),
            values,
            negated: false,
        }
    }

    /// `column NOT IN (...)`; an empty list is always true.
    pub fn not_in<T: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Expr::True;
        }
        Expr::InList {
            column: column.into(),
            values,
            negated: true,
        }
    }

    pub fn between(
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Expr::Between {
            column: column.into(),
            from: from.into(),
            to: to.into(),
            negated: false,
        }
    }

    pub fn not_between(
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Expr::Between {
            column: column.into(),
            from: from.into(),
            to: to.into(),
            negated: true,
        }
    }

    pub fn exists(query: SelectQb) -> Self {
        Expr::Exists {
            query: Box::new(query),
            negated: false,
        }
    }

    pub fn not_exists(query: SelectQb) -> Self {
        Expr::Exists {
            query: Box::new(query),
            negated: true,
        }
    }

    fn quantified<T: Into<Value>>(
        column: impl Into<String>,
        op: Op,
        quantifier: Op,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Expr::Quantified {
            column: column.into(),
            op,
            quantifier,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `column op ANY (...)`
    pub fn any<T: Into<Value>>(
        column: impl Into<String>,
        op: Op,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Self::quantified(column, op, Op::Any, values)
    }

    /// `column op ALL (...)`
    pub fn all<T: Into<Value>>(
        column: impl Into<String>,
        op: Op,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Self::quantified(column, op, Op::All, values)
    }

    /// `column op SOME (...)`
    pub fn some<T: Into<Value>>(
        column: impl Into<String>,
        op: Op,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Self::quantified(column, op, Op::Some, values)
    }

    pub fn is_distinct_from(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::DistinctFrom {
            column: column.into(),
            value: value.into(),
            negated: false,
        }
    }

    pub fn is_not_distinct_from(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::DistinctFrom {
            column: column.into(),
            value: value.into(),
            negated: true,
        }
    }

    /// Create a template expression with `?` placeholders.
    ///
    /// # Example
    /// ```ignore
    /// Expr::template("a = ? OR b = ?", [1, 2])
    /// ```
    pub fn template<T: Into<Value>>(
        sql: impl Into<String>,
        params: impl IntoIterator<Item = T>,
    ) -> Self {
        Expr::Template {
            sql: sql.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a raw SQL fragment.
    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(sql.into())
    }

    /// Build a leaf from an operator and its operand list.
    ///
    /// Comparison operators take one value, `BETWEEN` two, the NULL checks none. `ANY`, `ALL`
    /// and `SOME` compare with `=`. `EXISTS` needs a subquery, use [`Expr::exists`].
    pub fn from_op(column: impl Into<String>, op: Op, mut values: Vec<Value>) -> OrmResult<Self> {
        let column = column.into();
        let arity = |expected: usize, values: &[Value]| -> OrmResult<()> {
            if values.len() == expected {
                Ok(())
            } else {
                Err(OrmError::validation(format!(
                    "operator {} expects {expected} value(s), got {}",
                    op.as_sql(),
                    values.len()
                )))
            }
        };

        Ok(match op {
            op if op.is_comparison() => {
                arity(1, &values)?;
                Self::compare(column, op, values.remove(0))
            }
            Op::IsDistinctFrom | Op::IsNotDistinctFrom => {
                arity(1, &values)?;
                Expr::DistinctFrom {
                    column,
                    value: values.remove(0),
                    negated: op == Op::IsNotDistinctFrom,
                }
            }
            Op::In => Self::in_list(column, values),
            Op::NotIn => Self::not_in(column, values),
            Op::IsNull => {
                arity(0, &values)?;
                Self::is_null(column)
            }
            Op::IsNotNull => {
                arity(0, &values)?;
                Self::is_not_null(column)
            }
            Op::Between | Op::NotBetween => {
                arity(2, &values)?;
                let to = values.remove(1);
                let from = values.remove(0);
                Expr::Between {
                    column,
                    from,
                    to,
                    negated: op == Op::NotBetween,
                }
            }
            Op::Any | Op::All | Op::Some => Self::quantified(column, Op::Eq, op, values),
            _ => {
                return Err(OrmError::validation(format!(
                    "operator {} requires a subquery",
                    op.as_sql()
                )));
            }
        })
    }

    /// Compile into SQL, pushing arguments into `params`.
    pub(crate) fn compile(&self, params: &mut ParamList) -> OrmResult<String> {
        match self {
            Expr::And(exprs) => compile_combinator(exprs, " AND ", params),
            Expr::Or(exprs) => compile_combinator(exprs, " OR ", params),
            Expr::Not(inner) => Ok(format!("NOT ({})", inner.compile(params)?)),
            Expr::Compare { column, op, value } => {
                let needs_lower = matches!(op, Op::ILike | Op::NotILike)
                    && !params.dialect().supports_ilike();
                let ph = params.push(value.clone());
                if needs_lower {
                    let like = if *op == Op::ILike { "LIKE" } else { "NOT LIKE" };
                    Ok(format!("LOWER({column}) {like} LOWER({ph})"))
                } else {
                    Ok(format!("{column} {} {ph}", op.as_sql()))
                }
            }
            Expr::NullCheck { column, is_null } => Ok(if *is_null {
                format!("{column} IS NULL")
            } else {
                format!("{column} IS NOT NULL")
            }),
            Expr::InList {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return Ok(if *negated { "1=1" } else { "1=0" }.to_string());
                }
                let op = if *negated { "NOT IN" } else { "IN" };
                Ok(format!("{column} {op} ({})", params.push_all(values)))
            }
            Expr::Between {
                column,
                from,
                to,
                negated,
            } => {
                let op = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                let from = params.push(from.clone());
                let to = params.push(to.clone());
                Ok(format!("{column} {op} {from} AND {to}"))
            }
            Expr::Exists { query, negated } => {
                let op = if *negated { "NOT EXISTS" } else { "EXISTS" };
                Ok(format!("{op} ({})", query.compile_into(params)?))
            }
            Expr::Quantified {
                column,
                op,
                quantifier,
                values,
            } => {
                if values.is_empty() {
                    // Vacuous truth: ALL over nothing holds, ANY/SOME over nothing does not.
                    return Ok(if *quantifier == Op::All { "1=1" } else { "1=0" }.to_string());
                }
                Ok(format!(
                    "{column} {} {} ({})",
                    op.as_sql(),
                    quantifier.as_sql(),
                    params.push_all(values)
                ))
            }
            Expr::DistinctFrom {
                column,
                value,
                negated,
            } => Ok(compile_distinct_from(column, value, *negated, params)),
            Expr::Template {
                sql,
                params: template_params,
            } => {
                let mut result = String::with_capacity(sql.len());
                let mut values = template_params.iter().peekable();
                for ch in sql.chars() {
                    match (ch, values.next_if(|_| ch == '?')) {
                        (_, Some(v)) => result.push_str(&params.push(v.clone())),
                        (ch, None) => result.push(ch),
                    }
                }
                Ok(result)
            }
            Expr::Raw(sql) => Ok(sql.clone()),
            Expr::True => Ok("1=1".to_string()),
            Expr::False => Ok("1=0".to_string()),
        }
    }
}

/// Join compiled children; more than one child is parenthesized.
fn compile_combinator(exprs: &[Expr], sep: &str, params: &mut ParamList) -> OrmResult<String> {
    if exprs.is_empty() {
        return Err(OrmError::EmptyCondition);
    }
    let mut parts = exprs
        .iter()
        .map(|e| e.compile(params))
        .collect::<OrmResult<Vec<_>>>()?;
    if parts.len() == 1 {
        return Ok(parts.remove(0));
    }
    Ok(format!("({})", parts.join(sep)))
}

fn compile_distinct_from(
    column: &str,
    value: &Value,
    not_distinct: bool,
    params: &mut ParamList,
) -> String {
    match params.dialect().distinct_from() {
        DistinctFrom::Native => {
            let ph = params.push(value.clone());
            if not_distinct {
                format!("{column} IS NOT DISTINCT FROM {ph}")
            } else {
                format!("{column} IS DISTINCT FROM {ph}")
            }
        }
        DistinctFrom::NullSafeEqual => {
            let ph = params.push(value.clone());
            if not_distinct {
                format!("{column} <=> {ph}")
            } else {
                format!("NOT {column} <=> {ph}")
            }
        }
        DistinctFrom::CaseExpression => {
            let p1 = params.push(value.clone());
            let p2 = params.push(value.clone());
            let p3 = params.push(value.clone());
            let outcome = if not_distinct { 0 } else { 1 };
            format!(
                "CASE WHEN {column} IS NULL AND {p1} IS NULL THEN 0 \
                 WHEN {column} IS NOT NULL AND {p2} IS NOT NULL AND {column} = {p3} THEN 0 \
                 ELSE 1 END = {outcome}"
            )
        }
    }
}

/// The AND-ed predicate list of a WHERE or HAVING clause.
///
/// An empty group means "no clause"; it is the builder's list, not a combinator, so it never
/// raises [`OrmError::EmptyCondition`].
#[derive(Clone, Debug, Default)]
pub struct ExprGroup {
    exprs: Vec<Expr>,
}

impl ExprGroup {
    /// Create a new empty expression group.
    pub fn new() -> Self {
        Self { exprs: Vec::new() }
    }

    /// Check if the group is empty.
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Add an expression to be ANDed.
    pub fn and_expr(&mut self, expr: Expr) {
        self.exprs.push(expr);
    }

    /// Get all expressions.
    pub fn exprs(&self) -> &[Expr] {
        &self.exprs
    }

    /// Compile the clause body (without the keyword). `None` when the group is empty.
    pub(crate) fn compile(&self, params: &mut ParamList) -> OrmResult<Option<String>> {
        if self.exprs.is_empty() {
            return Ok(None);
        }
        let parts = self
            .exprs
            .iter()
            .map(|e| e.compile(params))
            .collect::<OrmResult<Vec<_>>>()?;
        Ok(Some(parts.join(" AND ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    fn compile(expr: &Expr, dialect: Dialect) -> (String, Vec<Value>) {
        let mut params = ParamList::new(dialect);
        let sql = expr.compile(&mut params).unwrap();
        (sql, params.into_values())
    }

    #[test]
    fn test_simple_eq() {
        let (sql, args) = compile(&Expr::eq("name", "alice"), Dialect::Pgsql);
        assert_eq!(sql, "name = $1");
        assert_eq!(args, vec![Value::from("alice")]);
    }

    #[test]
    fn test_and_group_parenthesized() {
        let expr = Expr::and(vec![Expr::eq("status", "active"), Expr::gt("age", 18)]);
        let (sql, args) = compile(&expr, Dialect::Pgsql);
        assert_eq!(sql, "(status = $1 AND age > $2)");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_single_child_not_parenthesized() {
        let expr = Expr::or(vec![Expr::eq("role", "admin")]);
        assert_eq!(compile(&expr, Dialect::Sqlite).0, "role = ?");
    }

    #[test]
    fn test_nested_and_or() {
        let expr = Expr::and(vec![
            Expr::eq("status", "active"),
            Expr::or(vec![Expr::eq("role", "admin"), Expr::eq("role", "superuser")]),
        ]);
        let (sql, _) = compile(&expr, Dialect::Pgsql);
        assert_eq!(sql, "(status = $1 AND (role = $2 OR role = $3))");
    }

    #[test]
    fn test_empty_combinator_is_error() {
        let mut params = ParamList::new(Dialect::Sqlite);
        assert!(matches!(
            Expr::and(vec![]).compile(&mut params),
            Err(OrmError::EmptyCondition)
        ));
        assert!(matches!(
            Expr::not(Expr::or(vec![])).compile(&mut params),
            Err(OrmError::EmptyCondition)
        ));
    }

    #[test]
    fn test_in_list() {
        let (sql, args) = compile(&Expr::in_list("id", [1, 2, 3]), Dialect::Mssql);
        assert_eq!(sql, "id IN (@p1, @p2, @p3)");
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_empty_in_lists() {
        assert_eq!(compile(&Expr::in_list::<i32>("id", []), Dialect::Pgsql).0, "1=0");
        assert_eq!(compile(&Expr::not_in::<i32>("id", []), Dialect::Pgsql).0, "1=1");
    }

    #[test]
    fn test_between_and_null_checks() {
        let (sql, _) = compile(&Expr::not_between("age", 18, 65), Dialect::Pgsql);
        assert_eq!(sql, "age NOT BETWEEN $1 AND $2");
        assert_eq!(compile(&Expr::is_null("deleted_at"), Dialect::Pgsql).0, "deleted_at IS NULL");
    }

    #[test]
    fn test_ilike_emulation() {
        let expr = Expr::ilike("name", "%Al%");
        assert_eq!(compile(&expr, Dialect::Pgsql).0, "name ILIKE $1");
        assert_eq!(compile(&expr, Dialect::Sqlite).0, "LOWER(name) LIKE LOWER(?)");
        assert_eq!(compile(&expr, Dialect::Mysql).0, "LOWER(name) LIKE LOWER(?)");
        let expr = Expr::not_ilike("name", "%Al%");
        assert_eq!(compile(&expr, Dialect::Mssql).0, "LOWER(name) NOT LIKE LOWER(@p1)");
    }

    #[test]
    fn test_distinct_from_per_dialect() {
        let expr = Expr::is_distinct_from("a", 1);
        assert_eq!(compile(&expr, Dialect::Pgsql).0, "a IS DISTINCT FROM $1");
        assert_eq!(compile(&expr, Dialect::Sqlite).0, "a IS DISTINCT FROM ?");
        assert_eq!(compile(&expr, Dialect::Mysql).0, "NOT a <=> ?");
        assert_eq!(
            compile(&Expr::is_not_distinct_from("a", 1), Dialect::Mysql).0,
            "a <=> ?"
        );

        let (sql, args) = compile(&expr, Dialect::Mssql);
        assert_eq!(
            sql,
            "CASE WHEN a IS NULL AND @p1 IS NULL THEN 0 \
             WHEN a IS NOT NULL AND @p2 IS NOT NULL AND a = @p3 THEN 0 \
             ELSE 1 END = 1"
        );
        assert_eq!(args, vec![Value::Int(1); 3]);
        let (sql, _) = compile(&Expr::is_not_distinct_from("a", 1), Dialect::Mssql);
        assert!(sql.ends_with("END = 0"));
    }

    #[test]
    fn test_quantified() {
        let expr = Expr::any("score", Op::Gt, [10, 20]);
        assert_eq!(compile(&expr, Dialect::Pgsql).0, "score > ANY ($1, $2)");
        let expr = Expr::all("score", Op::Lt, Vec::<i32>::new());
        assert_eq!(compile(&expr, Dialect::Pgsql).0, "1=1");
        let expr = Expr::some("score", Op::Eq, Vec::<i32>::new());
        assert_eq!(compile(&expr, Dialect::Pgsql).0, "1=0");
    }

    #[test]
    fn test_template_renumbered() {
        let expr = Expr::template("a = ? OR b = ?", [1, 2]);
        let mut params = ParamList::new(Dialect::Pgsql);
        params.push(Value::Int(0));
        assert_eq!(expr.compile(&mut params).unwrap(), "a = $2 OR b = $3");
    }

    #[test]
    fn test_from_op() {
        let expr = Expr::from_op("age", Op::Gte, vec![Value::Int(18)]).unwrap();
        assert_eq!(compile(&expr, Dialect::Pgsql).0, "age >= $1");

        let expr = Expr::from_op("age", Op::Between, vec![Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(compile(&expr, Dialect::Pgsql).0, "age BETWEEN $1 AND $2");

        assert!(Expr::from_op("age", Op::Eq, vec![]).is_err());
        assert!(Expr::from_op("age", Op::Exists, vec![]).is_err());
        assert_eq!(Op::Ne.as_sql(), "<>");
    }

    #[test]
    fn test_group_joins_without_parens() {
        let mut group = ExprGroup::new();
        group.and_expr(Expr::eq("status", "active"));
        group.and_expr(Expr::in_list("role", ["admin", "user"]));
        let mut params = ParamList::new(Dialect::Pgsql);
        assert_eq!(
            group.compile(&mut params).unwrap().as_deref(),
            Some("status = $1 AND role IN ($2, $3)")
        );
        assert_eq!(ExprGroup::new().compile(&mut params).unwrap(), None);
    }
}
