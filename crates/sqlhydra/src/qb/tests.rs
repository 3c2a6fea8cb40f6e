//! Cross-builder tests for the qb module.

use crate::dialect::Dialect;
use crate::error::OrmError;
use crate::qb::{
    Expr, Filter, Op, Ordered, Statement, StatementKind, create_table, delete, insert, select,
    update,
};
use crate::value::Value;

#[test]
fn test_statement_dispatch() {
    let statements: Vec<Statement> = vec![
        select("users").eq("id", 1).into(),
        insert("users").set("name", "a").into(),
        update("users").set("name", "b").eq("id", 1).into(),
        delete("users").eq("id", 1).into(),
        create_table("users").column("id", "INTEGER").into(),
    ];
    let kinds: Vec<StatementKind> = statements.iter().map(Statement::kind).collect();
    assert_eq!(
        kinds,
        vec![
            StatementKind::Select,
            StatementKind::Insert,
            StatementKind::Update,
            StatementKind::Delete,
            StatementKind::CreateTable,
        ]
    );
    for statement in &statements {
        assert_eq!(statement.table_name(), "users");
        let (sql, _) = statement.build_with_dialect(Dialect::Sqlite).unwrap();
        assert!(!sql.contains('$'), "{sql}");
    }
    assert_eq!(StatementKind::CreateTable.to_string(), "CREATE TABLE");
}

#[test]
fn test_placeholders_follow_dialect() {
    let qb = select("users").eq("a", 1).in_list("b", [2, 3]);
    let expected = [
        (Dialect::Sqlite, "SELECT * FROM users WHERE a = ? AND b IN (?, ?)"),
        (Dialect::Mysql, "SELECT * FROM users WHERE a = ? AND b IN (?, ?)"),
        (Dialect::Pgsql, "SELECT * FROM users WHERE a = $1 AND b IN ($2, $3)"),
        (Dialect::Mssql, "SELECT * FROM users WHERE a = @p1 AND b IN (@p2, @p3)"),
    ];
    for (dialect, sql) in expected {
        assert_eq!(qb.build_with_dialect(dialect).unwrap().0, sql);
    }
}

#[test]
fn test_complex_where_expr() {
    let qb = select("users").and_expr(Expr::and(vec![
        Expr::eq("status", "active"),
        Expr::or(vec![
            Expr::eq("role", "admin"),
            Expr::and(vec![Expr::eq("role", "user"), Expr::gt("reputation", 100)]),
        ]),
    ]));
    let (sql, args) = qb.build().unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM users WHERE (status = $1 AND (role = $2 OR (role = $3 AND reputation > $4)))"
    );
    assert_eq!(args.len(), 4);
}

#[test]
fn test_not_wraps_single_fragment() {
    let sql = select("users")
        .and_expr(Expr::not(Expr::eq("banned", true)))
        .to_sql()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM users WHERE NOT (banned = $1)");
}

#[test]
fn test_empty_combinator_in_every_builder() {
    let empty = || Expr::and(vec![]);
    assert!(matches!(
        select("t").and_expr(empty()).build(),
        Err(OrmError::EmptyCondition)
    ));
    assert!(matches!(
        update("t").set("a", 1).and_expr(empty()).build(),
        Err(OrmError::EmptyCondition)
    ));
    assert!(matches!(
        delete("t").and_expr(empty()).build(),
        Err(OrmError::EmptyCondition)
    ));
}

#[test]
fn test_having_numbers_after_where() {
    let (sql, args) = select("orders")
        .dialect(Dialect::Mssql)
        .select("user_id, SUM(total)")
        .eq("status", "paid")
        .group_by("user_id")
        .having_template("SUM(total) BETWEEN ? AND ?", [100, 500])
        .build()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT user_id, SUM(total) FROM orders WHERE status = @p1 GROUP BY user_id \
         HAVING SUM(total) BETWEEN @p2 AND @p3"
    );
    assert_eq!(args[1], Value::Int(100));
}

#[test]
fn test_quantified_and_distinct_through_builder() {
    let sql = select("scores")
        .dialect(Dialect::Mysql)
        .any("points", Op::Gte, [10, 20])
        .is_not_distinct_from("bonus", Value::Null)
        .to_sql()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM scores WHERE points >= ANY (?, ?) AND bonus <=> ?");
}

#[test]
fn test_build_twice_is_identical() {
    let statement: Statement = select("users")
        .columns(&["id", "name"])
        .ilike("name", "%a%")
        .order_by_asc("id")
        .page(2, 2)
        .dialect(Dialect::Sqlite)
        .into();
    let first = statement.build().unwrap();
    let second = statement.build().unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.0,
        "SELECT id, name FROM users WHERE LOWER(name) LIKE LOWER(?) ORDER BY id ASC LIMIT 2 OFFSET 2"
    );
}
