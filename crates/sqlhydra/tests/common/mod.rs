//! Shared in-memory SQLite fixture.

#![allow(dead_code)]

use std::sync::Arc;

use sqlhydra::{Connection, ConnectionConfig, OrmResult, QueryBuilder, Value};

/// A fresh in-memory database with the blog schema and seed rows:
///
/// - users: 1 alice (active), 2 bob (active), 3 carol (inactive)
/// - profiles: alice only
/// - posts: 1 "first" (alice, published), 2 "second" (alice, draft), 3 "third" (bob, published)
/// - comments: two on post 1, one on post 3
/// - tags: 1 rust, 2 sql; post 1 has both, post 3 has sql
/// - uploads: one for alice
pub async fn blog() -> Arc<Connection> {
    let conn = Arc::new(
        Connection::open(&ConnectionConfig::sqlite(":memory:").name("blog"))
            .await
            .expect("open sqlite"),
    );
    seed(&conn.query_builder()).await.expect("seed");
    conn
}

async fn seed(qb: &QueryBuilder) -> OrmResult<()> {
    let tables = [
        qb.create_table("users")
            .column("id", "INTEGER PRIMARY KEY")
            .column("name", "TEXT NOT NULL")
            .column("active", "INTEGER NOT NULL DEFAULT 1"),
        qb.create_table("profiles")
            .column("id", "INTEGER PRIMARY KEY")
            .column("user_id", "INTEGER NOT NULL")
            .column("bio", "TEXT"),
        qb.create_table("posts")
            .column("id", "INTEGER PRIMARY KEY")
            .column("user_id", "INTEGER NOT NULL")
            .column("title", "TEXT NOT NULL")
            .column("published", "INTEGER NOT NULL"),
        qb.create_table("comments")
            .column("id", "INTEGER PRIMARY KEY")
            .column("post_id", "INTEGER NOT NULL")
            .column("body", "TEXT NOT NULL"),
        qb.create_table("tags")
            .column("id", "INTEGER PRIMARY KEY")
            .column("name", "TEXT NOT NULL"),
        qb.create_table("post_tags")
            .column("post_id", "INTEGER NOT NULL")
            .column("tag_id", "INTEGER NOT NULL"),
        qb.create_table("uploads")
            .column("id", "INTEGER PRIMARY KEY")
            .column("user_id", "INTEGER NOT NULL")
            .column("file", "TEXT NOT NULL"),
    ];
    for table in tables {
        qb.execute(table).await?;
    }

    qb.execute(
        qb.insert("users")
            .columns(&["id", "name", "active"])
            .values([Value::from(1), Value::from("alice"), Value::from(true)])
            .values([Value::from(2), Value::from("bob"), Value::from(true)])
            .values([Value::from(3), Value::from("carol"), Value::from(false)]),
    )
    .await?;
    qb.execute(qb.insert("profiles").set("id", 1).set("user_id", 1).set("bio", "hi"))
        .await?;
    qb.execute(
        qb.insert("posts")
            .columns(&["id", "user_id", "title", "published"])
            .values([Value::from(1), Value::from(1), Value::from("first"), Value::from(true)])
            .values([Value::from(2), Value::from(1), Value::from("second"), Value::from(false)])
            .values([Value::from(3), Value::from(2), Value::from("third"), Value::from(true)]),
    )
    .await?;
    qb.execute(
        qb.insert("comments")
            .columns(&["id", "post_id", "body"])
            .values([Value::from(1), Value::from(1), Value::from("c1")])
            .values([Value::from(2), Value::from(1), Value::from("c2")])
            .values([Value::from(3), Value::from(3), Value::from("c3")]),
    )
    .await?;
    qb.execute(
        qb.insert("tags")
            .columns(&["id", "name"])
            .values([Value::from(1), Value::from("rust")])
            .values([Value::from(2), Value::from("sql")]),
    )
    .await?;
    qb.execute(
        qb.insert("post_tags")
            .columns(&["post_id", "tag_id"])
            .values([1, 1])
            .values([1, 2])
            .values([3, 2]),
    )
    .await?;
    qb.execute(qb.insert("uploads").set("id", 1).set("user_id", 1).set("file", "a.png"))
        .await?;
    Ok(())
}

/// Text values of `column`, in record order.
pub fn names(records: &[sqlhydra::Record], column: &str) -> Vec<String> {
    records
        .iter()
        .map(|r| r.try_get::<String>(column).expect("text column"))
        .collect()
}
