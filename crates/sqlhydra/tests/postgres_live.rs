//! Live PostgreSQL checks.
//!
//! Skipped unless `SQLHYDRA_PG_HOST` is set (a `.env` file is honored). Also reads
//! `SQLHYDRA_PG_USER`, `SQLHYDRA_PG_PASSWORD` and `SQLHYDRA_PG_DATABASE`.

#![cfg(feature = "postgres")]

use std::time::Duration;

use sqlhydra::{Connection, ConnectionConfig, Filter, Ordered, RelationSpec};

fn config(pool: bool) -> Option<ConnectionConfig> {
    let _ = dotenvy::dotenv();
    let host = std::env::var("SQLHYDRA_PG_HOST").ok()?;
    let env = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
    Some(
        ConnectionConfig::new("pgsql")
            .host(host)
            .user(env("SQLHYDRA_PG_USER", "postgres"))
            .password(env("SQLHYDRA_PG_PASSWORD", ""))
            .database(env("SQLHYDRA_PG_DATABASE", "postgres"))
            .params(if pool { "application_name=sqlhydra-test&pool=true" } else { "application_name=sqlhydra-test" }),
    )
}

#[tokio::test]
async fn eager_loading_and_rollback() {
    let Some(config) = config(false) else {
        eprintln!("SQLHYDRA_PG_HOST not set, skipping");
        return;
    };
    let conn = Connection::open(&config).await.unwrap();
    let qb = conn.query_builder();

    qb.execute_raw(
        "CREATE TEMP TABLE hydra_users (id BIGINT PRIMARY KEY, name TEXT NOT NULL)",
        &[],
    )
    .await
    .unwrap();
    qb.execute_raw(
        "CREATE TEMP TABLE hydra_posts (id BIGINT PRIMARY KEY, hydra_user_id BIGINT NOT NULL, title TEXT NOT NULL)",
        &[],
    )
    .await
    .unwrap();
    qb.execute(qb.insert("hydra_users").columns(&["id", "name"]).values([sqlhydra::Value::Int(1), "ann".into()]))
        .await
        .unwrap();
    qb.execute(
        qb.insert("hydra_posts")
            .columns(&["id", "hydra_user_id", "title"])
            .values([sqlhydra::Value::Int(1), 1.into(), "p1".into()]),
    )
    .await
    .unwrap();

    let users = qb
        .get(
            qb.select("hydra_users").order_by("id"),
            &[RelationSpec::has_many("hydra_posts")],
        )
        .await
        .unwrap();
    assert_eq!(users[0].many("hydra_posts").len(), 1);

    let result = conn
        .transaction(|qb| async move {
            qb.execute(qb.delete("hydra_posts").eq("id", 1)).await?;
            Err::<(), _>(sqlhydra::OrmError::validation("abort"))
        })
        .await;
    assert!(result.is_err());
    assert_eq!(qb.count(&qb.select("hydra_posts")).await.unwrap(), 1);
}

#[cfg(feature = "pool")]
#[tokio::test]
async fn pooled_connection_runs_statements() {
    let Some(config) = config(true) else {
        eprintln!("SQLHYDRA_PG_HOST not set, skipping");
        return;
    };
    let conn = Connection::open(&config).await.unwrap();
    let qb = conn.query_builder();
    let one: i64 = qb
        .fetch_scalar(qb.select("pg_catalog.pg_class").select("COUNT(*)").limit(1))
        .await
        .unwrap();
    assert!(one > 0);
}

#[tokio::test]
async fn cancelled_transaction_rolls_back() {
    let Some(config) = config(false) else {
        eprintln!("SQLHYDRA_PG_HOST not set, skipping");
        return;
    };
    let conn = Connection::open(&config).await.unwrap();
    let qb = conn.query_builder();
    qb.execute_raw("CREATE TEMP TABLE hydra_marks (id BIGINT PRIMARY KEY)", &[])
        .await
        .unwrap();

    let cancelled = tokio::time::timeout(
        Duration::from_millis(200),
        conn.transaction(|qb| async move {
            qb.execute(qb.insert("hydra_marks").set("id", 1)).await?;
            std::future::pending::<()>().await;
            Ok(())
        }),
    )
    .await;
    assert!(cancelled.is_err());
    assert!(!conn.in_transaction());

    // The rollback runs on the runtime; wait for the session to come free.
    let mut tx = conn.begin().await;
    for _ in 0..50 {
        if tx.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx = conn.begin().await;
    }
    let tx = tx.unwrap();
    assert_eq!(tx.count(&tx.select("hydra_marks")).await.unwrap(), 0);
    conn.rollback().await.unwrap();
}
