//! Transaction coordinator behavior on SQLite.

#![cfg(feature = "sqlite")]

mod common;

use std::sync::Arc;

use common::blog;
use futures_util::FutureExt;
use sqlhydra::{Connection, Filter, OrmError, QueryBuilder};

async fn user_count(qb: &QueryBuilder) -> i64 {
    qb.count(&qb.select("users")).await.unwrap()
}

#[tokio::test]
async fn committed_writes_are_visible() {
    let conn = blog().await;

    let id = conn
        .transaction(|qb| async move {
            let result = qb.execute(qb.insert("users").set("name", "dave")).await?;
            Ok(result.last_insert_id)
        })
        .await
        .unwrap();

    assert_eq!(id, Some(4));
    assert_eq!(user_count(&conn.query_builder()).await, 4);
    assert!(!conn.in_transaction());
}

#[tokio::test]
async fn error_rolls_back_every_statement() {
    let conn = blog().await;

    let err = conn
        .transaction(|qb| async move {
            qb.execute(qb.insert("users").set("name", "dave")).await?;
            qb.execute(qb.delete("posts").eq("user_id", 1)).await?;
            qb.execute(qb.insert("no_such_table").set("x", 1)).await?;
            Ok(())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, OrmError::Sqlite(_)));
    let qb = conn.query_builder();
    assert_eq!(user_count(&qb).await, 3);
    assert_eq!(qb.count(&qb.select("posts").eq("user_id", 1)).await.unwrap(), 2);
}

#[tokio::test]
async fn panic_rolls_back_and_propagates() {
    let conn: Arc<Connection> = blog().await;
    let task_conn = Arc::clone(&conn);

    let joined = tokio::spawn(async move {
        task_conn
            .transaction(|qb| async move {
                qb.execute(qb.insert("users").set("name", "dave")).await?;
                if user_count(&qb).await == 4 {
                    panic!("invariant violated");
                }
                Ok(())
            })
            .await
    })
    .await;

    assert!(joined.unwrap_err().is_panic());
    assert!(!conn.in_transaction());
    assert_eq!(user_count(&conn.query_builder()).await, 3);
}

#[tokio::test]
async fn manual_begin_commit_and_rollback() {
    let conn = blog().await;

    let tx = conn.begin().await.unwrap();
    assert!(tx.in_transaction());
    assert!(matches!(conn.begin().await, Err(OrmError::AlreadyInTransaction)));
    tx.execute(tx.update("users").set("active", false).eq("id", 1))
        .await
        .unwrap();
    conn.rollback().await.unwrap();

    let qb = conn.query_builder();
    assert_eq!(qb.count(&qb.select("users").eq("active", false)).await.unwrap(), 1);

    let tx = conn.begin().await.unwrap();
    tx.execute(tx.update("users").set("active", false).eq("id", 1))
        .await
        .unwrap();
    conn.commit().await.unwrap();
    assert_eq!(qb.count(&qb.select("users").eq("active", false)).await.unwrap(), 2);

    assert!(matches!(conn.commit().await, Err(OrmError::NotInTransaction)));
}

#[tokio::test]
async fn statements_through_connection_join_active_transaction() {
    let conn = blog().await;

    conn.begin().await.unwrap();
    let qb = conn.query_builder();
    assert!(qb.in_transaction());
    qb.execute(qb.delete("comments")).await.unwrap();
    conn.rollback().await.unwrap();

    let qb = conn.query_builder();
    assert_eq!(qb.count(&qb.select("comments")).await.unwrap(), 3);
}

#[tokio::test]
async fn panic_before_body_future_still_rolls_back() {
    let conn: Arc<Connection> = blog().await;
    let task_conn = Arc::clone(&conn);

    let joined = tokio::spawn(async move {
        task_conn
            .transaction(|qb| -> std::future::Ready<sqlhydra::OrmResult<()>> {
                let _statement = qb.insert("users").set("name", "dave");
                panic!("closure failed before producing its future")
            })
            .await
    })
    .await;

    assert!(joined.unwrap_err().is_panic());
    assert!(!conn.in_transaction());
    conn.begin().await.unwrap();
    conn.rollback().await.unwrap();
}

#[tokio::test]
async fn dropped_transaction_rolls_back_its_writes() {
    let conn = blog().await;

    let polled = conn
        .transaction(|qb| async move {
            qb.execute(qb.insert("users").set("name", "dave")).await?;
            std::future::pending::<()>().await;
            Ok(())
        })
        .now_or_never();
    assert!(polled.is_none());

    assert!(!conn.in_transaction());
    let qb = conn.query_builder();
    assert!(!qb.in_transaction());
    assert_eq!(user_count(&qb).await, 3);
    conn.transaction(|qb| async move { qb.execute(qb.delete("comments")).await })
        .await
        .unwrap();
}
