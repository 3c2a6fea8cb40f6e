//! Eager loading and transactions on an in-memory SQLite database.
//!
//! Run with:
//!   cargo run --example blog -p sqlhydra

use sqlhydra::prelude::*;

#[derive(Debug, Clone, Model)]
struct Comment {
    #[orm(id)]
    id: i64,
    post_id: i64,
    body: String,
}

#[derive(Debug, Clone, Model)]
struct Post {
    #[orm(id)]
    id: i64,
    user_id: i64,
    title: String,
    #[orm(relation)]
    comments: Vec<Comment>,
}

#[derive(Debug, Clone, Model)]
struct User {
    #[orm(id)]
    id: i64,
    name: String,
    #[orm(relation)]
    posts: Vec<Post>,
}

#[tokio::main]
async fn main() -> OrmResult<()> {
    let registry = Registry::new();
    let conn = registry
        .connect(&ConnectionConfig::sqlite(":memory:"))
        .await?;
    let qb = conn.query_builder();

    for ddl in [
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
        "CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, title TEXT NOT NULL)",
        "CREATE TABLE comments (id INTEGER PRIMARY KEY, post_id INTEGER NOT NULL, body TEXT NOT NULL)",
    ] {
        qb.execute_raw(ddl, &[]).await?;
    }

    // Writes inside the closure commit together or not at all.
    conn.transaction(|qb| async move {
        qb.execute(qb.insert("users").set("id", 1).set("name", "alice")).await?;
        qb.execute(qb.insert("users").set("id", 2).set("name", "bob")).await?;
        qb.execute(
            qb.insert("posts")
                .columns(&["id", "user_id", "title"])
                .values([Value::from(1), Value::from(1), Value::from("Hello")])
                .values([Value::from(2), Value::from(1), Value::from("Again")]),
        )
        .await?;
        qb.execute(qb.insert("comments").set("id", 1).set("post_id", 1).set("body", "Nice"))
            .await
    })
    .await?;

    let users: Vec<User> = qb
        .get_as(
            qb.select("users").order_by("id"),
            &[RelationSpec::has_many("posts")
                .order_by("id")
                .with(RelationSpec::has_many("comments"))],
        )
        .await?;

    for user in &users {
        println!("{} ({} posts)", user.name, user.posts.len());
        for post in &user.posts {
            println!("  #{} {} ({} comments)", post.id, post.title, post.comments.len());
        }
    }

    let page = qb.paginate(qb.select("posts").order_by("id"), 1, 1).await?;
    println!(
        "page {}/{} of {} posts",
        page.current_page, page.total_pages, page.total
    );

    registry.remove_all()
}
