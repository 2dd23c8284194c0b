use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub article_id: Uuid,
    pub created_at: OffsetDateTime,
}

pub async fn insert(
    db: &PgPool,
    content: &str,
    author_id: Uuid,
    article_id: Uuid,
) -> anyhow::Result<Comment> {
    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (content, author_id, article_id)
        VALUES ($1, $2, $3)
        RETURNING id, content, author_id, article_id, created_at
        "#,
    )
    .bind(content)
    .bind(author_id)
    .bind(article_id)
    .fetch_one(db)
    .await?;
    Ok(comment)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Comment>> {
    let comment = sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, content, author_id, article_id, created_at
        FROM comments
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(comment)
}

pub async fn list_by_article(
    db: &PgPool,
    article_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Comment>> {
    let rows = sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, content, author_id, article_id, created_at
        FROM comments
        WHERE article_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(article_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Unpaginated variant used when embedding comments into an article read.
pub async fn list_all_by_article(db: &PgPool, article_id: Uuid) -> anyhow::Result<Vec<Comment>> {
    let rows = sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, content, author_id, article_id, created_at
        FROM comments
        WHERE article_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(article_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn count_by_article(db: &PgPool, article_id: Uuid) -> anyhow::Result<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE article_id = $1")
        .bind(article_id)
        .fetch_one(db)
        .await?;
    Ok(total)
}

pub async fn delete_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
