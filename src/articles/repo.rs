use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "article_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ArticleStatus {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub status: ArticleStatus,
    pub author_id: Uuid,
    pub views: i32,
    pub likes: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub status: ArticleStatus,
    pub author_id: Uuid,
}

#[derive(Debug)]
pub struct ArticleUpdate {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub status: ArticleStatus,
}

pub async fn insert(db: &PgPool, new: &NewArticle) -> anyhow::Result<Article> {
    let article = sqlx::query_as::<_, Article>(
        r#"
        INSERT INTO articles (title, content, image_url, status, author_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, title, content, image_url, status, author_id, views, likes, created_at, updated_at
        "#,
    )
    .bind(&new.title)
    .bind(&new.content)
    .bind(&new.image_url)
    .bind(new.status)
    .bind(new.author_id)
    .fetch_one(db)
    .await?;
    Ok(article)
}

pub async fn update(db: &PgPool, id: Uuid, up: &ArticleUpdate) -> anyhow::Result<Option<Article>> {
    let article = sqlx::query_as::<_, Article>(
        r#"
        UPDATE articles
        SET title = $2, content = $3, image_url = $4, status = $5, updated_at = now()
        WHERE id = $1
        RETURNING id, title, content, image_url, status, author_id, views, likes, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(&up.title)
    .bind(&up.content)
    .bind(&up.image_url)
    .bind(up.status)
    .fetch_optional(db)
    .await?;
    Ok(article)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Article>> {
    let article = sqlx::query_as::<_, Article>(
        r#"
        SELECT id, title, content, image_url, status, author_id, views, likes, created_at, updated_at
        FROM articles
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(article)
}

/// Fetch by id, bumping the view counter as part of the read. Reading an
/// article is not a pure read: the incremented count is persisted before the
/// row is returned. A missing stored count starts from 0.
pub async fn fetch_and_count_view(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Article>> {
    let article = sqlx::query_as::<_, Article>(
        r#"
        UPDATE articles
        SET views = COALESCE(views, 0) + 1
        WHERE id = $1
        RETURNING id, title, content, image_url, status, author_id, views, likes, created_at, updated_at
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(article)
}

pub async fn list(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<Article>> {
    let rows = sqlx::query_as::<_, Article>(
        r#"
        SELECT id, title, content, image_url, status, author_id, views, likes, created_at, updated_at
        FROM articles
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn list_by_author(
    db: &PgPool,
    author_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Article>> {
    let rows = sqlx::query_as::<_, Article>(
        r#"
        SELECT id, title, content, image_url, status, author_id, views, likes, created_at, updated_at
        FROM articles
        WHERE author_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(author_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn count(db: &PgPool) -> anyhow::Result<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
        .fetch_one(db)
        .await?;
    Ok(total)
}

pub async fn count_by_author(db: &PgPool, author_id: Uuid) -> anyhow::Result<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(db)
        .await?;
    Ok(total)
}

pub async fn delete_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM articles WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn load_tags(db: &PgPool, article_id: Uuid) -> anyhow::Result<Vec<Tag>> {
    let tags = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.name
        FROM tags t
        INNER JOIN article_tags at ON t.id = at.tag_id
        WHERE at.article_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(article_id)
    .fetch_all(db)
    .await?;
    Ok(tags)
}

/// Make the stored tag association match `desired` exactly.
///
/// An empty `desired` set means tags were not supplied with this save: the
/// existing association is left untouched rather than cleared, so a bare
/// "update the title" request cannot wipe an article's tags. When tags are
/// supplied the old rows are deleted and the new set inserted inside one
/// transaction, so an interrupted replace never leaves a partial set behind.
/// Duplicate ids in the input hit the pair's primary key and are ignored.
pub async fn replace_tags(
    db: &PgPool,
    article_id: Uuid,
    desired: &[Uuid],
) -> anyhow::Result<Vec<Tag>> {
    if desired.is_empty() {
        return load_tags(db, article_id).await;
    }

    let mut tx = db.begin().await?;
    sqlx::query("DELETE FROM article_tags WHERE article_id = $1")
        .bind(article_id)
        .execute(&mut *tx)
        .await?;
    for tag_id in desired {
        sqlx::query(
            "INSERT INTO article_tags (article_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(article_id)
        .bind(tag_id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    load_tags(db, article_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_format_is_uppercase() {
        assert_eq!(
            serde_json::to_string(&ArticleStatus::Draft).unwrap(),
            "\"DRAFT\""
        );
        assert_eq!(
            serde_json::to_string(&ArticleStatus::Published).unwrap(),
            "\"PUBLISHED\""
        );
        let status: ArticleStatus = serde_json::from_str("\"ARCHIVED\"").unwrap();
        assert_eq!(status, ArticleStatus::Archived);
    }
}
