use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::articles::repo::{Article, ArticleStatus, Tag};
use crate::comments::dto::CommentDto;
use crate::users::dto::UserDto;

/// Create/update payload. `tags` carries the full desired tag id set; an
/// absent or empty list leaves the stored association as it is.
#[derive(Debug, Deserialize)]
pub struct ArticleRequest {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub status: Option<ArticleStatus>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
}

/// List-item projection: no author, comments or tags embedded.
#[derive(Debug, Serialize)]
pub struct ArticleSummaryDto {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub status: ArticleStatus,
    pub author_id: Uuid,
    pub views: i32,
    pub likes: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Article> for ArticleSummaryDto {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            title: article.title,
            content: article.content,
            image_url: article.image_url,
            status: article.status,
            author_id: article.author_id,
            views: article.views,
            likes: article.likes,
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }
}

/// Detail projection with the tag set and, on reads, the author and comments.
#[derive(Debug, Serialize)]
pub struct ArticleDto {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub status: ArticleStatus,
    pub author_id: Uuid,
    pub author: Option<UserDto>,
    pub views: i32,
    pub likes: i32,
    pub tags: Vec<Tag>,
    pub comments: Vec<CommentDto>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ArticleDto {
    pub fn from_parts(
        article: Article,
        tags: Vec<Tag>,
        author: Option<UserDto>,
        comments: Vec<CommentDto>,
    ) -> Self {
        Self {
            id: article.id,
            title: article.title,
            content: article.content,
            image_url: article.image_url,
            status: article.status,
            author_id: article.author_id,
            author,
            views: article.views,
            likes: article.likes,
            tags,
            comments,
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_request_defaults_tags_to_empty() {
        let payload: ArticleRequest =
            serde_json::from_str(r#"{"title":"Hello","content":"World"}"#).unwrap();
        assert!(payload.tags.is_empty());
        assert!(payload.status.is_none());
        assert!(payload.image_url.is_none());
    }

    #[test]
    fn article_request_parses_tags_and_status() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"title":"Hello","content":"World","status":"PUBLISHED","tags":["{id}"]}}"#
        );
        let payload: ArticleRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(payload.status, Some(ArticleStatus::Published));
        assert_eq!(payload.tags, vec![id]);
    }
}
