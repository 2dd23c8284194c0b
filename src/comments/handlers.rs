use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{claims::Principal, extractors::AuthUser},
    comments::{
        dto::{CommentDto, CommentRequest},
        repo::{self, Comment},
    },
    error::ApiError,
    pagination::{Page, PageParams},
    state::AppState,
};

pub fn comment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/articles/:id/comments",
            post(add_comment).get(list_comments),
        )
        .route("/articles/:id/comments/:comment_id", delete(delete_comment))
}

#[instrument(skip(state, principal, payload))]
pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(article_id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentDto>), ApiError> {
    if payload.content.trim().is_empty() {
        return Err(ApiError::Validation("Content must not be blank".into()));
    }

    // author_id comes from the principal, never from the payload
    let comment = repo::insert(&state.db, &payload.content, principal.id, article_id).await?;

    info!(comment_id = %comment.id, article_id = %article_id, "comment added");
    Ok((StatusCode::CREATED, Json(CommentDto::from(comment))))
}

#[instrument(skip(state))]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(article_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<CommentDto>>, ApiError> {
    let rows =
        repo::list_by_article(&state.db, article_id, params.limit(), params.offset()).await?;
    let total = repo::count_by_article(&state.db, article_id).await?;
    let content = rows.into_iter().map(CommentDto::from).collect();
    Ok(Json(Page::new(content, params, total)))
}

/// Only the comment's author may delete it. The checks run in a fixed
/// order: principal (401, via the extractor) → comment existence (404) →
/// ownership (403), so a nonexistent target always reads as "not found"
/// rather than "forbidden".
#[instrument(skip(state, principal))]
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path((_article_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let comment = repo::find_by_id(&state.db, comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".into()))?;

    ensure_comment_author(&principal, &comment)?;

    repo::delete_by_id(&state.db, comment_id).await?;
    info!(comment_id = %comment_id, "comment deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn ensure_comment_author(principal: &Principal, comment: &Comment) -> Result<(), ApiError> {
    if comment.author_id != principal.id {
        return Err(ApiError::Forbidden(
            "You can only delete your own comments".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::Role;
    use time::OffsetDateTime;

    fn comment_by(author_id: Uuid) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            content: "nice post".into(),
            author_id,
            article_id: Uuid::new_v4(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn principal(id: Uuid, role: Role) -> Principal {
        Principal {
            id,
            email: "someone@example.com".into(),
            role,
        }
    }

    #[test]
    fn author_may_delete_own_comment() {
        let id = Uuid::new_v4();
        let result = ensure_comment_author(&principal(id, Role::User), &comment_by(id));
        assert!(result.is_ok());
    }

    #[test]
    fn non_author_is_forbidden() {
        let err = ensure_comment_author(
            &principal(Uuid::new_v4(), Role::User),
            &comment_by(Uuid::new_v4()),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn admin_role_grants_no_bypass_on_comments() {
        let err = ensure_comment_author(
            &principal(Uuid::new_v4(), Role::Admin),
            &comment_by(Uuid::new_v4()),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }
}
