use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    articles::{
        dto::{ArticleDto, ArticleRequest, ArticleSummaryDto},
        repo::{self, ArticleStatus, ArticleUpdate, NewArticle},
    },
    auth::extractors::AuthUser,
    comments,
    error::ApiError,
    pagination::{Page, PageParams},
    state::AppState,
    users::{dto::UserDto, repo::User},
};

pub fn article_routes() -> Router<AppState> {
    Router::new()
        .route("/articles", post(create_article).get(list_articles))
        .route("/articles/author/:author_id", get(list_articles_by_author))
        .route(
            "/articles/:id",
            get(get_article).put(update_article).delete(delete_article),
        )
}

#[instrument(skip(state, principal, payload))]
pub async fn create_article(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(payload): Json<ArticleRequest>,
) -> Result<(StatusCode, Json<ArticleDto>), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("Title must not be blank".into()));
    }
    if payload.content.trim().is_empty() {
        return Err(ApiError::Validation("Content must not be blank".into()));
    }

    // The author is always the authenticated principal; the payload carries
    // no author field at all.
    let article = repo::insert(
        &state.db,
        &NewArticle {
            title: payload.title,
            content: payload.content,
            image_url: payload.image_url,
            status: payload.status.unwrap_or(ArticleStatus::Draft),
            author_id: principal.id,
        },
    )
    .await?;

    let tags = repo::replace_tags(&state.db, article.id, &payload.tags).await?;

    info!(article_id = %article.id, author_id = %principal.id, "article created");
    Ok((
        StatusCode::CREATED,
        Json(ArticleDto::from_parts(article, tags, None, Vec::new())),
    ))
}

#[instrument(skip(state, principal, payload))]
pub async fn update_article(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ArticleRequest>,
) -> Result<Json<ArticleDto>, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("Title must not be blank".into()));
    }
    if payload.content.trim().is_empty() {
        return Err(ApiError::Validation("Content must not be blank".into()));
    }

    let existing = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Article not found".into()))?;
    if existing.author_id != principal.id && !principal.is_admin() {
        return Err(ApiError::Forbidden(
            "You can only edit your own articles".into(),
        ));
    }

    let article = repo::update(
        &state.db,
        id,
        &ArticleUpdate {
            title: payload.title,
            content: payload.content,
            image_url: payload.image_url,
            status: payload.status.unwrap_or(existing.status),
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Article not found".into()))?;

    // An empty tag list on update intentionally leaves the stored set alone.
    let tags = repo::replace_tags(&state.db, article.id, &payload.tags).await?;

    info!(article_id = %article.id, "article updated");
    Ok(Json(ArticleDto::from_parts(article, tags, None, Vec::new())))
}

#[instrument(skip(state))]
pub async fn list_articles(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<ArticleSummaryDto>>, ApiError> {
    let articles = repo::list(&state.db, params.limit(), params.offset()).await?;
    let total = repo::count(&state.db).await?;
    let content = articles.into_iter().map(ArticleSummaryDto::from).collect();
    Ok(Json(Page::new(content, params, total)))
}

#[instrument(skip(state))]
pub async fn list_articles_by_author(
    State(state): State<AppState>,
    Path(author_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<ArticleSummaryDto>>, ApiError> {
    let articles =
        repo::list_by_author(&state.db, author_id, params.limit(), params.offset()).await?;
    let total = repo::count_by_author(&state.db, author_id).await?;
    let content = articles.into_iter().map(ArticleSummaryDto::from).collect();
    Ok(Json(Page::new(content, params, total)))
}

/// Fetch one article with author, tags and comments embedded. This is a
/// side-effecting read: the view counter is incremented and persisted.
#[instrument(skip(state))]
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ArticleDto>, ApiError> {
    let article = repo::fetch_and_count_view(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Article not found".into()))?;

    let tags = repo::load_tags(&state.db, article.id).await?;
    // The author may have been deleted since publication; the article still
    // renders, just without an author block.
    let author = User::find_by_id(&state.db, article.author_id)
        .await?
        .map(UserDto::from);
    let comment_rows = comments::repo::list_all_by_article(&state.db, article.id).await?;
    let comment_dtos = comment_rows
        .into_iter()
        .map(comments::dto::CommentDto::from)
        .collect();

    Ok(Json(ArticleDto::from_parts(
        article,
        tags,
        author,
        comment_dtos,
    )))
}

#[instrument(skip(state, _principal))]
pub async fn delete_article(
    State(state): State<AppState>,
    AuthUser(_principal): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    repo::delete_by_id(&state.db, id).await?;
    info!(article_id = %id, "article deleted");
    Ok(StatusCode::NO_CONTENT)
}
