use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::auth::extractors::CurrentUser;
use crate::blogs::dto::{BlogPayload, BlogResponse, PageParams, PageResponse};
use crate::blogs::repo::Blog;
use crate::error::AppError;
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/blogs", get(list_blogs))
        .route("/blogs/:id", get(get_blog))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/blogs", post(create_blog))
        .route("/blogs/:id", put(update_blog).delete(delete_blog))
}

fn validate(payload: &BlogPayload) -> Result<(), AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".into()));
    }
    if payload.content.trim().is_empty() {
        return Err(AppError::Validation("Content is required".into()));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_blogs(
    State(state): State<AppState>,
    Query(p): Query<PageParams>,
) -> Result<Json<PageResponse>, AppError> {
    let page = p.page.max(1);
    let size = if p.size < 1 { 10 } else { p.size };
    let offset = (page - 1) * size;

    let total = Blog::count(&state.db).await?;
    let blogs = Blog::list(&state.db, size, offset).await?;

    Ok(Json(PageResponse {
        content: blogs.into_iter().map(BlogResponse::from).collect(),
        total_elements: total,
        total_pages: (total + size - 1) / size,
        size,
        number: page,
    }))
}

#[instrument(skip(state))]
pub async fn get_blog(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BlogResponse>, AppError> {
    let blog = Blog::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("Blog"))?;
    Ok(Json(blog.into()))
}

#[instrument(skip(state, user, payload))]
pub async fn create_blog(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<BlogPayload>,
) -> Result<(StatusCode, Json<BlogResponse>), AppError> {
    validate(&payload)?;

    // The authenticated identity is the author, never the request body.
    let blog = Blog::create(&state.db, user.id, &payload.title, &payload.content).await?;

    info!(blog_id = blog.id, user_id = user.id, "blog created");
    Ok((
        StatusCode::CREATED,
        Json(BlogResponse {
            id: blog.id,
            title: blog.title,
            content: blog.content,
            author: user.into(),
            created_at: blog.created_at,
            updated_at: blog.updated_at,
        }),
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn update_blog(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<BlogPayload>,
) -> Result<Json<BlogResponse>, AppError> {
    validate(&payload)?;

    // Ownership check and write happen in the same transaction.
    let mut tx = state.db.begin().await?;
    let author_id = Blog::author_of(&mut tx, id)
        .await?
        .ok_or(AppError::NotFound("Blog"))?;
    if author_id != user.id {
        warn!(blog_id = id, user_id = user.id, "update rejected, not the author");
        return Err(AppError::Forbidden);
    }
    Blog::update_content(&mut tx, id, &payload.title, &payload.content).await?;
    tx.commit().await?;

    let blog = Blog::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("Blog"))?;

    info!(blog_id = id, user_id = user.id, "blog updated");
    Ok(Json(blog.into()))
}

#[instrument(skip(state, user))]
pub async fn delete_blog(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let mut tx = state.db.begin().await?;
    let author_id = Blog::author_of(&mut tx, id)
        .await?
        .ok_or(AppError::NotFound("Blog"))?;
    if author_id != user.id {
        warn!(blog_id = id, user_id = user.id, "delete rejected, not the author");
        return Err(AppError::Forbidden);
    }
    Blog::delete(&mut tx, id).await?;
    tx.commit().await?;

    info!(blog_id = id, user_id = user.id, "blog deleted");
    Ok(StatusCode::NO_CONTENT)
}
