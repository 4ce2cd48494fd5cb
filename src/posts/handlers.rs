use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::{AppError, AppResult},
    posts::{
        dto::{DeleteResponse, Page, PageQuery, PostRequest, PostView},
        services::{self, DeleteOutcome},
    },
    state::AppState,
};

pub fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/:id",
            get(get_post).put(edit_post).delete(delete_post),
        )
        .route("/users/:id/posts", get(list_user_posts))
}

#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Page<PostView>>> {
    let page = services::list(state.posts.as_ref(), q.page, state.config.posts_per_page).await?;
    Ok(Json(page.map(PostView::from)))
}

#[instrument(skip(state))]
pub async fn list_user_posts(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(author): Path<Uuid>,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Page<PostView>>> {
    let page = services::posts_by_user(
        state.users.as_ref(),
        state.posts.as_ref(),
        author,
        q.page,
        state.config.posts_per_page,
    )
    .await?;
    Ok(Json(page.map(PostView::from)))
}

#[instrument(skip(state, body))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<PostRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<PostView>)> {
    let post = services::create(state.posts.as_ref(), user_id, &body.title, &body.content).await?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/posts/{}", post.id))
        .map_err(|e| AppError::Internal(e.into()))?;
    headers.insert(header::LOCATION, location);

    Ok((StatusCode::CREATED, headers, Json(post.into())))
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PostView>> {
    let post = services::get(state.posts.as_ref(), id).await?;
    Ok(Json(post.into()))
}

#[instrument(skip(state, body))]
pub async fn edit_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<PostRequest>,
) -> AppResult<Json<PostView>> {
    let post = services::edit(state.posts.as_ref(), user_id, id, &body.title, &body.content).await?;
    Ok(Json(post.into()))
}

#[instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DeleteResponse>> {
    let body = match services::delete(state.posts.as_ref(), user_id, id).await? {
        DeleteOutcome::Deleted => DeleteResponse {
            deleted: true,
            notice: "Your post has been deleted!".into(),
        },
        DeleteOutcome::NotOwner { notice } => DeleteResponse {
            deleted: false,
            notice: notice.into(),
        },
    };
    Ok(Json(body))
}
