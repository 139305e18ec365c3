use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ApiResult, AppState, AuthUser};
use crate::entities::{Post, PostId, UserId};
use crate::repositories::PostMutation;

#[derive(Debug, Serialize)]
pub(super) struct PostBody {
    id: PostId,
    author: UserId,
    content: String,
    image: Option<String>,
    created_at: DateTime<Utc>,
    hashtags: Option<String>,
    likes: usize,
}

impl From<Post> for PostBody {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            author: p.author,
            content: p.content,
            image: p.image,
            created_at: p.created_at,
            hashtags: p.hashtags,
            likes: p.likes.len(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CreatePostBody {
    content: String,
    hashtags: Option<String>,
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdatePostBody {
    content: Option<String>,
    hashtags: Option<String>,
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FeedParams {
    hashtags: Option<String>,
}

impl FeedParams {
    /// `?hashtags=a,b` into filter tokens. Empty segments survive and
    /// become a bare `#` substring filter, matching any tagged post; an
    /// empty parameter is no filter at all.
    fn tokens(self) -> Vec<String> {
        self.hashtags
            .filter(|raw| !raw.is_empty())
            .map(|raw| raw.split(',').map(str::to_string).collect())
            .unwrap_or_default()
    }
}

fn bodies(posts: Vec<Post>) -> Vec<PostBody> { posts.into_iter().map(Into::into).collect() }

pub(super) async fn list(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(params): Query<FeedParams>,
) -> ApiResult<Json<Vec<PostBody>>> {
    let posts = state.visible_posts(caller, params.tokens()).await?;

    Ok(Json(bodies(posts)))
}

pub(super) async fn following_feed(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(params): Query<FeedParams>,
) -> ApiResult<Json<Vec<PostBody>>> {
    let posts = state.following_feed(caller, params.tokens()).await?;

    Ok(Json(bodies(posts)))
}

pub(super) async fn create(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(body): Json<CreatePostBody>,
) -> ApiResult<(StatusCode, Json<PostBody>)> {
    let post = state
        .create_post(caller, body.content, body.hashtags, body.image)
        .await?;

    Ok((StatusCode::CREATED, Json(post.into())))
}

pub(super) async fn detail(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(id): Path<PostId>,
) -> ApiResult<Json<PostBody>> {
    let post = state.get_post(id).await?;

    Ok(Json(post.into()))
}

pub(super) async fn update(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<PostId>,
    Json(body): Json<UpdatePostBody>,
) -> ApiResult<Json<PostBody>> {
    let mutation = PostMutation {
        content: body.content,
        hashtags: body.hashtags,
        image: body.image,
    };
    let post = state.update_post(caller, id, mutation).await?;

    Ok(Json(post.into()))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<PostId>,
) -> ApiResult<StatusCode> {
    state.delete_post(caller, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn like(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<PostId>,
) -> ApiResult<Json<PostBody>> {
    let post = state.like(caller, id).await?;

    Ok(Json(post.into()))
}

pub(super) async fn unlike(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<PostId>,
) -> ApiResult<Json<PostBody>> {
    let post = state.unlike(caller, id).await?;

    Ok(Json(post.into()))
}
