use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ApiResult, AppState, AuthUser};
use crate::entities::{Comment, CommentId, PostId, UserId};

#[derive(Debug, Serialize)]
pub(super) struct CommentBody {
    id: CommentId,
    post: PostId,
    author: UserId,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<Comment> for CommentBody {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            post: c.post,
            author: c.author,
            content: c.content,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateCommentBody {
    content: String,
}

pub(super) async fn list(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(post): Path<PostId>,
) -> ApiResult<Json<Vec<CommentBody>>> {
    let comments = state.comments_of(post).await?;

    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

pub(super) async fn create(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(post): Path<PostId>,
    Json(body): Json<CreateCommentBody>,
) -> ApiResult<(StatusCode, Json<CommentBody>)> {
    let comment = state.add_comment(caller, post, body.content).await?;

    Ok((StatusCode::CREATED, Json(comment.into())))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<CommentId>,
) -> ApiResult<StatusCode> {
    state.delete_comment(caller, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
