use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use super::users::UserSummaryBody;
use super::{ApiResult, AppState, AuthUser};
use crate::entities::UserId;
use crate::handlers::FollowLists;

#[derive(Debug, Serialize)]
pub(super) struct FollowListsBody {
    detail: String,
    following: Vec<UserSummaryBody>,
    followers: Vec<UserSummaryBody>,
}

impl FollowListsBody {
    fn new(detail: &str, lists: FollowLists) -> Self {
        Self {
            detail: detail.to_string(),
            following: lists.following.into_iter().map(Into::into).collect(),
            followers: lists.followers.into_iter().map(Into::into).collect(),
        }
    }
}

pub(super) async fn follow(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<UserId>,
) -> ApiResult<(StatusCode, Json<FollowListsBody>)> {
    let lists = state.follow(caller, id).await?;

    Ok((
        StatusCode::CREATED,
        Json(FollowListsBody::new("successfully followed.", lists)),
    ))
}

pub(super) async fn unfollow(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<UserId>,
) -> ApiResult<Json<FollowListsBody>> {
    let lists = state.unfollow(caller, id).await?;

    Ok(Json(FollowListsBody::new("successfully unfollowed.", lists)))
}
