use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{ApiResult, AppState, AuthUser};
use crate::entities::{User, UserId, UserProfile};
use crate::handlers::{MeView, UserSummary};

#[derive(Debug, Serialize)]
pub(super) struct UserSummaryBody {
    pub(super) id: UserId,
    pub(super) email: String,
    pub(super) display_name: String,
}

impl From<UserSummary> for UserSummaryBody {
    fn from(s: UserSummary) -> Self {
        Self {
            id: s.id,
            email: s.email,
            display_name: s.display_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct UserBody {
    id: UserId,
    email: String,
    display_name: String,
    registered_at: DateTime<Utc>,
}

impl From<User> for UserBody {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            display_name: u.display_name,
            registered_at: u.registered_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ProfileFieldsBody {
    first_name: String,
    last_name: String,
    bio: String,
    location: String,
    birthdate: Option<NaiveDate>,
    picture: Option<String>,
}

impl From<UserProfile> for ProfileFieldsBody {
    fn from(p: UserProfile) -> Self {
        Self {
            first_name: p.first_name,
            last_name: p.last_name,
            bio: p.bio,
            location: p.location,
            birthdate: p.birthdate,
            picture: p.picture,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct MeBody {
    #[serde(flatten)]
    user: UserBody,
    following: Vec<UserSummaryBody>,
    followers: Vec<UserSummaryBody>,
    profile: Option<ProfileFieldsBody>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RegisterUserBody {
    email: String,
    display_name: String,
}

pub(super) async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterUserBody>,
) -> ApiResult<(StatusCode, Json<UserBody>)> {
    let user = state.register_user(body.email, body.display_name).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub(super) async fn me(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<MeBody>> {
    let MeView {
        user,
        following,
        followers,
        profile,
    } = state.me(caller).await?;

    Ok(Json(MeBody {
        user: user.into(),
        following: following.into_iter().map(Into::into).collect(),
        followers: followers.into_iter().map(Into::into).collect(),
        profile: profile.map(Into::into),
    }))
}

pub(super) async fn following(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<Vec<UserSummaryBody>>> {
    let list = state.following(caller).await?;

    Ok(Json(list.into_iter().map(Into::into).collect()))
}

pub(super) async fn followers(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<Vec<UserSummaryBody>>> {
    let list = state.followers(caller).await?;

    Ok(Json(list.into_iter().map(Into::into).collect()))
}
