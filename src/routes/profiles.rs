use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ApiResult, AppState, AuthUser};
use crate::entities::{UserId, UserProfile};
use crate::handlers::ProfileView;
use crate::repositories::ProfileMutation;

#[derive(Debug, Serialize)]
pub(super) struct ProfileBody {
    user: UserId,
    email: String,
    first_name: String,
    last_name: String,
    bio: String,
    location: String,
    birthdate: Option<NaiveDate>,
    picture: Option<String>,
}

impl From<ProfileView> for ProfileBody {
    fn from(ProfileView { profile, owner }: ProfileView) -> Self {
        Self {
            user: profile.user,
            email: owner.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            bio: profile.bio,
            location: profile.location,
            birthdate: profile.birthdate,
            picture: profile.picture,
        }
    }
}

/// Body without the owner join, for caller-scoped endpoints.
#[derive(Debug, Serialize)]
pub(super) struct OwnProfileBody {
    user: UserId,
    first_name: String,
    last_name: String,
    bio: String,
    location: String,
    birthdate: Option<NaiveDate>,
    picture: Option<String>,
}

impl From<UserProfile> for OwnProfileBody {
    fn from(p: UserProfile) -> Self {
        Self {
            user: p.user,
            first_name: p.first_name,
            last_name: p.last_name,
            bio: p.bio,
            location: p.location,
            birthdate: p.birthdate,
            picture: p.picture,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ProfileFieldsBody {
    first_name: Option<String>,
    last_name: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    birthdate: Option<NaiveDate>,
    picture: Option<String>,
}

impl From<ProfileFieldsBody> for ProfileMutation {
    fn from(b: ProfileFieldsBody) -> Self {
        Self {
            first_name: b.first_name,
            last_name: b.last_name,
            bio: b.bio,
            location: b.location,
            birthdate: b.birthdate,
            picture: b.picture,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchParams {
    search: Option<String>,
}

pub(super) async fn list(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<ProfileBody>>> {
    let profiles = state.search_profiles(params.search).await?;

    Ok(Json(profiles.into_iter().map(Into::into).collect()))
}

pub(super) async fn create(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(body): Json<ProfileFieldsBody>,
) -> ApiResult<(StatusCode, Json<OwnProfileBody>)> {
    let profile = state.create_profile(caller, body.into()).await?;

    Ok((StatusCode::CREATED, Json(profile.into())))
}

pub(super) async fn detail(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(user): Path<UserId>,
) -> ApiResult<Json<ProfileBody>> {
    let profile = state.get_profile(user).await?;

    Ok(Json(profile.into()))
}

pub(super) async fn own(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<ProfileBody>> {
    let profile = state.get_profile(caller).await?;

    Ok(Json(profile.into()))
}

pub(super) async fn update(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(body): Json<ProfileFieldsBody>,
) -> ApiResult<Json<OwnProfileBody>> {
    let profile = state.update_profile(caller, body.into()).await?;

    Ok(Json(profile.into()))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> ApiResult<StatusCode> {
    state.delete_profile(caller).await?;

    Ok(StatusCode::NO_CONTENT)
}
