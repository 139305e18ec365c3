use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::entities::UserId;
use crate::handlers::{Handler, HandlerError};

mod comments;
mod follow;
mod posts;
mod profiles;
mod users;

pub(crate) type AppState = Arc<Handler>;

pub fn router(handler: Handler) -> Router {
    Router::new()
        .route("/users", post(users::register))
        .route("/users/me", get(users::me))
        .route("/users/me/following", get(users::following))
        .route("/users/me/followers", get(users::followers))
        .route("/follow/:id", post(follow::follow))
        .route("/unfollow/:id", delete(follow::unfollow))
        .route("/posts", get(posts::list).post(posts::create))
        .route("/posts/following", get(posts::following_feed))
        .route(
            "/posts/:id",
            get(posts::detail).patch(posts::update).delete(posts::remove),
        )
        .route("/posts/:id/like", post(posts::like))
        .route("/posts/:id/unlike", post(posts::unlike))
        .route(
            "/posts/:id/comments",
            get(comments::list).post(comments::create),
        )
        .route("/comments/:id", delete(comments::remove))
        .route("/profiles", get(profiles::list).post(profiles::create))
        .route("/profiles/:id", get(profiles::detail))
        .route(
            "/profile",
            get(profiles::own).patch(profiles::update).delete(profiles::remove),
        )
        .with_state(Arc::new(handler))
}

#[derive(Debug, Serialize)]
pub(crate) struct Detail {
    pub(crate) detail: String,
}

impl Detail {
    pub(crate) fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

pub(crate) type ApiResult<T> = ::std::result::Result<T, ApiError>;

/// Boundary wrapper turning `HandlerError` into a 4xx/5xx JSON response.
pub(crate) struct ApiError(HandlerError);

impl From<HandlerError> for ApiError {
    fn from(e: HandlerError) -> Self { Self(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            HandlerError::Validation(_) => StatusCode::BAD_REQUEST,
            HandlerError::NotFound(_) => StatusCode::NOT_FOUND,
            HandlerError::Ownership => StatusCode::FORBIDDEN,
            HandlerError::Conflict(_) => StatusCode::CONFLICT,
            HandlerError::Internal(e) => {
                tracing::error!("handler failed: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            },
        };

        let detail = match &self.0 {
            HandlerError::Internal(_) => "internal server error.".to_string(),
            e => e.to_string(),
        };

        (status, Json(Detail::new(detail))).into_response()
    }
}

/// The authenticated principal, injected upstream as `x-user-id`.
/// Token verification itself is out of scope for this service.
pub(crate) struct AuthUser(pub(crate) UserId);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where S: Send + Sync
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> ::std::result::Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<UserId>().ok())
            .map(AuthUser)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(Detail::new("authentication credentials were not provided.")),
                )
                    .into_response()
            })
    }
}
