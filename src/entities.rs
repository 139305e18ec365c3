use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

pub type UserId = u64;
pub type PostId = Uuid;
pub type CommentId = Uuid;

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub registered_at: DateTime<Utc>,
}

/// Directed edge: `follower` sees `followee`'s posts.
#[derive(Debug, Clone)]
pub struct FollowEdge {
    pub follower: UserId,
    pub followee: UserId,
    pub followed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: PostId,
    pub author: UserId,
    pub content: String,
    /// Opaque ref to an externally stored image.
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Free-form blob expected to hold zero or more `#token` substrings.
    /// Never validated; duplicates and malformed tags pass through silently.
    pub hashtags: Option<String>,
    pub likes: HashSet<UserId>,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: CommentId,
    pub post: PostId,
    pub author: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user: UserId,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub location: String,
    pub birthdate: Option<NaiveDate>,
    pub picture: Option<String>,
}
