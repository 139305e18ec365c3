use std::collections::HashSet;

use async_trait::async_trait;

use crate::entities::{Comment, CommentId, FollowEdge, Post, PostId, User, UserId, UserProfile};

pub(crate) mod mock;
pub(crate) mod mongo;

type Result<T> = ::std::result::Result<T, RepositoryError>;

#[async_trait]
pub(crate) trait UserRepository {
    /// Returns `false` when the id or email is already taken.
    async fn insert(&self, item: User) -> Result<bool>;
    async fn is_exists(&self, id: UserId) -> Result<bool>;

    async fn find(&self, id: UserId) -> Result<User>;
    async fn finds(&self, query: UserQuery) -> Result<Vec<User>>;

    /// Allocates the next user id. Must be atomic against concurrent callers.
    async fn next_id(&self) -> Result<UserId>;
}

#[async_trait]
pub(crate) trait FollowRepository {
    /// Returns `false` when the `(follower, followee)` pair already exists.
    async fn insert(&self, edge: FollowEdge) -> Result<bool>;
    /// Returns `false` when no such edge exists.
    async fn delete(&self, follower: UserId, followee: UserId) -> Result<bool>;

    async fn following_of(&self, user: UserId) -> Result<Vec<UserId>>;
    async fn followers_of(&self, user: UserId) -> Result<Vec<UserId>>;
}

#[async_trait]
pub(crate) trait PostRepository {
    async fn insert(&self, item: Post) -> Result<bool>;

    async fn find(&self, id: PostId) -> Result<Post>;
    /// Matches are always ordered by `created_at` descending.
    async fn finds(&self, query: PostQuery) -> Result<Vec<Post>>;

    async fn update(&self, id: PostId, mutation: PostMutation) -> Result<Post>;

    async fn insert_like(&self, id: PostId, user_id: UserId) -> Result<bool>;
    async fn delete_like(&self, id: PostId, user_id: UserId) -> Result<bool>;

    async fn delete(&self, id: PostId) -> Result<Post>;
}

#[async_trait]
pub(crate) trait CommentRepository {
    async fn insert(&self, item: Comment) -> Result<bool>;

    async fn find(&self, id: CommentId) -> Result<Comment>;
    /// Ordered by `created_at` ascending.
    async fn finds_by_post(&self, post: PostId) -> Result<Vec<Comment>>;

    async fn delete(&self, id: CommentId) -> Result<Comment>;
    /// Cascade helper; returns the number of comments removed.
    async fn delete_by_post(&self, post: PostId) -> Result<u64>;
}

#[async_trait]
pub(crate) trait ProfileRepository {
    /// Returns `false` when the user already has a profile.
    async fn insert(&self, item: UserProfile) -> Result<bool>;

    async fn find_by_user(&self, user: UserId) -> Result<UserProfile>;
    async fn finds(&self, query: ProfileQuery) -> Result<Vec<UserProfile>>;

    async fn update(&self, user: UserId, mutation: ProfileMutation) -> Result<UserProfile>;
    async fn delete(&self, user: UserId) -> Result<UserProfile>;
}

#[derive(Debug, Clone, Default)]
pub(crate) struct UserQuery {
    pub(crate) ids: Option<HashSet<UserId>>,
    pub(crate) email_contains: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PostQuery {
    pub(crate) authors: Option<HashSet<UserId>>,
    /// Conjunctive: each token `t` keeps only posts whose hashtag blob
    /// contains the literal substring `#t`.
    pub(crate) hashtags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ProfileQuery {
    pub(crate) users: Option<HashSet<UserId>>,
}

#[derive(Debug, Clone, Default)]
pub struct PostMutation {
    pub content: Option<String>,
    pub hashtags: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileMutation {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub birthdate: Option<chrono::NaiveDate>,
    pub picture: Option<String>,
}

#[derive(Debug)]
pub(crate) enum RepositoryError {
    NotFound,
    NoUnique { matched: u32 },
    Internal(anyhow::Error),
}

impl ::std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        match self {
            RepositoryError::NotFound => write!(f, "cannot find object."),
            RepositoryError::NoUnique { matched } => write!(
                f,
                "expected unique object, found non-unique objects (matched: {})",
                matched
            ),
            RepositoryError::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl ::std::error::Error for RepositoryError {}

/// Substring filter the visibility engine is built around: a token matches
/// when `#token` appears anywhere in the blob, so `cat` also matches
/// `#category`.
pub(crate) fn hashtag_blob_matches(blob: Option<&str>, tokens: &[String]) -> bool {
    let blob = blob.unwrap_or("");
    tokens.iter().all(|t| blob.contains(&format!("#{}", t)))
}
