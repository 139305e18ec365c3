use std::collections::{HashMap, HashSet};

use anyhow::anyhow;
use chrono::Utc;
use uuid::Uuid;

use crate::entities::{Comment, CommentId, Post, PostId, User, UserId, UserProfile};
use crate::repositories::{
    CommentRepository, FollowRepository, PostMutation, PostQuery, PostRepository, ProfileMutation,
    ProfileQuery, ProfileRepository, RepositoryError, UserQuery, UserRepository,
};
use crate::utils::{AlsoChain, LetChain};

type Result<T> = ::std::result::Result<T, HandlerError>;

/// Operation failures, mapped 1:1 onto response codes at the route
/// boundary. Everything carries a human-readable detail string.
#[derive(Debug)]
pub enum HandlerError {
    Validation(String),
    NotFound(String),
    Ownership,
    Conflict(String),
    Internal(anyhow::Error),
}

impl ::std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        match self {
            HandlerError::Validation(s) => write!(f, "{}", s),
            HandlerError::NotFound(s) => write!(f, "{}", s),
            HandlerError::Ownership => {
                write!(f, "you do not have permission to perform this action.")
            },
            HandlerError::Conflict(s) => write!(f, "{}", s),
            HandlerError::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl ::std::error::Error for HandlerError {}

#[derive(Debug, Clone)]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
}

impl From<User> for UserSummary {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            display_name: u.display_name,
        }
    }
}

/// Refreshed follow lists returned by follow/unfollow.
#[derive(Debug, Clone)]
pub struct FollowLists {
    pub following: Vec<UserSummary>,
    pub followers: Vec<UserSummary>,
}

#[derive(Debug, Clone)]
pub struct MeView {
    pub user: User,
    pub following: Vec<UserSummary>,
    pub followers: Vec<UserSummary>,
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Clone)]
pub struct ProfileView {
    pub profile: UserProfile,
    pub owner: UserSummary,
}

pub struct Handler {
    pub(crate) user_repository: Box<dyn UserRepository + Sync + Send>,
    pub(crate) follow_repository: Box<dyn FollowRepository + Sync + Send>,
    pub(crate) post_repository: Box<dyn PostRepository + Sync + Send>,
    pub(crate) comment_repository: Box<dyn CommentRepository + Sync + Send>,
    pub(crate) profile_repository: Box<dyn ProfileRepository + Sync + Send>,
}

/// Shared write policy: safe methods are always allowed, unsafe methods
/// require the requester to own the resource.
fn can_write(requester: UserId, owner: UserId) -> bool { requester == owner }

fn ensure_owner(requester: UserId, owner: UserId) -> Result<()> {
    match can_write(requester, owner) {
        true => Ok(()),
        false => Err(HandlerError::Ownership),
    }
}

impl Handler {
    // --- users ---

    #[tracing::instrument(skip(self))]
    pub async fn register_user(&self, email: String, display_name: String) -> Result<User> {
        if email.is_empty() {
            return Err(HandlerError::Validation("email must not be empty.".into()));
        }

        let new_user = User {
            id: self.user_repository.next_id().await.map_err(internal)?,
            email,
            display_name,
            registered_at: Utc::now(),
        };

        let inserted = self
            .user_repository
            .insert(new_user.clone())
            .await
            .map_err(internal)?;

        if !inserted {
            return Err(HandlerError::Conflict(
                "a user with this email already exists.".into(),
            ));
        }

        Ok(new_user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn me(&self, caller: UserId) -> Result<MeView> {
        let user = self.user_repository.find(caller).await.map_err(user_err)?;
        let FollowLists {
            following,
            followers,
        } = self.follow_lists(caller).await?;

        let profile = match self.profile_repository.find_by_user(caller).await {
            Ok(p) => Some(p),
            Err(RepositoryError::NotFound) => None,
            Err(e) => return Err(internal(e)),
        };

        Ok(MeView {
            user,
            following,
            followers,
            profile,
        })
    }

    // --- follow graph ---

    #[tracing::instrument(skip(self))]
    pub async fn follow(&self, caller: UserId, target: UserId) -> Result<FollowLists> {
        if caller == target {
            return Err(HandlerError::Validation(
                "you cannot follow yourself.".into(),
            ));
        }

        // a missing followee is a bad request, not a 404
        if !self
            .user_repository
            .is_exists(target)
            .await
            .map_err(internal)?
        {
            return Err(HandlerError::Validation(
                "the user with the specified id does not exist.".into(),
            ));
        }

        let inserted = self
            .follow_repository
            .insert(crate::entities::FollowEdge {
                follower: caller,
                followee: target,
                followed_at: Utc::now(),
            })
            .await
            .map_err(internal)?;

        if !inserted {
            return Err(HandlerError::Conflict(
                "you are already following this user.".into(),
            ));
        }

        self.follow_lists(caller).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn unfollow(&self, caller: UserId, target: UserId) -> Result<FollowLists> {
        if caller == target {
            return Err(HandlerError::Validation(
                "you cannot unfollow yourself.".into(),
            ));
        }

        let removed = self
            .follow_repository
            .delete(caller, target)
            .await
            .map_err(internal)?;

        if !removed {
            return Err(HandlerError::NotFound(
                "you are not following this user.".into(),
            ));
        }

        self.follow_lists(caller).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn following(&self, user: UserId) -> Result<Vec<UserSummary>> {
        let ids = self
            .follow_repository
            .following_of(user)
            .await
            .map_err(internal)?;

        self.summaries(ids).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn followers(&self, user: UserId) -> Result<Vec<UserSummary>> {
        let ids = self
            .follow_repository
            .followers_of(user)
            .await
            .map_err(internal)?;

        self.summaries(ids).await
    }

    async fn follow_lists(&self, user: UserId) -> Result<FollowLists> {
        FollowLists {
            following: self.following(user).await?,
            followers: self.followers(user).await?,
        }
        .let_(Ok)
    }

    async fn summaries(&self, ids: Vec<UserId>) -> Result<Vec<UserSummary>> {
        let set = ids.iter().copied().collect::<HashSet<_>>();
        let mut by_id = self
            .user_repository
            .finds(UserQuery {
                ids: Some(set),
                ..UserQuery::default()
            })
            .await
            .map_err(internal)?
            .drain(..)
            .map(|u| (u.id, u))
            .collect::<HashMap<_, _>>();

        // keep edge insertion order
        Ok(ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(UserSummary::from)
            .collect())
    }

    // --- posts & visibility ---

    #[tracing::instrument(skip(self))]
    pub async fn create_post(
        &self,
        author: UserId,
        content: String,
        hashtags: Option<String>,
        image: Option<String>,
    ) -> Result<Post> {
        if !self
            .user_repository
            .is_exists(author)
            .await
            .map_err(internal)?
        {
            return Err(HandlerError::Validation("user is not registered.".into()));
        }

        let new_post = Post {
            id: Uuid::new_v4(),
            author,
            content,
            image,
            created_at: Utc::now(),
            hashtags,
            likes: HashSet::new(),
        };

        let inserted = self
            .post_repository
            .insert(new_post.clone())
            .await
            .map_err(internal)?;

        if !inserted {
            return Err(internal(anyhow!("post id collision")));
        }

        Ok(new_post)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_post(&self, id: PostId) -> Result<Post> {
        self.post_repository.find(id).await.map_err(post_err)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_post(
        &self,
        caller: UserId,
        id: PostId,
        mutation: PostMutation,
    ) -> Result<Post> {
        let post = self.post_repository.find(id).await.map_err(post_err)?;
        ensure_owner(caller, post.author)?;

        self.post_repository
            .update(id, mutation)
            .await
            .map_err(post_err)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_post(&self, caller: UserId, id: PostId) -> Result<()> {
        let post = self.post_repository.find(id).await.map_err(post_err)?;
        ensure_owner(caller, post.author)?;

        self.post_repository.delete(id).await.map_err(post_err)?;

        // comments are owned by the post
        let removed = self
            .comment_repository
            .delete_by_post(id)
            .await
            .map_err(internal)?;
        tracing::trace!("cascade removed {} comments", removed);

        Ok(())
    }

    /// Own posts plus posts of followed authors, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn visible_posts(
        &self,
        caller: UserId,
        hashtag_filter: Vec<String>,
    ) -> Result<Vec<Post>> {
        let authors = self
            .follow_repository
            .following_of(caller)
            .await
            .map_err(internal)?
            .drain(..)
            .collect::<HashSet<_>>()
            .also_(|a| {
                a.insert(caller);
            });

        self.post_repository
            .finds(PostQuery {
                authors: Some(authors),
                hashtags: hashtag_filter,
            })
            .await
            .map_err(internal)
    }

    /// Followed authors' posts only; the caller's own are excluded.
    #[tracing::instrument(skip(self))]
    pub async fn following_feed(
        &self,
        caller: UserId,
        hashtag_filter: Vec<String>,
    ) -> Result<Vec<Post>> {
        let authors = self
            .follow_repository
            .following_of(caller)
            .await
            .map_err(internal)?
            .drain(..)
            .collect::<HashSet<_>>();

        self.post_repository
            .finds(PostQuery {
                authors: Some(authors),
                hashtags: hashtag_filter,
            })
            .await
            .map_err(internal)
    }

    /// Set add: a redundant like is a no-op, never an error.
    #[tracing::instrument(skip(self))]
    pub async fn like(&self, caller: UserId, id: PostId) -> Result<Post> {
        self.post_repository
            .insert_like(id, caller)
            .await
            .map_err(post_err)?;

        self.post_repository.find(id).await.map_err(post_err)
    }

    /// Set remove: unliking a never-liked post is a no-op, never an error.
    #[tracing::instrument(skip(self))]
    pub async fn unlike(&self, caller: UserId, id: PostId) -> Result<Post> {
        self.post_repository
            .delete_like(id, caller)
            .await
            .map_err(post_err)?;

        self.post_repository.find(id).await.map_err(post_err)
    }

    // --- comments ---

    #[tracing::instrument(skip(self))]
    pub async fn add_comment(
        &self,
        caller: UserId,
        post: PostId,
        content: String,
    ) -> Result<Comment> {
        // any authenticated user may comment on any post
        self.post_repository.find(post).await.map_err(post_err)?;

        let new_comment = Comment {
            id: Uuid::new_v4(),
            post,
            author: caller,
            content,
            created_at: Utc::now(),
        };

        let inserted = self
            .comment_repository
            .insert(new_comment.clone())
            .await
            .map_err(internal)?;

        if !inserted {
            return Err(internal(anyhow!("comment id collision")));
        }

        Ok(new_comment)
    }

    #[tracing::instrument(skip(self))]
    pub async fn comments_of(&self, post: PostId) -> Result<Vec<Comment>> {
        self.post_repository.find(post).await.map_err(post_err)?;

        self.comment_repository
            .finds_by_post(post)
            .await
            .map_err(internal)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_comment(&self, caller: UserId, id: CommentId) -> Result<()> {
        let comment = self.comment_repository.find(id).await.map_err(comment_err)?;
        ensure_owner(caller, comment.author)?;

        self.comment_repository
            .delete(id)
            .await
            .map_err(comment_err)?;

        Ok(())
    }

    // --- profiles ---

    #[tracing::instrument(skip(self))]
    pub async fn create_profile(
        &self,
        caller: UserId,
        fields: ProfileMutation,
    ) -> Result<UserProfile> {
        if !self
            .user_repository
            .is_exists(caller)
            .await
            .map_err(internal)?
        {
            return Err(HandlerError::Validation("user is not registered.".into()));
        }

        let ProfileMutation {
            first_name,
            last_name,
            bio,
            location,
            birthdate,
            picture,
        } = fields;

        let new_profile = UserProfile {
            user: caller,
            first_name: first_name.unwrap_or_default(),
            last_name: last_name.unwrap_or_default(),
            bio: bio.unwrap_or_default(),
            location: location.unwrap_or_default(),
            birthdate,
            picture,
        };

        let inserted = self
            .profile_repository
            .insert(new_profile.clone())
            .await
            .map_err(internal)?;

        if !inserted {
            return Err(HandlerError::Conflict("user profile already exists.".into()));
        }

        Ok(new_profile)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_profile(&self, user: UserId) -> Result<ProfileView> {
        let profile = self
            .profile_repository
            .find_by_user(user)
            .await
            .map_err(profile_err)?;
        let owner = self.user_repository.find(user).await.map_err(user_err)?;

        Ok(ProfileView {
            profile,
            owner: owner.into(),
        })
    }

    /// Optional case-insensitive substring search on the owner's email.
    #[tracing::instrument(skip(self))]
    pub async fn search_profiles(&self, search: Option<String>) -> Result<Vec<ProfileView>> {
        let users = match search {
            None => None,
            Some(pat) => Some(
                self.user_repository
                    .finds(UserQuery {
                        email_contains: Some(pat),
                        ..UserQuery::default()
                    })
                    .await
                    .map_err(internal)?
                    .iter()
                    .map(|u| u.id)
                    .collect::<HashSet<_>>(),
            ),
        };

        let profiles = self
            .profile_repository
            .finds(ProfileQuery { users })
            .await
            .map_err(internal)?;

        let owners = profiles.iter().map(|p| p.user).collect::<HashSet<_>>();
        let mut by_id = self
            .user_repository
            .finds(UserQuery {
                ids: Some(owners),
                ..UserQuery::default()
            })
            .await
            .map_err(internal)?
            .drain(..)
            .map(|u| (u.id, u))
            .collect::<HashMap<_, _>>();

        Ok(profiles
            .into_iter()
            .filter_map(|p| {
                by_id.remove(&p.user).map(|u| ProfileView {
                    profile: p,
                    owner: u.into(),
                })
            })
            .collect())
    }

    /// Operates on the caller's own profile, resolved implicitly.
    #[tracing::instrument(skip(self))]
    pub async fn update_profile(
        &self,
        caller: UserId,
        mutation: ProfileMutation,
    ) -> Result<UserProfile> {
        self.profile_repository
            .update(caller, mutation)
            .await
            .map_err(profile_err)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_profile(&self, caller: UserId) -> Result<()> {
        self.profile_repository
            .delete(caller)
            .await
            .map_err(profile_err)?;

        Ok(())
    }
}

fn internal<E>(e: E) -> HandlerError
where E: Into<anyhow::Error> {
    HandlerError::Internal(e.into())
}

fn user_err(e: RepositoryError) -> HandlerError {
    match e {
        RepositoryError::NotFound => {
            HandlerError::NotFound("cannot find user. not registered?".into())
        },
        e => internal(e),
    }
}

fn post_err(e: RepositoryError) -> HandlerError {
    match e {
        RepositoryError::NotFound => HandlerError::NotFound("cannot find post.".into()),
        e => internal(e),
    }
}

fn comment_err(e: RepositoryError) -> HandlerError {
    match e {
        RepositoryError::NotFound => HandlerError::NotFound("cannot find comment.".into()),
        e => internal(e),
    }
}

fn profile_err(e: RepositoryError) -> HandlerError {
    match e {
        RepositoryError::NotFound => {
            HandlerError::NotFound("user profile does not exist.".into())
        },
        e => internal(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory;

    async fn user(h: &Handler, email: &str) -> User {
        h.register_user(email.to_string(), email.split('@').next().unwrap().to_string())
            .await
            .unwrap()
    }

    fn ids(posts: &[Post]) -> Vec<PostId> { posts.iter().map(|p| p.id).collect() }

    #[tokio::test]
    async fn self_follow_is_rejected_and_creates_nothing() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;

        let err = h.follow(a.id, a.id).await.unwrap_err();
        assert!(matches!(err, HandlerError::Validation(_)));
        assert!(h.following(a.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn follow_unknown_target_is_a_bad_request() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;

        let err = h.follow(a.id, 999).await.unwrap_err();
        assert!(matches!(err, HandlerError::Validation(_)));
    }

    #[tokio::test]
    async fn double_follow_conflicts_and_keeps_one_edge() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;
        let b = user(&h, "b@test.com").await;

        let lists = h.follow(a.id, b.id).await.unwrap();
        assert_eq!(lists.following.len(), 1);
        assert_eq!(lists.following[0].email, "b@test.com");

        let err = h.follow(a.id, b.id).await.unwrap_err();
        assert!(matches!(err, HandlerError::Conflict(_)));
        assert_eq!(h.following(a.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unfollow_removes_edge_from_both_lists() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;
        let b = user(&h, "b@test.com").await;

        h.follow(a.id, b.id).await.unwrap();
        let lists = h.unfollow(a.id, b.id).await.unwrap();

        assert!(lists.following.is_empty());
        assert!(h.followers(b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unfollow_without_edge_is_not_found() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;
        let b = user(&h, "b@test.com").await;

        let err = h.unfollow(a.id, b.id).await.unwrap_err();
        assert!(matches!(err, HandlerError::NotFound(_)));
    }

    #[tokio::test]
    async fn visible_posts_cover_own_and_followed_authors_only() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;
        let b = user(&h, "b@test.com").await;
        let c = user(&h, "c@test.com").await;

        let mine = h.create_post(a.id, "mine".into(), None, None).await.unwrap();
        let followed = h.create_post(b.id, "followed".into(), None, None).await.unwrap();
        let stranger = h.create_post(c.id, "stranger".into(), None, None).await.unwrap();

        h.follow(a.id, b.id).await.unwrap();

        let visible = h.visible_posts(a.id, vec![]).await.unwrap();
        let visible_ids = ids(&visible);
        assert!(visible_ids.contains(&mine.id));
        assert!(visible_ids.contains(&followed.id));
        assert!(!visible_ids.contains(&stranger.id));
    }

    #[tokio::test]
    async fn visible_posts_are_newest_first() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;

        let first = h.create_post(a.id, "first".into(), None, None).await.unwrap();
        let second = h.create_post(a.id, "second".into(), None, None).await.unwrap();

        let visible = h.visible_posts(a.id, vec![]).await.unwrap();
        assert_eq!(ids(&visible), vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn hashtag_filter_uses_literal_substring_semantics() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;

        let exact = h
            .create_post(a.id, "p1".into(), Some("#cat#dog".into()), None)
            .await
            .unwrap();
        let prefix = h
            .create_post(a.id, "p2".into(), Some("#category".into()), None)
            .await
            .unwrap();
        h.create_post(a.id, "p3".into(), Some("#dog".into()), None)
            .await
            .unwrap();

        let matched = h.visible_posts(a.id, vec!["cat".into()]).await.unwrap();
        let matched_ids = ids(&matched);
        assert_eq!(matched_ids.len(), 2);
        assert!(matched_ids.contains(&exact.id));
        // substring, not tag equality: "cat" also hits "#category"
        assert!(matched_ids.contains(&prefix.id));

        let both = h
            .visible_posts(a.id, vec!["cat".into(), "dog".into()])
            .await
            .unwrap();
        assert_eq!(ids(&both), vec![exact.id]);
    }

    #[tokio::test]
    async fn like_and_unlike_are_idempotent() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;
        let p = h.create_post(a.id, "p".into(), None, None).await.unwrap();

        let liked = h.like(a.id, p.id).await.unwrap();
        assert_eq!(liked.likes.len(), 1);
        let liked_again = h.like(a.id, p.id).await.unwrap();
        assert_eq!(liked_again.likes.len(), 1);

        let unliked = h.unlike(a.id, p.id).await.unwrap();
        assert!(unliked.likes.is_empty());
        // never-liked unlike is a no-op, not an error
        let unliked_again = h.unlike(a.id, p.id).await.unwrap();
        assert!(unliked_again.likes.is_empty());
    }

    #[tokio::test]
    async fn only_the_author_can_update_or_delete_a_post() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;
        let b = user(&h, "b@test.com").await;
        let p = h.create_post(a.id, "p".into(), None, None).await.unwrap();

        let mutation = PostMutation {
            content: Some("edited".into()),
            ..PostMutation::default()
        };
        let err = h.update_post(b.id, p.id, mutation.clone()).await.unwrap_err();
        assert!(matches!(err, HandlerError::Ownership));

        let err = h.delete_post(b.id, p.id).await.unwrap_err();
        assert!(matches!(err, HandlerError::Ownership));

        let updated = h.update_post(a.id, p.id, mutation).await.unwrap();
        assert_eq!(updated.content, "edited");
        h.delete_post(a.id, p.id).await.unwrap();
        assert!(matches!(
            h.get_post(p.id).await.unwrap_err(),
            HandlerError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn update_with_no_fields_returns_the_record_unchanged() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;
        let p = h
            .create_post(a.id, "p".into(), Some("#x".into()), None)
            .await
            .unwrap();

        let same = h
            .update_post(a.id, p.id, PostMutation::default())
            .await
            .unwrap();
        assert_eq!(same.content, "p");
        assert_eq!(same.hashtags.as_deref(), Some("#x"));

        h.create_profile(
            a.id,
            ProfileMutation {
                bio: Some("hi".into()),
                ..ProfileMutation::default()
            },
        )
        .await
        .unwrap();
        let same = h
            .update_profile(a.id, ProfileMutation::default())
            .await
            .unwrap();
        assert_eq!(same.bio, "hi");
    }

    #[tokio::test]
    async fn deleting_a_post_cascades_its_comments() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;
        let b = user(&h, "b@test.com").await;
        let p = h.create_post(a.id, "p".into(), None, None).await.unwrap();

        let c = h.add_comment(b.id, p.id, "nice".into()).await.unwrap();
        assert_eq!(h.comments_of(p.id).await.unwrap().len(), 1);

        h.delete_post(a.id, p.id).await.unwrap();
        assert!(matches!(
            h.delete_comment(b.id, c.id).await.unwrap_err(),
            HandlerError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn comments_are_open_to_everyone_but_deletable_by_author_only() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;
        let b = user(&h, "b@test.com").await;
        let p = h.create_post(a.id, "p".into(), None, None).await.unwrap();

        // no follow relationship required to comment
        let c = h.add_comment(b.id, p.id, "hello".into()).await.unwrap();

        let err = h.delete_comment(a.id, c.id).await.unwrap_err();
        assert!(matches!(err, HandlerError::Ownership));
        h.delete_comment(b.id, c.id).await.unwrap();
    }

    #[tokio::test]
    async fn second_profile_for_the_same_user_conflicts() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;

        h.create_profile(a.id, ProfileMutation::default())
            .await
            .unwrap();
        let err = h
            .create_profile(a.id, ProfileMutation::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Conflict(_)));

        assert_eq!(h.search_profiles(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn profile_search_matches_owner_email_substring() {
        let h = in_memory();
        let a = user(&h, "alice@test.com").await;
        let b = user(&h, "bob@test.com").await;
        h.create_profile(a.id, ProfileMutation::default())
            .await
            .unwrap();
        h.create_profile(b.id, ProfileMutation::default())
            .await
            .unwrap();

        let found = h.search_profiles(Some("ALICE".into())).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].owner.email, "alice@test.com");
    }

    #[tokio::test]
    async fn profile_mutation_is_caller_scoped() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;
        let b = user(&h, "b@test.com").await;
        h.create_profile(a.id, ProfileMutation::default())
            .await
            .unwrap();

        // b has no profile; the implicit own-profile resolution fails
        let err = h
            .update_profile(
                b.id,
                ProfileMutation {
                    bio: Some("hi".into()),
                    ..ProfileMutation::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::NotFound(_)));

        let updated = h
            .update_profile(
                a.id,
                ProfileMutation {
                    bio: Some("hi".into()),
                    ..ProfileMutation::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.bio, "hi");

        h.delete_profile(a.id).await.unwrap();
        assert!(matches!(
            h.get_profile(a.id).await.unwrap_err(),
            HandlerError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn duplicate_email_registration_conflicts() {
        let h = in_memory();
        user(&h, "a@test.com").await;

        let err = h
            .register_user("a@test.com".into(), "again".into())
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Conflict(_)));
    }

    #[tokio::test]
    async fn following_feed_excludes_own_posts_and_honors_filter() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;
        let b = user(&h, "b@test.com").await;

        h.follow(a.id, b.id).await.unwrap();
        h.create_post(a.id, "mine".into(), Some("#travel".into()), None)
            .await
            .unwrap();
        let travel = h
            .create_post(b.id, "trip".into(), Some("#travel".into()), None)
            .await
            .unwrap();

        let feed = h.following_feed(a.id, vec!["travel".into()]).await.unwrap();
        assert_eq!(ids(&feed), vec![travel.id]);

        let empty = h.following_feed(a.id, vec!["nature".into()]).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn me_view_carries_lists_and_optional_profile() {
        let h = in_memory();
        let a = user(&h, "a@test.com").await;
        let b = user(&h, "b@test.com").await;
        h.follow(b.id, a.id).await.unwrap();

        let view = h.me(a.id).await.unwrap();
        assert!(view.following.is_empty());
        assert_eq!(view.followers.len(), 1);
        assert!(view.profile.is_none());

        h.create_profile(a.id, ProfileMutation::default())
            .await
            .unwrap();
        assert!(h.me(a.id).await.unwrap().profile.is_some());
    }
}
