use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    hashtag_blob_matches, CommentRepository, FollowRepository, PostMutation, PostQuery,
    PostRepository, ProfileMutation, ProfileQuery, ProfileRepository, RepositoryError, Result,
    UserQuery, UserRepository,
};
use crate::entities::{Comment, CommentId, FollowEdge, Post, PostId, User, UserId, UserProfile};

/// Test/development backend. The uniqueness rules the mongo backend gets
/// from unique indexes are checked here explicitly before pushing.
pub struct InMemoryRepository<T>(Mutex<Vec<T>>);

impl<T> InMemoryRepository<T> {
    pub fn new() -> Self { Self(Mutex::new(vec![])) }
}
impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self { Self::new() }
}

#[inline]
fn find_ref<T, P>(v: &[T], predicate: P) -> Result<&T>
where P: FnMut(&&T) -> bool {
    let mut res = v.iter().filter(predicate).collect::<Vec<_>>();
    tracing::trace!("found - {}", res.len());

    match res.len() {
        0 => Err(RepositoryError::NotFound),
        1 => Ok(res.remove(0)),
        i => Err(RepositoryError::NoUnique { matched: i as u32 }),
    }
}

#[inline]
fn find_mut<T, P>(v: &mut Vec<T>, predicate: P) -> Result<&mut T>
where P: FnMut(&&mut T) -> bool {
    let mut res = v.iter_mut().filter(predicate).collect::<Vec<_>>();
    tracing::trace!("found - {}", res.len());

    match res.len() {
        0 => Err(RepositoryError::NotFound),
        1 => Ok(res.remove(0)),
        i => Err(RepositoryError::NoUnique { matched: i as u32 }),
    }
}

#[inline]
fn remove_one<T, P>(v: &mut Vec<T>, predicate: P) -> Result<T>
where P: Fn(&T) -> bool {
    let mut indexes = v
        .iter()
        .enumerate()
        .filter_map(|(i, item)| predicate(item).then_some(i))
        .collect::<Vec<_>>();

    match indexes.len() {
        0 => Err(RepositoryError::NotFound),
        1 => Ok(v.remove(indexes.remove(0))),
        i => Err(RepositoryError::NoUnique { matched: i as u32 }),
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository<User> {
    async fn insert(&self, item: User) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id || v.email == item.email) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn is_exists(&self, id: UserId) -> Result<bool> {
        let guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == id) {
            Ok(_) => Ok(true),
            Err(RepositoryError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn find(&self, id: UserId) -> Result<User> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn finds(&self, UserQuery { ids, email_contains }: UserQuery) -> Result<Vec<User>> {
        Ok(self
            .0
            .lock()
            .await
            .iter()
            .filter(|u| ids.as_ref().map(|s| s.contains(&u.id)).unwrap_or(true))
            .filter(|u| {
                email_contains
                    .as_ref()
                    .map(|s| u.email.to_lowercase().contains(&s.to_lowercase()))
                    .unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    async fn next_id(&self) -> Result<UserId> {
        let guard = self.0.lock().await;

        Ok(guard.iter().map(|u| u.id).max().unwrap_or(0) + 1)
    }
}

#[async_trait]
impl FollowRepository for InMemoryRepository<FollowEdge> {
    async fn insert(&self, edge: FollowEdge) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| {
            v.follower == edge.follower && v.followee == edge.followee
        }) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(edge);
        Ok(true)
    }

    async fn delete(&self, follower: UserId, followee: UserId) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match remove_one(&mut guard, |v| {
            v.follower == follower && v.followee == followee
        }) {
            Ok(_) => Ok(true),
            Err(RepositoryError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn following_of(&self, user: UserId) -> Result<Vec<UserId>> {
        Ok(self
            .0
            .lock()
            .await
            .iter()
            .filter(|e| e.follower == user)
            .map(|e| e.followee)
            .collect())
    }

    async fn followers_of(&self, user: UserId) -> Result<Vec<UserId>> {
        Ok(self
            .0
            .lock()
            .await
            .iter()
            .filter(|e| e.followee == user)
            .map(|e| e.follower)
            .collect())
    }
}

#[async_trait]
impl PostRepository for InMemoryRepository<Post> {
    async fn insert(&self, item: Post) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find(&self, id: PostId) -> Result<Post> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn finds(&self, PostQuery { authors, hashtags }: PostQuery) -> Result<Vec<Post>> {
        let mut matched = self
            .0
            .lock()
            .await
            .iter()
            .filter(|p| {
                authors
                    .as_ref()
                    .map(|s| s.contains(&p.author))
                    .unwrap_or(true)
            })
            .filter(|p| hashtag_blob_matches(p.hashtags.as_deref(), &hashtags))
            .cloned()
            .collect::<Vec<_>>();

        // stable sort keeps insertion order within equal timestamps
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn update(&self, id: PostId, mutation: PostMutation) -> Result<Post> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        let PostMutation {
            content,
            hashtags,
            image,
        } = mutation;
        if let Some(val) = content {
            item.content = val;
        }
        if let Some(val) = hashtags {
            item.hashtags = Some(val);
        }
        if let Some(val) = image {
            item.image = Some(val);
        }

        Ok(item.clone())
    }

    async fn insert_like(&self, id: PostId, user_id: UserId) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        Ok(item.likes.insert(user_id))
    }

    async fn delete_like(&self, id: PostId, user_id: UserId) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        Ok(item.likes.remove(&user_id))
    }

    async fn delete(&self, id: PostId) -> Result<Post> {
        let mut guard = self.0.lock().await;

        remove_one(&mut guard, |v| v.id == id)
    }
}

#[async_trait]
impl CommentRepository for InMemoryRepository<Comment> {
    async fn insert(&self, item: Comment) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find(&self, id: CommentId) -> Result<Comment> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn finds_by_post(&self, post: PostId) -> Result<Vec<Comment>> {
        let mut matched = self
            .0
            .lock()
            .await
            .iter()
            .filter(|c| c.post == post)
            .cloned()
            .collect::<Vec<_>>();

        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matched)
    }

    async fn delete(&self, id: CommentId) -> Result<Comment> {
        let mut guard = self.0.lock().await;

        remove_one(&mut guard, |v| v.id == id)
    }

    async fn delete_by_post(&self, post: PostId) -> Result<u64> {
        let mut guard = self.0.lock().await;
        let before = guard.len();

        guard.retain(|c| c.post != post);
        Ok((before - guard.len()) as u64)
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository<UserProfile> {
    async fn insert(&self, item: UserProfile) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.user == item.user) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find_by_user(&self, user: UserId) -> Result<UserProfile> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.user == user)?.clone())
    }

    async fn finds(&self, ProfileQuery { users }: ProfileQuery) -> Result<Vec<UserProfile>> {
        Ok(self
            .0
            .lock()
            .await
            .iter()
            .filter(|p| users.as_ref().map(|s| s.contains(&p.user)).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn update(&self, user: UserId, mutation: ProfileMutation) -> Result<UserProfile> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.user == user)?;

        let ProfileMutation {
            first_name,
            last_name,
            bio,
            location,
            birthdate,
            picture,
        } = mutation;
        if let Some(val) = first_name {
            item.first_name = val;
        }
        if let Some(val) = last_name {
            item.last_name = val;
        }
        if let Some(val) = bio {
            item.bio = val;
        }
        if let Some(val) = location {
            item.location = val;
        }
        if let Some(val) = birthdate {
            item.birthdate = Some(val);
        }
        if let Some(val) = picture {
            item.picture = Some(val);
        }

        Ok(item.clone())
    }

    async fn delete(&self, user: UserId) -> Result<UserProfile> {
        let mut guard = self.0.lock().await;

        remove_one(&mut guard, |v| v.user == user)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn edge(follower: UserId, followee: UserId) -> FollowEdge {
        FollowEdge {
            follower,
            followee,
            followed_at: Utc::now(),
        }
    }

    fn post(author: UserId, hashtags: Option<&str>) -> Post {
        Post {
            id: Uuid::new_v4(),
            author,
            content: "hello".to_string(),
            image: None,
            created_at: Utc::now(),
            hashtags: hashtags.map(str::to_string),
            likes: HashSet::new(),
        }
    }

    #[tokio::test]
    async fn duplicate_edge_insert_is_rejected() {
        let repo = InMemoryRepository::<FollowEdge>::new();

        assert!(repo.insert(edge(1, 2)).await.unwrap());
        assert!(!repo.insert(edge(1, 2)).await.unwrap());
        // reverse direction is a different edge
        assert!(repo.insert(edge(2, 1)).await.unwrap());
        assert_eq!(repo.following_of(1).await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn edge_delete_reports_absence() {
        let repo = InMemoryRepository::<FollowEdge>::new();

        repo.insert(edge(1, 2)).await.unwrap();
        assert!(repo.delete(1, 2).await.unwrap());
        assert!(!repo.delete(1, 2).await.unwrap());
    }

    #[tokio::test]
    async fn like_set_is_idempotent() {
        let repo = InMemoryRepository::<Post>::new();
        let p = post(1, None);
        let id = p.id;
        repo.insert(p).await.unwrap();

        assert!(repo.insert_like(id, 7).await.unwrap());
        assert!(!repo.insert_like(id, 7).await.unwrap());
        assert_eq!(repo.find(id).await.unwrap().likes.len(), 1);

        assert!(repo.delete_like(id, 7).await.unwrap());
        assert!(!repo.delete_like(id, 7).await.unwrap());
    }

    #[tokio::test]
    async fn hashtag_filter_is_conjunctive_substring() {
        let repo = InMemoryRepository::<Post>::new();
        repo.insert(post(1, Some("#cat#dog"))).await.unwrap();
        repo.insert(post(1, Some("#category"))).await.unwrap();
        repo.insert(post(1, Some("#dog"))).await.unwrap();
        repo.insert(post(1, None)).await.unwrap();

        let found = repo
            .finds(PostQuery {
                authors: None,
                hashtags: vec!["cat".to_string()],
            })
            .await
            .unwrap();
        // substring match: "#category" counts as a "cat" hit
        assert_eq!(found.len(), 2);

        let found = repo
            .finds(PostQuery {
                authors: None,
                hashtags: vec!["cat".to_string(), "dog".to_string()],
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn profile_is_unique_per_user() {
        let repo = InMemoryRepository::<UserProfile>::new();
        let profile = UserProfile {
            user: 1,
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            location: String::new(),
            birthdate: None,
            picture: None,
        };

        assert!(repo.insert(profile.clone()).await.unwrap());
        assert!(!repo.insert(profile).await.unwrap());
        assert_eq!(repo.finds(ProfileQuery::default()).await.unwrap().len(), 1);
    }
}
