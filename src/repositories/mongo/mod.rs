use anyhow::anyhow;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{Collection, Database};

use super::{
    CommentRepository, FollowRepository, PostMutation, PostQuery, PostRepository, ProfileMutation,
    ProfileQuery, ProfileRepository, RepositoryError, Result, UserQuery, UserRepository,
};
use crate::entities::{Comment, CommentId, FollowEdge, Post, PostId, User, UserId, UserProfile};

mod models;
mod type_convert;

use models::{
    MongoCommentModel, MongoFollowModel, MongoPostModel, MongoProfileModel, MongoUserModel,
};

pub struct MongoUserRepository {
    coll: Collection<MongoUserModel>,
    counters: Collection<Document>,
}

impl MongoUserRepository {
    pub async fn new_with(db: Database) -> ::anyhow::Result<Self> {
        db.run_command(
            doc! {
                "createIndexes": "user",
                "indexes": [
                    {
                        "name": "unique_id",
                        "key": { "id": 1 },
                        "unique": true
                    },
                    {
                        "name": "unique_email",
                        "key": { "email": 1 },
                        "unique": true
                    }
                ],
            },
            None,
        )
        .await?;

        Ok(Self {
            coll: db.collection("user"),
            counters: db.collection("counters"),
        })
    }
}

pub struct MongoFollowRepository {
    coll: Collection<MongoFollowModel>,
}

impl MongoFollowRepository {
    pub async fn new_with(db: Database) -> ::anyhow::Result<Self> {
        // the compound unique index is what makes concurrent duplicate
        // follows lose at the store
        db.run_command(
            doc! {
                "createIndexes": "follow",
                "indexes": [{
                    "name": "unique_edge",
                    "key": { "follower": 1, "followee": 1 },
                    "unique": true
                }],
            },
            None,
        )
        .await?;

        Ok(Self {
            coll: db.collection("follow"),
        })
    }
}

pub struct MongoPostRepository {
    coll: Collection<MongoPostModel>,
}

impl MongoPostRepository {
    pub async fn new_with(db: Database) -> ::anyhow::Result<Self> {
        db.run_command(
            doc! {
                "createIndexes": "post",
                "indexes": [{
                    "name": "unique_id",
                    "key": { "id": 1 },
                    "unique": true
                }],
            },
            None,
        )
        .await?;

        Ok(Self {
            coll: db.collection("post"),
        })
    }
}

pub struct MongoCommentRepository {
    coll: Collection<MongoCommentModel>,
}

impl MongoCommentRepository {
    pub async fn new_with(db: Database) -> ::anyhow::Result<Self> {
        db.run_command(
            doc! {
                "createIndexes": "comment",
                "indexes": [{
                    "name": "unique_id",
                    "key": { "id": 1 },
                    "unique": true
                }],
            },
            None,
        )
        .await?;

        Ok(Self {
            coll: db.collection("comment"),
        })
    }
}

pub struct MongoProfileRepository {
    coll: Collection<MongoProfileModel>,
}

impl MongoProfileRepository {
    pub async fn new_with(db: Database) -> ::anyhow::Result<Self> {
        db.run_command(
            doc! {
                "createIndexes": "profile",
                "indexes": [{
                    "name": "unique_user",
                    "key": { "user": 1 },
                    "unique": true
                }],
            },
            None,
        )
        .await?;

        Ok(Self {
            coll: db.collection("profile"),
        })
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn insert(&self, item: User) -> Result<bool> {
        let model: MongoUserModel = item.into();

        try_unique_check(self.coll.insert_one(model, None).await)
    }

    async fn is_exists(&self, id: UserId) -> Result<bool> {
        let count = self
            .coll
            .count_documents(doc! { "id": id.to_string() }, None)
            .await
            .map_err(convert_repo_err)?;

        Ok(count > 0)
    }

    async fn find(&self, id: UserId) -> Result<User> {
        let model = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .await
            .map_err(convert_repo_err)?;

        Ok(convert_404_or(model)?.into())
    }

    async fn finds(&self, query: UserQuery) -> Result<Vec<User>> {
        let filter: Document = query.into();
        let opts = FindOptions::builder()
            .sort(doc! { "registered_at": 1 })
            .build();

        Ok(self
            .coll
            .find(filter, opts)
            .await
            .map_err(convert_repo_err)?
            .try_collect::<Vec<_>>()
            .await
            .map_err(convert_repo_err)?
            .drain(..)
            .map(|m| m.into())
            .collect())
    }

    async fn next_id(&self) -> Result<UserId> {
        let opts = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let counter = self
            .counters
            .find_one_and_update(
                doc! { "_id": "user_id" },
                doc! { "$inc": { "seq": 1i64 } },
                opts,
            )
            .await
            .map_err(convert_repo_err)?;

        let seq = convert_404_or(counter)?
            .get_i64("seq")
            .map_err(convert_repo_err)?;

        Ok(seq as UserId)
    }
}

#[async_trait]
impl FollowRepository for MongoFollowRepository {
    async fn insert(&self, edge: FollowEdge) -> Result<bool> {
        let model: MongoFollowModel = edge.into();

        try_unique_check(self.coll.insert_one(model, None).await)
    }

    async fn delete(&self, follower: UserId, followee: UserId) -> Result<bool> {
        let res = self
            .coll
            .delete_one(
                doc! {
                    "follower": follower.to_string(),
                    "followee": followee.to_string()
                },
                None,
            )
            .await
            .map_err(convert_repo_err)?;

        Ok(res.deleted_count > 0)
    }

    async fn following_of(&self, user: UserId) -> Result<Vec<UserId>> {
        let opts = FindOptions::builder().sort(doc! { "followed_at": 1 }).build();

        Ok(self
            .coll
            .find(doc! { "follower": user.to_string() }, opts)
            .await
            .map_err(convert_repo_err)?
            .try_collect::<Vec<_>>()
            .await
            .map_err(convert_repo_err)?
            .drain(..)
            .map(|m| FollowEdge::from(m).followee)
            .collect())
    }

    async fn followers_of(&self, user: UserId) -> Result<Vec<UserId>> {
        let opts = FindOptions::builder().sort(doc! { "followed_at": 1 }).build();

        Ok(self
            .coll
            .find(doc! { "followee": user.to_string() }, opts)
            .await
            .map_err(convert_repo_err)?
            .try_collect::<Vec<_>>()
            .await
            .map_err(convert_repo_err)?
            .drain(..)
            .map(|m| FollowEdge::from(m).follower)
            .collect())
    }
}

#[async_trait]
impl PostRepository for MongoPostRepository {
    async fn insert(&self, item: Post) -> Result<bool> {
        let model: MongoPostModel = item.into();

        try_unique_check(self.coll.insert_one(model, None).await)
    }

    async fn find(&self, id: PostId) -> Result<Post> {
        let model = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .await
            .map_err(convert_repo_err)?;

        Ok(convert_404_or(model)?.into())
    }

    async fn finds(&self, query: PostQuery) -> Result<Vec<Post>> {
        let filter: Document = query.into();
        let opts = FindOptions::builder().sort(doc! { "created_at": -1 }).build();

        Ok(self
            .coll
            .find(filter, opts)
            .await
            .map_err(convert_repo_err)?
            .try_collect::<Vec<_>>()
            .await
            .map_err(convert_repo_err)?
            .drain(..)
            .map(|m| m.into())
            .collect())
    }

    async fn update(&self, id: PostId, mutation: PostMutation) -> Result<Post> {
        let set: Document = mutation.into();

        // the server rejects an empty $set
        if set.is_empty() {
            return self.find(id).await;
        }

        let opts = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let model = self
            .coll
            .find_one_and_update(doc! { "id": id.to_string() }, doc! { "$set": set }, opts)
            .await
            .map_err(convert_repo_err)?;

        Ok(convert_404_or(model)?.into())
    }

    async fn insert_like(&self, id: PostId, user_id: UserId) -> Result<bool> {
        let res = self
            .coll
            .update_one(
                doc! { "id": id.to_string() },
                doc! { "$addToSet": { "likes": user_id.to_string() } },
                None,
            )
            .await
            .map_err(convert_repo_err)?;

        convert_404(res.matched_count > 0)?;
        Ok(res.modified_count > 0)
    }

    async fn delete_like(&self, id: PostId, user_id: UserId) -> Result<bool> {
        let res = self
            .coll
            .update_one(
                doc! { "id": id.to_string() },
                doc! { "$pull": { "likes": user_id.to_string() } },
                None,
            )
            .await
            .map_err(convert_repo_err)?;

        convert_404(res.matched_count > 0)?;
        Ok(res.modified_count > 0)
    }

    async fn delete(&self, id: PostId) -> Result<Post> {
        let model = self
            .coll
            .find_one_and_delete(doc! { "id": id.to_string() }, None)
            .await
            .map_err(convert_repo_err)?;

        Ok(convert_404_or(model)?.into())
    }
}

#[async_trait]
impl CommentRepository for MongoCommentRepository {
    async fn insert(&self, item: Comment) -> Result<bool> {
        let model: MongoCommentModel = item.into();

        try_unique_check(self.coll.insert_one(model, None).await)
    }

    async fn find(&self, id: CommentId) -> Result<Comment> {
        let model = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .await
            .map_err(convert_repo_err)?;

        Ok(convert_404_or(model)?.into())
    }

    async fn finds_by_post(&self, post: PostId) -> Result<Vec<Comment>> {
        let opts = FindOptions::builder().sort(doc! { "created_at": 1 }).build();

        Ok(self
            .coll
            .find(doc! { "post": post.to_string() }, opts)
            .await
            .map_err(convert_repo_err)?
            .try_collect::<Vec<_>>()
            .await
            .map_err(convert_repo_err)?
            .drain(..)
            .map(|m| m.into())
            .collect())
    }

    async fn delete(&self, id: CommentId) -> Result<Comment> {
        let model = self
            .coll
            .find_one_and_delete(doc! { "id": id.to_string() }, None)
            .await
            .map_err(convert_repo_err)?;

        Ok(convert_404_or(model)?.into())
    }

    async fn delete_by_post(&self, post: PostId) -> Result<u64> {
        let res = self
            .coll
            .delete_many(doc! { "post": post.to_string() }, None)
            .await
            .map_err(convert_repo_err)?;

        Ok(res.deleted_count)
    }
}

#[async_trait]
impl ProfileRepository for MongoProfileRepository {
    async fn insert(&self, item: UserProfile) -> Result<bool> {
        let model: MongoProfileModel = item.into();

        try_unique_check(self.coll.insert_one(model, None).await)
    }

    async fn find_by_user(&self, user: UserId) -> Result<UserProfile> {
        let model = self
            .coll
            .find_one(doc! { "user": user.to_string() }, None)
            .await
            .map_err(convert_repo_err)?;

        Ok(convert_404_or(model)?.into())
    }

    async fn finds(&self, query: ProfileQuery) -> Result<Vec<UserProfile>> {
        let filter: Document = query.into();

        Ok(self
            .coll
            .find(filter, None)
            .await
            .map_err(convert_repo_err)?
            .try_collect::<Vec<_>>()
            .await
            .map_err(convert_repo_err)?
            .drain(..)
            .map(|m| m.into())
            .collect())
    }

    async fn update(&self, user: UserId, mutation: ProfileMutation) -> Result<UserProfile> {
        let set: Document = mutation.into();

        // the server rejects an empty $set
        if set.is_empty() {
            return self.find_by_user(user).await;
        }

        let opts = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let model = self
            .coll
            .find_one_and_update(doc! { "user": user.to_string() }, doc! { "$set": set }, opts)
            .await
            .map_err(convert_repo_err)?;

        Ok(convert_404_or(model)?.into())
    }

    async fn delete(&self, user: UserId) -> Result<UserProfile> {
        let model = self
            .coll
            .find_one_and_delete(doc! { "user": user.to_string() }, None)
            .await
            .map_err(convert_repo_err)?;

        Ok(convert_404_or(model)?.into())
    }
}

fn convert_repo_err<E>(e: E) -> RepositoryError
where E: Sync + Send + ::std::error::Error + 'static {
    RepositoryError::Internal(anyhow!(e))
}

/// `Ok(false)` on a duplicate-key write rejection, `Ok(true)` otherwise.
fn try_unique_check<T>(result: ::mongodb::error::Result<T>) -> Result<bool> {
    match match match result {
        Ok(_) => return Ok(true),
        Err(e) => (*e.kind.clone(), e),
    } {
        (
            ::mongodb::error::ErrorKind::Write(::mongodb::error::WriteFailure::WriteError(e)),
            src,
        ) => (e.code, src),
        (_, src) => return Err(RepositoryError::Internal(anyhow!(src))),
    } {
        (11000, _) => Ok(false),
        (_, src) => Err(RepositoryError::Internal(anyhow!(src))),
    }
}

fn convert_404_or<T>(option: Option<T>) -> Result<T> {
    match option {
        Some(t) => Ok(t),
        None => Err(RepositoryError::NotFound),
    }
}

fn convert_404(b: bool) -> Result<()> {
    match b {
        true => Ok(()),
        false => Err(RepositoryError::NotFound),
    }
}
