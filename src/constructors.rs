use crate::entities::{Comment, FollowEdge, Post, User, UserProfile};
use crate::handlers::Handler;
use crate::repositories::mock::InMemoryRepository;
use crate::repositories::mongo::{
    MongoCommentRepository, MongoFollowRepository, MongoPostRepository, MongoProfileRepository,
    MongoUserRepository,
};

/// Volatile backend; state is gone when the process is.
pub fn in_memory() -> Handler {
    Handler {
        user_repository: Box::new(InMemoryRepository::<User>::new()),
        follow_repository: Box::new(InMemoryRepository::<FollowEdge>::new()),
        post_repository: Box::new(InMemoryRepository::<Post>::new()),
        comment_repository: Box::new(InMemoryRepository::<Comment>::new()),
        profile_repository: Box::new(InMemoryRepository::<UserProfile>::new()),
    }
}

pub async fn mongo(
    uri_str: impl AsRef<str>,
    db_name: impl AsRef<str>,
) -> ::anyhow::Result<Handler> {
    let c = ::mongodb::Client::with_uri_str(uri_str.as_ref()).await?;
    let db = c.database(db_name.as_ref());

    Ok(Handler {
        user_repository: Box::new(MongoUserRepository::new_with(db.clone()).await?),
        follow_repository: Box::new(MongoFollowRepository::new_with(db.clone()).await?),
        post_repository: Box::new(MongoPostRepository::new_with(db.clone()).await?),
        comment_repository: Box::new(MongoCommentRepository::new_with(db.clone()).await?),
        profile_repository: Box::new(MongoProfileRepository::new_with(db).await?),
    })
}
