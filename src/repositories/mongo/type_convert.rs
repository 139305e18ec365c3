use mongodb::bson::{doc, DateTime, Document};

use super::models::{
    MongoCommentModel, MongoFollowModel, MongoPostModel, MongoProfileModel, MongoUserModel,
};
use super::{PostMutation, PostQuery, ProfileMutation, ProfileQuery, UserQuery};
use crate::entities::{Comment, FollowEdge, Post, User, UserProfile};

impl From<MongoUserModel> for User {
    fn from(
        MongoUserModel {
            id,
            email,
            display_name,
            registered_at,
        }: MongoUserModel,
    ) -> User {
        User {
            id: id.parse().unwrap(),
            email,
            display_name,
            registered_at: registered_at.to_chrono(),
        }
    }
}

impl From<User> for MongoUserModel {
    fn from(
        User {
            id,
            email,
            display_name,
            registered_at,
        }: User,
    ) -> MongoUserModel {
        MongoUserModel {
            id: id.to_string(),
            email,
            display_name,
            registered_at: DateTime::from_chrono(registered_at),
        }
    }
}

impl From<MongoFollowModel> for FollowEdge {
    fn from(
        MongoFollowModel {
            follower,
            followee,
            followed_at,
        }: MongoFollowModel,
    ) -> FollowEdge {
        FollowEdge {
            follower: follower.parse().unwrap(),
            followee: followee.parse().unwrap(),
            followed_at: followed_at.to_chrono(),
        }
    }
}

impl From<FollowEdge> for MongoFollowModel {
    fn from(
        FollowEdge {
            follower,
            followee,
            followed_at,
        }: FollowEdge,
    ) -> MongoFollowModel {
        MongoFollowModel {
            follower: follower.to_string(),
            followee: followee.to_string(),
            followed_at: DateTime::from_chrono(followed_at),
        }
    }
}

impl From<MongoPostModel> for Post {
    fn from(
        MongoPostModel {
            id,
            author,
            content,
            image,
            created_at,
            hashtags,
            mut likes,
        }: MongoPostModel,
    ) -> Post {
        Post {
            id: id.parse().unwrap(),
            author: author.parse().unwrap(),
            content,
            image,
            created_at: created_at.to_chrono(),
            hashtags,
            likes: likes.drain().map(|s| s.parse().unwrap()).collect(),
        }
    }
}

impl From<Post> for MongoPostModel {
    fn from(
        Post {
            id,
            author,
            content,
            image,
            created_at,
            hashtags,
            mut likes,
        }: Post,
    ) -> MongoPostModel {
        MongoPostModel {
            id: id.to_string(),
            author: author.to_string(),
            content,
            image,
            created_at: DateTime::from_chrono(created_at),
            hashtags,
            likes: likes.drain().map(|i| i.to_string()).collect(),
        }
    }
}

impl From<MongoCommentModel> for Comment {
    fn from(
        MongoCommentModel {
            id,
            post,
            author,
            content,
            created_at,
        }: MongoCommentModel,
    ) -> Comment {
        Comment {
            id: id.parse().unwrap(),
            post: post.parse().unwrap(),
            author: author.parse().unwrap(),
            content,
            created_at: created_at.to_chrono(),
        }
    }
}

impl From<Comment> for MongoCommentModel {
    fn from(
        Comment {
            id,
            post,
            author,
            content,
            created_at,
        }: Comment,
    ) -> MongoCommentModel {
        MongoCommentModel {
            id: id.to_string(),
            post: post.to_string(),
            author: author.to_string(),
            content,
            created_at: DateTime::from_chrono(created_at),
        }
    }
}

impl From<MongoProfileModel> for UserProfile {
    fn from(
        MongoProfileModel {
            user,
            first_name,
            last_name,
            bio,
            location,
            birthdate,
            picture,
        }: MongoProfileModel,
    ) -> UserProfile {
        UserProfile {
            user: user.parse().unwrap(),
            first_name,
            last_name,
            bio,
            location,
            birthdate: birthdate.map(|s| s.parse().unwrap()),
            picture,
        }
    }
}

impl From<UserProfile> for MongoProfileModel {
    fn from(
        UserProfile {
            user,
            first_name,
            last_name,
            bio,
            location,
            birthdate,
            picture,
        }: UserProfile,
    ) -> MongoProfileModel {
        MongoProfileModel {
            user: user.to_string(),
            first_name,
            last_name,
            bio,
            location,
            birthdate: birthdate.map(|d| d.to_string()),
            picture,
        }
    }
}

impl From<UserQuery> for Document {
    fn from(UserQuery { ids, email_contains }: UserQuery) -> Self {
        let mut query = doc! {};

        if let Some(mut set_raw) = ids {
            let set = set_raw.drain().map(|i| i.to_string()).collect::<Vec<_>>();
            query.insert("id", doc! { "$in": set });
        }

        if let Some(pat) = email_contains {
            query.insert(
                "email",
                doc! { "$regex": regex::escape(&pat), "$options": "i" },
            );
        }

        query
    }
}

impl From<PostQuery> for Document {
    fn from(PostQuery { authors, hashtags }: PostQuery) -> Self {
        let mut query = doc! {};

        if let Some(mut set_raw) = authors {
            let set = set_raw.drain().map(|i| i.to_string()).collect::<Vec<_>>();
            query.insert("author", doc! { "$in": set });
        }

        // conjunctive literal-substring match on the blob, one regex per token
        if !hashtags.is_empty() {
            let conds = hashtags
                .iter()
                .map(|t| doc! { "hashtags": { "$regex": regex::escape(&format!("#{}", t)) } })
                .collect::<Vec<_>>();
            query.insert("$and", conds);
        }

        query
    }
}

impl From<ProfileQuery> for Document {
    fn from(ProfileQuery { users }: ProfileQuery) -> Self {
        let mut query = doc! {};

        if let Some(mut set_raw) = users {
            let set = set_raw.drain().map(|i| i.to_string()).collect::<Vec<_>>();
            query.insert("user", doc! { "$in": set });
        }

        query
    }
}

// all-None mutations must convert to an empty document so the update
// paths can skip the write entirely
impl From<PostMutation> for Document {
    fn from(
        PostMutation {
            content,
            hashtags,
            image,
        }: PostMutation,
    ) -> Self {
        let mut set = doc! {};

        if let Some(val) = content {
            set.insert("content", val);
        }
        if let Some(val) = hashtags {
            set.insert("hashtags", val);
        }
        if let Some(val) = image {
            set.insert("image", val);
        }

        set
    }
}

impl From<ProfileMutation> for Document {
    fn from(
        ProfileMutation {
            first_name,
            last_name,
            bio,
            location,
            birthdate,
            picture,
        }: ProfileMutation,
    ) -> Self {
        let mut set = doc! {};

        if let Some(val) = first_name {
            set.insert("first_name", val);
        }
        if let Some(val) = last_name {
            set.insert("last_name", val);
        }
        if let Some(val) = bio {
            set.insert("bio", val);
        }
        if let Some(val) = location {
            set.insert("location", val);
        }
        if let Some(val) = birthdate {
            set.insert("birthdate", val.to_string());
        }
        if let Some(val) = picture {
            set.insert("picture", val);
        }

        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutations_with_no_fields_convert_to_empty_documents() {
        assert!(Document::from(PostMutation::default()).is_empty());
        assert!(Document::from(ProfileMutation::default()).is_empty());
    }
}
