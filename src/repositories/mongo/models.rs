use std::collections::HashSet;

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

// u64 ids are stored as decimal strings (bson has no unsigned 64-bit type),
// uuids as their hyphenated form.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct MongoUserModel {
    pub(super) id: String,
    pub(super) email: String,
    pub(super) display_name: String,
    pub(super) registered_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct MongoFollowModel {
    pub(super) follower: String,
    pub(super) followee: String,
    pub(super) followed_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct MongoPostModel {
    pub(super) id: String,
    pub(super) author: String,
    pub(super) content: String,
    pub(super) image: Option<String>,
    pub(super) created_at: DateTime,
    pub(super) hashtags: Option<String>,
    pub(super) likes: HashSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct MongoCommentModel {
    pub(super) id: String,
    pub(super) post: String,
    pub(super) author: String,
    pub(super) content: String,
    pub(super) created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct MongoProfileModel {
    pub(super) user: String,
    pub(super) first_name: String,
    pub(super) last_name: String,
    pub(super) bio: String,
    pub(super) location: String,
    /// ISO `YYYY-MM-DD`, or absent.
    pub(super) birthdate: Option<String>,
    pub(super) picture: Option<String>,
}
