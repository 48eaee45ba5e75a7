use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub author_id: Uuid,
    pub author_username: String,
    pub group: Option<PostGroup>,
    /// Media store key of the attached image.
    pub image: Option<String>,
}

/// The slice of a group a post listing needs to link back to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostGroup {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

/// The author-editable fields. `author` and `created_at` never change.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

/// Which posts a listing covers. Every listing is newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(Uuid),
    Author(Uuid),
    /// Posts by every author the given user follows.
    FollowedBy(Uuid),
}
