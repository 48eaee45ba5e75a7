//! Data access contracts.
//!
//! Services only ever talk to these traits. `infra::pg` backs them with
//! PostgreSQL, `infra::memory` with in-process tables.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::comment::{Comment, NewComment};
use crate::domain::group::{Group, NewGroup};
use crate::domain::post::{NewPost, Post, PostChanges, PostFilter};
use crate::domain::user::{NewUser, User};

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Returns `None` when the username is already taken.
    async fn create(&self, user: NewUser) -> Result<Option<User>>;
    async fn get(&self, id: Uuid) -> Result<Option<User>>;
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;
    /// The user together with their stored password hash.
    async fn credentials(&self, username: &str) -> Result<Option<(User, String)>>;
}

#[async_trait]
pub trait GroupRepo: Send + Sync {
    async fn create(&self, group: NewGroup) -> Result<Group>;
    async fn get(&self, id: Uuid) -> Result<Option<Group>>;
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Group>>;
    async fn list(&self) -> Result<Vec<Group>>;
    /// Posts in the group keep existing with their group cleared.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn create(&self, post: NewPost) -> Result<Post>;
    async fn get(&self, id: Uuid) -> Result<Option<Post>>;
    async fn update(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>>;
    /// Deletes the post and every comment on it.
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn count(&self, filter: PostFilter) -> Result<u64>;
    /// Newest first.
    async fn list(&self, filter: PostFilter, limit: u64, offset: u64) -> Result<Vec<Post>>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn create(&self, comment: NewComment) -> Result<Comment>;
    async fn get(&self, id: Uuid) -> Result<Option<Comment>>;
    /// Oldest first.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait FollowRepo: Send + Sync {
    /// Returns `false` when the pair already existed.
    async fn create(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool>;
    async fn delete(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool>;
    async fn exists(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool>;
    async fn count(&self) -> Result<u64>;
}

/// One handle per entity, cheap to clone into services.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepo>,
    pub groups: Arc<dyn GroupRepo>,
    pub posts: Arc<dyn PostRepo>,
    pub comments: Arc<dyn CommentRepo>,
    pub follows: Arc<dyn FollowRepo>,
}
