//! In-process repositories with the same semantics as the PostgreSQL ones.
//!
//! All tables sit behind one lock so cascades (post -> comments,
//! group -> posts) apply atomically.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::comment::{Comment, NewComment};
use crate::domain::group::{Group, NewGroup};
use crate::domain::post::{NewPost, Post, PostChanges, PostFilter, PostGroup};
use crate::domain::repo::{
    CommentRepo, FollowRepo, GroupRepo, PostRepo, Repositories, UserRepo,
};
use crate::domain::user::{NewUser, User};

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    // Insertion counter; breaks created_at ties so "newest first" is stable.
    seq: u64,
    users: HashMap<Uuid, UserRow>,
    groups: HashMap<Uuid, Group>,
    posts: HashMap<Uuid, PostRow>,
    comments: HashMap<Uuid, CommentRow>,
    follows: HashMap<(Uuid, Uuid), OffsetDateTime>,
}

struct UserRow {
    user: User,
    password_hash: String,
}

struct PostRow {
    seq: u64,
    id: Uuid,
    text: String,
    created_at: OffsetDateTime,
    author_id: Uuid,
    group_id: Option<Uuid>,
    image: Option<String>,
}

struct CommentRow {
    seq: u64,
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    text: String,
    created_at: OffsetDateTime,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            users: Arc::new(self.clone()),
            groups: Arc::new(self.clone()),
            posts: Arc::new(self.clone()),
            comments: Arc::new(self.clone()),
            follows: Arc::new(self.clone()),
        }
    }
}

impl Tables {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn username(&self, user_id: Uuid) -> Result<String> {
        self.users
            .get(&user_id)
            .map(|row| row.user.username.clone())
            .ok_or_else(|| anyhow!("user {} does not exist", user_id))
    }

    fn post(&self, row: &PostRow) -> Result<Post> {
        let group = row
            .group_id
            .and_then(|group_id| self.groups.get(&group_id))
            .map(|group| PostGroup {
                id: group.id,
                slug: group.slug.clone(),
                title: group.title.clone(),
            });

        Ok(Post {
            id: row.id,
            text: row.text.clone(),
            created_at: row.created_at,
            author_id: row.author_id,
            author_username: self.username(row.author_id)?,
            group,
            image: row.image.clone(),
        })
    }

    fn comment(&self, row: &CommentRow) -> Result<Comment> {
        Ok(Comment {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            author_username: self.username(row.author_id)?,
            text: row.text.clone(),
            created_at: row.created_at,
        })
    }

    fn matches(&self, row: &PostRow, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => row.group_id == Some(group_id),
            PostFilter::Author(author_id) => row.author_id == author_id,
            PostFilter::FollowedBy(follower_id) => {
                self.follows.contains_key(&(follower_id, row.author_id))
            }
        }
    }

    fn filtered(&self, filter: PostFilter) -> Vec<&PostRow> {
        let mut rows: Vec<&PostRow> = self
            .posts
            .values()
            .filter(|row| self.matches(row, filter))
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });
        rows
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<Option<User>> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|row| row.user.username == user.username)
        {
            return Ok(None);
        }

        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.insert(
            created.id,
            UserRow {
                user: created.clone(),
                password_hash: user.password_hash,
            },
        );

        Ok(Some(created))
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|row| row.user.clone()))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|row| row.user.username == username)
            .map(|row| row.user.clone()))
    }

    async fn credentials(&self, username: &str) -> Result<Option<(User, String)>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|row| row.user.username == username)
            .map(|row| (row.user.clone(), row.password_hash.clone())))
    }
}

#[async_trait]
impl GroupRepo for MemoryStore {
    async fn create(&self, group: NewGroup) -> Result<Group> {
        let mut tables = self.tables.write().await;
        if tables.groups.values().any(|existing| existing.slug == group.slug) {
            return Err(anyhow!("group slug {} already exists", group.slug));
        }

        let created = Group {
            id: Uuid::new_v4(),
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        tables.groups.insert(created.id, created.clone());

        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.get(&id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables
            .groups
            .values()
            .find(|group| group.slug == slug)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Group>> {
        let tables = self.tables.read().await;
        let mut groups: Vec<Group> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.groups.remove(&id).is_none() {
            return Ok(false);
        }

        for post in tables.posts.values_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }

        Ok(true)
    }
}

#[async_trait]
impl PostRepo for MemoryStore {
    async fn create(&self, post: NewPost) -> Result<Post> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&post.author_id) {
            return Err(anyhow!("author {} does not exist", post.author_id));
        }
        if let Some(group_id) = post.group_id {
            if !tables.groups.contains_key(&group_id) {
                return Err(anyhow!("group {} does not exist", group_id));
            }
        }

        let row = PostRow {
            seq: tables.next_seq(),
            id: Uuid::new_v4(),
            text: post.text,
            created_at: OffsetDateTime::now_utc(),
            author_id: post.author_id,
            group_id: post.group_id,
            image: post.image,
        };
        let created = tables.post(&row)?;
        tables.posts.insert(row.id, row);

        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Post>> {
        let tables = self.tables.read().await;
        tables.posts.get(&id).map(|row| tables.post(row)).transpose()
    }

    async fn update(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>> {
        let mut tables = self.tables.write().await;
        if let Some(group_id) = changes.group_id {
            if !tables.groups.contains_key(&group_id) {
                return Err(anyhow!("group {} does not exist", group_id));
            }
        }

        let Some(row) = tables.posts.get_mut(&id) else {
            return Ok(None);
        };
        row.text = changes.text;
        row.group_id = changes.group_id;
        row.image = changes.image;

        let tables = &*tables;
        tables.posts.get(&id).map(|row| tables.post(row)).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.posts.remove(&id).is_none() {
            return Ok(false);
        }

        tables.comments.retain(|_, comment| comment.post_id != id);

        Ok(true)
    }

    async fn count(&self, filter: PostFilter) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables.filtered(filter).len() as u64)
    }

    async fn list(&self, filter: PostFilter, limit: u64, offset: u64) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        tables
            .filtered(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|row| tables.post(row))
            .collect()
    }
}

#[async_trait]
impl CommentRepo for MemoryStore {
    async fn create(&self, comment: NewComment) -> Result<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(anyhow!("post {} does not exist", comment.post_id));
        }

        let row = CommentRow {
            seq: tables.next_seq(),
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created_at: OffsetDateTime::now_utc(),
        };
        let created = tables.comment(&row)?;
        tables.comments.insert(row.id, row);

        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Comment>> {
        let tables = self.tables.read().await;
        tables
            .comments
            .get(&id)
            .map(|row| tables.comment(row))
            .transpose()
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&CommentRow> = tables
            .comments
            .values()
            .filter(|row| row.post_id == post_id)
            .collect();
        rows.sort_by_key(|row| row.seq);
        rows.into_iter().map(|row| tables.comment(row)).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.comments.remove(&id).is_some())
    }
}

#[async_trait]
impl FollowRepo for MemoryStore {
    async fn create(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.follows.contains_key(&(follower_id, author_id)) {
            return Ok(false);
        }
        tables
            .follows
            .insert((follower_id, author_id), OffsetDateTime::now_utc());
        Ok(true)
    }

    async fn delete(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.follows.remove(&(follower_id, author_id)).is_some())
    }

    async fn exists(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.follows.contains_key(&(follower_id, author_id)))
    }

    async fn count(&self) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables.follows.len() as u64)
    }
}
