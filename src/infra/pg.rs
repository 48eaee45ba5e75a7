//! PostgreSQL repositories.
//!
//! Cascades are left to the schema: `posts.group_id` is `ON DELETE SET NULL`,
//! `comments.post_id` is `ON DELETE CASCADE`.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::domain::comment::{Comment, NewComment};
use crate::domain::group::{Group, NewGroup};
use crate::domain::post::{NewPost, Post, PostChanges, PostFilter, PostGroup};
use crate::domain::repo::{
    CommentRepo, FollowRepo, GroupRepo, PostRepo, Repositories, UserRepo,
};
use crate::domain::user::{NewUser, User};
use crate::infra::db::Db;

const USER_COLUMNS: &str = "id, username, first_name, last_name, email, created_at";

const POST_SELECT: &str = "SELECT p.id, p.text, p.created_at, p.author_id, \
            u.username AS author_username, p.group_id, \
            g.slug AS group_slug, g.title AS group_title, p.image \
     FROM posts p \
     JOIN users u ON u.id = p.author_id \
     LEFT JOIN groups g ON g.id = p.group_id";

pub fn repositories(db: Db) -> Repositories {
    Repositories {
        users: Arc::new(PgUserRepo { db: db.clone() }),
        groups: Arc::new(PgGroupRepo { db: db.clone() }),
        posts: Arc::new(PgPostRepo { db: db.clone() }),
        comments: Arc::new(PgCommentRepo { db: db.clone() }),
        follows: Arc::new(PgFollowRepo { db }),
    }
}

pub struct PgUserRepo {
    db: Db,
}

pub struct PgGroupRepo {
    db: Db,
}

pub struct PgPostRepo {
    db: Db,
}

pub struct PgCommentRepo {
    db: Db,
}

pub struct PgFollowRepo {
    db: Db,
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        created_at: row.get("created_at"),
    }
}

fn group_from_row(row: &PgRow) -> Group {
    Group {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
    }
}

fn post_from_row(row: &PgRow) -> Post {
    let group_id: Option<Uuid> = row.get("group_id");
    let group_slug: Option<String> = row.get("group_slug");
    let group_title: Option<String> = row.get("group_title");
    let group = match (group_id, group_slug, group_title) {
        (Some(id), Some(slug), Some(title)) => Some(PostGroup { id, slug, title }),
        _ => None,
    };

    Post {
        id: row.get("id"),
        text: row.get("text"),
        created_at: row.get("created_at"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        group,
        image: row.get("image"),
    }
}

fn comment_from_row(row: &PgRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        text: row.get("text"),
        created_at: row.get("created_at"),
    }
}

fn push_post_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: PostFilter) {
    match filter {
        PostFilter::All => {}
        PostFilter::Group(group_id) => {
            builder.push(" WHERE p.group_id = ").push_bind(group_id);
        }
        PostFilter::Author(author_id) => {
            builder.push(" WHERE p.author_id = ").push_bind(author_id);
        }
        PostFilter::FollowedBy(follower_id) => {
            builder
                .push(" WHERE p.author_id IN (SELECT author_id FROM follows WHERE follower_id = ")
                .push_bind(follower_id)
                .push(")");
        }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn create(&self, user: NewUser) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (username, first_name, last_name, email, password_hash) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (username) DO NOTHING \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user.username)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.email)
        .bind(user.password_hash)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn credentials(&self, username: &str) -> Result<Option<(User, String)>> {
        let row = sqlx::query(&format!(
            "SELECT {}, password_hash FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| {
            let password_hash: String = row.get("password_hash");
            (user_from_row(&row), password_hash)
        }))
    }
}

#[async_trait]
impl GroupRepo for PgGroupRepo {
    async fn create(&self, group: NewGroup) -> Result<Group> {
        let row = sqlx::query(
            "INSERT INTO groups (title, slug, description) VALUES ($1, $2, $3) \
             RETURNING id, title, slug, description",
        )
        .bind(group.title)
        .bind(group.slug)
        .bind(group.description)
        .fetch_one(self.db.pool())
        .await?;

        Ok(group_from_row(&row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Group>> {
        let row = sqlx::query("SELECT id, title, slug, description FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(group_from_row))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let row =
            sqlx::query("SELECT id, title, slug, description FROM groups WHERE slug = $1")
                .bind(slug)
                .fetch_optional(self.db.pool())
                .await?;

        Ok(row.as_ref().map(group_from_row))
    }

    async fn list(&self) -> Result<Vec<Group>> {
        let rows = sqlx::query("SELECT id, title, slug, description FROM groups ORDER BY title")
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.iter().map(group_from_row).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PostRepo for PgPostRepo {
    async fn create(&self, post: NewPost) -> Result<Post> {
        let row = sqlx::query(
            "WITH inserted AS ( \
                INSERT INTO posts (text, author_id, group_id, image) \
                VALUES ($1, $2, $3, $4) \
                RETURNING id, text, created_at, author_id, group_id, image \
             ) \
             SELECT p.id, p.text, p.created_at, p.author_id, \
                    u.username AS author_username, p.group_id, \
                    g.slug AS group_slug, g.title AS group_title, p.image \
             FROM inserted p \
             JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id",
        )
        .bind(post.text)
        .bind(post.author_id)
        .bind(post.group_id)
        .bind(post.image)
        .fetch_one(self.db.pool())
        .await?;

        Ok(post_from_row(&row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("{} WHERE p.id = $1", POST_SELECT))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    async fn update(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>> {
        let row = sqlx::query(
            "WITH updated AS ( \
                UPDATE posts SET text = $2, group_id = $3, image = $4 \
                WHERE id = $1 \
                RETURNING id, text, created_at, author_id, group_id, image \
             ) \
             SELECT p.id, p.text, p.created_at, p.author_id, \
                    u.username AS author_username, p.group_id, \
                    g.slug AS group_slug, g.title AS group_title, p.image \
             FROM updated p \
             JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id",
        )
        .bind(id)
        .bind(changes.text)
        .bind(changes.group_id)
        .bind(changes.image)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, filter: PostFilter) -> Result<u64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p");
        push_post_filter(&mut builder, filter);

        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn list(&self, filter: PostFilter, limit: u64, offset: u64) -> Result<Vec<Post>> {
        let mut builder = QueryBuilder::<Postgres>::new(POST_SELECT);
        push_post_filter(&mut builder, filter);
        builder
            .push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let rows = builder.build().fetch_all(self.db.pool()).await?;

        Ok(rows.iter().map(post_from_row).collect())
    }
}

#[async_trait]
impl CommentRepo for PgCommentRepo {
    async fn create(&self, comment: NewComment) -> Result<Comment> {
        let row = sqlx::query(
            "WITH inserted AS ( \
                INSERT INTO comments (post_id, author_id, text) VALUES ($1, $2, $3) \
                RETURNING id, post_id, author_id, text, created_at \
             ) \
             SELECT c.id, c.post_id, c.author_id, u.username AS author_username, \
                    c.text, c.created_at \
             FROM inserted c \
             JOIN users u ON u.id = c.author_id",
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(comment.text)
        .fetch_one(self.db.pool())
        .await?;

        Ok(comment_from_row(&row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Comment>> {
        let row = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, \
                    c.text, c.created_at \
             FROM comments c \
             JOIN users u ON u.id = c.author_id \
             WHERE c.id = $1",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(comment_from_row))
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, \
                    c.text, c.created_at \
             FROM comments c \
             JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = $1 \
             ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(post_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl FollowRepo for PgFollowRepo {
    async fn create(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO follows (follower_id, author_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(follower_id)
        .bind(author_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND author_id = $2")
                .bind(follower_id)
                .bind(author_id)
                .execute(self.db.pool())
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND author_id = $2)",
        )
        .bind(follower_id)
        .bind(author_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(exists)
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.max(0) as u64)
    }
}
