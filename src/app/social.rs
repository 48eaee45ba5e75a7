use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::domain::repo::Repositories;
use crate::domain::user::User;

#[derive(Clone)]
pub struct SocialService {
    repos: Repositories,
}

impl SocialService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    async fn author(&self, username: &str) -> ServiceResult<User> {
        self.repos
            .users
            .get_by_username(username)
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }

    /// Idempotent. Following yourself is silently ignored. Returns whether a
    /// new follow was recorded.
    pub async fn follow(&self, follower_id: Uuid, username: &str) -> ServiceResult<bool> {
        let author = self.author(username).await?;
        if author.id == follower_id {
            return Ok(false);
        }

        let created = self.repos.follows.create(follower_id, author.id).await?;
        if created {
            tracing::info!(follower_id = %follower_id, author_id = %author.id, "follow created");
        }
        Ok(created)
    }

    /// Unlike `follow`, a missing relationship is an error.
    pub async fn unfollow(&self, follower_id: Uuid, username: &str) -> ServiceResult<()> {
        let author = self.author(username).await?;
        if !self.repos.follows.delete(follower_id, author.id).await? {
            return Err(ServiceError::NotFound("follow"));
        }

        tracing::info!(follower_id = %follower_id, author_id = %author.id, "follow removed");
        Ok(())
    }
}
