use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::forms::CommentForm;
use crate::domain::comment::{Comment, NewComment};
use crate::domain::repo::Repositories;

#[derive(Clone)]
pub struct CommentService {
    repos: Repositories,
}

impl CommentService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn add(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        form: CommentForm,
    ) -> ServiceResult<Comment> {
        if self.repos.posts.get(post_id).await?.is_none() {
            return Err(ServiceError::NotFound("post"));
        }

        let errors = form.check();
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let comment = self
            .repos
            .comments
            .create(NewComment {
                post_id,
                author_id,
                text: form.text,
            })
            .await?;

        tracing::info!(comment_id = %comment.id, post_id = %post_id, author_id = %author_id, "comment added");
        Ok(comment)
    }

    /// Deletes the comment if `user_id` wrote it. Returns the post it was on.
    pub async fn delete(&self, comment_id: Uuid, user_id: Uuid) -> ServiceResult<Uuid> {
        let comment = self
            .repos
            .comments
            .get(comment_id)
            .await?
            .ok_or(ServiceError::NotFound("comment"))?;
        if comment.author_id != user_id {
            return Err(ServiceError::NotOwner {
                post_id: comment.post_id,
            });
        }

        self.repos.comments.delete(comment.id).await?;

        tracing::info!(comment_id = %comment.id, post_id = %comment.post_id, "comment deleted");
        Ok(comment.post_id)
    }
}
