use thiserror::Error;
use uuid::Uuid;

use crate::app::forms::FormErrors;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid form submission")]
    Validation(FormErrors),

    /// The caller is authenticated but does not own the entry. Carries the
    /// post the caller should be sent back to.
    #[error("not the author of this entry")]
    NotOwner { post_id: Uuid },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
