pub mod auth;
pub mod comments;
pub mod error;
pub mod forms;
pub mod media;
pub mod pagination;
pub mod posts;
pub mod social;
