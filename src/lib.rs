pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::app::auth::AuthService;
use crate::app::comments::CommentService;
use crate::app::media::MediaService;
use crate::app::pagination::Paginator;
use crate::app::posts::PostService;
use crate::app::social::SocialService;
use crate::config::{AppConfig, CacheBackend, MediaBackend, StorageBackend};
use crate::domain::repo::Repositories;
use crate::infra::cache::{MemoryCache, PageCache, RedisCache};
use crate::infra::db::Db;
use crate::infra::memory::MemoryStore;
use crate::infra::pg;
use crate::infra::storage::{LocalStorage, MediaStore, ObjectStorage};

#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub cache: Arc<dyn PageCache>,
    pub media: Arc<dyn MediaStore>,
    /// Directory served under `media_url` when images are stored locally.
    pub media_root: Option<PathBuf>,
    pub media_url: String,
    pub page_size: usize,
    pub index_cache_ttl: Duration,
    pub session_key: [u8; 32],
    pub session_ttl_hours: u64,
    pub cookie_secure: bool,
    pub upload_max_bytes: usize,
}

impl AppState {
    /// Connects every backend selected by the config.
    pub async fn build(config: &AppConfig) -> Result<Self> {
        let repos = match config.storage_backend {
            StorageBackend::Postgres => {
                let db = Db::connect(config).await?;
                if config.run_migrations {
                    db.migrate().await?;
                    tracing::info!("database migrations applied");
                }
                pg::repositories(db)
            }
            StorageBackend::Memory => {
                tracing::warn!("using in-memory storage; data is lost on restart");
                MemoryStore::new().repositories()
            }
        };

        let cache: Arc<dyn PageCache> = match config.cache_backend {
            CacheBackend::Redis => Arc::new(RedisCache::connect(&config.redis_url).await?),
            CacheBackend::Memory => Arc::new(MemoryCache::new()),
        };

        let (media, media_root): (Arc<dyn MediaStore>, Option<PathBuf>) =
            match config.media_backend {
                MediaBackend::Local => {
                    let storage = LocalStorage::new(&config.media_root, &config.media_url);
                    let root = storage.root().to_path_buf();
                    (Arc::new(storage), Some(root))
                }
                MediaBackend::S3 => (Arc::new(ObjectStorage::new(config).await?), None),
            };

        Ok(Self {
            repos,
            cache,
            media,
            media_root,
            media_url: config.media_url.clone(),
            page_size: config.page_size,
            index_cache_ttl: Duration::from_secs(config.index_cache_seconds),
            session_key: config.session_key,
            session_ttl_hours: config.session_ttl_hours,
            cookie_secure: config.cookie_secure,
            upload_max_bytes: config.upload_max_bytes,
        })
    }

    pub fn post_service(&self) -> PostService {
        PostService::new(
            self.repos.clone(),
            MediaService::new(self.media.clone()),
            Paginator::new(self.page_size),
        )
    }

    pub fn comment_service(&self) -> CommentService {
        CommentService::new(self.repos.clone())
    }

    pub fn social_service(&self) -> SocialService {
        SocialService::new(self.repos.clone())
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.repos.clone(), self.session_key, self.session_ttl_hours)
    }
}
