use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaBackend {
    Local,
    S3,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub run_migrations: bool,
    pub cache_backend: CacheBackend,
    pub redis_url: String,
    pub media_backend: MediaBackend,
    pub media_root: String,
    pub media_url: String,
    pub s3_endpoint: Option<String>,
    pub s3_public_endpoint: Option<String>,
    pub s3_region: String,
    pub s3_bucket: Option<String>,
    pub page_size: usize,
    pub index_cache_seconds: u64,
    pub session_key: [u8; 32],
    pub session_ttl_hours: u64,
    pub cookie_secure: bool,
    pub upload_max_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests don't have to touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let http_addr = env.or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let storage_backend = match env.or("STORAGE_BACKEND", "postgres").as_str() {
            "postgres" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            other => return Err(anyhow!("unknown STORAGE_BACKEND: {}", other)),
        };
        let database_url = env.get("DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("missing required env var: DATABASE_URL"));
        }

        let cache_backend = match env.or("CACHE_BACKEND", "redis").as_str() {
            "redis" => CacheBackend::Redis,
            "memory" => CacheBackend::Memory,
            other => return Err(anyhow!("unknown CACHE_BACKEND: {}", other)),
        };

        let media_backend = match env.or("MEDIA_BACKEND", "local").as_str() {
            "local" => MediaBackend::Local,
            "s3" => MediaBackend::S3,
            other => return Err(anyhow!("unknown MEDIA_BACKEND: {}", other)),
        };
        let s3_endpoint = env.get("S3_ENDPOINT");
        let s3_bucket = env.get("S3_BUCKET");
        if media_backend == MediaBackend::S3 {
            if s3_endpoint.is_none() {
                return Err(anyhow!("missing required env var: S3_ENDPOINT"));
            }
            if s3_bucket.is_none() {
                return Err(anyhow!("missing required env var: S3_BUCKET"));
            }
        }

        let page_size: usize = env.parse_or("PAGE_SIZE", "10")?;
        if page_size == 0 {
            return Err(anyhow!("invalid PAGE_SIZE: must be at least 1"));
        }

        Ok(Self {
            http_addr,
            storage_backend,
            database_url,
            db_max_connections: env.parse_or("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env.parse_or("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env.parse_or("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env.parse_or("DB_MAX_LIFETIME_SECONDS", "1800")?,
            run_migrations: env.parse_or("RUN_MIGRATIONS", "true")?,
            cache_backend,
            redis_url: env.or("REDIS_URL", "redis://127.0.0.1/"),
            media_backend,
            media_root: env.or("MEDIA_ROOT", "media"),
            media_url: env.or("MEDIA_URL", "/media"),
            s3_endpoint,
            s3_public_endpoint: env.get("S3_PUBLIC_ENDPOINT"),
            s3_region: env.or("S3_REGION", "fr-par"),
            s3_bucket,
            page_size,
            index_cache_seconds: env.parse_or("INDEX_CACHE_SECONDS", "20")?,
            session_key: env.key_32("SESSION_KEY")?,
            session_ttl_hours: env.parse_or("SESSION_TTL_HOURS", "336")?,
            cookie_secure: env.parse_or("COOKIE_SECURE", "false")?,
            upload_max_bytes: env.parse_or("UPLOAD_MAX_BYTES", "5242880")?,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.get(key)
            .ok_or_else(|| anyhow!("missing required env var: {}", key))
    }

    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T>
    where
        T: FromStr,
        <T as FromStr>::Err: std::fmt::Display,
    {
        self.or(key, default)
            .parse::<T>()
            .map_err(|err| anyhow!("invalid {}: {}", key, err))
    }

    fn key_32(&self, key: &str) -> Result<[u8; 32]> {
        let value = self.required(key)?;
        let decoded = STANDARD
            .decode(value.as_bytes())
            .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
        if decoded.len() != 32 {
            return Err(anyhow!("invalid {}: expected 32 bytes", key));
        }
        let mut key_bytes = [0u8; 32];
        key_bytes.copy_from_slice(&decoded);
        Ok(key_bytes)
    }
}
