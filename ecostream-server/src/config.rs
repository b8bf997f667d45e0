//! Server configuration module
//!
//! Handles loading configuration from environment variables with development defaults.

use std::fmt;
use std::time::Duration;

use crate::validation::{validate_bucket_name, validate_content_type};

/// Default bucket used by the object store gateway
pub const DEFAULT_BUCKET: &str = "default";

/// Default content type for uploads that do not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Wrapper that keeps credentials out of logs and debug output
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret<T: Clone + Default>(T);

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn reveal(&self) -> &T {
        &self.0
    }
}

impl<T: Clone + Default> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

/// How mutating `/users/` requests are authorized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserAuthMode {
    /// No credential required
    #[default]
    None,
    /// `Authorization: Bearer <TOKEN>` with the shared static secret
    StaticToken,
    /// `Authorization: Bearer <session token>` issued by `/login/`
    Session,
}

impl UserAuthMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "none" | "" => Some(Self::None),
            "static" | "token" => Some(Self::StaticToken),
            "session" | "jwt" => Some(Self::Session),
            _ => None,
        }
    }
}

/// Backend for user and item records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackendKind {
    Postgres,
    Redis,
    /// In-process hash store (development and tests)
    Memory,
}

impl StoreBackendKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "redis" => Some(Self::Redis),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Backend for uploaded files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectBackendKind {
    /// S3-compatible object store (MinIO)
    Minio,
    /// In-process map (development and tests)
    Memory,
}

impl ObjectBackendKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "minio" | "s3" => Some(Self::Minio),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address (default: 127.0.0.1:8080)
    pub listen_addr: String,
    /// Allowed CORS origins, comma-separated (default: allow all)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 50)
    pub body_limit_mb: usize,
    /// Maximum file size per upload in MB (default: 25)
    pub max_file_size_mb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Deadline for a single store call in seconds (default: 10)
    pub store_timeout_secs: u64,
    /// Shared static bearer token
    pub secret_token: Secret<String>,
    /// HMAC secret used to sign session tokens
    pub jwt_secret: Secret<String>,
    /// Authorization applied to mutating user routes
    pub user_auth: UserAuthMode,
    /// Record store backend
    pub store_backend: StoreBackendKind,
    /// PostgreSQL connection URL
    pub postgres_url: Secret<String>,
    /// Database connection pool maximum connections (default: 20)
    pub database_max_connections: u32,
    /// Database connection pool minimum connections (default: 2)
    pub database_min_connections: u32,
    /// Redis connection URL
    pub redis_url: Secret<String>,
    /// Redis connection pool size (default: 16)
    pub redis_pool_size: u32,
    /// Object store backend
    pub object_backend: ObjectBackendKind,
    /// MinIO endpoint, host:port or full URL
    pub minio_url: String,
    pub minio_root_user: Secret<String>,
    pub minio_root_password: Secret<String>,
    pub minio_use_ssl: bool,
    pub minio_region: String,
    /// Bucket holding uploaded files (default: "default")
    pub bucket: String,
    /// Content type recorded for uploads that declare none
    pub default_content_type: String,
    /// Create the administrator account at startup when missing
    pub seed_admin: bool,
    pub admin_username: String,
    pub admin_password: Secret<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            allowed_origins: None, // None = allow all
            body_limit_mb: 50,
            max_file_size_mb: 25,
            timeout_secs: 30,
            store_timeout_secs: 10,
            secret_token: Secret::new("TOKEN".to_string()),
            jwt_secret: Secret::new("JWT_SECRET".to_string()),
            user_auth: UserAuthMode::None,
            store_backend: StoreBackendKind::Memory, // from_env() defaults to Postgres
            postgres_url: Secret::new("postgres://localhost:5432".to_string()),
            database_max_connections: 20,
            database_min_connections: 2,
            redis_url: Secret::new("redis://localhost:6379".to_string()),
            redis_pool_size: 16,
            object_backend: ObjectBackendKind::Memory, // from_env() defaults to MinIO
            minio_url: "localhost:9000".to_string(),
            minio_root_user: Secret::new("minioadmin".to_string()),
            minio_root_password: Secret::new("minioadmin".to_string()),
            minio_use_ssl: false,
            minio_region: "us-east-1".to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
            seed_admin: true,
            admin_username: "admin".to_string(),
            admin_password: Secret::new("admin".to_string()),
        }
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        let user_auth = match std::env::var("USERS_AUTH") {
            Ok(value) => UserAuthMode::parse(&value).unwrap_or_else(|| {
                tracing::warn!(value = %value, "Unknown USERS_AUTH, requiring no credential");
                UserAuthMode::None
            }),
            Err(_) => UserAuthMode::None,
        };

        let store_backend = match std::env::var("STORE_BACKEND") {
            Ok(value) => StoreBackendKind::parse(&value).unwrap_or_else(|| {
                tracing::warn!(value = %value, "Unknown STORE_BACKEND, using postgres");
                StoreBackendKind::Postgres
            }),
            Err(_) => StoreBackendKind::Postgres,
        };

        let object_backend = match std::env::var("OBJECT_STORE") {
            Ok(value) => ObjectBackendKind::parse(&value).unwrap_or_else(|| {
                tracing::warn!(value = %value, "Unknown OBJECT_STORE, using minio");
                ObjectBackendKind::Minio
            }),
            Err(_) => ObjectBackendKind::Minio,
        };

        let bucket = env_string("MINIO_BUCKET", DEFAULT_BUCKET);
        let bucket = match validate_bucket_name(&bucket) {
            Ok(()) => bucket,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid MINIO_BUCKET, using '{}'", DEFAULT_BUCKET);
                DEFAULT_BUCKET.to_string()
            }
        };

        let default_content_type = env_string("DEFAULT_CONTENT_TYPE", DEFAULT_CONTENT_TYPE);
        let default_content_type = match validate_content_type(&default_content_type) {
            Ok(()) => default_content_type,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid DEFAULT_CONTENT_TYPE, using '{}'", DEFAULT_CONTENT_TYPE);
                DEFAULT_CONTENT_TYPE.to_string()
            }
        };

        Self {
            listen_addr: env_string("LISTENER_URL", &defaults.listen_addr),
            allowed_origins,
            body_limit_mb: env_parse("BODY_LIMIT_MB", defaults.body_limit_mb),
            max_file_size_mb: env_parse("MAX_FILE_SIZE_MB", defaults.max_file_size_mb),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", defaults.timeout_secs),
            store_timeout_secs: env_parse("STORE_TIMEOUT_SECS", defaults.store_timeout_secs),
            secret_token: Secret::new(env_string("TOKEN", defaults.secret_token.reveal())),
            jwt_secret: Secret::new(env_string("JWT_SECRET", defaults.jwt_secret.reveal())),
            user_auth,
            store_backend,
            postgres_url: Secret::new(env_string("POSTGRES_URL", defaults.postgres_url.reveal())),
            database_max_connections: env_parse(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            database_min_connections: env_parse(
                "DATABASE_MIN_CONNECTIONS",
                defaults.database_min_connections,
            ),
            redis_url: Secret::new(env_string("REDIS_URL", defaults.redis_url.reveal())),
            redis_pool_size: env_parse("REDIS_POOL_SIZE", defaults.redis_pool_size),
            object_backend,
            minio_url: env_string("MINIO_URL", &defaults.minio_url),
            minio_root_user: Secret::new(env_string(
                "MINIO_ROOT_USER",
                defaults.minio_root_user.reveal(),
            )),
            minio_root_password: Secret::new(env_string(
                "MINIO_ROOT_PASSWORD",
                defaults.minio_root_password.reveal(),
            )),
            minio_use_ssl: env_flag("MINIO_USE_SSL", false),
            minio_region: env_string("MINIO_REGION", &defaults.minio_region),
            bucket,
            default_content_type,
            seed_admin: std::env::var("SEED_ADMIN")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            admin_username: env_string("ADMIN_USERNAME", &defaults.admin_username),
            admin_password: Secret::new(env_string(
                "ADMIN_PASSWORD",
                defaults.admin_password.reveal(),
            )),
        }
    }

    /// Deadline budget for one store call
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    /// MinIO endpoint as a URL, honouring `MINIO_USE_SSL` when no scheme is given
    pub fn minio_endpoint(&self) -> String {
        if self.minio_url.starts_with("http://") || self.minio_url.starts_with("https://") {
            self.minio_url.clone()
        } else if self.minio_use_ssl {
            format!("https://{}", self.minio_url)
        } else {
            format!("http://{}", self.minio_url)
        }
    }
}
