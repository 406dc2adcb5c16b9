//! Configuration management for the Flash Reader server

use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub ingest: IngestConfig,
    pub sessions: SessionConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: Option<String>,
    /// Root directory for the `local` provider.
    pub local_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Minio,
    R2,
    S3,
    B2,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// How often a running playback session flushes progress to the database.
    pub progress_flush_secs: u64,
    /// Playback sessions idle longer than this are swept.
    pub idle_timeout_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of a login token in days.
    pub token_ttl_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                provider: StorageProvider::Minio,
                endpoint: "http://localhost:9000".to_string(),
                bucket: "books".to_string(),
                access_key: "admin".to_string(),
                secret_key: "password123".to_string(),
                region: Some("us-east-1".to_string()),
                local_dir: "./data/books".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite:./flash-reader.db".to_string(),
            },
            ingest: IngestConfig {
                max_upload_bytes: 16 * 1024 * 1024,
            },
            sessions: SessionConfig {
                progress_flush_secs: 5,
                idle_timeout_secs: 1800,
            },
            auth: AuthConfig { token_ttl_days: 30 },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let provider = match env::var("STORAGE_PROVIDER")
            .unwrap_or_else(|_| "minio".to_string())
            .as_str()
        {
            "r2" => StorageProvider::R2,
            "s3" => StorageProvider::S3,
            "b2" => StorageProvider::B2,
            "local" => StorageProvider::Local,
            _ => StorageProvider::Minio,
        };

        let local_dir =
            env::var("STORAGE_LOCAL_DIR").unwrap_or_else(|_| "./data/books".to_string());

        // The local provider needs no S3 credentials; the rest do.
        let storage = if provider == StorageProvider::Local {
            StorageConfig {
                provider,
                endpoint: String::new(),
                bucket: env::var("STORAGE_BUCKET").unwrap_or_else(|_| "books".to_string()),
                access_key: String::new(),
                secret_key: String::new(),
                region: None,
                local_dir,
            }
        } else {
            StorageConfig {
                provider,
                endpoint: env::var("S3_ENDPOINT")?,
                bucket: env::var("S3_BUCKET")?,
                access_key: env::var("S3_ACCESS_KEY")?,
                secret_key: env::var("S3_SECRET_KEY")?,
                region: env::var("S3_REGION").ok(),
                local_dir,
            }
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            storage,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:./flash-reader.db".to_string()),
            },
            ingest: IngestConfig {
                max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(16 * 1024 * 1024),
            },
            sessions: SessionConfig {
                progress_flush_secs: env::var("PROGRESS_FLUSH_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5),
                idle_timeout_secs: env::var("SESSION_IDLE_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1800),
            },
            auth: AuthConfig {
                token_ttl_days: env::var("AUTH_TOKEN_TTL_DAYS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            },
        })
    }
}
