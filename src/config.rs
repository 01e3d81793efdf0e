/// Configuration management for promptcut-service
///
/// Loads configuration from environment variables with sensible defaults.
use anyhow::{anyhow, Result};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub s3: S3Config,
    pub engine: EngineConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EngineConfig {
    /// Run the in-process mock engine instead of waiting for an external
    /// engine to call the result route
    pub enable_mock: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let port_raw = std::env::var("PROMPTCUT_PORT").unwrap_or_else(|_| "8086".to_string());
        let port: u16 = port_raw
            .parse()
            .map_err(|_| anyhow!("PROMPTCUT_PORT must be a port number, got {port_raw:?}"))?;
        if port == 0 {
            return Err(anyhow!("PROMPTCUT_PORT must be greater than 0"));
        }

        let max_connections_raw =
            std::env::var("DATABASE_MAX_CONNECTIONS").unwrap_or_else(|_| "10".to_string());
        let max_connections: u32 = max_connections_raw.parse().map_err(|_| {
            anyhow!("DATABASE_MAX_CONNECTIONS must be a number, got {max_connections_raw:?}")
        })?;
        if max_connections == 0 {
            return Err(anyhow!("DATABASE_MAX_CONNECTIONS must be greater than 0"));
        }

        Ok(Config {
            app: AppConfig {
                host: std::env::var("PROMPTCUT_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port,
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ORIGINS")
                    .unwrap_or_else(|_| "*".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/promptcut".to_string()),
                max_connections,
            },
            s3: S3Config {
                bucket: std::env::var("S3_BUCKET")
                    .unwrap_or_else(|_| "promptcut-uploads".to_string()),
                region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                access_key_id: std::env::var("AWS_ACCESS_KEY_ID").ok(),
                secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
                endpoint: std::env::var("S3_ENDPOINT").ok(),
            },
            engine: EngineConfig {
                enable_mock: std::env::var("ENGINE_ENABLE_MOCK")
                    .map(|val| val == "1" || val.eq_ignore_ascii_case("true"))
                    .unwrap_or(true),
            },
        })
    }
}
