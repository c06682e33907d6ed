use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub images: ImageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cookie_name: String,
}

/// Which image backend to use, plus the knobs each backend needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    pub backend: ImageBackend,
    pub local_path: String,
    pub s3_bucket: String,
    pub s3_region: String,
    /// Custom endpoint (LocalStack and other S3-compatible stores)
    pub s3_endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageBackend {
    Local,
    S3,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        };

        let backend = match env::var("IMAGE_STORE").as_deref() {
            Ok("s3") => ImageBackend::S3,
            _ => ImageBackend::Local,
        };

        Self {
            environment,
            server: ServerConfig {
                port: env::var("LISTEN_PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(8080),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgres://localhost/profile_api".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            },
            security: SecurityConfig {
                jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string()),
                jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1),
                cookie_name: "token".to_string(),
            },
            images: ImageConfig {
                backend,
                local_path: env::var("LOCAL_PATH").unwrap_or_else(|_| "./images".to_string()),
                s3_bucket: env::var("S3_BUCKET").unwrap_or_default(),
                s3_region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                s3_endpoint: env::var("AWS_S3_ENDPOINT").ok().filter(|v| !v.is_empty()),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_env() {
        let config = AppConfig::from_env();
        assert_eq!(config.security.cookie_name, "token");
        assert!(config.security.jwt_expiry_hours >= 1);
        assert!(config.database.max_connections > 0);
    }
}
