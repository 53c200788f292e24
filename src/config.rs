use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub bcrypt_cost: u32,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let server = ServerConfig {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(3001),
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
        };

        // DATABASE_URL wins; otherwise compose one from the discrete DB_* variables.
        let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            let host = std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".into());
            let port = std::env::var("DB_PORT").unwrap_or_else(|_| "5432".into());
            let name = std::env::var("DB_NAME").unwrap_or_else(|_| "smartvolley".into());
            let user = std::env::var("DB_USER").unwrap_or_else(|_| "postgres".into());
            let password = std::env::var("DB_PASSWORD").unwrap_or_else(|_| "postgres".into());
            format!("postgres://{user}:{password}@{host}:{port}/{name}")
        });

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_ttl_minutes: std::env::var("ACCESS_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(15),
            refresh_ttl_days: std::env::var("REFRESH_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };

        let bcrypt_cost = std::env::var("BCRYPT_ROUNDS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(12);

        let rate_limit = RateLimitConfig {
            max_requests: std::env::var("RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(100),
            window_seconds: std::env::var("RATE_LIMIT_WINDOW_SECONDS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(15 * 60),
        };

        Ok(Self {
            server,
            database_url,
            jwt,
            bcrypt_cost,
            rate_limit,
        })
    }
}
