use std::{fmt, net::SocketAddr, str::FromStr};

use anyhow::{anyhow, bail, Context};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => bail!("expected development, staging or production, got '{other}'"),
        }
    }
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

// Keeps the signing secret out of logs.
impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"***")
            .field("algorithm", &self.algorithm)
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_days", &self.refresh_ttl_days)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub recycle_secs: u64,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_v1_str: String,
    pub project_name: String,
    pub version: String,
    pub environment: Environment,
    pub jwt: JwtConfig,
    pub database: DatabaseConfig,
    pub cors_origins: Vec<String>,
    pub log_level: String,
    pub json_logs: bool,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. `from_env` is
    /// this over the process environment.
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<String> {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("missing required environment variable {key}"))
        };

        let secret = required("SECRET_KEY")?;
        let database_url = required("DATABASE_URL")?;

        let algorithm = match get("ALGORITHM") {
            Some(raw) => raw
                .trim()
                .parse::<Algorithm>()
                .map_err(|e| anyhow!("invalid ALGORITHM '{raw}': {e}"))?,
            None => Algorithm::HS256,
        };
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            bail!("ALGORITHM must be one of HS256, HS384, HS512 (SECRET_KEY is a shared secret)");
        }

        let environment = match get("ENVIRONMENT") {
            Some(raw) => raw.parse::<Environment>().context("invalid ENVIRONMENT")?,
            None => Environment::Development,
        };

        let cors_origins = get("BACKEND_CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        let access_ttl_minutes = parse_or(&get, "ACCESS_TOKEN_EXPIRE_MINUTES", 15_i64)?;
        let refresh_ttl_days = parse_or(&get, "REFRESH_TOKEN_EXPIRE_DAYS", 30_i64)?;
        if access_ttl_minutes <= 0 || refresh_ttl_days <= 0 {
            bail!("token lifetimes must be positive");
        }

        Ok(Self {
            api_v1_str: get("API_V1_STR").unwrap_or_else(|| "/api/v1".into()),
            project_name: get("PROJECT_NAME").unwrap_or_else(|| "Portfolio Backend".into()),
            version: get("VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").into()),
            environment,
            jwt: JwtConfig {
                secret,
                algorithm,
                access_ttl_minutes,
                refresh_ttl_days,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10_u32)?,
                recycle_secs: parse_or(&get, "DB_POOL_RECYCLE_SECS", 300_u64)?,
                acquire_timeout_secs: parse_or(&get, "DB_ACQUIRE_TIMEOUT_SECS", 5_u64)?,
            },
            cors_origins,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "INFO".into()),
            json_logs: get("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&get, "APP_PORT", 8080_u16)?,
        })
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {key} '{raw}': {e}")),
        None => Ok(default),
    }
}
