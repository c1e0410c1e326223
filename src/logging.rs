use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, Environment};

/// Filter used when `RUST_LOG` is unset, derived from `LOG_LEVEL`.
pub fn default_filter(config: &AppConfig) -> String {
    let level = match config.log_level.to_ascii_lowercase().as_str() {
        "warning" => "warn".to_owned(),
        "critical" | "fatal" => "error".to_owned(),
        other => other.to_owned(),
    };
    let sqlx = if config.environment == Environment::Development {
        "info"
    } else {
        "warn"
    };
    format!(
        "{}={level},axum=info,tower_http=info,sqlx={sqlx}",
        env!("CARGO_CRATE_NAME")
    )
}

pub fn init(config: &AppConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config)));

    if config.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}
