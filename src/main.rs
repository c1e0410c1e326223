use anyhow::Context;
use tracing::{info, warn};

use portfolio_backend::{app, config::AppConfig, db, logging, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("load configuration")?;
    logging::init(&config);

    info!(
        environment = %config.environment,
        version = %config.version,
        "starting {}",
        config.project_name
    );

    let addr = config.socket_addr()?;
    let app_state = AppState::init(config).await?;

    if let Err(e) = db::migrate(&app_state.db).await {
        warn!(error = %e, "migration failed; continuing");
    }

    let router = app::build_app(app_state);
    app::serve(router, addr).await
}
