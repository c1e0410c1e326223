use axum::{extract::State, routing::post, Router};
use tracing::{info, instrument, warn};

use super::{
    claims::TokenKind,
    dto::{LoginRequest, RefreshRequest, TokenPair},
    jwt::SecurityManager,
};
use crate::{
    db::DbSession,
    error::{AppError, AppResult},
    extract::ValidatedJson,
    response::ApiResponse,
    state::AppState,
    users::{repo::PgUserRepository, services::UserService},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

fn issue_pair(security: &SecurityManager, user_id: uuid::Uuid) -> AppResult<TokenPair> {
    let access_token = security.create_access_token(user_id, None)?;
    let refresh_token = security.create_refresh_token(user_id)?;
    Ok(TokenPair::bearer(access_token, refresh_token))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<ApiResponse<TokenPair>> {
    let session = DbSession::acquire(&state.db).await?;
    let service = UserService::new(PgUserRepository::new(&session), state.security.clone());
    let user = service
        .authenticate_user(&payload.email, &payload.password)
        .await?;

    let pair = issue_pair(&state.security, user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(ApiResponse::ok(pair).with_message("Login successful"))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshRequest>,
) -> AppResult<ApiResponse<TokenPair>> {
    let claims = state.security.get_token_data(&payload.refresh_token, false)?;
    if claims.kind != TokenKind::Refresh {
        warn!(user_id = %claims.sub, "access token presented for refresh");
        return Err(AppError::Authentication("Refresh token required".into()));
    }

    // The subject must still exist and be active.
    let session = DbSession::acquire(&state.db).await?;
    let service = UserService::new(PgUserRepository::new(&session), state.security.clone());
    let user = match service.get_user(claims.sub).await {
        Ok(u) => u,
        Err(AppError::NotFound { .. }) => return Err(AppError::invalid_token()),
        Err(e) => return Err(e),
    };
    if !user.is_active {
        return Err(AppError::Authorization("Inactive user".into()));
    }

    let pair = issue_pair(&state.security, user.id)?;
    info!(user_id = %user.id, "tokens refreshed");
    Ok(ApiResponse::ok(pair).with_message("Token refreshed"))
}
