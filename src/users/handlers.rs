use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::{
    dto::{ListUsersQuery, UserCreate, UserOut, UserUpdate},
    repo::PgUserRepository,
    services::UserService,
};
use crate::{
    auth::extractors::AuthUser,
    db::DbSession,
    error::{AppError, AppResult},
    extract::{UuidPath, ValidatedJson, ValidatedQuery},
    response::{ApiResponse, PaginationMeta},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/", get(list_users).post(create_user))
        .route("/users/me", get(get_me))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

fn service<'s>(state: &AppState, session: &'s DbSession) -> UserService<PgUserRepository<'s>> {
    UserService::new(PgUserRepository::new(session), state.security.clone())
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    ValidatedQuery(q): ValidatedQuery<ListUsersQuery>,
) -> AppResult<ApiResponse<Vec<UserOut>>> {
    let session = DbSession::acquire(&state.db).await?;
    let (total, users) = service(&state, &session)
        .list_users(q.skip, q.limit)
        .await?;
    let meta = PaginationMeta::from_window(q.skip, q.limit, total);
    let items = users.into_iter().map(UserOut::from).collect();
    Ok(ApiResponse::paginated(items, meta))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UserCreate>,
) -> AppResult<(StatusCode, ApiResponse<UserOut>)> {
    let session = DbSession::acquire(&state.db).await?;
    let user = service(&state, &session)
        .create_user(&payload.email, &payload.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(UserOut::from(user)).with_message("User created"),
    ))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<ApiResponse<UserOut>> {
    let session = DbSession::acquire(&state.db).await?;
    let user = service(&state, &session).get_user(user_id).await?;
    Ok(ApiResponse::ok(user.into()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    UuidPath(id): UuidPath,
) -> AppResult<ApiResponse<UserOut>> {
    let session = DbSession::acquire(&state.db).await?;
    let user = service(&state, &session).get_user(id).await?;
    Ok(ApiResponse::ok(user.into()))
}

/// Users may only modify their own account.
fn ensure_self(caller: Uuid, id: Uuid) -> AppResult<()> {
    if caller != id {
        warn!(caller = %caller, target = %id, "attempt to modify another user");
        return Err(AppError::Authorization("Not enough permissions".into()));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    UuidPath(id): UuidPath,
    ValidatedJson(payload): ValidatedJson<UserUpdate>,
) -> AppResult<ApiResponse<UserOut>> {
    ensure_self(caller, id)?;
    let session = DbSession::acquire(&state.db).await?;
    let user = service(&state, &session).update_user(id, payload).await?;
    Ok(ApiResponse::ok(user.into()).with_message("User updated"))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    UuidPath(id): UuidPath,
) -> AppResult<ApiResponse<()>> {
    ensure_self(caller, id)?;
    let session = DbSession::acquire(&state.db).await?;
    service(&state, &session).delete_user(id).await?;
    Ok(ApiResponse::empty("User deleted"))
}
