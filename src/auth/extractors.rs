use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use super::{claims::TokenKind, jwt::SecurityManager};
use crate::error::AppError;

/// Extracts and validates a Bearer access token, yielding the user ID.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<SecurityManager>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let security = Arc::<SecurityManager>::from_ref(state);

        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Not authenticated".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Authentication("Invalid authentication scheme".into()))?;

        let claims = security.get_token_data(token.trim(), false)?;
        if claims.kind != TokenKind::Access {
            return Err(AppError::Authentication("Access token required".into()));
        }

        Ok(AuthUser(claims.sub))
    }
}
