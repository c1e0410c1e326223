use std::{collections::HashSet, sync::Arc};

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    claims::{Claims, TokenKind},
    password,
};
use crate::{config::JwtConfig, error::AppError, state::AppState};

/// Password hashing plus token signing and verification.
#[derive(Clone)]
pub struct SecurityManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl FromRef<AppState> for Arc<SecurityManager> {
    fn from_ref(state: &AppState) -> Self {
        state.security.clone()
    }
}

impl SecurityManager {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm: cfg.algorithm,
            access_ttl: Duration::minutes(cfg.access_ttl_minutes),
            refresh_ttl: Duration::days(cfg.refresh_ttl_days),
        }
    }

    pub fn hash_password(&self, plain: &str) -> anyhow::Result<String> {
        password::hash_password(plain)
    }

    pub fn verify_password(&self, plain: &str, hash: &str) -> bool {
        password::verify_password(plain, hash)
    }

    pub fn verify_dummy(&self, plain: &str) {
        password::verify_dummy(plain)
    }

    /// `ttl` falls back to the configured access lifetime.
    pub fn create_access_token(
        &self,
        subject: Uuid,
        ttl: Option<Duration>,
    ) -> anyhow::Result<String> {
        self.sign(subject, TokenKind::Access, ttl.unwrap_or(self.access_ttl))
    }

    pub fn create_refresh_token(&self, subject: Uuid) -> anyhow::Result<String> {
        self.sign(subject, TokenKind::Refresh, self.refresh_ttl)
    }

    fn sign(&self, subject: Uuid, kind: TokenKind, ttl: Duration) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + ttl;
        let claims = Claims {
            sub: subject,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            kind,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)?;
        debug!(user_id = %subject, kind = ?kind, "jwt signed");
        Ok(token)
    }

    /// `None` on bad signature, malformed input or (when checked) expiry.
    pub fn decode_token(&self, token: &str, verify_expiry: bool) -> Option<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_exp = verify_expiry;
        validation.required_spec_claims = HashSet::from(["exp".to_owned()]);

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => {
                debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
                Some(data.claims)
            }
            Err(e) => {
                debug!(error = %e, "jwt rejected");
                None
            }
        }
    }

    pub fn get_token_data(&self, token: &str, ignore_expiration: bool) -> Result<Claims, AppError> {
        self.decode_token(token, !ignore_expiration).ok_or_else(|| {
            warn!("invalid or expired token");
            AppError::invalid_token()
        })
    }
}
