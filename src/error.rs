use axum::{
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::error::ErrorKind;
use thiserror::Error;
use tracing::{error, warn};

/// One entry of a validation failure list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{entity} not found")]
    NotFound {
        entity: &'static str,
        identifier: String,
    },

    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Validation error")]
    RequestValidation(Vec<FieldError>),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{entity} with {field}='{value}' already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// `reason` is the driver's message. It is logged, never sent.
    #[error("Database constraint violation")]
    Constraint {
        constraint: Option<String>,
        reason: String,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(entity: &'static str, identifier: impl ToString) -> Self {
        AppError::NotFound {
            entity,
            identifier: identifier.to_string(),
        }
    }

    pub fn invalid_credentials() -> Self {
        AppError::Authentication("Incorrect email or password".into())
    }

    pub fn invalid_token() -> Self {
        AppError::Authentication("Invalid or expired token".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Validation { .. } | AppError::RequestValidation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::Duplicate { .. } | AppError::Constraint { .. } => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let mut body = ErrorBody::new(self.to_string());
        match self {
            AppError::NotFound { entity, identifier } => {
                body.detail = Some(json!({ "entity": entity, "identifier": identifier }));
            }
            AppError::Validation { field, .. } => {
                body.detail = field.as_ref().map(|f| json!({ "field": f }));
            }
            AppError::RequestValidation(errors) => {
                body.errors = Some(errors.clone());
            }
            AppError::Duplicate {
                entity,
                field,
                value,
            } => {
                body.detail = Some(json!({ "entity": entity, "field": field, "value": value }));
            }
            AppError::Constraint { constraint, .. } => {
                body.detail = constraint.as_ref().map(|c| json!({ "constraint": c }));
            }
            AppError::Internal(_) => {
                body.message = "Internal server error".into();
            }
            AppError::Authentication(_) | AppError::Authorization(_) => {}
        }
        body
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if matches!(
                db.kind(),
                ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation
            ) {
                return AppError::Constraint {
                    constraint: db.constraint().map(str::to_owned),
                    reason: db.message().to_owned(),
                };
            }
        }
        AppError::Internal(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Internal(e) => error!(error = ?e, "unhandled error"),
            AppError::Constraint { constraint, reason } => {
                warn!(constraint = ?constraint, %reason, "database constraint violation")
            }
            _ => {}
        }

        let body = self.body();
        let mut res = (status, Json(body.clone())).into_response();
        if matches!(self, AppError::Authentication(_)) {
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        res.extensions_mut().insert(body);
        res
    }
}

/// Error response body. `path` is filled in by [`attach_request_path`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            detail: None,
            errors: None,
            path: None,
        }
    }
}

/// Re-renders error bodies produced by [`AppError`] with the request path.
pub async fn attach_request_path(req: Request, next: Next) -> Response {
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    let mut res = next.run(req).await;
    match res.extensions_mut().remove::<ErrorBody>() {
        Some(mut body) => {
            body.path = Some(path);
            let (mut parts, _) = res.into_parts();
            parts.headers.remove(header::CONTENT_LENGTH);
            (parts, Json(body)).into_response()
        }
        None => res,
    }
}

pub async fn not_found_fallback() -> AppError {
    AppError::NotFound {
        entity: "Route",
        identifier: "unknown".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_covers_every_kind() {
        assert_eq!(AppError::not_found("User", 1).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Validation {
                message: "bad".into(),
                field: None
            }
            .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::RequestValidation(vec![]).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(AppError::invalid_credentials().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Authorization("no".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Duplicate {
                entity: "User",
                field: "email",
                value: "a@b.co".into()
            }
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Constraint {
                constraint: None,
                reason: "x".into()
            }
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn duplicate_body_carries_structured_detail() {
        let body = AppError::Duplicate {
            entity: "User",
            field: "email",
            value: "a@b.co".into(),
        }
        .body();
        assert!(!body.success);
        assert_eq!(body.message, "User with email='a@b.co' already exists");
        assert_eq!(
            body.detail,
            Some(json!({ "entity": "User", "field": "email", "value": "a@b.co" }))
        );
    }

    #[test]
    fn constraint_body_does_not_leak_driver_message() {
        let body = AppError::Constraint {
            constraint: Some("users_email_key".into()),
            reason: "duplicate key value violates unique constraint \"users_email_key\"".into(),
        }
        .body();
        let rendered = serde_json::to_string(&body).unwrap();
        assert!(rendered.contains("users_email_key"));
        assert!(!rendered.contains("duplicate key value"));
    }

    #[test]
    fn internal_body_is_generic() {
        let body = AppError::Internal(anyhow::anyhow!("secret stack detail")).body();
        assert_eq!(body.message, "Internal server error");
        assert!(body.detail.is_none());
    }

    #[test]
    fn authentication_response_sets_www_authenticate() {
        let res = AppError::invalid_token().into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn non_database_sqlx_errors_are_internal() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
