//! Request extractors that validate their input and reject with
//! [`AppError::RequestValidation`] (HTTP 422) instead of axum's plain-text
//! rejections.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::error::{AppError, FieldError};

/// JSON body that is deserialized and then checked with `validator`.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        data.validate().map_err(validation_errors)?;
        Ok(ValidatedJson(data))
    }
}

/// Query string counterpart of [`ValidatedJson`].
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(data) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(query_rejection)?;
        data.validate().map_err(validation_errors)?;
        Ok(ValidatedQuery(data))
    }
}

/// Single UUID path parameter.
pub struct UuidPath(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for UuidPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                AppError::RequestValidation(vec![FieldError::new("id", e.body_text())])
            })?;

        Uuid::parse_str(&raw).map(UuidPath).map_err(|_| {
            AppError::RequestValidation(vec![FieldError::new(
                "id",
                format!("'{raw}' is not a valid UUID"),
            )
            .with_code("uuid_parsing")])
        })
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    let text = rejection.body_text();
    let (field, code) = match &rejection {
        JsonRejection::JsonDataError(_) => (field_from_serde_message(&text), "invalid_data"),
        JsonRejection::JsonSyntaxError(_) => (None, "json_syntax"),
        JsonRejection::MissingJsonContentType(_) => (None, "content_type"),
        _ => (None, "invalid_body"),
    };
    AppError::RequestValidation(vec![
        FieldError::new(field.unwrap_or("body"), text.clone()).with_code(code)
    ])
}

fn query_rejection(rejection: QueryRejection) -> AppError {
    let text = rejection.body_text();
    let field = field_from_serde_message(&text).unwrap_or("query");
    AppError::RequestValidation(vec![
        FieldError::new(field, text.clone()).with_code("invalid_query")
    ])
}

pub(crate) fn validation_errors(errors: ValidationErrors) -> AppError {
    let mut list: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid"));
                FieldError::new(field.to_string(), message).with_code(err.code.to_string())
            })
        })
        .collect();
    list.sort_by(|a, b| a.field.cmp(&b.field));
    AppError::RequestValidation(list)
}

/// Pulls the field name out of serde messages such as
/// "missing field `password`" or "unknown field `foo`".
fn field_from_serde_message(msg: &str) -> Option<&str> {
    const MARKER: &str = "field `";
    let start = msg.find(MARKER)? + MARKER.len();
    let rest = &msg[start..];
    let end = rest.find('`')?;
    Some(&rest[..end])
}
