use std::collections::BTreeMap;

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Per-field validation messages, serialized as `{"field": ["msg", ...]}`.
#[derive(Debug, Default, Clone)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Ok if no field collected an error, otherwise the validation error.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Malformed query string")]
    MalformedQuery,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Not found.")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(FieldErrors::single(field, message))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }
}

/// Unique-constraint violations that belong to the client, keyed by the
/// Postgres constraint name.
fn unique_violation(constraint: &str) -> Option<ApiError> {
    match constraint {
        "users_username_key" => Some(ApiError::validation(
            "username",
            "A user with that username already exists.",
        )),
        _ => None,
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                match db.constraint().and_then(unique_violation) {
                    Some(err) => err,
                    None => ApiError::Internal(sqlx::Error::Database(db).into()),
                }
            }
            other => ApiError::Internal(other.into()),
        }
    }
}

/// Every error collapses to a structured body; nothing framework-default,
/// nothing internal leaks past the 500 boundary.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(FieldErrors(fields)) => {
                (StatusCode::BAD_REQUEST, Json(json!(fields))).into_response()
            }
            ApiError::MalformedPayload => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "detail": "Malformed payload" })),
            )
                .into_response(),
            ApiError::MalformedQuery => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "detail": "Malformed query string" })),
            )
                .into_response(),
            ApiError::Unauthorized(detail) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Forbidden(detail) => {
                (StatusCode::FORBIDDEN, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response()
            }
            ApiError::Internal(e) => {
                error!(error = %e, "unhandled server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "Unhandled server error" })),
                )
                    .into_response()
            }
        }
    }
}

/// Json extractor whose rejection is normalized like every other error body.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            tracing::warn!(error = %e, "malformed request payload");
            ApiError::MalformedPayload
        })?;
        Ok(ApiJson(value))
    }
}

/// Query extractor whose rejection is normalized like every other error body.
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "malformed query string");
                ApiError::MalformedQuery
            })?;
        Ok(ApiQuery(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_accumulate_per_field() {
        let mut errors = FieldErrors::new();
        errors.push("quantity", "Ensure this value is greater than or equal to 0.");
        errors.push("quantity", "Ensure that there are no more than 2 decimal places.");
        errors.push("meal_type", "Invalid meal type.");
        let FieldErrors(map) = errors;
        assert_eq!(map["quantity"].len(), 2);
        assert_eq!(map["meal_type"].len(), 1);
    }

    #[test]
    fn empty_field_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
        assert!(FieldErrors::single("name", "required").into_result().is_err());
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn username_unique_violation_maps_to_field_error() {
        let err = unique_violation("users_username_key").unwrap();
        let ApiError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.contains("username"));
        assert!(unique_violation("profiles_user_id_key").is_none());
    }

    #[tokio::test]
    async fn bad_query_param_is_normalized() {
        let req = axum::http::Request::builder()
            .uri("/food_logs?page=abc")
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        let err = ApiQuery::<crate::pagination::PageQuery>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MalformedQuery));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
