use actix_web::{http::header, HttpResponse, ResponseError};
use serde::Serialize;

use crate::repo::RepoError;
use crate::validate::FieldErrors;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("not found")] NotFound,
    #[error("{0}")] Forbidden(String),
    #[error("validation failed")] Validation(FieldErrors),
    #[error("authentication required")] Unauthenticated,
    /// Anonymous browser request; answered with a redirect to the login form.
    #[error("login required")] LoginRequired { next: String },
    #[error("conflict")] Conflict,
    #[error("{0}")] BadRequest(String),
    #[error("internal error")] Internal,
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            RepoError::Conflict => ApiError::Conflict,
            RepoError::Internal(msg) => {
                tracing::error!("repository failure: {msg}");
                ApiError::Internal
            }
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(e: FieldErrors) -> Self {
        ApiError::Validation(e)
    }
}

pub fn login_url(next: &str) -> String {
    format!("/login/?next={}", urlencoding::encode(next))
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::LoginRequired { next } => {
                return HttpResponse::Found()
                    .insert_header((header::LOCATION, login_url(next)))
                    .finish();
            }
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let fields = match self {
            ApiError::Validation(f) => Some(f.clone()),
            _ => None,
        };
        HttpResponse::build(status).json(ApiErrorBody { error: self.to_string(), fields })
    }
}
