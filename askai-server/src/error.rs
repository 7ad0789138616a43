use askai_core::{ErrorKind, RelayError};
use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Relay(#[from] RelayError),
    #[error("Not Found")]
    NotFound { method: Method, path: String },
    #[error("Request timed out")]
    Timeout { after: Duration },
}

/// Error body understood by the chat client: it shows `details`, then `error`
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tip: Option<&'static str>,
}

#[derive(Serialize)]
struct NotFoundBody {
    error: &'static str,
    method: String,
    path: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Relay(err) => {
                let status =
                    StatusCode::from_u16(err.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let details = match err.kind {
                    ErrorKind::ClientValidation => None,
                    _ => err.detail.clone(),
                };
                let body = Json(ErrorBody {
                    tip: err.tip(),
                    error: err.message,
                    details,
                });
                (status, body).into_response()
            }
            ApiError::NotFound { method, path } => {
                let body = Json(NotFoundBody {
                    error: "Not Found",
                    method: method.to_string(),
                    path,
                });
                (StatusCode::NOT_FOUND, body).into_response()
            }
            ApiError::Timeout { after } => {
                let body = Json(ErrorBody {
                    error: "Request timed out".to_string(),
                    details: Some(format!("The relay did not finish within {:?}", after)),
                    tip: None,
                });
                (StatusCode::GATEWAY_TIMEOUT, body).into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
