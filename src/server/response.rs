use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::helpers::time::now_millis;
use crate::providers::error::ServiceError;

pub const NOT_FOUND: &str = "NOT_FOUND";
pub const UPSTREAM_AUTH_ERROR: &str = "UPSTREAM_AUTH_ERROR";
pub const SERVICE_UNAVAILABLE: &str = "SERVICE_UNAVAILABLE";

#[derive(Debug, Serialize)]
struct SuccessBody<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    timestamp: i64,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
    timestamp: i64,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

/// `{"success": true, "data": .., "timestamp": ..}`
#[derive(Debug)]
pub struct ApiSuccess<T> {
    data: T,
    message: Option<String>,
}

impl<T> ApiSuccess<T> {
    pub fn new(data: T) -> Self {
        Self { data, message: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        let body = SuccessBody {
            success: true,
            data: self.data,
            message: self.message,
            timestamp: now_millis(),
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}

/// `{"success": false, "error": {"code", "message", "details"?}, "timestamp": ..}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_owned(),
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, NOT_FOUND, message)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Maps a service failure onto the route's error `code`.
    pub fn from_service(code: &str, err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(message) => Self::bad_request(code, message),
            ServiceError::Unavailable(message) => Self::new(StatusCode::SERVICE_UNAVAILABLE, SERVICE_UNAVAILABLE, message),
            ServiceError::Credential(e) => Self::new(StatusCode::BAD_GATEWAY, UPSTREAM_AUTH_ERROR, e.to_string()),
            ServiceError::Upstream(e) => Self::new(StatusCode::BAD_GATEWAY, code, e.to_string()),
            ServiceError::Aggregate(e) => {
                let failed = serde_json::json!({ "failed": e.failed_ids() });
                Self::new(StatusCode::BAD_GATEWAY, code, e.to_string()).with_details(failed)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(code = %self.code, status = self.status.as_u16(), "{}", self.message);
        }
        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                details: self.details,
            },
            timestamp: now_millis(),
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiSuccess<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::CredentialError;
    use crate::resilience::error::{AggregateError, TaskFailure, UpstreamFetchError};

    #[test]
    fn service_errors_map_to_status_and_code() {
        let invalid = ApiError::from_service("WEATHER_ERROR", ServiceError::invalid_input("bad city"));
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
        assert_eq!(invalid.code, "WEATHER_ERROR");

        let upstream = ApiError::from_service("QUOTE_ERROR", UpstreamFetchError::Status(500).into());
        assert_eq!(upstream.status, StatusCode::BAD_GATEWAY);
        assert_eq!(upstream.code, "QUOTE_ERROR");

        let credential = ApiError::from_service(
            "CITY_LOOKUP_ERROR",
            CredentialError::NotConfigured("missing".into()).into(),
        );
        assert_eq!(credential.status, StatusCode::BAD_GATEWAY);
        assert_eq!(credential.code, UPSTREAM_AUTH_ERROR);

        let aggregate = ApiError::from_service(
            "NEWS_ERROR",
            AggregateError {
                failures: vec![TaskFailure {
                    id: "BBC News".into(),
                    error: UpstreamFetchError::Status(503),
                }],
            }
            .into(),
        );
        assert_eq!(aggregate.status, StatusCode::BAD_GATEWAY);
        assert_eq!(aggregate.details, Some(serde_json::json!({"failed": ["BBC News"]})));
    }
}
