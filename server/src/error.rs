use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use jobrec::CoreError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let code = self.code();
        if status.is_server_error() {
            tracing::error!(code, status = %status, error = %self, "api_error");
        } else {
            tracing::warn!(code, status = %status, error = %self, "api_error");
        }
        let body = Json(ErrorResponse { code, message: self.public_message() });
        (status, body).into_response()
    }
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::Upstream(_) => "upstream_error",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::ServiceUnavailable(msg) => msg.clone(),
            ApiError::Unauthorized(_) => "unauthorized".into(),
            ApiError::Upstream(_) => "error fetching user data".into(),
            ApiError::Internal(_) => "internal server error".into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::EmptyCorpus => ApiError::ServiceUnavailable(value.to_string()),
            CoreError::NotFound(_) => ApiError::NotFound(value.to_string()),
            CoreError::InvalidJob(_) | CoreError::DuplicateJob(_) | CoreError::InvalidInput(_) => {
                ApiError::BadRequest(value.to_string())
            }
            CoreError::UpstreamData(_) => ApiError::Upstream(value.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::BadRequest(value.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    #[tokio::test]
    async fn empty_corpus_maps_to_503_with_code() {
        let response = ApiError::from(CoreError::EmptyCorpus).into_response();
        let (parts, body) = response.into_parts();
        assert_eq!(parts.status, StatusCode::SERVICE_UNAVAILABLE);
        let bytes = body.collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["code"], "service_unavailable");
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = ApiError::from(CoreError::ModelSave { path: "/secret/model.bin".into(), reason: "disk full".into() });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "internal server error");
        assert_eq!(ApiError::from(CoreError::NotFound(3)).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(CoreError::UpstreamData("down".into())).status_code(), StatusCode::BAD_GATEWAY);
    }
}
