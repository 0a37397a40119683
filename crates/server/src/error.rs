use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DbErr,
    models::{agent::AgentError, post::PostError, reference_image::ReferenceImageError},
};
use deployment::DeploymentError;
use services::services::{
    auto_post::AutoPostError, config::ConfigError, generation::GenerationError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error, ts_rs::TS)]
#[ts(type = "string")]
pub enum ApiError {
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    ReferenceImage(#[from] ReferenceImageError),
    #[error(transparent)]
    Post(#[from] PostError),
    #[error(transparent)]
    AutoPost(#[from] AutoPostError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<&'static str> for ApiError {
    fn from(msg: &'static str) -> Self {
        ApiError::BadRequest(msg.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Agent(err) => match err {
                AgentError::AgentNotFound => (StatusCode::NOT_FOUND, "AgentError"),
                AgentError::DuplicateHandle => (StatusCode::CONFLICT, "AgentError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "AgentError"),
            },
            ApiError::ReferenceImage(err) => match err {
                ReferenceImageError::NotFound | ReferenceImageError::AgentNotFound => {
                    (StatusCode::NOT_FOUND, "ReferenceImageError")
                }
                ReferenceImageError::DuplicateUrl => (StatusCode::CONFLICT, "ReferenceImageError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ReferenceImageError"),
            },
            ApiError::Post(err) => match err {
                PostError::PostNotFound | PostError::AgentNotFound => {
                    (StatusCode::NOT_FOUND, "PostError")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "PostError"),
            },
            ApiError::AutoPost(err) => match err {
                AutoPostError::Validation(_) => (StatusCode::BAD_REQUEST, "AutoPostError"),
                AutoPostError::AgentNotFound | AutoPostError::PreviewNotFound => {
                    (StatusCode::NOT_FOUND, "AutoPostError")
                }
                AutoPostError::StalePreview { .. } => (StatusCode::CONFLICT, "AutoPostError"),
                AutoPostError::Generation(_) => (StatusCode::BAD_GATEWAY, "GenerationError"),
                AutoPostError::Publication(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "PublicationError")
                }
                AutoPostError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AutoPostError"),
            },
            ApiError::Deployment(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DeploymentError"),
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::Config(err) => match err {
                ConfigError::ValidationError(_) => (StatusCode::BAD_REQUEST, "ConfigError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ConfigError"),
            },
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IoError"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "ConflictError"),
        };

        let error_message = match &self {
            ApiError::AutoPost(AutoPostError::Validation(msg)) => msg.clone(),
            ApiError::AutoPost(AutoPostError::Generation(gen_err)) => match gen_err {
                GenerationError::Upstream { message, .. } => {
                    format!("Content generation failed: {message}")
                }
                _ => "Content generation failed. Please try again.".to_string(),
            },
            ApiError::AutoPost(AutoPostError::Publication(_)) => {
                "Failed to publish the post. The draft is still available.".to_string()
            }
            ApiError::Unauthorized => "Unauthorized".to_string(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::Internal(msg) => msg.clone(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Conflict(msg) => msg.clone(),
            _ => format!("{}: {}", error_type, self),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_maps_to_expected_http_statuses() {
        assert_eq!(
            ApiError::BadRequest("bad".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotFound("missing".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("conflict".to_string())
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Internal("boom".to_string())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn domain_errors_map_to_expected_http_statuses() {
        assert_eq!(
            ApiError::from(AgentError::AgentNotFound)
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(AgentError::DuplicateHandle)
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(ReferenceImageError::DuplicateUrl)
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn workflow_errors_map_to_expected_http_statuses() {
        assert_eq!(
            ApiError::from(AutoPostError::Validation("bad".to_string()))
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AutoPostError::PreviewNotFound)
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(AutoPostError::StalePreview {
                expected: 1,
                current: 2
            })
            .into_response()
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(AutoPostError::Generation(GenerationError::Upstream {
                status: 500,
                message: "model down".to_string()
            }))
            .into_response()
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(AutoPostError::Publication(DbErr::Custom(
                "insert failed".to_string()
            )))
            .into_response()
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
