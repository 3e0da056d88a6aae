// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to encode image: {0}")]
    Encoding(String),

    #[error("{0} is not configured")]
    Configuration(String),

    #[error("Tripo3D API error: {0}")]
    Submission(String),

    #[error("Tripo3D polling error: {0}")]
    PollTransport(String),

    #[error("Tripo3D task {task_id} failed")]
    RemoteJobFailed { task_id: String },

    #[error("Tripo3D task {task_id} timeout: no terminal state after {attempts} attempts")]
    PollTimeout { task_id: String, attempts: u32 },

    #[error("Model URL not found in successful response for task {0}")]
    MalformedResult(String),

    #[error("OpenAI analysis failed: {0}")]
    AnalysisRequest(String),

    #[error("OpenAI analysis failed: empty response")]
    EmptyResponse,

    #[error("OpenAI analysis failed: invalid JSON: {0}")]
    Parse(String),

    #[error("Invalid analysis structure: missing {0}")]
    IncompleteAnalysis(String),

    #[error("Invalid model URL domain: {0}")]
    ForbiddenOrigin(String),

    #[error("Failed to fetch model: {0}")]
    UpstreamFetch(String),
}

/// Startup configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("{0} must not be empty")]
    Empty(String),
}

impl TerrainError {
    /// Headline shown in the `error` field of a 5xx body.
    fn headline(&self) -> &'static str {
        match self {
            TerrainError::Validation(_) | TerrainError::ForbiddenOrigin(_) => "Invalid request",
            TerrainError::Encoding(_) => "Image encoding error",
            TerrainError::Configuration(_) => "Service misconfigured",
            TerrainError::Submission(_)
            | TerrainError::PollTransport(_)
            | TerrainError::RemoteJobFailed { .. }
            | TerrainError::PollTimeout { .. }
            | TerrainError::MalformedResult(_) => "Model generation failed",
            TerrainError::AnalysisRequest(_)
            | TerrainError::EmptyResponse
            | TerrainError::Parse(_)
            | TerrainError::IncompleteAnalysis(_) => "Terrain analysis failed",
            TerrainError::UpstreamFetch(_) => "Failed to proxy model",
        }
    }
}

impl ResponseError for TerrainError {
    fn status_code(&self) -> StatusCode {
        match self {
            TerrainError::Validation(_) | TerrainError::ForbiddenOrigin(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = self.to_string();
        let message = if message.trim().is_empty() {
            "Unknown error occurred".to_string()
        } else {
            message
        };
        match self {
            TerrainError::Validation(_) | TerrainError::ForbiddenOrigin(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": message
                }))
            }
            _ => HttpResponse::build(self.status_code()).json(serde_json::json!({
                "error": self.headline(),
                "details": message
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(err: TerrainError) -> (StatusCode, serde_json::Value) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_are_bad_requests_without_details() {
        let (status, body) =
            body_json(TerrainError::Validation("Description is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Description is required");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn forbidden_origin_is_a_bad_request() {
        let (status, _) =
            body_json(TerrainError::ForbiddenOrigin("evil.example".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn downstream_errors_carry_headline_and_details() {
        let (status, body) = body_json(TerrainError::PollTimeout {
            task_id: "t-1".into(),
            attempts: 60,
        })
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Model generation failed");
        assert!(body["details"].as_str().unwrap().contains("60 attempts"));

        let (status, body) =
            body_json(TerrainError::IncompleteAnalysis("investors".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Terrain analysis failed");
    }

    #[tokio::test]
    async fn empty_message_falls_back_to_unknown_error() {
        let (_, body) = body_json(TerrainError::Validation(String::new())).await;
        assert_eq!(body["error"], "Unknown error occurred");
    }
}
