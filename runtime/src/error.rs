// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the extraction pipeline and the HTTP layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Why a browser session stopped before the full procedure ran.
///
/// These never reach an HTTP client directly. The extractor records them on
/// the [`Extraction`](crate::extractor::Extraction) so the caller can log the
/// difference between "timed out" and "nothing there".
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("could not open page: {0}")]
    Page(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("navigation timed out after {ms}ms")]
    NavigationTimeout { ms: u64 },

    #[error("page evaluation failed: {0}")]
    Evaluation(String),

    /// The task running the extraction died (panic or runtime shutdown).
    #[error("extraction worker failed: {0}")]
    Worker(String),
}

impl ExtractError {
    /// Short machine-readable tag used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::Launch(_) => "launch",
            ExtractError::Page(_) => "page",
            ExtractError::Navigation(_) => "navigation",
            ExtractError::NavigationTimeout { .. } => "timeout",
            ExtractError::Evaluation(_) => "evaluation",
            ExtractError::Worker(_) => "worker",
        }
    }
}

/// Errors surfaced by the JSON API.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Missing url parameter")]
    MissingUrl { example: String },

    #[error("Invalid URL. Must be a {host} URL")]
    InvalidHost { host: String, example: String },

    #[error("No m3u8 URLs found")]
    NotFound { url: String },

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingUrl { .. } | ApiError::InvalidHost { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> serde_json::Value {
        let error = self.to_string();
        match self {
            ApiError::MissingUrl { example } => serde_json::json!({
                "error": error,
                "usage": format!("POST /api/extract-m3u8 with {{\"url\": \"{example}\"}}"),
            }),
            ApiError::InvalidHost { example, .. } => serde_json::json!({
                "error": error,
                "example": example,
            }),
            ApiError::NotFound { url } => serde_json::json!({
                "error": error,
                "videasy_url": url,
            }),
            ApiError::Internal(message) => serde_json::json!({
                "error": error,
                "message": message,
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "https://player.videasy.net/movie/299534";

    #[test]
    fn api_error_status_codes() {
        assert_eq!(
            ApiError::MissingUrl {
                example: EXAMPLE.into()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound { url: "x".into() }.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn invalid_host_message_names_the_host() {
        let err = ApiError::InvalidHost {
            host: "player.videasy.net".into(),
            example: EXAMPLE.into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid URL. Must be a player.videasy.net URL"
        );
        let body = err.body();
        assert_eq!(body["example"], EXAMPLE);
    }

    #[test]
    fn missing_url_body_has_usage() {
        let body = ApiError::MissingUrl {
            example: EXAMPLE.into(),
        }
        .body();
        assert_eq!(body["error"], "Missing url parameter");
        assert!(body["usage"].as_str().unwrap().contains(EXAMPLE));
    }

    #[test]
    fn extract_error_kinds() {
        assert_eq!(ExtractError::NavigationTimeout { ms: 5 }.kind(), "timeout");
        assert_eq!(
            ExtractError::NavigationTimeout { ms: 30000 }.to_string(),
            "navigation timed out after 30000ms"
        );
    }
}
