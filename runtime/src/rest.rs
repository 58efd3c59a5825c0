// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP front end.
//!
//! Embed endpoints return the best proxied manifest URL as plain text; the
//! JSON API returns the full report. Every route goes through the shared
//! [`ExtractionPool`].

use crate::config::{Config, SourceConfig};
use crate::error::ApiError;
use crate::extractor::Extraction;
use crate::pool::ExtractionPool;
use crate::proxy::ProxyRewriter;
use crate::report::{timestamp_now, ApiSuccess, ExtractionReport};
use crate::target;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const NOT_FOUND_TEXT: &str = "No m3u8 URLs found";
const INTERNAL_ERROR_TEXT: &str = "Internal server error";

/// State shared by all handlers.
pub struct AppState {
    pub started_at: Instant,
    pub pool: Arc<ExtractionPool>,
    pub proxy: ProxyRewriter,
    pub source: SourceConfig,
}

impl AppState {
    pub fn new(pool: Arc<ExtractionPool>, config: &Config) -> Self {
        Self {
            started_at: Instant::now(),
            pool,
            proxy: ProxyRewriter::new(config.proxy_prefix()),
            source: config.source.clone(),
        }
    }
}

/// Build the axum Router with all endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/embed/movie/:id", get(embed_movie))
        .route("/embed/tv/:show/:season/:episode", get(embed_tv))
        .route("/api/extract-m3u8", post(extract_m3u8))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("server running at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
        })
        .await?;
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────

fn log_empty(extraction: &Extraction) {
    info!(
        locator = %extraction.target,
        status = extraction.status(),
        elapsed_ms = extraction.elapsed_ms,
        "no m3u8 URLs found"
    );
}

/// Plain-text response with the best proxied URL.
async fn embed(state: &AppState, locator: String) -> Response {
    info!(%locator, "extracting m3u8 for embed");
    match state.pool.extract(&locator).await {
        Ok(extraction) => match extraction.urls.best() {
            Some(best) => (
                [(header::CONTENT_TYPE, "text/plain")],
                state.proxy.rewrite(best),
            )
                .into_response(),
            None => {
                log_empty(&extraction);
                (StatusCode::NOT_FOUND, NOT_FOUND_TEXT).into_response()
            }
        },
        Err(e) => {
            error!(%locator, "extraction worker failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_TEXT).into_response()
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────

async fn index() -> Html<&'static str> {
    Html(include_str!("index.html"))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": timestamp_now(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
    }))
}

async fn embed_movie(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let locator = target::movie(&state.source.base_url, &id);
    embed(&state, locator).await
}

async fn embed_tv(
    State(state): State<Arc<AppState>>,
    Path((show, season, episode)): Path<(String, String, String)>,
) -> Response {
    let locator = target::tv(&state.source.base_url, &show, &season, &episode);
    embed(&state, locator).await
}

/// `POST /api/extract-m3u8` with `{"url": "..."}`.
///
/// A missing or unparsable body is treated the same as a missing `url`.
async fn extract_m3u8(
    State(state): State<Arc<AppState>>,
    body: Option<Json<Value>>,
) -> Result<Json<ApiSuccess>, ApiError> {
    let url = body
        .as_ref()
        .and_then(|Json(v)| v.get("url"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::MissingUrl {
            example: state.source.default_target.clone(),
        })?
        .to_string();

    if !target::is_source_url(&url, &state.source.host_marker) {
        return Err(ApiError::InvalidHost {
            host: state.source.host_marker.clone(),
            example: state.source.default_target.clone(),
        });
    }

    info!(locator = %url, "extracting m3u8");
    let extraction = state.pool.extract(&url).await.map_err(|e| {
        error!(locator = %url, "extraction worker failed: {e}");
        ApiError::Internal(e.to_string())
    })?;

    match ExtractionReport::build(&url, &extraction.urls, &state.proxy) {
        Some(report) => Ok(Json(report.into())),
        None => {
            log_empty(&extraction);
            Err(ApiError::NotFound { url })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractSettings;
    use crate::extractor::Extractor;
    use crate::renderer::NoopLauncher;

    #[test]
    fn test_app_state_uses_configured_prefix() {
        let config = Config {
            proxy_prefix: Some("https://proxy.test/?u=".into()),
            ..Config::default()
        };
        let extractor = Arc::new(Extractor::new(
            Arc::new(NoopLauncher::new("test")),
            ExtractSettings::immediate(),
        ));
        let state = AppState::new(Arc::new(ExtractionPool::new(extractor, 1)), &config);
        assert_eq!(state.proxy.prefix(), "https://proxy.test/?u=");
        assert_eq!(state.source.host_marker, "player.videasy.net");
    }
}
