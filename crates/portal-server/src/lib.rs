//! Portal Server: the HTTP surface of the employee portal.
//!
//! [`create_app`] builds the router over an [`AppState`]; `main.rs` only
//! parses configuration, connects the stores and serves.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod seed;
pub mod state;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, warn};

pub use state::AppState;

/// Room for multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Build the application router.
///
/// `cors_origins` empty allows any origin.
pub fn create_app(state: AppState, cors_origins: &[String]) -> Router {
    let body_limit = usize::try_from(state.max_upload_bytes + MULTIPART_OVERHEAD)
        .unwrap_or(usize::MAX);

    routes::router()
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(cors_origins))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return base.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(parsed)
}
