//! Static web UI.

use crate::AppState;
use axum::{response::Redirect, routing::get, Router};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

/// `/` redirects to `/ui`, which serves `index.html`; assets live under `/static`.
pub fn routes(static_dir: &Path) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(|| async { Redirect::temporary("/ui") }))
        .route_service("/ui", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
}
