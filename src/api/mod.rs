pub mod errors;
pub mod handlers;

use std::path::PathBuf;

use axum::{routing::get, Router};
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use handlers::{ApiDoc, AppState};

/// Build the HTTP router. Icon assets are served under `/png` when `assets`
/// is given.
pub fn router(state: AppState, assets: Option<PathBuf>) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/", get(handlers::index))
        .route("/api/view", get(handlers::get_view))
        .with_state(state)
        .split_for_parts();

    let router = router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        );

    match assets {
        Some(dir) => router.nest_service("/png", ServeDir::new(dir)),
        None => router,
    }
}
