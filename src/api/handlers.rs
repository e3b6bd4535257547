use std::sync::Arc;

use askama::Template;
use axum::{extract::State, response::Html, Json};
use tokio::sync::watch;
use utoipa::OpenApi;

use super::errors::AppError;
use crate::{
    display::DisplayState,
    icons::IconMapping,
    view::{build_view, DashboardPage, DashboardView, ForecastDayView, ReadingView, ViewOptions},
};

/// Static inputs of the view, fixed at startup.
#[derive(Debug)]
pub struct ViewContext {
    pub options: ViewOptions,
    pub icons: IconMapping,
    /// Seconds between reloads of the HTML page.
    pub refresh_secs: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub display: watch::Receiver<DisplayState>,
    pub view: Arc<ViewContext>,
}

impl AppState {
    fn current_view(&self) -> DashboardView {
        let state = self.display.borrow();
        build_view(&state, &self.view.options, &self.view.icons)
    }
}

/// Render the dashboard page.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Dashboard page", content_type = "text/html", body = String),
        (status = 500, description = "Template rendering failed"),
    ),
    tag = "dashboard"
)]
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let view = state.current_view();
    let page = DashboardPage {
        view: &view,
        lang: state.view.options.lang.code(),
        refresh_secs: state.view.refresh_secs,
    };
    Ok(Html(page.render()?))
}

/// The formatted values the page shows, as JSON.
#[utoipa::path(
    get,
    path = "/api/view",
    responses(
        (status = 200, description = "Current dashboard view", body = DashboardView),
    ),
    tag = "dashboard"
)]
pub async fn get_view(State(state): State<AppState>) -> Json<DashboardView> {
    Json(state.current_view())
}

/// Health check.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI document (used in api/mod.rs)
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(index, get_view, health),
    components(schemas(DashboardView, ReadingView, ForecastDayView)),
    tags(
        (name = "dashboard", description = "Dashboard page and view data"),
        (name = "system", description = "Service endpoints"),
    ),
    info(
        title = "Home Dashboard API",
        version = "0.1.0",
        description = "Wall dashboard showing time, hub sensors and the weather forecast"
    )
)]
pub struct ApiDoc;
