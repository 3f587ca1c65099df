use std::{net::SocketAddr, path::Path, sync::Arc};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use server_api::{items_catalog, list_cities, list_organizations, nearest_for_query, DirectoryContext};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{CitiesResponse, ItemsCatalog, NearestResponse, OrganizationsResponse},
};
use tracing::{info, warn};

mod config;

use config::load_settings;

#[derive(Clone)]
struct AppState {
    api: DirectoryContext,
}

#[derive(Debug, Deserialize)]
struct CityQuery {
    city: Option<String>,
}

// Kept as strings so non-numeric input gets the service's own 400 body.
#[derive(Debug, Deserialize)]
struct NearestQuery {
    lat: Option<String>,
    lng: Option<String>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let api = DirectoryContext::load(
        Path::new(&settings.data_path),
        Path::new(&settings.catalog_path),
    )?;
    let app = build_router(Arc::new(AppState { api }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, data = %settings.data_path, "directory service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/cities", get(http_list_cities))
        .route("/api/ngos", get(http_list_ngos))
        .route("/api/nearest", get(http_nearest))
        .route("/api/items_catalog", get(http_items_catalog))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_list_cities(State(state): State<Arc<AppState>>) -> Json<CitiesResponse> {
    Json(list_cities(&state.api))
}

async fn http_list_ngos(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CityQuery>,
) -> ApiResult<OrganizationsResponse> {
    list_organizations(&state.api, q.city.as_deref())
        .map(Json)
        .map_err(error_response)
}

async fn http_nearest(
    State(state): State<Arc<AppState>>,
    Query(q): Query<NearestQuery>,
) -> ApiResult<NearestResponse> {
    nearest_for_query(&state.api, q.lat.as_deref(), q.lng.as_deref())
        .map(Json)
        .map_err(error_response)
}

async fn http_items_catalog(State(state): State<Arc<AppState>>) -> ApiResult<ItemsCatalog> {
    items_catalog(&state.api).map(Json).map_err(error_response)
}

fn error_response(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!(error = %err, "directory request failed");
    }
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
