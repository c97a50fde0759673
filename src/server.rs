use crate::analytics::{build_report, AnalyticsFilter, AnalyticsReport};
use crate::config::AppConfig;
use crate::data::Dataset;
use crate::export;
use crate::stats::{provider_zone_stats, ProviderZoneStats, ZoneStats};
use crate::types::Provider;
use crate::view::{heatmap_points, map_layer, CenterCard, ClientFilter, LayerRequest, MapLayer};
use crate::zone::Zone;
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub struct AppState {
    pub dataset: Dataset,
    pub config: AppConfig,
}

#[derive(Deserialize)]
pub struct LayerParams {
    #[serde(default)]
    filter: ClientFilter,
    zoom: Option<u8>,
    #[serde(default = "default_clustering")]
    clustering: bool,
}

fn default_clustering() -> bool {
    true
}

#[derive(Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    filter: ClientFilter,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneResponse {
    #[serde(flatten)]
    stats: ZoneStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    providers: Option<ProviderZoneStats>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/map/settings", get(settings_handler))
        .route("/api/business-centers", get(layer_handler))
        .route("/api/business-centers/:id", get(card_handler))
        .route("/api/heatmap", get(heatmap_handler))
        .route("/api/zone/stats", post(zone_stats_handler))
        .route("/api/providers", get(providers_handler))
        .route("/api/analytics", get(analytics_handler))
        .route("/api/export.csv", get(export_csv_handler))
        .route("/api/export.geojson", get(export_geojson_handler));

    let app = match &state.config.server.static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, dataset: Dataset) -> Result<()> {
    let port = config.server.port;
    let state = Arc::new(AppState { dataset, config });

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSettings {
    center: [f64; 2],
    initial_zoom: u8,
    zoom_threshold: u8,
    low_penetration_threshold: f64,
}

/// Initial view and thresholds the map page starts from.
async fn settings_handler(State(state): State<Arc<AppState>>) -> Json<MapSettings> {
    let map = &state.config.map;
    Json(MapSettings {
        center: map.center,
        initial_zoom: map.initial_zoom,
        zoom_threshold: map.zoom_threshold,
        low_penetration_threshold: map.low_penetration_threshold,
    })
}

async fn layer_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LayerParams>,
) -> Json<MapLayer> {
    let map = &state.config.map;
    let request = LayerRequest {
        filter: params.filter,
        zoom: params.zoom.unwrap_or(map.initial_zoom),
        clustering: params.clustering,
    };
    Json(map_layer(
        &state.dataset.centers,
        request,
        map.zoom_threshold,
        map.low_penetration_threshold,
    ))
}

async fn card_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CenterCard>, StatusCode> {
    state
        .dataset
        .find(&id)
        .map(|bc| Json(CenterCard::new(bc, state.config.map.low_penetration_threshold)))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn heatmap_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Json<Vec<[f64; 3]>> {
    Json(heatmap_points(&state.dataset.centers, params.filter))
}

async fn zone_stats_handler(
    State(state): State<Arc<AppState>>,
    Json(zone): Json<Zone>,
) -> Json<ZoneResponse> {
    let dataset = &state.dataset;
    let inside = dataset.index.centers_in_zone(&zone, &dataset.centers);
    let stats = ZoneStats::from_centers(inside);
    let providers = (!dataset.providers.is_empty())
        .then(|| provider_zone_stats(&zone, &dataset.providers));
    Json(ZoneResponse { stats, providers })
}

async fn providers_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Provider>> {
    Json(state.dataset.providers.clone())
}

async fn analytics_handler(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AnalyticsFilter>,
) -> Json<AnalyticsReport> {
    Json(build_report(
        &state.dataset.centers,
        &filter,
        state.config.map.low_penetration_threshold,
    ))
}

async fn export_csv_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match export::to_csv_string(&state.dataset.centers) {
        Ok(body) => Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"business_centers.csv\""),
            ],
            body,
        )),
        Err(e) => {
            error!("CSV export failed: {:#}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn export_geojson_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let fc = export::to_feature_collection(
        &state.dataset.centers,
        state.config.map.low_penetration_threshold,
    );
    ([(header::CONTENT_TYPE, "application/geo+json")], fc.to_string())
}
