//! Web server for the interactive accessibility map.
//!
//! Serves the embedded page plus a small JSON API: static dataset layers,
//! per-session location transitions, and the analysis for the current
//! location.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use clap::Parser;
use geojson::FeatureCollection;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use healthreach::analysis::{analyze, AnalysisParams, AnalysisResult};
use healthreach::config::{Config, ServerConfig};
use healthreach::dataset::Dataset;
use healthreach::models::QueryPoint;
use healthreach::present::{
    escape_html, legend, nearest_lines, radius_label, AnalysisLayers, LegendEntry, MapPresenter,
    SummaryChart,
};
use healthreach::session::{GeolocationReading, Interaction, MapClick, SessionId, SessionStore};

mod page;

#[derive(Parser, Debug)]
#[command(name = "serve")]
#[command(about = "Hanoi healthcare accessibility map server")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(short, long)]
    listen: Option<String>,

    /// Directory holding the cached GeoJSON files (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

/// Application state shared across handlers
struct AppState {
    dataset: Dataset,
    sessions: SessionStore,
    params: AnalysisParams,
    presenter: MapPresenter,
    server: ServerConfig,
    boundary_layer: FeatureCollection,
    facilities_layer: FeatureCollection,
}

type ApiError = (StatusCode, String);

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn session_not_found(id: &SessionId) -> ApiError {
    let message = format!("Unknown session {}", id);
    warn!("{}", message);
    (StatusCode::NOT_FOUND, message)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(dir) = args.data_dir {
        config.data.dir = dir;
    }

    info!("Healthreach map server");

    let dataset = Dataset::load_or_fetch(&config.data, &config.source)
        .await
        .context("Failed to load dataset")?;
    info!(
        "Dataset ready: boundary '{}', {} facilities",
        dataset.boundary.name,
        dataset.facilities.len()
    );

    let presenter = MapPresenter::new();
    let boundary_layer = presenter.boundary_layer(&dataset.boundary);
    let facilities_layer = presenter.facilities_layer(&dataset.facilities);

    let state = Arc::new(AppState {
        dataset,
        sessions: SessionStore::with_limits(
            Duration::from_secs(config.server.session_idle_secs),
            config.server.max_sessions,
        ),
        params: AnalysisParams::from(&config.analysis),
        presenter,
        server: config.server.clone(),
        boundary_layer,
        facilities_layer,
    });

    // Sweep idle sessions in the background
    let sweeper = Arc::clone(&state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweeper.sessions.evict_idle(chrono::Utc::now());
        }
    });

    // Build router
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/boundary", get(boundary_handler))
        .route("/api/facilities", get(facilities_handler))
        .route("/api/legend", get(legend_handler))
        .route("/api/sessions", post(create_session_handler))
        .route("/api/sessions/{id}/gps", post(gps_handler))
        .route("/api/sessions/{id}/click", post(click_handler))
        .route("/api/sessions/{id}/location", delete(clear_handler))
        .route("/api/sessions/{id}/analysis", get(analysis_handler))
        .route("/api/sessions/{id}/chart.svg", get(chart_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on http://{}", config.server.listen);

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(page::render(&state.server))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    facilities: usize,
    sessions: usize,
    loaded_at: chrono::DateTime<chrono::Utc>,
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        facilities: state.dataset.facilities.len(),
        sessions: state.sessions.len(),
        loaded_at: state.dataset.loaded_at,
    })
}

async fn boundary_handler(State(state): State<Arc<AppState>>) -> Response {
    Json(&state.boundary_layer).into_response()
}

async fn facilities_handler(State(state): State<Arc<AppState>>) -> Response {
    Json(&state.facilities_layer).into_response()
}

async fn legend_handler() -> Json<Vec<LegendEntry>> {
    Json(legend())
}

#[derive(Serialize)]
struct SessionCreated {
    id: SessionId,
}

async fn create_session_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SessionCreated>) {
    let id = state.sessions.create();
    (StatusCode::CREATED, Json(SessionCreated { id }))
}

#[derive(Serialize)]
struct TransitionResponse {
    transition: &'static str,
    message: String,
    warning: bool,
    query: Option<QueryPoint>,
}

fn apply_interaction(
    state: &AppState,
    id: &SessionId,
    interaction: Interaction,
) -> Result<Json<TransitionResponse>, ApiError> {
    let transition = state
        .sessions
        .apply(id, interaction)
        .ok_or_else(|| session_not_found(id))?;
    let query = state.sessions.query_point(id).flatten();

    Ok(Json(TransitionResponse {
        transition: transition.kind(),
        message: transition.message(),
        warning: transition.is_warning(),
        query,
    }))
}

/// Device location reading; `null` when the browser could not provide one
async fn gps_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
    Json(reading): Json<Option<GeolocationReading>>,
) -> Result<Json<TransitionResponse>, ApiError> {
    apply_interaction(&state, &id, Interaction::GpsReading(reading))
}

async fn click_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
    Json(click): Json<MapClick>,
) -> Result<Json<TransitionResponse>, ApiError> {
    apply_interaction(&state, &id, Interaction::MapClick(click))
}

async fn clear_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
) -> Result<Json<TransitionResponse>, ApiError> {
    apply_interaction(&state, &id, Interaction::Clear)
}

#[derive(Serialize)]
struct AnalysisResponse<'a> {
    query: Option<QueryPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<AnalysisResult<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    layers: Option<AnalysisLayers>,
    lines: Vec<String>,
    radius_label: String,
    chart_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<String>,
}

fn current_analysis<'a>(
    state: &'a AppState,
    id: &SessionId,
) -> Result<Option<(QueryPoint, AnalysisResult<'a>)>, ApiError> {
    let query = state
        .sessions
        .query_point(id)
        .ok_or_else(|| session_not_found(id))?;

    Ok(query.map(|q| {
        let result = analyze(
            q.location(),
            &state.dataset.facilities,
            Some(&state.dataset.boundary),
            state.params,
        );
        (q, result)
    }))
}

/// Full recomputation for the session's current location
async fn analysis_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
) -> Result<Response, ApiError> {
    let radius_label = radius_label(state.params.radius_m);

    let response = match current_analysis(&state, &id)? {
        None => AnalysisResponse {
            query: None,
            analysis: None,
            layers: None,
            lines: Vec::new(),
            radius_label,
            chart_available: false,
            notice: None,
        },
        Some((query, result)) => {
            let notice = (result.inside_boundary == Some(false)).then(|| {
                format!(
                    "The selected location is outside {}.",
                    escape_html(&state.dataset.boundary.name)
                )
            });
            AnalysisResponse {
                query: Some(query),
                layers: Some(state.presenter.analysis_layers(&result)),
                lines: nearest_lines(&result.nearest),
                chart_available: result.within_radius.count > 0,
                analysis: Some(result),
                radius_label,
                notice,
            }
        }
    };

    Ok(Json(&response).into_response())
}

async fn chart_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
) -> Result<Response, ApiError> {
    let chart = current_analysis(&state, &id)?.and_then(|(_, result)| {
        SummaryChart::from_counts(&result.category_counts, result.within_radius.radius_m)
    });

    Ok(match chart {
        Some(chart) => (
            [(header::CONTENT_TYPE, "image/svg+xml")],
            chart.render_svg(),
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}
