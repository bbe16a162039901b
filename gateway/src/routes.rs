//! Map selection routes
//!
//! Each dataset kind gets one path:
//! - GET returns the default selection and the option lists for its form
//! - POST takes the form (`application/x-www-form-urlencoded`, keyed by
//!   category label), renders the map and returns where it was written

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Form, Json, Router,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use capacity_datasets::options::{Country, OptionSet};
use capacity_datasets::resolver::FormValues;
use capacity_datasets::{Category, DatasetError, DatasetKind, Viewport};
use capacity_viz::pipeline::Selection;
use capacity_viz::{MapPipeline, RenderedMap, VizError};

/// Shared gateway state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<MapPipeline>,
    /// Rendered maps keyed by resolved data filename.
    pub cache: Arc<RwLock<HashMap<String, RenderedMap>>>,
}

impl AppState {
    pub fn new(pipeline: MapPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

// ========== Request/Response Types ==========

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize)]
pub struct FormResponse {
    pub kind: DatasetKind,
    pub defaults: BTreeMap<&'static str, String>,
    pub options: BTreeMap<&'static str, Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct MapResponse {
    pub kind: DatasetKind,
    pub selection: Selection,
    pub file_name: String,
    pub viz_path: String,
    pub viz_url: String,
    pub records: usize,
    pub skipped: usize,
    pub cached: bool,
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub categories: BTreeMap<&'static str, Vec<String>>,
    pub forms: BTreeMap<&'static str, FormResponse>,
    pub terminals_by_country: BTreeMap<&'static str, Vec<u32>>,
    pub viewports: BTreeMap<&'static str, Viewport>,
}

// ========== Errors ==========

fn error_kind(err: &VizError) -> &'static str {
    match err {
        VizError::Dataset(e) => match e {
            DatasetError::UnknownOption { .. } => "unknown_option",
            DatasetError::InvalidTokens { .. } => "invalid_tokens",
            DatasetError::UnsafeToken(_) => "unsafe_token",
            DatasetError::ArtifactNotFound(_) => "artifact_not_found",
            DatasetError::MalformedArtifact { .. } => "malformed_artifact",
            DatasetError::EmptyArtifact { .. } => "empty_artifact",
            DatasetError::JoinMismatch { .. } => "join_mismatch",
            DatasetError::Io(_) => "io",
        },
        VizError::OutputDir { .. } | VizError::Io(_) => "io",
        VizError::Render(_) => "render",
    }
}

fn status_for(err: &VizError) -> StatusCode {
    match err.as_dataset() {
        Some(
            DatasetError::UnknownOption { .. }
            | DatasetError::InvalidTokens { .. }
            | DatasetError::UnsafeToken(_),
        ) => StatusCode::BAD_REQUEST,
        Some(DatasetError::ArtifactNotFound(_)) => StatusCode::NOT_FOUND,
        Some(
            DatasetError::MalformedArtifact { .. }
            | DatasetError::EmptyArtifact { .. }
            | DatasetError::JoinMismatch { .. },
        ) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: VizError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Map rendering failed: {}", err);
    } else {
        debug!("Rejected selection: {}", err);
    }
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
            kind: error_kind(&err),
        }),
    )
}

// ========== Forms ==========

fn categories(kind: DatasetKind) -> &'static [Category] {
    match kind {
        DatasetKind::Heatmap => &[
            Category::Country,
            Category::NumberOfTerminals,
            Category::PopulationCap,
            Category::RoutingPolicy,
            Category::IncumbentDemand,
        ],
        DatasetKind::CountryCapacity => &[
            Category::Country,
            Category::NumberOfTerminals,
            Category::UtDistributionAlgorithm,
            Category::BeamAllocation,
        ],
        DatasetKind::GsUtilization => &[
            Category::Country,
            Category::NumberOfTerminals,
            Category::PopulationCap,
            Category::RoutingPolicy,
            Category::Scenario,
        ],
        DatasetKind::CellHeatmap => &[Category::Country, Category::TerminalsCap, Category::Demand],
    }
}

/// A selection as the form field values that would produce it.
fn form_values(selection: &Selection) -> BTreeMap<&'static str, String> {
    let fields: Vec<(Category, String)> = match selection {
        Selection::Heatmap(s) => vec![
            (Category::Country, s.country.display().to_string()),
            (Category::NumberOfTerminals, s.terminals.to_string()),
            (Category::PopulationCap, s.population_cap.display().to_string()),
            (Category::RoutingPolicy, s.routing_policy.display().to_string()),
            (Category::IncumbentDemand, s.incumbent_demand.display().to_string()),
        ],
        Selection::CountryCapacity(s) => vec![
            (Category::Country, s.country.display().to_string()),
            (Category::NumberOfTerminals, s.terminals.to_string()),
            (Category::UtDistributionAlgorithm, s.ut_algorithm.display().to_string()),
            (Category::BeamAllocation, s.beam_allocation.display().to_string()),
        ],
        Selection::GsUtilization(s) => vec![
            (Category::Country, s.country.display().to_string()),
            (Category::NumberOfTerminals, s.terminals.to_string()),
            (Category::PopulationCap, s.population_cap.display().to_string()),
            (Category::RoutingPolicy, s.routing_policy.display().to_string()),
            (Category::Scenario, s.scenario.display().to_string()),
        ],
        Selection::CellHeatmap(s) => vec![
            (Category::Country, s.country.display().to_string()),
            (Category::TerminalsCap, s.terminals_cap.display().to_string()),
            (Category::Demand, s.demand.display().to_string()),
        ],
    };
    fields.into_iter().map(|(c, v)| (c.label(), v)).collect()
}

fn form_for(kind: DatasetKind) -> FormResponse {
    FormResponse {
        kind,
        defaults: form_values(&Selection::default_for(kind)),
        options: categories(kind).iter().map(|c| (c.label(), c.choices())).collect(),
    }
}

// ========== Rendering ==========

async fn render_map(state: AppState, kind: DatasetKind, form: FormValues) -> ApiResult<MapResponse> {
    let selection = Selection::from_form(kind, &form).map_err(|e| api_error(e.into()))?;
    let artifact = selection.resolve().map_err(|e| api_error(e.into()))?;

    let hit = state.cache.read().await.get(&artifact.file_name).cloned();
    let (rendered, cached) = match hit {
        Some(map) if state.pipeline.static_root().join(&map.viz_path).is_file() => {
            debug!("Cache hit for {}", artifact.file_name);
            (map, true)
        }
        _ => {
            let pipeline = state.pipeline.clone();
            let rendered = tokio::task::spawn_blocking(move || pipeline.render(&selection))
                .await
                .map_err(|e| {
                    error!("Render task panicked: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(ErrorBody {
                            error: "Render task failed".to_string(),
                            kind: "internal",
                        }),
                    )
                })?
                .map_err(api_error)?;

            state
                .cache
                .write()
                .await
                .insert(artifact.file_name.clone(), rendered.clone());
            (rendered, false)
        }
    };

    info!("Serving {} map {} (cached: {})", kind, rendered.viz_path, cached);
    Ok(Json(MapResponse {
        kind,
        selection,
        viz_url: format!("/static/{}", rendered.viz_path),
        file_name: rendered.file_name,
        viz_path: rendered.viz_path,
        records: rendered.records,
        skipped: rendered.skipped,
        cached,
    }))
}

// ========== Handlers ==========

pub async fn heatmap_form() -> Json<FormResponse> {
    Json(form_for(DatasetKind::Heatmap))
}

pub async fn heatmap(State(state): State<AppState>, Form(form): Form<FormValues>) -> ApiResult<MapResponse> {
    render_map(state, DatasetKind::Heatmap, form).await
}

pub async fn country_capacity_form() -> Json<FormResponse> {
    Json(form_for(DatasetKind::CountryCapacity))
}

pub async fn country_capacity(
    State(state): State<AppState>,
    Form(form): Form<FormValues>,
) -> ApiResult<MapResponse> {
    render_map(state, DatasetKind::CountryCapacity, form).await
}

pub async fn gs_utilization_form() -> Json<FormResponse> {
    Json(form_for(DatasetKind::GsUtilization))
}

pub async fn gs_utilization(
    State(state): State<AppState>,
    Form(form): Form<FormValues>,
) -> ApiResult<MapResponse> {
    render_map(state, DatasetKind::GsUtilization, form).await
}

pub async fn cell_heatmap_form() -> Json<FormResponse> {
    Json(form_for(DatasetKind::CellHeatmap))
}

pub async fn cell_heatmap(
    State(state): State<AppState>,
    Form(form): Form<FormValues>,
) -> ApiResult<MapResponse> {
    render_map(state, DatasetKind::CellHeatmap, form).await
}

pub async fn options() -> Json<OptionsResponse> {
    let countries = Country::all();
    Json(OptionsResponse {
        categories: Category::ALL.iter().map(|c| (c.label(), c.choices())).collect(),
        forms: DatasetKind::ALL
            .iter()
            .map(|&kind| (kind.as_str(), form_for(kind)))
            .collect(),
        terminals_by_country: countries
            .iter()
            .map(|c| (c.display(), c.terminal_counts().to_vec()))
            .collect(),
        viewports: countries.iter().map(|c| (c.display(), c.viewport())).collect(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cached_maps = state.cache.read().await.len();
    let static_root = state.pipeline.static_root();
    if !static_root.is_dir() {
        warn!("Static root {:?} is missing", static_root);
    }
    Json(serde_json::json!({
        "status": "healthy",
        "service": "capacity-gateway",
        "static_root_present": static_root.is_dir(),
        "cached_maps": cached_maps,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ========== Router ==========

pub fn map_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/options", get(options))
        .route("/heatmap", get(heatmap_form).post(heatmap))
        .route("/country-capacity", get(country_capacity_form).post(country_capacity))
        .route("/gs-utilization", get(gs_utilization_form).post(gs_utilization))
        .route("/cell-heatmap", get(cell_heatmap_form).post(cell_heatmap))
        .with_state(state)
}
