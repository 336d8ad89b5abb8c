// Cash Drawer - Reporting API
// Read-mostly REST API over the drawer database (axum)

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use cash_drawer::{
    init_logging, AppConfig, CashDrawerService, CashError, CountRecord, CountTotals, CountType,
    DenominationCount, DrawerSettings, DrawerSummary, RecordFilter, ReconciliationReport,
    SqliteRepository,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
struct AppState {
    service: Arc<Mutex<CashDrawerService<SqliteRepository>>>,
}

impl AppState {
    fn service(&self) -> MutexGuard<'_, CashDrawerService<SqliteRepository>> {
        self.service.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Library errors mapped onto HTTP status codes
struct ApiError(CashError);

impl From<CashError> for ApiError {
    fn from(err: CashError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CashError::NotFound { .. } => StatusCode::NOT_FOUND,
            CashError::Validation(_) | CashError::NotAClosingRecord(_) => StatusCode::BAD_REQUEST,
            CashError::InactiveDrawer(_) | CashError::DuplicateSubmission { .. } => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "request failed");
        }

        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.0.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Deserialize)]
struct RecordsQuery {
    #[serde(rename = "type")]
    count_type: Option<CountType>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct TotalsRequest {
    drawer_id: String,
    count_type: CountType,
    denominations: DenominationCount,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/drawers - All drawers with their targets
async fn list_drawers(State(state): State<AppState>) -> ApiResult<Vec<DrawerSettings>> {
    Ok(Json(ApiResponse::ok(state.service().drawers()?)))
}

/// GET /api/drawers/:id/records - Counts of one drawer, newest first
async fn drawer_records(
    State(state): State<AppState>,
    Path(drawer_id): Path<String>,
    Query(query): Query<RecordsQuery>,
) -> ApiResult<Vec<CountRecord>> {
    let filter = RecordFilter {
        drawer_id: Some(drawer_id),
        count_type: query.count_type,
        from: query.from,
        to: query.to,
    };
    Ok(Json(ApiResponse::ok(state.service().list_counts(&filter)?)))
}

/// GET /api/drawers/:id/summary - Latest opening vs latest closing
async fn drawer_summary(
    State(state): State<AppState>,
    Path(drawer_id): Path<String>,
) -> ApiResult<DrawerSummary> {
    Ok(Json(ApiResponse::ok(state.service().drawer_summary(&drawer_id)?)))
}

/// GET /api/records/:id
async fn get_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> ApiResult<CountRecord> {
    Ok(Json(ApiResponse::ok(state.service().get_count(&record_id)?)))
}

/// GET /api/records/:id/discrepancy - Reconcile one closing count
async fn record_discrepancy(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> ApiResult<ReconciliationReport> {
    Ok(Json(ApiResponse::ok(state.service().reconcile(&record_id)?)))
}

/// POST /api/totals - Preview totals and cash-out without saving
async fn preview_totals(
    State(state): State<AppState>,
    Json(request): Json<TotalsRequest>,
) -> ApiResult<CountTotals> {
    let totals = state.service().preview_totals(
        &request.drawer_id,
        request.count_type,
        &request.denominations,
    )?;
    Ok(Json(ApiResponse::ok(totals)))
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/drawers", get(list_drawers))
        .route("/drawers/:id/records", get(drawer_records))
        .route("/drawers/:id/summary", get(drawer_summary))
        .route("/records/:id", get(get_record))
        .route("/records/:id/discrepancy", get(record_discrepancy))
        .route("/totals", post(preview_totals))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::load_or_default(None)?;
    init_logging(&cfg.logging);

    let db_path = &cfg.database.path;
    let repo = SqliteRepository::open(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let state = AppState {
        service: Arc::new(Mutex::new(CashDrawerService::new(repo))),
    };

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", cfg.server.bind))?;

    info!(bind = %cfg.server.bind, db = %db_path.display(), "reporting API listening");

    axum::serve(listener, router(state))
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
