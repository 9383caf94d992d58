use crate::infra::{ApiState, AppState};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use estimpro::error::AppError;
use estimpro::workflows::estimation::{
    generate_report, Advance, DraftPatch, ReportFormat, ResultsView,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResultsQuery {
    #[serde(rename = "propertyData")]
    pub(crate) property_data: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReportQuery {
    #[serde(rename = "propertyData")]
    pub(crate) property_data: Option<String>,
    #[serde(default)]
    pub(crate) format: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct HandoffResponse {
    pub(crate) property_data: String,
    pub(crate) results_path: String,
}

pub(crate) fn estimation_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/wizard", post(create_wizard))
        .route(
            "/api/v1/wizard/:session_id",
            get(wizard_state).patch(update_wizard),
        )
        .route("/api/v1/wizard/:session_id/next", post(wizard_next))
        .route("/api/v1/wizard/:session_id/previous", post(wizard_previous))
        .route("/api/v1/results", get(results_endpoint))
        .route("/api/v1/report", get(report_endpoint))
        .route("/api/v1/exchange-rate/retry", post(retry_exchange_rate))
        .with_state(state)
}

pub(crate) fn with_estimation_routes(state: ApiState) -> Router {
    estimation_router(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn create_wizard(State(state): State<ApiState>) -> Response {
    let (session_id, wizard) = state.sessions.create();
    tracing::info!(%session_id, "wizard session opened");
    let payload = json!({ "session_id": session_id, "wizard": wizard.snapshot() });
    (StatusCode::CREATED, Json(payload)).into_response()
}

async fn wizard_state(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<Response, AppError> {
    let wizard = state.sessions.fetch(&session_id)?;
    Ok(Json(wizard.snapshot()).into_response())
}

async fn update_wizard(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    Json(patch): Json<DraftPatch>,
) -> Result<Response, AppError> {
    state.sessions.ensure_idle(&session_id)?;
    let mut wizard = state.sessions.fetch(&session_id)?;
    wizard.apply(patch)?;
    state.sessions.store(&session_id, wizard.clone());
    Ok(Json(wizard.snapshot()).into_response())
}

async fn wizard_previous(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<Response, AppError> {
    state.sessions.ensure_idle(&session_id)?;
    let mut wizard = state.sessions.fetch(&session_id)?;
    wizard.previous();
    state.sessions.store(&session_id, wizard.clone());
    Ok(Json(wizard.snapshot()).into_response())
}

async fn wizard_next(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<Response, AppError> {
    state.sessions.ensure_idle(&session_id)?;
    let mut wizard = state.sessions.fetch(&session_id)?;
    if let Advance::Moved(_) = wizard.next() {
        state.sessions.store(&session_id, wizard.clone());
        return Ok(Json(wizard.snapshot()).into_response());
    }

    // The stored wizard stays at Confirmation; dropping this request before
    // geocoding settles releases the guard and leaves the session editable.
    let _submission = state.sessions.begin_submission(&session_id)?;
    match wizard.submit(state.services.geocoder.as_ref()).await {
        Ok(handoff) => {
            state.sessions.remove(&session_id);
            let payload = HandoffResponse {
                results_path: handoff.results_path(),
                property_data: handoff.into_property_data(),
            };
            Ok(Json(payload).into_response())
        }
        Err(rejected) => {
            let snapshot = rejected.wizard.snapshot();
            state.sessions.store(&session_id, *rejected.wizard);
            let payload = json!({ "error": rejected.error.to_string(), "wizard": snapshot });
            Ok((AppError::from(rejected.error).status(), Json(payload)).into_response())
        }
    }
}

fn view_status(view: &ResultsView) -> StatusCode {
    match view {
        ResultsView::Error(failure) => failure
            .errors()
            .next()
            .cloned()
            .map(|err| AppError::from(err).status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        ResultsView::Loading | ResultsView::Ready(_) => StatusCode::OK,
    }
}

async fn results_endpoint(
    State(state): State<ApiState>,
    Query(query): Query<ResultsQuery>,
) -> Response {
    let surface = state.services.results_surface();
    let view = surface.load(query.property_data.as_deref()).await;
    (view_status(&view), Json(view)).into_response()
}

async fn report_endpoint(
    State(state): State<ApiState>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, AppError> {
    let format = match query.format.as_deref() {
        Some(raw) => raw.parse::<ReportFormat>()?,
        None => ReportFormat::default(),
    };

    let page = state
        .services
        .results_surface()
        .load(query.property_data.as_deref())
        .await
        .into_page()?;

    let report = generate_report(
        &page.property,
        &page.valuation,
        &state.services.converter.rate_status(),
    )?;
    let body = report.render(format)?;
    let disposition = format!("attachment; filename=\"{}\"", report.file_name(format));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn retry_exchange_rate(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let cleared = state.services.converter.retry();
    let status = state.services.converter.rate_status();
    Json(json!({ "cleared": cleared, "status": status.label() }))
}
