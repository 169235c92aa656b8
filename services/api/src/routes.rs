use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use homologa::workflows::homologation::{
    homologation_router, AuditTrail, BlobStore, HomologationStore, PaymentGateway, PaymentStore,
    WorkflowState,
};
use serde_json::json;

pub(crate) fn with_workflow_routes<H, P, B, G, A>(
    state: WorkflowState<H, P, B, G, A>,
) -> axum::Router
where
    H: HomologationStore + 'static,
    P: PaymentStore + 'static,
    B: BlobStore + 'static,
    G: PaymentGateway + 'static,
    A: AuditTrail + 'static,
{
    homologation_router(state)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
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
        json!({ "status": "degraded" })
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
