use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use super::domain::{DocumentType, HomologationId, HomologationStatus, OwnerIdentity, VehicleDescriptor};
use super::ports::{AuditTrail, BlobStore, HomologationStore, PaymentGateway, PaymentStore};
use super::reconciler::{GatewayNotification, PaymentReconciler, ReconcileError};
use super::service::{
    AttachDocumentRequest, CreateHomologationRequest, CreatePreferenceRequest,
    HomologationService, HomologationServiceError, TransitionRequest,
};

/// Shared router state bundling the workflow facade and the reconciler.
pub struct WorkflowState<H, P, B, G, A> {
    pub service: Arc<HomologationService<H, P, B, G, A>>,
    pub reconciler: Arc<PaymentReconciler<P, H, G>>,
}

impl<H, P, B, G, A> Clone for WorkflowState<H, P, B, G, A> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            reconciler: Arc::clone(&self.reconciler),
        }
    }
}

/// Router builder exposing the workflow's HTTP surface.
pub fn homologation_router<H, P, B, G, A>(state: WorkflowState<H, P, B, G, A>) -> Router
where
    H: HomologationStore + 'static,
    P: PaymentStore + 'static,
    B: BlobStore + 'static,
    G: PaymentGateway + 'static,
    A: AuditTrail + 'static,
{
    Router::new()
        .route(
            "/api/v1/homologations",
            post(create_handler::<H, P, B, G, A>),
        )
        .route(
            "/api/v1/homologations/:homologation_id",
            get(get_handler::<H, P, B, G, A>),
        )
        .route(
            "/api/v1/homologations/:homologation_id/documents",
            post(attach_document_handler::<H, P, B, G, A>),
        )
        .route(
            "/api/v1/homologations/:homologation_id/transition",
            post(transition_handler::<H, P, B, G, A>),
        )
        .route(
            "/api/v1/payments/preference",
            post(preference_handler::<H, P, B, G, A>),
        )
        .route(
            "/api/v1/payments/webhook",
            post(webhook_handler::<H, P, B, G, A>),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateHomologationBody {
    pub(crate) owner: OwnerIdentity,
    pub(crate) vehicle: VehicleDescriptor,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttachDocumentBody {
    pub(crate) name: String,
    pub(crate) document_type: DocumentType,
    pub(crate) content_type: String,
    /// Base64-encoded file bytes.
    pub(crate) content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionBody {
    pub(crate) target_status: HomologationStatus,
    pub(crate) expected_version: u64,
    pub(crate) actor: String,
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PreferenceBody {
    pub(crate) homologation_id: String,
    pub(crate) amount_cents: i64,
    pub(crate) description: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WebhookBody {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    pub(crate) data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WebhookData {
    /// The gateway sends both numeric and string payment ids.
    pub(crate) id: serde_json::Value,
}

fn error_response(error: &HomologationServiceError) -> Response {
    let status = match error {
        HomologationServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        HomologationServiceError::HomologationNotFound(_) => StatusCode::NOT_FOUND,
        HomologationServiceError::InvalidTransition(_)
        | HomologationServiceError::SubmissionBlocked(_) => StatusCode::UNPROCESSABLE_ENTITY,
        HomologationServiceError::VersionConflict { .. } => StatusCode::CONFLICT,
        HomologationServiceError::Store(_)
        | HomologationServiceError::Blob(_)
        | HomologationServiceError::Gateway(_)
        | HomologationServiceError::Audit(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

pub(crate) async fn create_handler<H, P, B, G, A>(
    State(state): State<WorkflowState<H, P, B, G, A>>,
    Json(body): Json<CreateHomologationBody>,
) -> Response
where
    H: HomologationStore + 'static,
    P: PaymentStore + 'static,
    B: BlobStore + 'static,
    G: PaymentGateway + 'static,
    A: AuditTrail + 'static,
{
    match state.service.create(CreateHomologationRequest {
        owner: body.owner,
        vehicle: body.vehicle,
    }) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn get_handler<H, P, B, G, A>(
    State(state): State<WorkflowState<H, P, B, G, A>>,
    Path(homologation_id): Path<String>,
) -> Response
where
    H: HomologationStore + 'static,
    P: PaymentStore + 'static,
    B: BlobStore + 'static,
    G: PaymentGateway + 'static,
    A: AuditTrail + 'static,
{
    match state.service.get(&HomologationId(homologation_id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn attach_document_handler<H, P, B, G, A>(
    State(state): State<WorkflowState<H, P, B, G, A>>,
    Path(homologation_id): Path<String>,
    Json(body): Json<AttachDocumentBody>,
) -> Response
where
    H: HomologationStore + 'static,
    P: PaymentStore + 'static,
    B: BlobStore + 'static,
    G: PaymentGateway + 'static,
    A: AuditTrail + 'static,
{
    let content = match BASE64.decode(body.content.as_bytes()) {
        Ok(bytes) => bytes,
        Err(_) => {
            let payload = json!({ "error": "document content is not valid base64" });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };

    match state.service.attach_document(AttachDocumentRequest {
        homologation_id: HomologationId(homologation_id),
        name: body.name,
        doc_type: body.document_type,
        content_type: body.content_type,
        content,
    }) {
        Ok(document) => (StatusCode::CREATED, Json(document)).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn transition_handler<H, P, B, G, A>(
    State(state): State<WorkflowState<H, P, B, G, A>>,
    Path(homologation_id): Path<String>,
    Json(body): Json<TransitionBody>,
) -> Response
where
    H: HomologationStore + 'static,
    P: PaymentStore + 'static,
    B: BlobStore + 'static,
    G: PaymentGateway + 'static,
    A: AuditTrail + 'static,
{
    match state.service.transition(TransitionRequest {
        homologation_id: HomologationId(homologation_id),
        target: body.target_status,
        expected_version: body.expected_version,
        actor: body.actor,
        reason: body.reason,
    }) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn preference_handler<H, P, B, G, A>(
    State(state): State<WorkflowState<H, P, B, G, A>>,
    Json(body): Json<PreferenceBody>,
) -> Response
where
    H: HomologationStore + 'static,
    P: PaymentStore + 'static,
    B: BlobStore + 'static,
    G: PaymentGateway + 'static,
    A: AuditTrail + 'static,
{
    match state.service.create_payment_preference(CreatePreferenceRequest {
        homologation_id: HomologationId(body.homologation_id),
        amount_cents: body.amount_cents,
        description: body.description,
    }) {
        Ok(created) => {
            let payload = json!({
                "preference_id": created.preference_id,
                "init_point": created.init_point,
                "payment_id": created.payment.id.0,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn webhook_handler<H, P, B, G, A>(
    State(state): State<WorkflowState<H, P, B, G, A>>,
    Json(body): Json<WebhookBody>,
) -> Response
where
    H: HomologationStore + 'static,
    P: PaymentStore + 'static,
    B: BlobStore + 'static,
    G: PaymentGateway + 'static,
    A: AuditTrail + 'static,
{
    let payment_id = match &body.data.id {
        serde_json::Value::String(id) => id.clone(),
        serde_json::Value::Number(id) => id.to_string(),
        _ => {
            let payload = json!({ "received": false, "error": "data.id must be a string or number" });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };

    match state.reconciler.reconcile(GatewayNotification {
        kind: body.kind,
        payment_id,
    }) {
        Ok(_) => (StatusCode::OK, Json(json!({ "received": true }))).into_response(),
        Err(error @ ReconcileError::PaymentRecordNotFound(_)) => {
            let payload = json!({ "received": false, "error": error.to_string() });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(error @ ReconcileError::GatewayUnavailable(_))
        | Err(error @ ReconcileError::StoreUnavailable(_)) => {
            let payload = json!({ "received": false, "error": error.to_string() });
            (StatusCode::SERVICE_UNAVAILABLE, Json(payload)).into_response()
        }
    }
}
