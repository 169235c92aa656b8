//! Vehicle-homologation workflow: lifecycle transitions, payment
//! reconciliation, document intake, and the admin review surface.

pub mod domain;
pub mod ports;
pub mod reconciler;
pub mod router;
pub mod service;
pub mod transitions;

#[cfg(test)]
mod tests;

pub use domain::{
    AuditEntry, Document, DocumentId, DocumentType, Homologation, HomologationId,
    HomologationStatus, OwnerIdentity, Payment, PaymentId, PaymentState, PaymentStatus,
    VehicleDescriptor,
};
pub use ports::{
    AuditError, AuditTrail, BlobError, BlobStore, GatewayError, GatewayPaymentRecord,
    HomologationStore, PaymentGateway, PaymentStore, PreferenceReceipt, PreferenceRequest,
    StoreError,
};
pub use reconciler::{
    map_gateway_status, GatewayNotification, PaymentReconciler, ReconcileError, ReconcileOutcome,
};
pub use router::{homologation_router, WorkflowState};
pub use service::{
    AttachDocumentRequest, CreateHomologationRequest, CreatePreferenceRequest,
    HomologationService, HomologationServiceError, PreferenceCreated, ServiceSettings,
    TransitionRequest, ValidationError,
};
pub use transitions::{
    allowed_targets, plan_transition, submission_gate, InvalidTransition, LifecycleStamp,
    SubmissionBlocked, TransitionPlan,
};
