use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::domain::{
    AuditEntry, Document, DocumentId, DocumentType, Homologation, HomologationId,
    HomologationStatus, OwnerIdentity, Payment, PaymentId, PaymentState, PaymentStatus,
    VehicleDescriptor,
};
use super::ports::{
    AuditError, AuditTrail, BlobError, BlobStore, GatewayError, HomologationStore,
    PaymentGateway, PaymentStore, PreferenceReceipt, PreferenceRequest, StoreError,
};
use super::transitions::{
    plan_transition, submission_gate, InvalidTransition, LifecycleStamp, SubmissionBlocked,
};

static HOMOLOGATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static DOCUMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static PAYMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_homologation_id() -> HomologationId {
    let id = HOMOLOGATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    HomologationId(format!("hom-{id:06}"))
}

fn next_document_id() -> DocumentId {
    let id = DOCUMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DocumentId(format!("doc-{id:06}"))
}

fn next_payment_id() -> PaymentId {
    let id = PAYMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    PaymentId(format!("pay-{id:06}"))
}

/// Request payloads accepted by the workflow facade.
#[derive(Debug, Clone)]
pub struct CreateHomologationRequest {
    pub owner: OwnerIdentity,
    pub vehicle: VehicleDescriptor,
}

#[derive(Debug, Clone)]
pub struct AttachDocumentRequest {
    pub homologation_id: HomologationId,
    pub name: String,
    pub doc_type: DocumentType,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct CreatePreferenceRequest {
    pub homologation_id: HomologationId,
    pub amount_cents: i64,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub homologation_id: HomologationId,
    pub target: HomologationStatus,
    pub expected_version: u64,
    pub actor: String,
    pub reason: Option<String>,
}

/// Preference creation result surfaced to the wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceCreated {
    pub payment: Payment,
    pub preference_id: String,
    pub init_point: String,
}

/// Malformed or missing request fields, rejected before any collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("owner full name must not be empty")]
    EmptyOwnerName,
    #[error("vehicle identification number must not be empty")]
    EmptyVin,
    #[error("document name must not be empty")]
    EmptyDocumentName,
    #[error("document content must not be empty")]
    EmptyDocumentContent,
    #[error("document content type must not be empty")]
    EmptyContentType,
    #[error("amount must be greater than zero")]
    NonPositiveAmount,
    #[error("payment description must not be empty")]
    EmptyDescription,
    #[error("actor must not be empty")]
    EmptyActor,
    #[error("documents may only be attached in draft (currently '{current}')")]
    DocumentsLocked { current: HomologationStatus },
}

/// Error raised by the workflow facade.
#[derive(Debug, thiserror::Error)]
pub enum HomologationServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("homologation '{0}' not found")]
    HomologationNotFound(String),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error(transparent)]
    SubmissionBlocked(#[from] SubmissionBlocked),
    #[error("version conflict: expected {expected}, stored {stored}")]
    VersionConflict { expected: u64, stored: u64 },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Audit(#[from] AuditError),
}

/// Knobs the facade needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub currency: String,
    pub notification_url: Option<String>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            currency: "ARS".to_string(),
            notification_url: None,
        }
    }
}

/// Facade composing the stores, blob storage, payment gateway, and audit trail
/// behind the applicant- and admin-facing operations.
pub struct HomologationService<H, P, B, G, A> {
    homologations: Arc<H>,
    payments: Arc<P>,
    blobs: Arc<B>,
    gateway: Arc<G>,
    audit: Arc<A>,
    settings: ServiceSettings,
}

impl<H, P, B, G, A> HomologationService<H, P, B, G, A>
where
    H: HomologationStore + 'static,
    P: PaymentStore + 'static,
    B: BlobStore + 'static,
    G: PaymentGateway + 'static,
    A: AuditTrail + 'static,
{
    pub fn new(
        homologations: Arc<H>,
        payments: Arc<P>,
        blobs: Arc<B>,
        gateway: Arc<G>,
        audit: Arc<A>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            homologations,
            payments,
            blobs,
            gateway,
            audit,
            settings,
        }
    }

    /// Open a new case in `draft`.
    pub fn create(
        &self,
        request: CreateHomologationRequest,
    ) -> Result<Homologation, HomologationServiceError> {
        if request.owner.full_name.trim().is_empty() {
            return Err(ValidationError::EmptyOwnerName.into());
        }
        if request.vehicle.vin.trim().is_empty() {
            return Err(ValidationError::EmptyVin.into());
        }

        let record = Homologation {
            id: next_homologation_id(),
            owner: request.owner,
            vehicle: request.vehicle,
            status: HomologationStatus::Draft,
            payment_status: PaymentState::Pending,
            documents: Vec::new(),
            submission_date: None,
            review_date: None,
            completion_date: None,
            created_at: Utc::now(),
            version: 1,
        };

        Ok(self.homologations.insert(record)?)
    }

    pub fn get(&self, id: &HomologationId) -> Result<Homologation, HomologationServiceError> {
        self.homologations
            .fetch(id)?
            .ok_or_else(|| HomologationServiceError::HomologationNotFound(id.0.clone()))
    }

    /// Upload one supporting document and append it to the case.
    pub fn attach_document(
        &self,
        request: AttachDocumentRequest,
    ) -> Result<Document, HomologationServiceError> {
        if request.name.trim().is_empty() {
            return Err(ValidationError::EmptyDocumentName.into());
        }
        if request.content.is_empty() {
            return Err(ValidationError::EmptyDocumentContent.into());
        }
        if request.content_type.trim().is_empty() {
            return Err(ValidationError::EmptyContentType.into());
        }

        let record = self.get(&request.homologation_id)?;
        if record.status != HomologationStatus::Draft {
            return Err(ValidationError::DocumentsLocked {
                current: record.status,
            }
            .into());
        }

        let document_id = next_document_id();
        let path = format!(
            "homologations/{}/{}/{}",
            record.id.0, document_id.0, request.name
        );
        let url = self
            .blobs
            .upload(&path, &request.content, &request.content_type)?;

        let document = Document {
            id: document_id,
            homologation_id: record.id.clone(),
            name: request.name,
            doc_type: request.doc_type,
            url,
            size_bytes: request.content.len() as u64,
            content_type: request.content_type,
            uploaded_at: Utc::now(),
        };

        self.homologations
            .append_document(&record.id, document.clone())?;
        Ok(document)
    }

    /// Ask the gateway for a checkout preference and record the pending attempt.
    pub fn create_payment_preference(
        &self,
        request: CreatePreferenceRequest,
    ) -> Result<PreferenceCreated, HomologationServiceError> {
        if request.amount_cents <= 0 {
            return Err(ValidationError::NonPositiveAmount.into());
        }
        if request.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription.into());
        }

        let record = self.get(&request.homologation_id)?;

        let payment_id = next_payment_id();
        let PreferenceReceipt {
            preference_id,
            init_point,
        } = self.gateway.create_preference(PreferenceRequest {
            external_reference: payment_id.0.clone(),
            title: request.description,
            amount_cents: request.amount_cents,
            currency: self.settings.currency.clone(),
            notification_url: self.settings.notification_url.clone(),
        })?;

        let now = Utc::now();
        let payment = self.payments.insert(Payment {
            id: payment_id,
            homologation_id: record.id,
            amount_cents: request.amount_cents,
            currency: self.settings.currency.clone(),
            preference_id: preference_id.clone(),
            gateway_payment_id: None,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        })?;

        Ok(PreferenceCreated {
            payment,
            preference_id,
            init_point,
        })
    }

    /// Advance a case through its lifecycle on behalf of an admin.
    ///
    /// Exactly one homologation write and one audit append on success.
    pub fn transition(
        &self,
        request: TransitionRequest,
    ) -> Result<Homologation, HomologationServiceError> {
        if request.actor.trim().is_empty() {
            return Err(ValidationError::EmptyActor.into());
        }

        let record = self.get(&request.homologation_id)?;
        if record.version != request.expected_version {
            return Err(HomologationServiceError::VersionConflict {
                expected: request.expected_version,
                stored: record.version,
            });
        }

        let plan = plan_transition(record.status, request.target)?;
        if plan.requires_submission_gate {
            submission_gate(&record)?;
        }

        let previous_status = record.status;
        let mut mutated = record;
        mutated.status = plan.target;
        match plan.stamp {
            Some(LifecycleStamp::Submission) => mutated.submission_date = Some(Utc::now()),
            Some(LifecycleStamp::Review) => mutated.review_date = Some(Utc::now()),
            Some(LifecycleStamp::Completion) => mutated.completion_date = Some(Utc::now()),
            None => {}
        }

        let updated = self
            .homologations
            .update(mutated, request.expected_version)
            .map_err(|err| match err {
                StoreError::VersionConflict { expected, stored } => {
                    HomologationServiceError::VersionConflict { expected, stored }
                }
                StoreError::NotFound => HomologationServiceError::HomologationNotFound(
                    request.homologation_id.0.clone(),
                ),
                other => HomologationServiceError::Store(other),
            })?;

        self.audit.append(
            &updated.id,
            AuditEntry {
                actor: request.actor,
                previous_status,
                new_status: updated.status,
                reason: request.reason,
                recorded_at: Utc::now(),
            },
        )?;

        Ok(updated)
    }
}
