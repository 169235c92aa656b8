use super::domain::{
    AuditEntry, Document, Homologation, HomologationId, Payment, PaymentId,
};

/// Datastore port for homologation records.
///
/// Writers never bump `version` themselves: `update` commits the supplied record
/// only when the stored version still equals `expected_version`, then increments
/// it, so two admins acting on stale data cannot both win.
pub trait HomologationStore: Send + Sync {
    fn insert(&self, record: Homologation) -> Result<Homologation, StoreError>;
    fn fetch(&self, id: &HomologationId) -> Result<Option<Homologation>, StoreError>;
    fn update(
        &self,
        record: Homologation,
        expected_version: u64,
    ) -> Result<Homologation, StoreError>;
    /// Atomic append at the store boundary so concurrent uploads cannot lose
    /// each other's documents to a read-modify-write race.
    fn append_document(
        &self,
        id: &HomologationId,
        document: Document,
    ) -> Result<Homologation, StoreError>;
    /// Cheap connectivity probe used by the startup check.
    fn ping(&self) -> Result<(), StoreError>;
}

/// Datastore port for payment records.
pub trait PaymentStore: Send + Sync {
    fn insert(&self, payment: Payment) -> Result<Payment, StoreError>;
    fn fetch(&self, id: &PaymentId) -> Result<Option<Payment>, StoreError>;
    fn find_by_gateway_id(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<Payment>, StoreError>;
    fn update(&self, payment: Payment) -> Result<Payment, StoreError>;
}

/// Error enumeration for datastore failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("version conflict (expected {expected}, stored {stored})")]
    VersionConflict { expected: u64, stored: u64 },
    #[error("datastore unavailable: {0}")]
    Unavailable(String),
}

/// Blob storage port for uploaded document content.
pub trait BlobStore: Send + Sync {
    fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String, BlobError>;
    fn public_url(&self, path: &str) -> Result<String, BlobError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob storage unavailable: {0}")]
    Unavailable(String),
}

/// Payment preference requested from the gateway for one payment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceRequest {
    /// Our payment id, echoed back by the gateway as the external reference.
    pub external_reference: String,
    pub title: String,
    pub amount_cents: i64,
    pub currency: String,
    pub notification_url: Option<String>,
}

/// Gateway handle returned when a preference is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceReceipt {
    pub preference_id: String,
    pub init_point: String,
}

/// Authoritative payment record as the gateway reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPaymentRecord {
    pub id: String,
    /// Gateway-vocabulary status string, mapped by the reconciler.
    pub status: String,
    /// External reference the preference was created with, when echoed back.
    pub external_reference: Option<String>,
    pub amount_cents: Option<i64>,
}

/// Payment gateway port (preference creation and payment lookup).
pub trait PaymentGateway: Send + Sync {
    fn create_preference(
        &self,
        request: PreferenceRequest,
    ) -> Result<PreferenceReceipt, GatewayError>;
    fn get_payment(&self, gateway_payment_id: &str)
        -> Result<GatewayPaymentRecord, GatewayError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
    #[error("gateway has no payment '{0}'")]
    UnknownPayment(String),
}

/// Outbound audit-trail hook appended to on every successful admin transition.
pub trait AuditTrail: Send + Sync {
    fn append(&self, id: &HomologationId, entry: AuditEntry) -> Result<(), AuditError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit trail unavailable: {0}")]
    Unavailable(String),
}
