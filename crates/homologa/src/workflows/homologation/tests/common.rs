use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::workflows::homologation::domain::{
    AuditEntry, Document, DocumentId, DocumentType, Homologation, HomologationId,
    HomologationStatus, OwnerIdentity, Payment, PaymentId, PaymentState, PaymentStatus,
    VehicleDescriptor,
};
use crate::workflows::homologation::ports::{
    AuditError, AuditTrail, BlobError, BlobStore, GatewayError, GatewayPaymentRecord,
    HomologationStore, PaymentGateway, PaymentStore, PreferenceReceipt, PreferenceRequest,
    StoreError,
};
use crate::workflows::homologation::reconciler::PaymentReconciler;
use crate::workflows::homologation::service::{HomologationService, ServiceSettings};
use crate::workflows::homologation::{homologation_router, WorkflowState};

#[derive(Default, Clone)]
pub(super) struct MemoryHomologationStore {
    pub(super) records: Arc<Mutex<HashMap<HomologationId, Homologation>>>,
}

impl HomologationStore for MemoryHomologationStore {
    fn insert(&self, record: Homologation) -> Result<Homologation, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &HomologationId) -> Result<Option<Homologation>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(
        &self,
        mut record: Homologation,
        expected_version: u64,
    ) -> Result<Homologation, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let stored = guard.get(&record.id).ok_or(StoreError::NotFound)?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                stored: stored.version,
            });
        }
        record.version = expected_version + 1;
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn append_document(
        &self,
        id: &HomologationId,
        document: Document,
    ) -> Result<Homologation, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let record = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        record.documents.push(document);
        record.version += 1;
        Ok(record.clone())
    }

    fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryPaymentStore {
    pub(super) records: Arc<Mutex<HashMap<PaymentId, Payment>>>,
}

impl PaymentStore for MemoryPaymentStore {
    fn insert(&self, payment: Payment) -> Result<Payment, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&payment.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(payment.id.clone(), payment.clone());
        Ok(payment)
    }

    fn fetch(&self, id: &PaymentId) -> Result<Option<Payment>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_by_gateway_id(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .find(|payment| payment.gateway_payment_id.as_deref() == Some(gateway_payment_id))
            .cloned())
    }

    fn update(&self, payment: Payment) -> Result<Payment, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if !guard.contains_key(&payment.id) {
            return Err(StoreError::NotFound);
        }
        guard.insert(payment.id.clone(), payment.clone());
        Ok(payment)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryBlobStore {
    pub(super) uploads: Arc<Mutex<Vec<(String, u64, String)>>>,
    pub(super) unavailable: Arc<AtomicBool>,
}

impl MemoryBlobStore {
    pub(super) fn set_unavailable(&self, value: bool) {
        self.unavailable.store(value, Ordering::Relaxed);
    }
}

impl BlobStore for MemoryBlobStore {
    fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String, BlobError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(BlobError::Unavailable("blob store offline".to_string()));
        }
        self.uploads.lock().expect("blob mutex poisoned").push((
            path.to_string(),
            bytes.len() as u64,
            content_type.to_string(),
        ));
        Ok(format!("https://blobs.test/{path}"))
    }

    fn public_url(&self, path: &str) -> Result<String, BlobError> {
        Ok(format!("https://blobs.test/{path}"))
    }
}

/// Gateway fake: preferences are recorded, payment lookups served from a
/// scripted map so tests control what the gateway "knows".
#[derive(Default, Clone)]
pub(super) struct ScriptedGateway {
    pub(super) preferences: Arc<Mutex<Vec<PreferenceRequest>>>,
    pub(super) payments: Arc<Mutex<HashMap<String, GatewayPaymentRecord>>>,
    sequence: Arc<AtomicU64>,
    unavailable: Arc<AtomicBool>,
}

impl ScriptedGateway {
    pub(super) fn script_payment(
        &self,
        gateway_payment_id: &str,
        status: &str,
        external_reference: Option<&str>,
    ) {
        self.payments.lock().expect("gateway mutex poisoned").insert(
            gateway_payment_id.to_string(),
            GatewayPaymentRecord {
                id: gateway_payment_id.to_string(),
                status: status.to_string(),
                external_reference: external_reference.map(str::to_string),
                amount_cents: Some(150_000),
            },
        );
    }

    pub(super) fn set_unavailable(&self, value: bool) {
        self.unavailable.store(value, Ordering::Relaxed);
    }
}

impl PaymentGateway for ScriptedGateway {
    fn create_preference(
        &self,
        request: PreferenceRequest,
    ) -> Result<PreferenceReceipt, GatewayError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(GatewayError::Unavailable("gateway offline".to_string()));
        }
        let n = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.preferences
            .lock()
            .expect("gateway mutex poisoned")
            .push(request);
        Ok(PreferenceReceipt {
            preference_id: format!("pref-{n:04}"),
            init_point: format!("https://gateway.test/checkout/pref-{n:04}"),
        })
    }

    fn get_payment(
        &self,
        gateway_payment_id: &str,
    ) -> Result<GatewayPaymentRecord, GatewayError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(GatewayError::Unavailable("gateway offline".to_string()));
        }
        self.payments
            .lock()
            .expect("gateway mutex poisoned")
            .get(gateway_payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownPayment(gateway_payment_id.to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct RecordingAuditTrail {
    entries: Arc<Mutex<Vec<(HomologationId, AuditEntry)>>>,
}

impl RecordingAuditTrail {
    pub(super) fn entries(&self) -> Vec<(HomologationId, AuditEntry)> {
        self.entries.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditTrail for RecordingAuditTrail {
    fn append(&self, id: &HomologationId, entry: AuditEntry) -> Result<(), AuditError> {
        self.entries
            .lock()
            .expect("audit mutex poisoned")
            .push((id.clone(), entry));
        Ok(())
    }
}

pub(super) type TestService = HomologationService<
    MemoryHomologationStore,
    MemoryPaymentStore,
    MemoryBlobStore,
    ScriptedGateway,
    RecordingAuditTrail,
>;

pub(super) type TestReconciler =
    PaymentReconciler<MemoryPaymentStore, MemoryHomologationStore, ScriptedGateway>;

pub(super) struct Harness {
    pub(super) service: Arc<TestService>,
    pub(super) reconciler: Arc<TestReconciler>,
    pub(super) homologations: Arc<MemoryHomologationStore>,
    pub(super) payments: Arc<MemoryPaymentStore>,
    pub(super) blobs: Arc<MemoryBlobStore>,
    pub(super) gateway: Arc<ScriptedGateway>,
    pub(super) audit: Arc<RecordingAuditTrail>,
}

pub(super) fn harness() -> Harness {
    let homologations = Arc::new(MemoryHomologationStore::default());
    let payments = Arc::new(MemoryPaymentStore::default());
    let blobs = Arc::new(MemoryBlobStore::default());
    let gateway = Arc::new(ScriptedGateway::default());
    let audit = Arc::new(RecordingAuditTrail::default());

    let service = Arc::new(HomologationService::new(
        homologations.clone(),
        payments.clone(),
        blobs.clone(),
        gateway.clone(),
        audit.clone(),
        ServiceSettings::default(),
    ));
    let reconciler = Arc::new(PaymentReconciler::new(
        payments.clone(),
        homologations.clone(),
        gateway.clone(),
    ));

    Harness {
        service,
        reconciler,
        homologations,
        payments,
        blobs,
        gateway,
        audit,
    }
}

pub(super) fn test_router(harness: &Harness) -> axum::Router {
    homologation_router(WorkflowState {
        service: harness.service.clone(),
        reconciler: harness.reconciler.clone(),
    })
}

pub(super) fn owner() -> OwnerIdentity {
    OwnerIdentity {
        full_name: "Marta Quiroga".to_string(),
        email: "marta.quiroga@example.com".to_string(),
        national_id: "27-22893412-5".to_string(),
    }
}

pub(super) fn vehicle() -> VehicleDescriptor {
    VehicleDescriptor {
        make: "Ford".to_string(),
        model: "Falcon".to_string(),
        year: 1978,
        vin: "8AFDT33H1J8B12345".to_string(),
        plate: Some("AB123CD".to_string()),
    }
}

/// Seed a case directly into the store at a given lifecycle point.
pub(super) fn seed_homologation(
    store: &MemoryHomologationStore,
    suffix: &str,
    status: HomologationStatus,
    payment_status: PaymentState,
    document_count: usize,
) -> Homologation {
    let id = HomologationId(format!("hom-test-{suffix}"));
    let documents = (0..document_count)
        .map(|n| sample_document(&id, &format!("{suffix}-{n}")))
        .collect();
    let record = Homologation {
        id: id.clone(),
        owner: owner(),
        vehicle: vehicle(),
        status,
        payment_status,
        documents,
        submission_date: None,
        review_date: None,
        completion_date: None,
        created_at: Utc::now(),
        version: 1,
    };
    store.insert(record).expect("seed insert succeeds")
}

pub(super) fn sample_document(homologation_id: &HomologationId, suffix: &str) -> Document {
    Document {
        id: DocumentId(format!("doc-test-{suffix}")),
        homologation_id: homologation_id.clone(),
        name: "titulo.pdf".to_string(),
        doc_type: DocumentType::VehicleTitle,
        url: format!("https://blobs.test/homologations/{}/titulo.pdf", homologation_id.0),
        size_bytes: 2048,
        content_type: "application/pdf".to_string(),
        uploaded_at: Utc::now(),
    }
}

/// Seed a pending payment as preference creation would leave it.
pub(super) fn seed_payment(
    store: &MemoryPaymentStore,
    homologation_id: &HomologationId,
    suffix: &str,
    status: PaymentStatus,
    gateway_payment_id: Option<&str>,
) -> Payment {
    let now = Utc::now();
    let payment = Payment {
        id: PaymentId(format!("pay-test-{suffix}")),
        homologation_id: homologation_id.clone(),
        amount_cents: 150_000,
        currency: "ARS".to_string(),
        preference_id: format!("pref-test-{suffix}"),
        gateway_payment_id: gateway_payment_id.map(str::to_string),
        status,
        created_at: now,
        updated_at: now,
    };
    store.insert(payment).expect("seed payment succeeds")
}
