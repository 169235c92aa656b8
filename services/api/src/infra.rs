use homologa::workflows::homologation::{
    AuditEntry, AuditError, AuditTrail, BlobError, BlobStore, Document, GatewayError,
    GatewayPaymentRecord, Homologation, HomologationId, HomologationStore, Payment,
    PaymentGateway, PaymentId, PaymentStore, PreferenceReceipt, PreferenceRequest, StoreError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryHomologationStore {
    records: Arc<Mutex<HashMap<HomologationId, Homologation>>>,
}

impl HomologationStore for InMemoryHomologationStore {
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
        // The in-memory store is always reachable; a networked implementation
        // would round-trip here.
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPaymentStore {
    records: Arc<Mutex<HashMap<PaymentId, Payment>>>,
}

impl PaymentStore for InMemoryPaymentStore {
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

    fn find_by_gateway_id(&self, gateway_payment_id: &str) -> Result<Option<Payment>, StoreError> {
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

/// Keeps uploaded document bytes in memory and serves stable URLs for them.
#[derive(Default, Clone)]
pub(crate) struct InMemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, (Vec<u8>, String)>>>,
}

impl BlobStore for InMemoryBlobStore {
    fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String, BlobError> {
        let mut guard = self.blobs.lock().expect("blob mutex poisoned");
        guard.insert(path.to_string(), (bytes.to_vec(), content_type.to_string()));
        self.public_url(path)
    }

    fn public_url(&self, path: &str) -> Result<String, BlobError> {
        Ok(format!("memory://blobs/{path}"))
    }
}

/// Sandbox gateway: issues preference ids locally and resolves payment
/// lookups from notifications it has already seen, so the service can run
/// end-to-end without gateway credentials.
#[derive(Default, Clone)]
pub(crate) struct SandboxPaymentGateway {
    sequence: Arc<AtomicU64>,
    payments: Arc<Mutex<HashMap<String, GatewayPaymentRecord>>>,
}

impl SandboxPaymentGateway {
    #[cfg(test)]
    pub(crate) fn record_payment(&self, record: GatewayPaymentRecord) {
        self.payments
            .lock()
            .expect("gateway mutex poisoned")
            .insert(record.id.clone(), record);
    }
}

impl PaymentGateway for SandboxPaymentGateway {
    fn create_preference(
        &self,
        request: PreferenceRequest,
    ) -> Result<PreferenceReceipt, GatewayError> {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let preference_id = format!("sandbox-pref-{n:06}");
        info!(
            preference_id = %preference_id,
            external_reference = %request.external_reference,
            amount_cents = request.amount_cents,
            "sandbox preference created"
        );
        Ok(PreferenceReceipt {
            init_point: format!("https://sandbox.gateway.local/checkout/{preference_id}"),
            preference_id,
        })
    }

    fn get_payment(&self, gateway_payment_id: &str) -> Result<GatewayPaymentRecord, GatewayError> {
        self.payments
            .lock()
            .expect("gateway mutex poisoned")
            .get(gateway_payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownPayment(gateway_payment_id.to_string()))
    }
}

/// Audit sink that writes status changes to the structured log.
#[derive(Default, Clone)]
pub(crate) struct TracingAuditTrail;

impl AuditTrail for TracingAuditTrail {
    fn append(&self, id: &HomologationId, entry: AuditEntry) -> Result<(), AuditError> {
        info!(
            homologation_id = %id.0,
            actor = %entry.actor,
            from = %entry.previous_status,
            to = %entry.new_status,
            reason = entry.reason.as_deref().unwrap_or("-"),
            "status transition recorded"
        );
        Ok(())
    }
}
