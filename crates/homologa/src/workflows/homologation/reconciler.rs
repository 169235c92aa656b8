use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::domain::{HomologationStatus, PaymentId, PaymentState, PaymentStatus};
use super::ports::{GatewayError, HomologationStore, PaymentGateway, PaymentStore, StoreError};
use super::transitions::{plan_transition, submission_gate, LifecycleStamp};

/// Asynchronous gateway callback as delivered to the webhook endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayNotification {
    /// Gateway event type; only `payment` triggers processing.
    pub kind: String,
    /// Gateway-side payment identifier from the notification payload.
    pub payment_id: String,
}

/// What the reconciler did with a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Non-payment event type, acknowledged without processing.
    Ignored { kind: String },
    /// The local record already carries the mapped status; nothing re-applied.
    AlreadyApplied {
        payment_id: PaymentId,
        status: PaymentStatus,
    },
    /// Out-of-order delivery would downgrade an approved payment; discarded.
    StaleIgnored {
        payment_id: PaymentId,
        incoming: PaymentStatus,
    },
    /// Payment record updated. `homologation_synced` is false when the linked
    /// case could not be brought in line (repaired out of band).
    Applied {
        payment_id: PaymentId,
        status: PaymentStatus,
        homologation_synced: bool,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// No local payment record matches the notification; the gateway retries.
    #[error("no payment record for gateway payment '{0}'")]
    PaymentRecordNotFound(String),
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("datastore unavailable: {0}")]
    StoreUnavailable(String),
}

/// Map the gateway's status vocabulary onto the internal enum. Returns `None`
/// for vocabulary we do not recognize; callers default to pending.
pub fn map_gateway_status(raw: &str) -> Option<PaymentStatus> {
    match raw {
        "pending" | "in_process" => Some(PaymentStatus::Pending),
        "approved" | "authorized" => Some(PaymentStatus::Approved),
        "rejected" | "cancelled" => Some(PaymentStatus::Rejected),
        "refunded" | "charged_back" => Some(PaymentStatus::Refunded),
        _ => None,
    }
}

/// Converges local payment and homologation state with the gateway's
/// authoritative record.
///
/// The gateway may deliver duplicate or out-of-order notifications; the
/// reconciler always re-derives status from the gateway record itself and
/// refuses to downgrade an approved payment, so any delivery order converges
/// to the same final state.
pub struct PaymentReconciler<P, H, G> {
    payments: Arc<P>,
    homologations: Arc<H>,
    gateway: Arc<G>,
}

impl<P, H, G> PaymentReconciler<P, H, G>
where
    P: PaymentStore + 'static,
    H: HomologationStore + 'static,
    G: PaymentGateway + 'static,
{
    pub fn new(payments: Arc<P>, homologations: Arc<H>, gateway: Arc<G>) -> Self {
        Self {
            payments,
            homologations,
            gateway,
        }
    }

    pub fn reconcile(
        &self,
        notification: GatewayNotification,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if notification.kind != "payment" {
            return Ok(ReconcileOutcome::Ignored {
                kind: notification.kind,
            });
        }

        let gateway_record =
            self.gateway
                .get_payment(&notification.payment_id)
                .map_err(|err| match err {
                    GatewayError::Unavailable(message) => {
                        ReconcileError::GatewayUnavailable(message)
                    }
                    GatewayError::UnknownPayment(id) => ReconcileError::PaymentRecordNotFound(id),
                })?;

        let mapped = map_gateway_status(&gateway_record.status).unwrap_or_else(|| {
            warn!(
                gateway_status = %gateway_record.status,
                gateway_payment_id = %gateway_record.id,
                "unrecognized gateway payment status, defaulting to pending"
            );
            PaymentStatus::Pending
        });

        let payment = self
            .locate_payment(&gateway_record.id, gateway_record.external_reference.as_deref())?
            .ok_or_else(|| ReconcileError::PaymentRecordNotFound(gateway_record.id.clone()))?;

        // Record the gateway's payment id on first contact, whatever the
        // status, so later notifications resolve by primary key instead of
        // the external-reference fallback.
        let mut payment = self.link_gateway_id(payment, &gateway_record.id)?;

        if payment.status == mapped {
            // Duplicate delivery; do not re-trigger the homologation sync.
            return Ok(ReconcileOutcome::AlreadyApplied {
                payment_id: payment.id,
                status: mapped,
            });
        }

        // Approved is terminal against stale deliveries; only a refund supersedes it.
        if payment.status == PaymentStatus::Approved && mapped != PaymentStatus::Refunded {
            return Ok(ReconcileOutcome::StaleIgnored {
                payment_id: payment.id,
                incoming: mapped,
            });
        }

        payment.status = mapped;
        payment.updated_at = Utc::now();
        let payment = self
            .payments
            .update(payment)
            .map_err(|err| ReconcileError::StoreUnavailable(err.to_string()))?;

        // Payment truth is recorded above and is authoritative; a failed
        // homologation sync is logged and repaired out of band rather than
        // rolling back the money-received signal.
        let homologation_synced = match mapped {
            PaymentStatus::Approved => self.sync_homologation(&payment.homologation_id.0),
            PaymentStatus::Refunded => self.sync_refund(&payment.homologation_id.0),
            _ => false,
        };

        Ok(ReconcileOutcome::Applied {
            payment_id: payment.id,
            status: mapped,
            homologation_synced,
        })
    }

    fn locate_payment(
        &self,
        gateway_payment_id: &str,
        external_reference: Option<&str>,
    ) -> Result<Option<super::domain::Payment>, ReconcileError> {
        let by_gateway_id = self
            .payments
            .find_by_gateway_id(gateway_payment_id)
            .map_err(|err| ReconcileError::StoreUnavailable(err.to_string()))?;
        if by_gateway_id.is_some() {
            return Ok(by_gateway_id);
        }

        // First notification for a payment arrives before the local record has
        // seen the gateway id; the preference's external reference links them.
        let Some(reference) = external_reference else {
            return Ok(None);
        };
        self.payments
            .fetch(&PaymentId(reference.to_string()))
            .map_err(|err| ReconcileError::StoreUnavailable(err.to_string()))
    }

    fn link_gateway_id(
        &self,
        mut payment: super::domain::Payment,
        gateway_payment_id: &str,
    ) -> Result<super::domain::Payment, ReconcileError> {
        if payment.gateway_payment_id.is_some() {
            return Ok(payment);
        }
        payment.gateway_payment_id = Some(gateway_payment_id.to_string());
        payment.updated_at = Utc::now();
        self.payments
            .update(payment)
            .map_err(|err| ReconcileError::StoreUnavailable(err.to_string()))
    }

    /// Best-effort advance of the linked case to `submitted` with a confirmed
    /// payment. Never propagates a failure.
    fn sync_homologation(&self, homologation_id: &str) -> bool {
        let id = super::domain::HomologationId(homologation_id.to_string());
        let record = match self.homologations.fetch(&id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(%homologation_id, "approved payment references a missing homologation");
                return false;
            }
            Err(err) => {
                warn!(%homologation_id, error = %err, "failed to load homologation for payment sync");
                return false;
            }
        };

        let expected_version = record.version;
        let mut mutated = record;
        mutated.payment_status = PaymentState::Paid;

        let submitted = match plan_transition(mutated.status, HomologationStatus::Submitted) {
            Ok(plan) => match submission_gate(&mutated) {
                Ok(()) => {
                    mutated.status = HomologationStatus::Submitted;
                    if plan.stamp == Some(LifecycleStamp::Submission) {
                        mutated.submission_date = Some(Utc::now());
                    }
                    true
                }
                Err(blocked) => {
                    warn!(%homologation_id, reason = %blocked, "payment confirmed but submission gate blocked the transition");
                    false
                }
            },
            Err(invalid) => {
                warn!(%homologation_id, error = %invalid, "payment confirmed but homologation is past draft");
                false
            }
        };

        match self.homologations.update(mutated, expected_version) {
            Ok(_) => submitted,
            Err(StoreError::VersionConflict { expected, stored }) => {
                warn!(%homologation_id, expected, stored, "homologation changed mid-sync; leaving for retry");
                false
            }
            Err(err) => {
                warn!(%homologation_id, error = %err, "failed to persist homologation payment sync");
                false
            }
        }
    }

    /// Best-effort flip of the linked case's payment state after a refund or
    /// chargeback. The lifecycle status is left alone; what to do with a
    /// refunded case is an admin decision.
    fn sync_refund(&self, homologation_id: &str) -> bool {
        let id = super::domain::HomologationId(homologation_id.to_string());
        let record = match self.homologations.fetch(&id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(%homologation_id, "refunded payment references a missing homologation");
                return false;
            }
            Err(err) => {
                warn!(%homologation_id, error = %err, "failed to load homologation for refund sync");
                return false;
            }
        };

        if record.payment_status == PaymentState::Refunded {
            return true;
        }

        let expected_version = record.version;
        let mut mutated = record;
        mutated.payment_status = PaymentState::Refunded;
        match self.homologations.update(mutated, expected_version) {
            Ok(_) => true,
            Err(err) => {
                warn!(%homologation_id, error = %err, "failed to persist homologation refund sync");
                false
            }
        }
    }
}
