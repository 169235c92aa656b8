use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for homologation cases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HomologationId(pub String);

/// Identifier wrapper for uploaded documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

/// Identifier wrapper for payment attempts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub String);

/// Applicant identity captured when the case is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerIdentity {
    pub full_name: String,
    pub email: String,
    pub national_id: String,
}

/// Vehicle being certified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDescriptor {
    pub make: String,
    pub model: String,
    pub year: u16,
    pub vin: String,
    pub plate: Option<String>,
}

/// Lifecycle status tracked throughout the homologation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomologationStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Completed,
}

impl HomologationStatus {
    pub const ALL: [HomologationStatus; 6] = [
        HomologationStatus::Draft,
        HomologationStatus::Submitted,
        HomologationStatus::UnderReview,
        HomologationStatus::Approved,
        HomologationStatus::Rejected,
        HomologationStatus::Completed,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            HomologationStatus::Draft => "draft",
            HomologationStatus::Submitted => "submitted",
            HomologationStatus::UnderReview => "under_review",
            HomologationStatus::Approved => "approved",
            HomologationStatus::Rejected => "rejected",
            HomologationStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for HomologationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Payment condition summarized on the homologation record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Pending,
    Paid,
    Refunded,
}

impl PaymentState {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Paid => "paid",
            PaymentState::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status of an individual payment attempt at the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
    Refunded,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Category of an uploaded supporting document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    IdCard,
    VehicleTitle,
    Insurance,
    SafetyCertificate,
    Other,
}

/// One uploaded file tied to exactly one homologation. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub homologation_id: HomologationId,
    pub name: String,
    pub doc_type: DocumentType,
    pub url: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// One applicant's end-to-end vehicle-certification case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Homologation {
    pub id: HomologationId,
    pub owner: OwnerIdentity,
    pub vehicle: VehicleDescriptor,
    pub status: HomologationStatus,
    pub payment_status: PaymentState,
    pub documents: Vec<Document>,
    pub submission_date: Option<DateTime<Utc>>,
    pub review_date: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency guard, bumped by the store on every committed write.
    pub version: u64,
}

/// One payment attempt tied to exactly one homologation.
///
/// Retried preference creation may leave several records per case; at most one
/// `approved` record is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub homologation_id: HomologationId,
    pub amount_cents: i64,
    pub currency: String,
    pub preference_id: String,
    pub gateway_payment_id: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review-trail entry recorded on every successful admin transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub actor: String,
    pub previous_status: HomologationStatus,
    pub new_status: HomologationStatus,
    pub reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
