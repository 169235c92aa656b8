use super::domain::{Homologation, HomologationStatus, PaymentState};

/// Lifecycle timestamp a transition stamps on the record when it commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStamp {
    Submission,
    Review,
    Completion,
}

/// Validated plan for a single status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub target: HomologationStatus,
    pub stamp: Option<LifecycleStamp>,
    /// `draft -> submitted` additionally requires [`submission_gate`].
    pub requires_submission_gate: bool,
}

/// Status change rejected by the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move homologation from '{from}' to '{to}'")]
pub struct InvalidTransition {
    pub from: HomologationStatus,
    pub to: HomologationStatus,
}

/// Legal targets reachable from `from`. Terminal statuses return an empty slice;
/// `rejected` is deliberately terminal with no re-opening edge.
pub const fn allowed_targets(from: HomologationStatus) -> &'static [HomologationStatus] {
    match from {
        HomologationStatus::Draft => &[HomologationStatus::Submitted],
        HomologationStatus::Submitted => &[HomologationStatus::UnderReview],
        HomologationStatus::UnderReview => {
            &[HomologationStatus::Approved, HomologationStatus::Rejected]
        }
        HomologationStatus::Approved => &[HomologationStatus::Completed],
        HomologationStatus::Rejected | HomologationStatus::Completed => &[],
    }
}

/// Look up whether `from -> to` is legal and which side effects it mandates.
pub fn plan_transition(
    from: HomologationStatus,
    to: HomologationStatus,
) -> Result<TransitionPlan, InvalidTransition> {
    let legal = allowed_targets(from).contains(&to);
    if !legal {
        return Err(InvalidTransition { from, to });
    }

    let (stamp, requires_submission_gate) = match to {
        HomologationStatus::Submitted => (Some(LifecycleStamp::Submission), true),
        HomologationStatus::Approved => (Some(LifecycleStamp::Review), false),
        HomologationStatus::Completed => (Some(LifecycleStamp::Completion), false),
        _ => (None, false),
    };

    Ok(TransitionPlan {
        target: to,
        stamp,
        requires_submission_gate,
    })
}

/// Reason a homologation cannot yet be marked `submitted`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionBlocked {
    #[error("homologation has no uploaded documents")]
    NoDocuments,
    #[error("payment not confirmed (payment status is '{current}')")]
    PaymentUnconfirmed { current: PaymentState },
}

/// Gate for the `draft -> submitted` edge. Evaluated against the live record at
/// transition time; documents and payment state change asynchronously between
/// wizard steps, so the result is never cached.
pub fn submission_gate(record: &Homologation) -> Result<(), SubmissionBlocked> {
    if record.documents.is_empty() {
        return Err(SubmissionBlocked::NoDocuments);
    }
    if record.payment_status != PaymentState::Paid {
        return Err(SubmissionBlocked::PaymentUnconfirmed {
            current: record.payment_status,
        });
    }
    Ok(())
}
