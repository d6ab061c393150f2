use axum::http::StatusCode;

use super::domain::{AccountId, ApplicationId, CaseNumber, CategoryId, PlanId, TriggerId};
use crate::store::StoreError;

/// Typed failures surfaced by the case lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    #[error("{field} '{value}' is already registered")]
    DuplicateIdentity { field: String, value: String },
    #[error("application {application_id} already has a case for plan {plan_id}")]
    DuplicateCase {
        application_id: ApplicationId,
        plan_id: PlanId,
    },
    #[error("application {0} not found")]
    ApplicationNotFound(ApplicationId),
    #[error("plan {0} not found")]
    PlanNotFound(PlanId),
    #[error("plan category {0} not found")]
    CategoryNotFound(CategoryId),
    #[error("caseworker account {0} not found")]
    AccountNotFound(AccountId),
    #[error("case {0} not found")]
    CaseNotFound(CaseNumber),
    #[error("correspondence trigger {0} not found")]
    TriggerNotFound(TriggerId),
    #[error("case {case_number} is missing facts required for eligibility: {missing}")]
    IncompleteFacts {
        case_number: CaseNumber,
        missing: String,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error(transparent)]
    Storage(StoreError),
}

impl CaseError {
    /// Whether the caller may try again later; not-found and validation errors are final.
    pub fn is_transient(&self) -> bool {
        matches!(self, CaseError::StoreUnavailable(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CaseError::DuplicateIdentity { .. } | CaseError::DuplicateCase { .. } => {
                StatusCode::CONFLICT
            }
            CaseError::ApplicationNotFound(_)
            | CaseError::PlanNotFound(_)
            | CaseError::CategoryNotFound(_)
            | CaseError::AccountNotFound(_)
            | CaseError::CaseNotFound(_)
            | CaseError::TriggerNotFound(_) => StatusCode::NOT_FOUND,
            CaseError::IncompleteFacts { .. } | CaseError::InvalidInput(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            CaseError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CaseError::InvariantViolation(_) | CaseError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for CaseError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(detail) => CaseError::StoreUnavailable(detail),
            other => CaseError::Storage(other),
        }
    }
}

impl From<rusqlite::Error> for CaseError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::from(err).into()
    }
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), CaseError> {
    if value.trim().is_empty() {
        return Err(CaseError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}
