//! Benefit case lifecycle: intake, fact collection, eligibility determination and
//! correspondence, backed by the SQLite store.

pub mod catalog;
pub mod domain;
pub mod eligibility;
mod error;
pub mod intake;
pub mod notice;
pub mod outbox;
pub mod reporting;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use catalog::CatalogRepository;
pub use domain::{
    AccountId, AccountRole, ApplicationId, BenefitCase, CaseBundle, CaseNumber,
    CaseWorkerAccount, CategoryId, ChildRecord, CitizenApplication, ContactUpdate,
    CorrespondenceTrigger, DecisionId, DecisionStatus, EducationRecord, EligibilityDecision,
    EligibilityRun, Gender, IncomeRecord, NewApplication, NewCaseWorkerAccount, NewChild,
    NewEducation, NewIncome, NewPlan, Plan, PlanCategory, PlanId, Program, TriggerId,
    TriggerStatus,
};
pub use eligibility::{
    benefit_tier, DenialReason, Determination, EligibilityEngine, EligibilityPolicy,
};
pub use error::CaseError;
pub use intake::{IntakeImportError, IntakeImporter, IntakeSummary, RejectedRow};
pub use notice::{compose, NoticeText};
pub use outbox::{DispatchError, DispatchFailure, DispatchSummary, NoticeDispatcher};
pub use reporting::{
    CaseStatusFilter, CaseStatusRow, PendingTriggerRow, ReportExportError, ReportKind,
    ReportingAggregator, StateDemographicsRow,
};
pub use repository::CaseRepository;
pub use router::benefits_router;
pub use service::{BenefitsService, ReconciliationReport};
