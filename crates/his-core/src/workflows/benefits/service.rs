use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::catalog::CatalogRepository;
use super::domain::{
    AccountId, AccountRole, ApplicationId, BenefitCase, CaseBundle, CaseNumber, CaseWorkerAccount,
    CategoryId, ChildRecord, CitizenApplication, ContactUpdate, CorrespondenceTrigger,
    EducationRecord, EligibilityDecision, EligibilityRun, IncomeRecord, NewApplication,
    NewCaseWorkerAccount, NewChild, NewEducation, NewIncome, NewPlan, Plan, PlanCategory, PlanId,
    TriggerId,
};
use super::eligibility::{Determination, EligibilityEngine, EligibilityPolicy};
use super::error::CaseError;
use super::notice::compose;
use super::outbox::{DispatchFailure, DispatchSummary, NoticeDispatcher};
use super::reporting::{
    CaseStatusFilter, CaseStatusRow, PendingTriggerRow, ReportingAggregator, StateDemographicsRow,
};
use super::repository::CaseRepository;
use crate::store::Database;

/// What a reconciliation pass found and repaired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub decisions_checked: usize,
    pub triggers_completed: Vec<TriggerId>,
}

/// Entry point for the case lifecycle: repositories, rule engine, notices and outbox.
pub struct BenefitsService<D> {
    catalog: CatalogRepository,
    cases: CaseRepository,
    reports: ReportingAggregator,
    engine: EligibilityEngine,
    dispatcher: Arc<D>,
}

impl<D> BenefitsService<D>
where
    D: NoticeDispatcher + 'static,
{
    pub fn new(db: Database, dispatcher: Arc<D>, policy: EligibilityPolicy) -> Self {
        Self {
            catalog: CatalogRepository::new(db.clone()),
            cases: CaseRepository::new(db.clone()),
            reports: ReportingAggregator::new(db),
            engine: EligibilityEngine::new(policy),
            dispatcher,
        }
    }

    pub fn database(&self) -> &Database {
        self.cases.database()
    }

    pub fn cases(&self) -> &CaseRepository {
        &self.cases
    }

    pub fn register_application(
        &self,
        application: &NewApplication,
    ) -> Result<CitizenApplication, CaseError> {
        self.cases.create_application(application)
    }

    pub fn application(&self, id: ApplicationId) -> Result<CitizenApplication, CaseError> {
        self.cases.application(id)
    }

    pub fn list_applications(
        &self,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<CitizenApplication>, CaseError> {
        self.cases.list_applications(limit, offset)
    }

    pub fn update_application_contact(
        &self,
        id: ApplicationId,
        update: &ContactUpdate,
    ) -> Result<CitizenApplication, CaseError> {
        self.cases.update_application_contact(id, update)
    }

    pub fn open_case(
        &self,
        application_id: ApplicationId,
        plan_id: PlanId,
    ) -> Result<BenefitCase, CaseError> {
        self.cases.create_case(application_id, plan_id)
    }

    pub fn submit_income(
        &self,
        case_number: CaseNumber,
        income: &NewIncome,
    ) -> Result<IncomeRecord, CaseError> {
        self.cases.append_income(case_number, income)
    }

    pub fn submit_child(
        &self,
        case_number: CaseNumber,
        child: &NewChild,
    ) -> Result<ChildRecord, CaseError> {
        self.cases.append_child(case_number, child)
    }

    pub fn submit_education(
        &self,
        case_number: CaseNumber,
        education: &NewEducation,
    ) -> Result<EducationRecord, CaseError> {
        self.cases.append_education(case_number, education)
    }

    pub fn case_bundle(&self, case_number: CaseNumber) -> Result<CaseBundle, CaseError> {
        self.cases.case_bundle(case_number)
    }

    pub fn decision_history(
        &self,
        case_number: CaseNumber,
    ) -> Result<Vec<EligibilityDecision>, CaseError> {
        self.cases.decision_history(case_number)
    }

    /// Evaluate a case now and persist the decision with its notice.
    pub fn run_eligibility(&self, case_number: CaseNumber) -> Result<EligibilityRun, CaseError> {
        self.run_eligibility_at(case_number, Utc::now())
    }

    /// Evaluate a case as of `decided_at`; the date part drives age and validity.
    #[instrument(skip(self))]
    pub fn run_eligibility_at(
        &self,
        case_number: CaseNumber,
        decided_at: DateTime<Utc>,
    ) -> Result<EligibilityRun, CaseError> {
        let bundle = self.cases.case_bundle(case_number)?;
        if let Some(missing) = self.engine.missing_facts(&bundle) {
            return Err(CaseError::IncompleteFacts {
                case_number,
                missing,
            });
        }

        let determination = self.engine.evaluate(&bundle, decided_at.date_naive());
        let notice = compose(&determination, &bundle.application);
        self.cases
            .record_determination(&determination, &notice, decided_at)
    }

    /// Complete the trigger of every decision that lacks one.
    ///
    /// Cases whose application is gone cannot be repaired and fail the pass before any
    /// write happens.
    #[instrument(skip(self))]
    pub fn reconcile(&self) -> Result<ReconciliationReport, CaseError> {
        let orphans = self.cases.cases_without_application()?;
        if !orphans.is_empty() {
            return Err(orphaned_cases(&orphans));
        }

        let dangling = self.cases.decisions_without_trigger()?;
        let mut report = ReconciliationReport {
            decisions_checked: dangling.len(),
            triggers_completed: Vec::with_capacity(dangling.len()),
        };

        for decision in &dangling {
            let bundle = self.cases.case_bundle(decision.case_number)?;
            let determination = Determination::from_decision(decision, bundle.program());
            let notice = compose(&determination, &bundle.application);
            if let Some(trigger) = self.cases.complete_trigger(decision, &notice, Utc::now())? {
                report.triggers_completed.push(trigger.id);
            }
        }

        info!(
            checked = report.decisions_checked,
            completed = report.triggers_completed.len(),
            "reconciliation finished"
        );
        Ok(report)
    }

    /// Check-only variant of [`Self::reconcile`].
    pub fn verify_integrity(&self) -> Result<(), CaseError> {
        let orphans = self.cases.cases_without_application()?;
        if !orphans.is_empty() {
            return Err(orphaned_cases(&orphans));
        }

        let dangling = self.cases.decisions_without_trigger()?;
        if !dangling.is_empty() {
            let ids: Vec<String> = dangling.iter().map(|d| d.id.to_string()).collect();
            return Err(CaseError::InvariantViolation(format!(
                "decisions without a correspondence trigger: {}",
                ids.join(", ")
            )));
        }
        Ok(())
    }

    /// Hand pending triggers to the dispatcher; only delivered ones move to SENT.
    #[instrument(skip(self))]
    pub fn dispatch_pending(&self, limit: Option<usize>) -> Result<DispatchSummary, CaseError> {
        let mut summary = DispatchSummary::default();
        for trigger in self.cases.pending_triggers(limit)? {
            match self.dispatcher.dispatch(&trigger) {
                Ok(()) => match self.cases.mark_trigger_sent(trigger.id) {
                    Ok(_) => summary.sent.push(trigger.id),
                    Err(error) => {
                        warn!(trigger_id = %trigger.id, %error, "delivered notice not marked sent");
                        summary.failed.push(DispatchFailure {
                            trigger_id: trigger.id,
                            error: format!("delivered but not marked sent: {error}"),
                        });
                    }
                },
                Err(error) => {
                    warn!(trigger_id = %trigger.id, %error, "notice dispatch failed");
                    summary.failed.push(DispatchFailure {
                        trigger_id: trigger.id,
                        error: error.to_string(),
                    });
                }
            }
        }
        Ok(summary)
    }

    pub fn mark_trigger_sent(&self, id: TriggerId) -> Result<CorrespondenceTrigger, CaseError> {
        self.cases.mark_trigger_sent(id)
    }

    pub fn create_category(&self, name: &str) -> Result<PlanCategory, CaseError> {
        self.catalog.create_category(name)
    }

    pub fn list_categories(&self) -> Result<Vec<PlanCategory>, CaseError> {
        self.catalog.list_categories()
    }

    pub fn set_category_active(
        &self,
        id: CategoryId,
        active: bool,
    ) -> Result<PlanCategory, CaseError> {
        self.catalog.set_category_active(id, active)
    }

    pub fn create_plan(&self, plan: &NewPlan) -> Result<Plan, CaseError> {
        self.catalog.create_plan(plan)
    }

    pub fn plan(&self, id: PlanId) -> Result<Plan, CaseError> {
        self.catalog.plan(id)
    }

    pub fn list_plans(&self, active_only: bool) -> Result<Vec<Plan>, CaseError> {
        self.catalog.list_plans(active_only)
    }

    pub fn set_plan_active(&self, id: PlanId, active: bool) -> Result<Plan, CaseError> {
        self.catalog.set_plan_active(id, active)
    }

    pub fn create_account(
        &self,
        account: &NewCaseWorkerAccount,
    ) -> Result<CaseWorkerAccount, CaseError> {
        self.catalog.create_account(account)
    }

    pub fn list_accounts(
        &self,
        role: Option<AccountRole>,
    ) -> Result<Vec<CaseWorkerAccount>, CaseError> {
        self.catalog.list_accounts(role)
    }

    pub fn set_account_active(
        &self,
        id: AccountId,
        active: bool,
    ) -> Result<CaseWorkerAccount, CaseError> {
        self.catalog.set_account_active(id, active)
    }

    pub fn reports(&self) -> &ReportingAggregator {
        &self.reports
    }

    pub fn case_status_report(
        &self,
        filter: &CaseStatusFilter,
    ) -> Result<Vec<CaseStatusRow>, CaseError> {
        self.reports.case_status(filter)
    }

    pub fn state_demographics_report(&self) -> Result<Vec<StateDemographicsRow>, CaseError> {
        self.reports.state_demographics()
    }

    pub fn pending_trigger_report(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<PendingTriggerRow>, CaseError> {
        self.reports.pending_triggers(limit)
    }
}

fn orphaned_cases(orphans: &[CaseNumber]) -> CaseError {
    let numbers: Vec<String> = orphans.iter().map(CaseNumber::to_string).collect();
    CaseError::InvariantViolation(format!(
        "cases without an application: {}",
        numbers.join(", ")
    ))
}
