mod config;
mod policy;
mod rules;

pub use config::EligibilityPolicy;
pub use policy::{
    benefit_tier, DenialReason, CCAP_INCOME_LIMIT, MEDICAID_INCOME_LIMIT, MEDICARE_MINIMUM_AGE,
    SNAP_INCOME_LIMIT,
};

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{CaseBundle, CaseNumber, DecisionStatus, EligibilityDecision, Program};
use policy::{decide_outcome, ProgramOutcome};

/// Months an approval stays valid, counted from the decision date.
pub const VALIDITY_MONTHS: u32 = 12;

/// Stateless rule engine. `evaluate` depends only on the bundle and the decision date.
#[derive(Debug, Clone, Copy, Default)]
pub struct EligibilityEngine {
    policy: EligibilityPolicy,
}

impl EligibilityEngine {
    pub fn new(policy: EligibilityPolicy) -> Self {
        Self { policy }
    }

    /// Facts the policy requires that the bundle lacks, if any.
    pub fn missing_facts(&self, bundle: &CaseBundle) -> Option<String> {
        (self.policy.require_income_facts && rules::missing_income_record(bundle))
            .then(|| "income record".to_string())
    }

    pub fn evaluate(&self, bundle: &CaseBundle, as_of: NaiveDate) -> Determination {
        let signals = rules::gather_signals(bundle, as_of);
        let program = bundle.program();
        let plan_name = bundle.plan.name.clone();
        let case_number = bundle.case.case_number;

        match decide_outcome(program, &plan_name, &signals) {
            ProgramOutcome::Approved { benefit_amount } => Determination {
                case_number,
                plan_name,
                program,
                status: DecisionStatus::Approved,
                benefit_amount,
                denial_reason: None,
                validity_start: Some(as_of),
                validity_end: validity_end(as_of),
            },
            ProgramOutcome::PurchaseRequired => Determination {
                case_number,
                plan_name,
                program,
                status: DecisionStatus::PurchaseRequired,
                benefit_amount: 0,
                denial_reason: None,
                validity_start: None,
                validity_end: None,
            },
            ProgramOutcome::Denied(reason) => Determination {
                case_number,
                plan_name,
                program,
                status: DecisionStatus::Denied,
                benefit_amount: 0,
                denial_reason: Some(reason.summary()),
                validity_start: None,
                validity_end: None,
            },
        }
    }
}

fn validity_end(start: NaiveDate) -> Option<NaiveDate> {
    start
        .checked_add_months(Months::new(VALIDITY_MONTHS))
        .and_then(|end| end.pred_opt())
}

/// Engine output before it is persisted as an [`EligibilityDecision`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Determination {
    pub case_number: CaseNumber,
    pub plan_name: String,
    pub program: Option<Program>,
    pub status: DecisionStatus,
    pub benefit_amount: i64,
    pub denial_reason: Option<String>,
    pub validity_start: Option<NaiveDate>,
    pub validity_end: Option<NaiveDate>,
}

impl Determination {
    /// Rebuild the determination behind a stored decision, e.g. to recompose its notice.
    pub fn from_decision(decision: &EligibilityDecision, program: Option<Program>) -> Self {
        Self {
            case_number: decision.case_number,
            plan_name: decision.plan_name.clone(),
            program,
            status: decision.status,
            benefit_amount: decision.benefit_amount,
            denial_reason: decision.denial_reason.clone(),
            validity_start: decision.validity_start,
            validity_end: decision.validity_end,
        }
    }
}
