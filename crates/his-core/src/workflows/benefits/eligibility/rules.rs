use chrono::NaiveDate;

use super::super::domain::CaseBundle;

/// Facts the policy table reads, derived once per evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EligibilitySignals {
    pub total_income: i64,
    pub child_count: usize,
    pub age: Option<u32>,
}

pub(crate) fn gather_signals(bundle: &CaseBundle, as_of: NaiveDate) -> EligibilitySignals {
    EligibilitySignals {
        total_income: bundle.total_income(),
        child_count: bundle.child_count(),
        age: bundle.application.age_on(as_of),
    }
}

/// Facts a strict policy requires before the program can be evaluated.
pub(crate) fn missing_income_record(bundle: &CaseBundle) -> bool {
    bundle.income.is_none()
        && bundle
            .program()
            .is_some_and(|program| program.is_income_tested())
}
