use serde::{Deserialize, Serialize};

use super::super::domain::Program;
use super::rules::EligibilitySignals;

pub const SNAP_INCOME_LIMIT: i64 = 200_000;
pub const CCAP_INCOME_LIMIT: i64 = 300_000;
pub const MEDICAID_INCOME_LIMIT: i64 = 250_000;
pub const MEDICARE_MINIMUM_AGE: u32 = 65;

/// Fixed monthly benefit per approved program. QHP is never free-approved.
pub const fn benefit_tier(program: Program) -> i64 {
    match program {
        Program::Snap => 5_000,
        Program::Ccap => 8_000,
        Program::Medicaid => 10_000,
        Program::Medicare => 12_000,
        Program::Qhp => 0,
    }
}

/// Result of walking the priority list for one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProgramOutcome {
    Approved { benefit_amount: i64 },
    PurchaseRequired,
    Denied(DenialReason),
}

/// Unmet criterion behind a denial, rendered into the stored reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenialReason {
    IncomeAboveLimit {
        program: Program,
        plan: String,
        income: i64,
        limit: i64,
    },
    NoDependentChildren {
        plan: String,
    },
    BelowMinimumAge {
        plan: String,
        age: u32,
    },
    BirthDateUnknown {
        plan: String,
    },
    NoRulesDefined {
        plan: String,
    },
}

impl DenialReason {
    pub fn summary(&self) -> String {
        match self {
            DenialReason::IncomeAboveLimit {
                program,
                plan,
                income,
                limit,
            } => format!(
                "income {income} exceeds the {} limit of {limit} for {plan}",
                program.label()
            ),
            DenialReason::NoDependentChildren { plan } => {
                format!("CCAP requires at least one dependent child for {plan}")
            }
            DenialReason::BelowMinimumAge { plan, age } => format!(
                "applicant age {age} is below the Medicare minimum of {MEDICARE_MINIMUM_AGE} for {plan}"
            ),
            DenialReason::BirthDateUnknown { plan } => {
                format!("date of birth is required to establish Medicare age for {plan}")
            }
            DenialReason::NoRulesDefined { plan } => {
                format!("no eligibility rules are defined for {plan}")
            }
        }
    }
}

/// First matching rule wins; every path ends in exactly one outcome.
pub(crate) fn decide_outcome(
    program: Option<Program>,
    plan: &str,
    signals: &EligibilitySignals,
) -> ProgramOutcome {
    let Some(program) = program else {
        return ProgramOutcome::Denied(DenialReason::NoRulesDefined {
            plan: plan.to_string(),
        });
    };

    let income_rule = |limit: i64| {
        if signals.total_income <= limit {
            Ok(())
        } else {
            Err(DenialReason::IncomeAboveLimit {
                program,
                plan: plan.to_string(),
                income: signals.total_income,
                limit,
            })
        }
    };

    let verdict = match program {
        Program::Snap => income_rule(SNAP_INCOME_LIMIT),
        Program::Ccap => income_rule(CCAP_INCOME_LIMIT).and_then(|()| {
            if signals.child_count > 0 {
                Ok(())
            } else {
                Err(DenialReason::NoDependentChildren {
                    plan: plan.to_string(),
                })
            }
        }),
        Program::Medicaid => income_rule(MEDICAID_INCOME_LIMIT),
        Program::Medicare => match signals.age {
            Some(age) if age >= MEDICARE_MINIMUM_AGE => Ok(()),
            Some(age) => Err(DenialReason::BelowMinimumAge {
                plan: plan.to_string(),
                age,
            }),
            None => Err(DenialReason::BirthDateUnknown {
                plan: plan.to_string(),
            }),
        },
        Program::Qhp => return ProgramOutcome::PurchaseRequired,
    };

    match verdict {
        Ok(()) => ProgramOutcome::Approved {
            benefit_amount: benefit_tier(program),
        },
        Err(reason) => ProgramOutcome::Denied(reason),
    }
}
