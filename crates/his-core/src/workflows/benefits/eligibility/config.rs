use serde::{Deserialize, Serialize};

/// Operator-tunable switches around the fixed program rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityPolicy {
    /// Refuse to evaluate income-tested programs until an income record exists.
    #[serde(default)]
    pub require_income_facts: bool,
}

impl EligibilityPolicy {
    pub fn strict() -> Self {
        Self {
            require_income_facts: true,
        }
    }
}
