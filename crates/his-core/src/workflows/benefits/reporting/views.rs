use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::domain::{ApplicationId, CaseNumber, DecisionStatus, TriggerId};

/// One case with its current status; PENDING until a decision exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseStatusRow {
    pub case_number: CaseNumber,
    pub application_id: ApplicationId,
    pub applicant: String,
    pub state: String,
    pub plan: String,
    pub status: DecisionStatus,
    pub benefit_amount: i64,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDemographicsRow {
    pub state: String,
    pub total: i64,
    pub male: i64,
    pub female: i64,
    pub other: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTriggerRow {
    pub trigger_id: TriggerId,
    pub case_number: CaseNumber,
    pub applicant: Option<String>,
    pub created_at: DateTime<Utc>,
    pub notice_preview: String,
}

/// Optional filters and pagination for the case-status report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseStatusFilter {
    #[serde(default)]
    pub status: Option<DecisionStatus>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}
