//! Read-only dashboard queries. Each report is one statement, so it sees a single
//! snapshot; reports are not linearized with one another.

mod export;
mod views;

pub use export::{to_csv, write_csv};
pub use views::{CaseStatusFilter, CaseStatusRow, PendingTriggerRow, StateDemographicsRow};

use std::fmt;
use std::str::FromStr;

use rusqlite::{params, Row};
use tracing::instrument;

use super::domain::{ApplicationId, CaseNumber, DecisionStatus, TriggerId, TriggerStatus};
use super::error::CaseError;
use super::notice::preview;
use crate::store::row_helpers::{get, get_timestamp, parse_enum, parse_timestamp, query_all};
use crate::store::{Database, StoreError};

pub const NOTICE_PREVIEW_CHARS: usize = 100;

/// Named reports exposed to the CLI and HTTP layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    CaseStatus,
    StateDemographics,
    PendingTriggers,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [
        ReportKind::CaseStatus,
        ReportKind::StateDemographics,
        ReportKind::PendingTriggers,
    ];

    pub const fn slug(self) -> &'static str {
        match self {
            ReportKind::CaseStatus => "case-status",
            ReportKind::StateDemographics => "state-demographics",
            ReportKind::PendingTriggers => "pending-triggers",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == value.trim())
            .ok_or_else(|| {
                let known: Vec<_> = ReportKind::ALL.iter().map(|kind| kind.slug()).collect();
                format!("unknown report '{value}', expected one of {}", known.join(", "))
            })
    }
}

fn case_status_from_row(row: &Row<'_>) -> Result<CaseStatusRow, StoreError> {
    const TABLE: &str = "cases";
    let status: Option<String> = get(row, 5, "eligibility_decisions", "status")?;
    let decided_at: Option<String> = get(row, 7, "eligibility_decisions", "decided_at")?;
    Ok(CaseStatusRow {
        case_number: CaseNumber(get(row, 0, TABLE, "case_number")?),
        application_id: ApplicationId(get(row, 1, TABLE, "application_id")?),
        applicant: get(row, 2, "applications", "full_name")?,
        state: get(row, 3, "applications", "state")?,
        plan: get(row, 4, "plans", "name")?,
        status: match status {
            Some(raw) => parse_enum(&raw, "eligibility_decisions", "status")?,
            None => DecisionStatus::Pending,
        },
        benefit_amount: get::<Option<i64>>(row, 6, "eligibility_decisions", "benefit_amount")?
            .unwrap_or(0),
        decided_at: decided_at
            .map(|raw| parse_timestamp(&raw, "eligibility_decisions", "decided_at"))
            .transpose()?,
    })
}

fn demographics_from_row(row: &Row<'_>) -> Result<StateDemographicsRow, StoreError> {
    const TABLE: &str = "applications";
    Ok(StateDemographicsRow {
        state: get(row, 0, TABLE, "state")?,
        total: get(row, 1, TABLE, "total")?,
        male: get(row, 2, TABLE, "male")?,
        female: get(row, 3, TABLE, "female")?,
        other: get(row, 4, TABLE, "other")?,
    })
}

fn pending_trigger_from_row(row: &Row<'_>) -> Result<PendingTriggerRow, StoreError> {
    const TABLE: &str = "correspondence_triggers";
    let notice: String = get(row, 4, TABLE, "notice")?;
    Ok(PendingTriggerRow {
        trigger_id: TriggerId(get(row, 0, TABLE, "id")?),
        case_number: CaseNumber(get(row, 1, TABLE, "case_number")?),
        applicant: get(row, 2, "applications", "full_name")?,
        created_at: get_timestamp(row, 3, TABLE, "created_at")?,
        notice_preview: preview(&notice, NOTICE_PREVIEW_CHARS).to_string(),
    })
}

fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |value| i64::try_from(value).unwrap_or(i64::MAX))
}

/// Aggregate queries over the case graph.
#[derive(Clone)]
pub struct ReportingAggregator {
    db: Database,
}

impl ReportingAggregator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// One row per case, newest case first.
    #[instrument(skip(self))]
    pub fn case_status(&self, filter: &CaseStatusFilter) -> Result<Vec<CaseStatusRow>, CaseError> {
        let status = filter.status.map(DecisionStatus::label);
        let state = filter
            .state
            .as_deref()
            .map(|state| state.trim().to_ascii_uppercase());
        let offset = i64::try_from(filter.offset).unwrap_or(i64::MAX);

        Ok(self.db.read(|conn| {
            query_all(
                conn,
                "SELECT c.case_number, a.id, a.full_name, a.state, p.name,
                        d.status, d.benefit_amount, d.decided_at
                 FROM cases c
                 JOIN applications a ON a.id = c.application_id
                 JOIN plans p ON p.id = c.plan_id
                 LEFT JOIN eligibility_decisions d ON d.id = (
                     SELECT latest.id FROM eligibility_decisions latest
                     WHERE latest.case_number = c.case_number
                     ORDER BY latest.decided_at DESC, latest.id DESC
                     LIMIT 1
                 )
                 WHERE (?1 IS NULL OR COALESCE(d.status, 'PENDING') = ?1)
                   AND (?2 IS NULL OR a.state = ?2)
                 ORDER BY c.case_number DESC
                 LIMIT ?3 OFFSET ?4",
                params![status, state, sql_limit(filter.limit), offset],
                case_status_from_row,
            )
        })?)
    }

    /// Application counts per residency state with a gender breakdown.
    #[instrument(skip(self))]
    pub fn state_demographics(&self) -> Result<Vec<StateDemographicsRow>, CaseError> {
        Ok(self.db.read(|conn| {
            query_all(
                conn,
                "SELECT state,
                        COUNT(*) AS total,
                        SUM(CASE WHEN gender = 'MALE' THEN 1 ELSE 0 END) AS male,
                        SUM(CASE WHEN gender = 'FEMALE' THEN 1 ELSE 0 END) AS female,
                        SUM(CASE WHEN gender NOT IN ('MALE', 'FEMALE') THEN 1 ELSE 0 END) AS other
                 FROM applications
                 GROUP BY state
                 ORDER BY state",
                [],
                demographics_from_row,
            )
        })?)
    }

    /// PENDING triggers, newest first, with a bounded notice preview.
    #[instrument(skip(self))]
    pub fn pending_triggers(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<PendingTriggerRow>, CaseError> {
        Ok(self.db.read(|conn| {
            query_all(
                conn,
                "SELECT t.id, t.case_number, a.full_name, t.created_at, t.notice
                 FROM correspondence_triggers t
                 JOIN cases c ON c.case_number = t.case_number
                 LEFT JOIN applications a ON a.id = c.application_id
                 WHERE t.status = ?1
                 ORDER BY t.created_at DESC, t.id DESC
                 LIMIT ?2",
                params![TriggerStatus::Pending.label(), sql_limit(limit)],
                pending_trigger_from_row,
            )
        })?)
    }

    /// Render any report as CSV.
    pub fn export_csv(
        &self,
        kind: ReportKind,
        filter: &CaseStatusFilter,
    ) -> Result<String, ReportExportError> {
        let csv = match kind {
            ReportKind::CaseStatus => to_csv(&self.case_status(filter)?)?,
            ReportKind::StateDemographics => to_csv(&self.state_demographics()?)?,
            ReportKind::PendingTriggers => to_csv(&self.pending_triggers(filter.limit)?)?,
        };
        Ok(csv)
    }
}

/// Failure while producing a CSV export.
#[derive(Debug, thiserror::Error)]
pub enum ReportExportError {
    #[error(transparent)]
    Query(#[from] CaseError),
    #[error("failed to encode report as csv: {0}")]
    Encode(#[from] csv::Error),
}
