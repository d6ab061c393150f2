//! Case graph persistence: applications, cases, facts, decisions and triggers.

use chrono::{DateTime, Datelike, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info, instrument, warn};

use super::catalog::{category_from_row, plan_from_row};
use super::domain::{
    ApplicationId, BenefitCase, CaseBundle, CaseNumber, ChildRecord, CitizenApplication,
    ContactUpdate, CorrespondenceTrigger, DecisionId, EducationRecord, EligibilityDecision,
    EligibilityRun, IncomeRecord, NewApplication, NewChild, NewEducation, NewIncome, PlanId,
    TriggerId, TriggerStatus,
};
use super::eligibility::Determination;
use super::error::{require_text, CaseError};
use super::notice::NoticeText;
use crate::store::row_helpers::{
    format_date, format_timestamp, get, get_date, get_optional_date, get_timestamp, parse_enum,
    query_all, query_first,
};
use crate::store::{Database, StoreError};

const APPLICATION_COLUMNS: &str = "id, full_name, email, phone, national_id, gender, state, \
     date_of_birth, created_at, updated_at";
const CASE_COLUMNS: &str = "case_number, application_id, plan_id, created_at";
const DECISION_COLUMNS: &str = "id, case_number, plan_name, status, validity_start, \
     validity_end, benefit_amount, denial_reason, decided_at";
const TRIGGER_COLUMNS: &str =
    "id, case_number, decision_id, status, notice, created_at, updated_at";

const EARLIEST_GRADUATION_YEAR: i32 = 1900;

fn application_from_row(row: &Row<'_>) -> Result<CitizenApplication, StoreError> {
    const TABLE: &str = "applications";
    Ok(CitizenApplication {
        id: ApplicationId(get(row, 0, TABLE, "id")?),
        full_name: get(row, 1, TABLE, "full_name")?,
        email: get(row, 2, TABLE, "email")?,
        phone: get(row, 3, TABLE, "phone")?,
        national_id: get(row, 4, TABLE, "national_id")?,
        gender: parse_enum(&get::<String>(row, 5, TABLE, "gender")?, TABLE, "gender")?,
        state: get(row, 6, TABLE, "state")?,
        date_of_birth: get_optional_date(row, 7, TABLE, "date_of_birth")?,
        created_at: get_timestamp(row, 8, TABLE, "created_at")?,
        updated_at: get_timestamp(row, 9, TABLE, "updated_at")?,
    })
}

fn case_from_row(row: &Row<'_>) -> Result<BenefitCase, StoreError> {
    const TABLE: &str = "cases";
    Ok(BenefitCase {
        case_number: CaseNumber(get(row, 0, TABLE, "case_number")?),
        application_id: ApplicationId(get(row, 1, TABLE, "application_id")?),
        plan_id: PlanId(get(row, 2, TABLE, "plan_id")?),
        created_at: get_timestamp(row, 3, TABLE, "created_at")?,
    })
}

fn income_from_row(row: &Row<'_>) -> Result<IncomeRecord, StoreError> {
    const TABLE: &str = "income_records";
    Ok(IncomeRecord {
        id: get(row, 0, TABLE, "id")?,
        case_number: CaseNumber(get(row, 1, TABLE, "case_number")?),
        employment_income: get(row, 2, TABLE, "employment_income")?,
        property_income: get(row, 3, TABLE, "property_income")?,
        recorded_at: get_timestamp(row, 4, TABLE, "recorded_at")?,
    })
}

fn child_from_row(row: &Row<'_>) -> Result<ChildRecord, StoreError> {
    const TABLE: &str = "child_records";
    Ok(ChildRecord {
        id: get(row, 0, TABLE, "id")?,
        case_number: CaseNumber(get(row, 1, TABLE, "case_number")?),
        date_of_birth: get_date(row, 2, TABLE, "date_of_birth")?,
        national_id: get(row, 3, TABLE, "national_id")?,
        recorded_at: get_timestamp(row, 4, TABLE, "recorded_at")?,
    })
}

fn education_from_row(row: &Row<'_>) -> Result<EducationRecord, StoreError> {
    const TABLE: &str = "education_records";
    Ok(EducationRecord {
        id: get(row, 0, TABLE, "id")?,
        case_number: CaseNumber(get(row, 1, TABLE, "case_number")?),
        qualification: get(row, 2, TABLE, "qualification")?,
        graduation_year: get(row, 3, TABLE, "graduation_year")?,
        recorded_at: get_timestamp(row, 4, TABLE, "recorded_at")?,
    })
}

pub(crate) fn decision_from_row(row: &Row<'_>) -> Result<EligibilityDecision, StoreError> {
    const TABLE: &str = "eligibility_decisions";
    Ok(EligibilityDecision {
        id: DecisionId(get(row, 0, TABLE, "id")?),
        case_number: CaseNumber(get(row, 1, TABLE, "case_number")?),
        plan_name: get(row, 2, TABLE, "plan_name")?,
        status: parse_enum(&get::<String>(row, 3, TABLE, "status")?, TABLE, "status")?,
        validity_start: get_optional_date(row, 4, TABLE, "validity_start")?,
        validity_end: get_optional_date(row, 5, TABLE, "validity_end")?,
        benefit_amount: get(row, 6, TABLE, "benefit_amount")?,
        denial_reason: get(row, 7, TABLE, "denial_reason")?,
        decided_at: get_timestamp(row, 8, TABLE, "decided_at")?,
    })
}

fn trigger_from_row(row: &Row<'_>) -> Result<CorrespondenceTrigger, StoreError> {
    const TABLE: &str = "correspondence_triggers";
    Ok(CorrespondenceTrigger {
        id: TriggerId(get(row, 0, TABLE, "id")?),
        case_number: CaseNumber(get(row, 1, TABLE, "case_number")?),
        decision_id: DecisionId(get(row, 2, TABLE, "decision_id")?),
        status: parse_enum(&get::<String>(row, 3, TABLE, "status")?, TABLE, "status")?,
        notice: get(row, 4, TABLE, "notice")?,
        created_at: get_timestamp(row, 5, TABLE, "created_at")?,
        updated_at: get_timestamp(row, 6, TABLE, "updated_at")?,
    })
}

/// Outcome of a bundle read, resolved to a `CaseError` outside the retry loop.
enum BundleLookup {
    Missing,
    Orphaned(ApplicationId),
    Found(Box<CaseBundle>),
}

fn load_bundle(conn: &Connection, case_number: CaseNumber) -> Result<BundleLookup, StoreError> {
    // One read transaction so every part comes from the same snapshot.
    let tx = conn.unchecked_transaction()?;

    let case_sql = format!("SELECT {CASE_COLUMNS} FROM cases WHERE case_number = ?1");
    let Some(case) = query_first(&tx, &case_sql, [case_number.0], case_from_row)? else {
        return Ok(BundleLookup::Missing);
    };

    let application_sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ?1");
    let Some(application) =
        query_first(&tx, &application_sql, [case.application_id.0], application_from_row)?
    else {
        return Ok(BundleLookup::Orphaned(case.application_id));
    };

    let plan = query_first(
        &tx,
        "SELECT id, name, start_date, end_date, category_id, active, created_at, updated_at
         FROM plans WHERE id = ?1",
        [case.plan_id.0],
        plan_from_row,
    )?
    .ok_or(StoreError::CorruptRow {
        table: "cases",
        column: "plan_id",
        detail: format!("plan {} is missing", case.plan_id),
    })?;
    let category = query_first(
        &tx,
        "SELECT id, name, active, created_at, updated_at FROM plan_categories WHERE id = ?1",
        [plan.category_id.0],
        category_from_row,
    )?
    .ok_or(StoreError::CorruptRow {
        table: "plans",
        column: "category_id",
        detail: format!("category {} is missing", plan.category_id),
    })?;

    let income = query_first(
        &tx,
        "SELECT id, case_number, employment_income, property_income, recorded_at
         FROM income_records WHERE case_number = ?1 ORDER BY id DESC LIMIT 1",
        [case_number.0],
        income_from_row,
    )?;
    let children = query_all(
        &tx,
        "SELECT id, case_number, date_of_birth, national_id, recorded_at
         FROM child_records WHERE case_number = ?1 ORDER BY id",
        [case_number.0],
        child_from_row,
    )?;
    let education = query_first(
        &tx,
        "SELECT id, case_number, qualification, graduation_year, recorded_at
         FROM education_records WHERE case_number = ?1 ORDER BY id DESC LIMIT 1",
        [case_number.0],
        education_from_row,
    )?;
    let decision_sql = format!(
        "SELECT {DECISION_COLUMNS} FROM eligibility_decisions WHERE case_number = ?1
         ORDER BY decided_at DESC, id DESC LIMIT 1"
    );
    let latest_decision = query_first(&tx, &decision_sql, [case_number.0], decision_from_row)?;

    tx.finish()?;
    Ok(BundleLookup::Found(Box::new(CaseBundle {
        application,
        case,
        plan,
        category,
        income,
        children,
        education,
        latest_decision,
    })))
}

fn fact_insert_error(err: rusqlite::Error, case_number: CaseNumber) -> CaseError {
    match StoreError::from(err) {
        StoreError::ForeignKeyViolation(_) => CaseError::CaseNotFound(case_number),
        other => other.into(),
    }
}

/// Case lifecycle storage over the shared [`Database`].
#[derive(Clone)]
pub struct CaseRepository {
    db: Database,
}

impl CaseRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Register an application. National-id uniqueness is left to the store constraint.
    #[instrument(skip(self, application), fields(state = %application.state))]
    pub fn create_application(
        &self,
        application: &NewApplication,
    ) -> Result<CitizenApplication, CaseError> {
        require_text("full name", &application.full_name)?;
        require_text("national id", &application.national_id)?;
        require_text("state", &application.state)?;
        let national_id = application.national_id.trim();
        let now = format_timestamp(Utc::now());

        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO applications
                    (full_name, email, phone, national_id, gender, state, date_of_birth,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    application.full_name.trim(),
                    application.email,
                    application.phone,
                    national_id,
                    application.gender.label(),
                    application.state.trim().to_ascii_uppercase(),
                    application.date_of_birth.map(format_date),
                    now,
                ],
            )
            .map_err(|err| match StoreError::from(err) {
                StoreError::UniqueViolation(_) => CaseError::DuplicateIdentity {
                    field: "national id".to_string(),
                    value: national_id.to_string(),
                },
                other => other.into(),
            })?;
            Ok::<_, CaseError>(ApplicationId(conn.last_insert_rowid()))
        })?;

        info!(application_id = %id, "application registered");
        self.application(id)
    }

    pub fn application(&self, id: ApplicationId) -> Result<CitizenApplication, CaseError> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ?1");
        self.db
            .read(|conn| query_first(conn, &sql, [id.0], application_from_row))?
            .ok_or(CaseError::ApplicationNotFound(id))
    }

    /// Registered applications, newest first, whether or not a case exists yet.
    pub fn list_applications(
        &self,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<CitizenApplication>, CaseError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications ORDER BY id DESC LIMIT ?1 OFFSET ?2"
        );
        let limit = limit.map_or(-1, |value| i64::try_from(value).unwrap_or(i64::MAX));
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        Ok(self.db.read(|conn| {
            query_all(conn, &sql, params![limit, offset], application_from_row)
        })?)
    }

    /// Identity fields are immutable; only email and phone may change.
    #[instrument(skip(self, update))]
    pub fn update_application_contact(
        &self,
        id: ApplicationId,
        update: &ContactUpdate,
    ) -> Result<CitizenApplication, CaseError> {
        let changed = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE applications
                 SET email = COALESCE(?1, email), phone = COALESCE(?2, phone), updated_at = ?3
                 WHERE id = ?4",
                params![
                    update.email,
                    update.phone,
                    format_timestamp(Utc::now()),
                    id.0
                ],
            )
            .map_err(StoreError::from)
        })?;
        if changed == 0 {
            return Err(CaseError::ApplicationNotFound(id));
        }
        self.application(id)
    }

    /// Open a case. The case number is allocated by the insert itself.
    #[instrument(skip(self))]
    pub fn create_case(
        &self,
        application_id: ApplicationId,
        plan_id: PlanId,
    ) -> Result<BenefitCase, CaseError> {
        let now = format_timestamp(Utc::now());

        let case_number = self.db.with_conn(|conn| -> Result<CaseNumber, CaseError> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let application_exists = tx
                .query_row(
                    "SELECT 1 FROM applications WHERE id = ?1",
                    [application_id.0],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !application_exists {
                return Err(CaseError::ApplicationNotFound(application_id));
            }

            let plan_active: Option<bool> = tx
                .query_row(
                    "SELECT active FROM plans WHERE id = ?1",
                    [plan_id.0],
                    |row| row.get(0),
                )
                .optional()?;
            match plan_active {
                None => return Err(CaseError::PlanNotFound(plan_id)),
                Some(false) => {
                    return Err(CaseError::InvalidInput(format!(
                        "plan {plan_id} is not accepting new cases"
                    )))
                }
                Some(true) => {}
            }

            tx.execute(
                "INSERT INTO cases (application_id, plan_id, created_at) VALUES (?1, ?2, ?3)",
                params![application_id.0, plan_id.0, now],
            )
            .map_err(|err| match StoreError::from(err) {
                StoreError::UniqueViolation(_) => CaseError::DuplicateCase {
                    application_id,
                    plan_id,
                },
                other => other.into(),
            })?;
            let case_number = CaseNumber(tx.last_insert_rowid());
            tx.commit()?;
            Ok(case_number)
        })?;

        info!(%case_number, "case opened");
        self.case(case_number)
    }

    pub fn case(&self, case_number: CaseNumber) -> Result<BenefitCase, CaseError> {
        let sql = format!("SELECT {CASE_COLUMNS} FROM cases WHERE case_number = ?1");
        self.db
            .read(|conn| query_first(conn, &sql, [case_number.0], case_from_row))?
            .ok_or(CaseError::CaseNotFound(case_number))
    }

    #[instrument(skip(self, income))]
    pub fn append_income(
        &self,
        case_number: CaseNumber,
        income: &NewIncome,
    ) -> Result<IncomeRecord, CaseError> {
        if income.employment_income < 0 || income.property_income < 0 {
            return Err(CaseError::InvalidInput(
                "income amounts must not be negative".to_string(),
            ));
        }
        let recorded_at = Utc::now();

        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO income_records
                    (case_number, employment_income, property_income, recorded_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    case_number.0,
                    income.employment_income,
                    income.property_income,
                    format_timestamp(recorded_at)
                ],
            )
            .map_err(|err| fact_insert_error(err, case_number))?;
            Ok::<_, CaseError>(conn.last_insert_rowid())
        })?;

        debug!(income_id = id, "income recorded");
        Ok(IncomeRecord {
            id,
            case_number,
            employment_income: income.employment_income,
            property_income: income.property_income,
            recorded_at,
        })
    }

    #[instrument(skip(self, child))]
    pub fn append_child(
        &self,
        case_number: CaseNumber,
        child: &NewChild,
    ) -> Result<ChildRecord, CaseError> {
        let recorded_at = Utc::now();
        if child.date_of_birth > recorded_at.date_naive() {
            return Err(CaseError::InvalidInput(format!(
                "child date of birth {} is in the future",
                child.date_of_birth
            )));
        }
        let national_id = child
            .national_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO child_records (case_number, date_of_birth, national_id, recorded_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    case_number.0,
                    format_date(child.date_of_birth),
                    national_id,
                    format_timestamp(recorded_at)
                ],
            )
            .map_err(|err| fact_insert_error(err, case_number))?;
            Ok::<_, CaseError>(conn.last_insert_rowid())
        })?;

        debug!(child_id = id, "child recorded");
        Ok(ChildRecord {
            id,
            case_number,
            date_of_birth: child.date_of_birth,
            national_id: national_id.map(str::to_string),
            recorded_at,
        })
    }

    #[instrument(skip(self, education))]
    pub fn append_education(
        &self,
        case_number: CaseNumber,
        education: &NewEducation,
    ) -> Result<EducationRecord, CaseError> {
        require_text("qualification", &education.qualification)?;
        let recorded_at = Utc::now();
        let latest_year = recorded_at.year();
        if !(EARLIEST_GRADUATION_YEAR..=latest_year).contains(&education.graduation_year) {
            return Err(CaseError::InvalidInput(format!(
                "graduation year {} must be between {EARLIEST_GRADUATION_YEAR} and {latest_year}",
                education.graduation_year
            )));
        }
        let qualification = education.qualification.trim();

        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO education_records
                    (case_number, qualification, graduation_year, recorded_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    case_number.0,
                    qualification,
                    education.graduation_year,
                    format_timestamp(recorded_at)
                ],
            )
            .map_err(|err| fact_insert_error(err, case_number))?;
            Ok::<_, CaseError>(conn.last_insert_rowid())
        })?;

        debug!(education_id = id, "education recorded");
        Ok(EducationRecord {
            id,
            case_number,
            qualification: qualification.to_string(),
            graduation_year: education.graduation_year,
            recorded_at,
        })
    }

    pub fn case_bundle(&self, case_number: CaseNumber) -> Result<CaseBundle, CaseError> {
        match self.db.read(|conn| load_bundle(conn, case_number))? {
            BundleLookup::Found(bundle) => Ok(*bundle),
            BundleLookup::Missing => Err(CaseError::CaseNotFound(case_number)),
            BundleLookup::Orphaned(application_id) => Err(CaseError::InvariantViolation(format!(
                "case {case_number} references missing application {application_id}"
            ))),
        }
    }

    /// All decisions for a case, oldest first.
    pub fn decision_history(
        &self,
        case_number: CaseNumber,
    ) -> Result<Vec<EligibilityDecision>, CaseError> {
        let sql = format!(
            "SELECT {DECISION_COLUMNS} FROM eligibility_decisions WHERE case_number = ?1
             ORDER BY decided_at, id"
        );
        let (exists, decisions) = self.db.read(|conn| {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM cases WHERE case_number = ?1",
                    [case_number.0],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            let decisions = query_all(conn, &sql, [case_number.0], decision_from_row)?;
            Ok((exists, decisions))
        })?;
        if !exists {
            return Err(CaseError::CaseNotFound(case_number));
        }
        Ok(decisions)
    }

    /// Persist a decision and its correspondence trigger in one transaction.
    #[instrument(skip(self, determination, notice), fields(case_number = %determination.case_number))]
    pub fn record_determination(
        &self,
        determination: &Determination,
        notice: &NoticeText,
        decided_at: DateTime<Utc>,
    ) -> Result<EligibilityRun, CaseError> {
        let stamp = format_timestamp(decided_at);
        let case_number = determination.case_number;

        let (decision_id, trigger_id) = self.db.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO eligibility_decisions
                    (case_number, plan_name, status, validity_start, validity_end,
                     benefit_amount, denial_reason, decided_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    case_number.0,
                    determination.plan_name,
                    determination.status.label(),
                    determination.validity_start.map(format_date),
                    determination.validity_end.map(format_date),
                    determination.benefit_amount,
                    determination.denial_reason,
                    stamp,
                ],
            )
            .map_err(|err| fact_insert_error(err, case_number))?;
            let decision_id = DecisionId(tx.last_insert_rowid());

            tx.execute(
                "INSERT INTO correspondence_triggers
                    (case_number, decision_id, status, notice, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    case_number.0,
                    decision_id.0,
                    TriggerStatus::Pending.label(),
                    notice.as_str(),
                    stamp,
                ],
            )?;
            let trigger_id = TriggerId(tx.last_insert_rowid());
            tx.commit()?;
            Ok::<_, CaseError>((decision_id, trigger_id))
        })?;

        info!(
            %decision_id,
            %trigger_id,
            status = determination.status.label(),
            "eligibility decision recorded"
        );
        Ok(EligibilityRun {
            decision: EligibilityDecision {
                id: decision_id,
                case_number,
                plan_name: determination.plan_name.clone(),
                status: determination.status,
                validity_start: determination.validity_start,
                validity_end: determination.validity_end,
                benefit_amount: determination.benefit_amount,
                denial_reason: determination.denial_reason.clone(),
                decided_at,
            },
            trigger: CorrespondenceTrigger {
                id: trigger_id,
                case_number,
                decision_id,
                status: TriggerStatus::Pending,
                notice: notice.as_str().to_string(),
                created_at: decided_at,
                updated_at: decided_at,
            },
        })
    }

    /// Decisions persisted without a correspondence trigger.
    pub fn decisions_without_trigger(&self) -> Result<Vec<EligibilityDecision>, CaseError> {
        let sql = format!(
            "SELECT {DECISION_COLUMNS} FROM eligibility_decisions d
             WHERE NOT EXISTS (
                 SELECT 1 FROM correspondence_triggers t WHERE t.decision_id = d.id
             )
             ORDER BY d.id"
        );
        Ok(self.db.read(|conn| query_all(conn, &sql, [], decision_from_row))?)
    }

    /// Cases whose application row is gone. Only reachable for data written with
    /// foreign keys disabled.
    pub fn cases_without_application(&self) -> Result<Vec<CaseNumber>, CaseError> {
        let numbers = self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.case_number FROM cases c
                 LEFT JOIN applications a ON a.id = c.application_id
                 WHERE a.id IS NULL ORDER BY c.case_number",
            )?;
            let numbers = stmt
                .query_map([], |row| row.get(0).map(CaseNumber))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(numbers)
        })?;
        Ok(numbers)
    }

    /// Insert the missing trigger for `decision`. Returns `None` when one already exists.
    #[instrument(skip(self, decision, notice), fields(decision_id = %decision.id))]
    pub fn complete_trigger(
        &self,
        decision: &EligibilityDecision,
        notice: &NoticeText,
        created_at: DateTime<Utc>,
    ) -> Result<Option<CorrespondenceTrigger>, CaseError> {
        let stamp = format_timestamp(created_at);
        let inserted = self.db.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let changed = tx.execute(
                "INSERT INTO correspondence_triggers
                    (case_number, decision_id, status, notice, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(decision_id) DO NOTHING",
                params![
                    decision.case_number.0,
                    decision.id.0,
                    TriggerStatus::Pending.label(),
                    notice.as_str(),
                    stamp,
                ],
            )?;
            let id = (changed > 0).then(|| TriggerId(tx.last_insert_rowid()));
            tx.commit()?;
            Ok::<_, CaseError>(id)
        })?;

        let Some(id) = inserted else {
            debug!("trigger already present");
            return Ok(None);
        };
        warn!(trigger_id = %id, "completed missing correspondence trigger");
        Ok(Some(CorrespondenceTrigger {
            id,
            case_number: decision.case_number,
            decision_id: decision.id,
            status: TriggerStatus::Pending,
            notice: notice.as_str().to_string(),
            created_at,
            updated_at: created_at,
        }))
    }

    pub fn trigger(&self, id: TriggerId) -> Result<CorrespondenceTrigger, CaseError> {
        let sql = format!("SELECT {TRIGGER_COLUMNS} FROM correspondence_triggers WHERE id = ?1");
        self.db
            .read(|conn| query_first(conn, &sql, [id.0], trigger_from_row))?
            .ok_or(CaseError::TriggerNotFound(id))
    }

    /// PENDING triggers, newest first.
    pub fn pending_triggers(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<CorrespondenceTrigger>, CaseError> {
        let sql = format!(
            "SELECT {TRIGGER_COLUMNS} FROM correspondence_triggers WHERE status = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2"
        );
        let limit = limit.map_or(-1, |value| i64::try_from(value).unwrap_or(i64::MAX));
        Ok(self.db.read(|conn| {
            query_all(
                conn,
                &sql,
                params![TriggerStatus::Pending.label(), limit],
                trigger_from_row,
            )
        })?)
    }

    /// Move a trigger to SENT. Marking an already-sent trigger is a no-op.
    #[instrument(skip(self))]
    pub fn mark_trigger_sent(&self, id: TriggerId) -> Result<CorrespondenceTrigger, CaseError> {
        let changed = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE correspondence_triggers SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = ?4",
                params![
                    TriggerStatus::Sent.label(),
                    format_timestamp(Utc::now()),
                    id.0,
                    TriggerStatus::Pending.label()
                ],
            )
            .map_err(StoreError::from)
        })?;
        if changed > 0 {
            info!(trigger_id = %id, "trigger marked sent");
        }
        self.trigger(id)
    }
}
