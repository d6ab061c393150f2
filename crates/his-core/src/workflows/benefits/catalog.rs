//! Plan categories, plans and caseworker accounts.

use chrono::Utc;
use rusqlite::{params, Row};
use tracing::{info, instrument};

use super::domain::{
    AccountId, AccountRole, CaseWorkerAccount, CategoryId, NewCaseWorkerAccount, NewPlan, Plan,
    PlanCategory, PlanId,
};
use super::error::{require_text, CaseError};
use crate::store::row_helpers::{
    format_date, format_timestamp, get, get_date, get_optional_date, get_timestamp, parse_enum,
    query_all, query_first,
};
use crate::store::{Database, StoreError};

const CATEGORY_COLUMNS: &str = "id, name, active, created_at, updated_at";
const PLAN_COLUMNS: &str =
    "id, name, start_date, end_date, category_id, active, created_at, updated_at";
const ACCOUNT_COLUMNS: &str = "id, full_name, email, phone, gender, national_id, date_of_birth, \
     role, active, created_at, updated_at";

pub(crate) fn category_from_row(row: &Row<'_>) -> Result<PlanCategory, StoreError> {
    const TABLE: &str = "plan_categories";
    Ok(PlanCategory {
        id: CategoryId(get(row, 0, TABLE, "id")?),
        name: get(row, 1, TABLE, "name")?,
        active: get(row, 2, TABLE, "active")?,
        created_at: get_timestamp(row, 3, TABLE, "created_at")?,
        updated_at: get_timestamp(row, 4, TABLE, "updated_at")?,
    })
}

pub(crate) fn plan_from_row(row: &Row<'_>) -> Result<Plan, StoreError> {
    const TABLE: &str = "plans";
    Ok(Plan {
        id: PlanId(get(row, 0, TABLE, "id")?),
        name: get(row, 1, TABLE, "name")?,
        start_date: get_date(row, 2, TABLE, "start_date")?,
        end_date: get_date(row, 3, TABLE, "end_date")?,
        category_id: CategoryId(get(row, 4, TABLE, "category_id")?),
        active: get(row, 5, TABLE, "active")?,
        created_at: get_timestamp(row, 6, TABLE, "created_at")?,
        updated_at: get_timestamp(row, 7, TABLE, "updated_at")?,
    })
}

fn account_from_row(row: &Row<'_>) -> Result<CaseWorkerAccount, StoreError> {
    const TABLE: &str = "caseworker_accounts";
    Ok(CaseWorkerAccount {
        id: AccountId(get(row, 0, TABLE, "id")?),
        full_name: get(row, 1, TABLE, "full_name")?,
        email: get(row, 2, TABLE, "email")?,
        phone: get(row, 3, TABLE, "phone")?,
        gender: parse_enum(&get::<String>(row, 4, TABLE, "gender")?, TABLE, "gender")?,
        national_id: get(row, 5, TABLE, "national_id")?,
        date_of_birth: get_optional_date(row, 6, TABLE, "date_of_birth")?,
        role: parse_enum(&get::<String>(row, 7, TABLE, "role")?, TABLE, "role")?,
        active: get(row, 8, TABLE, "active")?,
        created_at: get_timestamp(row, 9, TABLE, "created_at")?,
        updated_at: get_timestamp(row, 10, TABLE, "updated_at")?,
    })
}

/// Administrator-facing catalog of programs and staff accounts.
#[derive(Clone)]
pub struct CatalogRepository {
    db: Database,
}

impl CatalogRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub fn create_category(&self, name: &str) -> Result<PlanCategory, CaseError> {
        require_text("category name", name)?;
        let name = name.trim();
        let now = format_timestamp(Utc::now());

        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO plan_categories (name, active, created_at, updated_at)
                 VALUES (?1, 1, ?2, ?2)",
                params![name, now],
            )
            .map_err(|err| match StoreError::from(err) {
                StoreError::UniqueViolation(_) => CaseError::DuplicateIdentity {
                    field: "category name".to_string(),
                    value: name.to_string(),
                },
                other => other.into(),
            })?;
            Ok::<_, CaseError>(CategoryId(conn.last_insert_rowid()))
        })?;

        info!(category_id = %id, name, "plan category created");
        self.category(id)
    }

    pub fn category(&self, id: CategoryId) -> Result<PlanCategory, CaseError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM plan_categories WHERE id = ?1");
        self.db
            .read(|conn| query_first(conn, &sql, [id.0], category_from_row))?
            .ok_or(CaseError::CategoryNotFound(id))
    }

    pub fn list_categories(&self) -> Result<Vec<PlanCategory>, CaseError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM plan_categories ORDER BY name");
        Ok(self.db.read(|conn| query_all(conn, &sql, [], category_from_row))?)
    }

    #[instrument(skip(self))]
    pub fn set_category_active(
        &self,
        id: CategoryId,
        active: bool,
    ) -> Result<PlanCategory, CaseError> {
        let changed = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE plan_categories SET active = ?1, updated_at = ?2 WHERE id = ?3",
                params![active, format_timestamp(Utc::now()), id.0],
            )
            .map_err(StoreError::from)
        })?;
        if changed == 0 {
            return Err(CaseError::CategoryNotFound(id));
        }
        self.category(id)
    }

    #[instrument(skip(self, plan), fields(name = %plan.name, category_id = %plan.category_id))]
    pub fn create_plan(&self, plan: &NewPlan) -> Result<Plan, CaseError> {
        require_text("plan name", &plan.name)?;
        if plan.start_date > plan.end_date {
            return Err(CaseError::InvalidInput(format!(
                "plan start date {} is after end date {}",
                plan.start_date, plan.end_date
            )));
        }
        let now = format_timestamp(Utc::now());

        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO plans (name, start_date, end_date, category_id, active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
                params![
                    plan.name.trim(),
                    format_date(plan.start_date),
                    format_date(plan.end_date),
                    plan.category_id.0,
                    now,
                ],
            )
            .map_err(|err| match StoreError::from(err) {
                StoreError::ForeignKeyViolation(_) => CaseError::CategoryNotFound(plan.category_id),
                other => other.into(),
            })?;
            Ok::<_, CaseError>(PlanId(conn.last_insert_rowid()))
        })?;

        info!(plan_id = %id, "plan created");
        self.plan(id)
    }

    pub fn plan(&self, id: PlanId) -> Result<Plan, CaseError> {
        let sql = format!("SELECT {PLAN_COLUMNS} FROM plans WHERE id = ?1");
        self.db
            .read(|conn| query_first(conn, &sql, [id.0], plan_from_row))?
            .ok_or(CaseError::PlanNotFound(id))
    }

    pub fn list_plans(&self, active_only: bool) -> Result<Vec<Plan>, CaseError> {
        let sql = format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE (?1 = 0 OR active = 1) ORDER BY id"
        );
        Ok(self
            .db
            .read(|conn| query_all(conn, &sql, [active_only], plan_from_row))?)
    }

    #[instrument(skip(self))]
    pub fn set_plan_active(&self, id: PlanId, active: bool) -> Result<Plan, CaseError> {
        let changed = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE plans SET active = ?1, updated_at = ?2 WHERE id = ?3",
                params![active, format_timestamp(Utc::now()), id.0],
            )
            .map_err(StoreError::from)
        })?;
        if changed == 0 {
            return Err(CaseError::PlanNotFound(id));
        }
        self.plan(id)
    }

    #[instrument(skip(self, account), fields(role = account.role.label()))]
    pub fn create_account(
        &self,
        account: &NewCaseWorkerAccount,
    ) -> Result<CaseWorkerAccount, CaseError> {
        require_text("full name", &account.full_name)?;
        require_text("email", &account.email)?;
        require_text("national id", &account.national_id)?;
        require_text("credential", &account.credential)?;
        let email = account.email.trim().to_ascii_lowercase();
        let national_id = account.national_id.trim();
        let now = format_timestamp(Utc::now());

        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO caseworker_accounts
                    (full_name, email, credential, phone, gender, national_id, date_of_birth,
                     role, active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)",
                params![
                    account.full_name.trim(),
                    email,
                    account.credential,
                    account.phone,
                    account.gender.label(),
                    national_id,
                    account.date_of_birth.map(format_date),
                    account.role.label(),
                    now,
                ],
            )
            .map_err(|err| {
                let err = StoreError::from(err);
                match err.violated_column() {
                    Some("email") => CaseError::DuplicateIdentity {
                        field: "email".to_string(),
                        value: email.clone(),
                    },
                    Some("national_id") => CaseError::DuplicateIdentity {
                        field: "national id".to_string(),
                        value: national_id.to_string(),
                    },
                    _ => err.into(),
                }
            })?;
            Ok::<_, CaseError>(AccountId(conn.last_insert_rowid()))
        })?;

        info!(account_id = %id, "caseworker account created");
        self.account(id)
    }

    pub fn account(&self, id: AccountId) -> Result<CaseWorkerAccount, CaseError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM caseworker_accounts WHERE id = ?1");
        self.db
            .read(|conn| query_first(conn, &sql, [id.0], account_from_row))?
            .ok_or(CaseError::AccountNotFound(id))
    }

    pub fn list_accounts(
        &self,
        role: Option<AccountRole>,
    ) -> Result<Vec<CaseWorkerAccount>, CaseError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM caseworker_accounts
             WHERE (?1 IS NULL OR role = ?1) ORDER BY id"
        );
        let role = role.map(AccountRole::label);
        Ok(self
            .db
            .read(|conn| query_all(conn, &sql, [role], account_from_row))?)
    }

    #[instrument(skip(self))]
    pub fn set_account_active(
        &self,
        id: AccountId,
        active: bool,
    ) -> Result<CaseWorkerAccount, CaseError> {
        let changed = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE caseworker_accounts SET active = ?1, updated_at = ?2 WHERE id = ?3",
                params![active, format_timestamp(Utc::now()), id.0],
            )
            .map_err(StoreError::from)
        })?;
        if changed == 0 {
            return Err(CaseError::AccountNotFound(id));
        }
        self.account(id)
    }
}
