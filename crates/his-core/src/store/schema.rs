//! Canonical relational schema and its migration path.
//!
//! Versions are tracked with `PRAGMA user_version`; each migration runs in its own
//! transaction and bumps the version in the same commit.

use rusqlite::Connection;
use tracing::info;

use super::error::StoreError;

pub const SCHEMA_VERSION: i64 = 2;

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA synchronous = NORMAL;
"#;

const V1_CASE_GRAPH: &str = r#"
CREATE TABLE plan_categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE plans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    category_id INTEGER NOT NULL REFERENCES plan_categories(id),
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK (start_date <= end_date)
);

CREATE TABLE caseworker_accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    credential TEXT NOT NULL,
    phone TEXT,
    gender TEXT NOT NULL,
    national_id TEXT NOT NULL UNIQUE,
    date_of_birth TEXT,
    role TEXT NOT NULL CHECK (role IN ('ADMIN', 'CASEWORKER')),
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE applications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    national_id TEXT NOT NULL UNIQUE,
    gender TEXT NOT NULL,
    state TEXT NOT NULL,
    date_of_birth TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- case_number doubles as the rowid so allocation happens inside the INSERT.
CREATE TABLE cases (
    case_number INTEGER PRIMARY KEY AUTOINCREMENT,
    application_id INTEGER NOT NULL REFERENCES applications(id),
    plan_id INTEGER NOT NULL REFERENCES plans(id),
    created_at TEXT NOT NULL,
    UNIQUE (application_id, plan_id)
);

CREATE TABLE income_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_number INTEGER NOT NULL REFERENCES cases(case_number),
    employment_income INTEGER NOT NULL CHECK (employment_income >= 0),
    property_income INTEGER NOT NULL CHECK (property_income >= 0),
    recorded_at TEXT NOT NULL
);

CREATE TABLE child_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_number INTEGER NOT NULL REFERENCES cases(case_number),
    date_of_birth TEXT NOT NULL,
    national_id TEXT,
    recorded_at TEXT NOT NULL
);

CREATE TABLE education_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_number INTEGER NOT NULL REFERENCES cases(case_number),
    qualification TEXT NOT NULL,
    graduation_year INTEGER NOT NULL,
    recorded_at TEXT NOT NULL
);

-- Append-only: the application never issues UPDATE or DELETE here.
CREATE TABLE eligibility_decisions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_number INTEGER NOT NULL REFERENCES cases(case_number),
    plan_name TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('APPROVED', 'DENIED', 'PURCHASE_REQUIRED', 'PENDING')),
    validity_start TEXT,
    validity_end TEXT,
    benefit_amount INTEGER NOT NULL DEFAULT 0,
    denial_reason TEXT,
    decided_at TEXT NOT NULL,
    CHECK ((status = 'DENIED') = (denial_reason IS NOT NULL))
);

CREATE TABLE correspondence_triggers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_number INTEGER NOT NULL REFERENCES cases(case_number),
    decision_id INTEGER NOT NULL UNIQUE REFERENCES eligibility_decisions(id),
    status TEXT NOT NULL CHECK (status IN ('PENDING', 'SENT')),
    notice TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

const V2_REPORTING_INDEXES: &str = r#"
CREATE INDEX idx_cases_application ON cases(application_id);
CREATE INDEX idx_income_case ON income_records(case_number);
CREATE INDEX idx_children_case ON child_records(case_number);
CREATE INDEX idx_education_case ON education_records(case_number);
CREATE INDEX idx_decisions_case_decided ON eligibility_decisions(case_number, decided_at);
CREATE INDEX idx_triggers_status_created ON correspondence_triggers(status, created_at);
CREATE INDEX idx_applications_state ON applications(state);
"#;

const MIGRATIONS: &[(i64, &str)] = &[(1, V1_CASE_GRAPH), (2, V2_REPORTING_INDEXES)];

pub fn current_version(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Bring the database up to [`SCHEMA_VERSION`], returning the version found on entry.
pub fn migrate(conn: &Connection) -> Result<i64, StoreError> {
    let found = current_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {found} is newer than supported version {SCHEMA_VERSION}"
        )));
    }

    for (version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > found) {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)
            .map_err(|err| StoreError::Migration(format!("version {version}: {err}")))?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        info!(version, "applied schema migration");
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .expect("prepare");
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .expect("query")
            .collect::<Result<Vec<_>, _>>()
            .expect("rows");
        names
    }

    #[test]
    fn migrates_empty_database_to_latest() {
        let conn = Connection::open_in_memory().expect("open");
        let found = migrate(&conn).expect("migrate");
        assert_eq!(found, 0);
        assert_eq!(current_version(&conn).expect("version"), SCHEMA_VERSION);

        let tables = table_names(&conn);
        for expected in [
            "applications",
            "caseworker_accounts",
            "cases",
            "child_records",
            "correspondence_triggers",
            "education_records",
            "eligibility_decisions",
            "income_records",
            "plan_categories",
            "plans",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn migration_is_a_no_op_when_current() {
        let conn = Connection::open_in_memory().expect("open");
        migrate(&conn).expect("first run");
        let found = migrate(&conn).expect("second run");
        assert_eq!(found, SCHEMA_VERSION);
    }

    #[test]
    fn upgrades_version_one_databases() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(V1_CASE_GRAPH).expect("v1");
        conn.pragma_update(None, "user_version", 1).expect("version");

        assert_eq!(migrate(&conn).expect("migrate"), 1);
        let index_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%'",
                [],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(index_count, 7);
    }

    #[test]
    fn refuses_newer_schema_versions() {
        let conn = Connection::open_in_memory().expect("open");
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .expect("version");
        assert!(matches!(migrate(&conn), Err(StoreError::Migration(_))));
    }
}
