use rusqlite::ErrorCode;

/// Store-level failure, classified from the underlying SQLite error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("corrupt value in {table}.{column}: {detail}")]
    CorruptRow {
        table: &'static str,
        column: &'static str,
        detail: String,
    },

    #[error("schema migration failed: {0}")]
    Migration(String),

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    /// Column named in a `UNIQUE constraint failed: table.column` message, if any.
    pub fn violated_column(&self) -> Option<&str> {
        match self {
            StoreError::UniqueViolation(detail) => detail
                .rsplit(':')
                .next()
                .and_then(|columns| columns.split(',').next())
                .and_then(|column| column.trim().rsplit('.').next()),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, message) => {
                let detail = message.clone().unwrap_or_else(|| failure.to_string());
                match failure.code {
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen => {
                        StoreError::Unavailable(detail)
                    }
                    ErrorCode::ConstraintViolation => match failure.extended_code {
                        rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                            StoreError::UniqueViolation(detail)
                        }
                        rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                            StoreError::ForeignKeyViolation(detail)
                        }
                        _ => StoreError::Database(detail),
                    },
                    _ => StoreError::Database(detail),
                }
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn constrained() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE parent (id INTEGER PRIMARY KEY, code TEXT NOT NULL UNIQUE);
             CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id));",
        )
        .expect("schema");
        conn
    }

    #[test]
    fn classifies_unique_violations_with_column() {
        let conn = constrained();
        conn.execute("INSERT INTO parent (code) VALUES ('A')", [])
            .expect("first insert");
        let err: StoreError = conn
            .execute("INSERT INTO parent (code) VALUES ('A')", [])
            .expect_err("duplicate rejected")
            .into();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
        assert_eq!(err.violated_column(), Some("code"));
    }

    #[test]
    fn classifies_foreign_key_violations() {
        let conn = constrained();
        let err: StoreError = conn
            .execute("INSERT INTO child (parent_id) VALUES (42)", [])
            .expect_err("orphan rejected")
            .into();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)));
        assert!(!err.is_unavailable());
    }
}
