use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, Params, Row};

use super::error::StoreError;

pub(crate) type RowDecoder<T> = fn(&Row<'_>) -> Result<T, StoreError>;

/// Run `sql` and decode every row.
pub(crate) fn query_all<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    decode: RowDecoder<T>,
) -> Result<Vec<T>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut decoded = Vec::new();
    while let Some(row) = rows.next()? {
        decoded.push(decode(row)?);
    }
    Ok(decoded)
}

/// Run `sql` and decode the first row, if any.
pub(crate) fn query_first<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    decode: RowDecoder<T>,
) -> Result<Option<T>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let decoded = match rows.next()? {
        Some(row) => Some(decode(row)?),
        None => None,
    };
    Ok(decoded)
}

/// Get a required column value from a row, returning CorruptRow on failure.
pub(crate) fn get<T: rusqlite::types::FromSql>(
    row: &Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

/// Parse a string into an enum, returning CorruptRow on failure.
pub(crate) fn parse_enum<T: std::str::FromStr>(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    raw.parse().map_err(|_| StoreError::CorruptRow {
        table,
        column,
        detail: format!("unknown variant: {raw}"),
    })
}

/// Timestamps are stored as fixed-width RFC 3339 UTC strings so they sort lexically.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow {
            table,
            column,
            detail: format!("invalid timestamp '{raw}': {e}"),
        })
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_date(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: format!("invalid date '{raw}': {e}"),
    })
}

pub(crate) fn get_timestamp(
    row: &Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<DateTime<Utc>, StoreError> {
    parse_timestamp(&get::<String>(row, idx, table, column)?, table, column)
}

pub(crate) fn get_date(
    row: &Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<NaiveDate, StoreError> {
    parse_date(&get::<String>(row, idx, table, column)?, table, column)
}

pub(crate) fn get_optional_date(
    row: &Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<Option<NaiveDate>, StoreError> {
    parse_optional_date(get(row, idx, table, column)?, table, column)
}

pub(crate) fn parse_optional_date(
    raw: Option<String>,
    table: &'static str,
    column: &'static str,
) -> Result<Option<NaiveDate>, StoreError> {
    raw.map(|value| parse_date(&value, table, column))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_round_trip_and_sort() {
        let earlier = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let later = earlier + chrono::Duration::microseconds(1);
        let (a, b) = (format_timestamp(earlier), format_timestamp(later));
        assert!(a < b);
        assert_eq!(parse_timestamp(&a, "t", "c").unwrap(), earlier);
    }

    #[test]
    fn rejects_malformed_dates() {
        let result = parse_date("2024-02-30", "applications", "date_of_birth");
        assert!(matches!(
            result,
            Err(StoreError::CorruptRow {
                table: "applications",
                column: "date_of_birth",
                ..
            })
        ));
    }
}
