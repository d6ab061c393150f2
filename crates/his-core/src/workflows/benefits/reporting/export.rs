use std::io::Write;

use serde::Serialize;

/// Write `rows` as CSV with a header row derived from the field names.
pub fn write_csv<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv<T: Serialize>(rows: &[T]) -> Result<String, csv::Error> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, rows)?;
    // Every field is a Rust string or number, so the buffer is valid UTF-8.
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
