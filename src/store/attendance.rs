use sqlx::SqlitePool;

use crate::error::ApiError;
use crate::model::attendance::{AttendanceRecord, StatusEntry};

/// Row shape of `attendance_records`: the entry list is stored as one
/// JSON document per date, so a save is a single-row write and the
/// last writer for a date wins outright.
#[derive(sqlx::FromRow)]
struct RecordRow {
    date: String,
    entries: String,
}

impl RecordRow {
    fn decode(self) -> Result<AttendanceRecord, ApiError> {
        let entries: Vec<StatusEntry> = serde_json::from_str(&self.entries)
            .map_err(|e| ApiError::Storage(sqlx::Error::Decode(Box::new(e))))?;
        Ok(AttendanceRecord {
            date: self.date,
            entries,
        })
    }
}

pub async fn find_by_date(
    pool: &SqlitePool,
    date: &str,
) -> Result<Option<AttendanceRecord>, ApiError> {
    let row = sqlx::query_as::<_, RecordRow>(
        "SELECT date, entries FROM attendance_records WHERE date = ?",
    )
    .bind(date)
    .fetch_optional(pool)
    .await?;

    row.map(RecordRow::decode).transpose()
}

/// Inclusive range scan. Dates are fixed-width zero-padded strings, so
/// lexical comparison in SQL is chronological comparison.
pub async fn find_by_date_range(
    pool: &SqlitePool,
    start: &str,
    end: &str,
) -> Result<Vec<AttendanceRecord>, ApiError> {
    let rows = sqlx::query_as::<_, RecordRow>(
        "SELECT date, entries FROM attendance_records WHERE date >= ? AND date <= ? ORDER BY date",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(RecordRow::decode).collect()
}

/// Insert or fully overwrite the entry list for the record's date.
pub async fn upsert(pool: &SqlitePool, record: &AttendanceRecord) -> Result<(), ApiError> {
    let entries = serde_json::to_string(&record.entries)
        .map_err(|e| ApiError::Validation(format!("Unserializable entry list: {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO attendance_records (date, entries)
        VALUES (?, ?)
        ON CONFLICT(date) DO UPDATE SET entries = excluded.entries
        "#,
    )
    .bind(&record.date)
    .bind(entries)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns whether a record existed for the date. Deleting an absent
/// date is a no-op success.
pub async fn delete(pool: &SqlitePool, date: &str) -> Result<bool, ApiError> {
    let result = sqlx::query("DELETE FROM attendance_records WHERE date = ?")
        .bind(date)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
