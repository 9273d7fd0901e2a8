//! Attendance aggregation over date-keyed records.
//!
//! The stores hand this module plain record lists; everything here is
//! a fresh computation per call, with no cached or shared state.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, StatusEntry};
use crate::model::student::Student;
use crate::store;

/// One cell of the monthly matrix. NoData means the date has no saved
/// record, or the record has no entry for the student. Not the same
/// thing as an explicit Absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum DayCell {
    #[serde(rename = "P")]
    Present,
    #[serde(rename = "A")]
    Absent,
    #[serde(rename = "-")]
    NoData,
}

impl DayCell {
    pub fn as_str(self) -> &'static str {
        match self {
            DayCell::Present => "P",
            DayCell::Absent => "A",
            DayCell::NoData => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRow {
    pub roll_no: String,
    pub name: String,
    pub department: String,
    /// One cell per calendar day, index 0 = day 1.
    pub days: Vec<DayCell>,
    pub total_present: u32,
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyMatrix {
    #[schema(example = "2024-01")]
    pub month: String,
    pub days_in_month: u32,
    pub rows: Vec<MonthlyRow>,
}

fn format_percentage(present: u32, total: u32) -> String {
    format!("{:.1}%", present as f64 / total as f64 * 100.0)
}

/// Rejects anything that is not a zero-padded `YYYY-MM-DD` string.
/// Range queries compare dates lexically, so the fixed-width form is
/// an invariant of every stored date, not just a style choice.
pub fn validate_date(date: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .filter(|parsed| parsed.format("%Y-%m-%d").to_string() == date)
        .ok_or_else(|| ApiError::validation(format!("Date must be YYYY-MM-DD, got '{date}'")))
}

pub fn parse_month(month: &str) -> Result<(i32, u32), ApiError> {
    let invalid = || ApiError::validation(format!("Month must be YYYY-MM, got '{month}'"));

    let (year_str, month_str) = month.split_once('-').ok_or_else(invalid)?;
    if year_str.len() != 4 || month_str.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year_str.parse().map_err(|_| invalid())?;
    let month_num: u32 = month_str.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month_num) {
        return Err(invalid());
    }
    Ok((year, month_num))
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32, ApiError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ApiError::validation(format!("No such month: {year}-{month:02}")))?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| ApiError::validation(format!("No such month: {year}-{month:02}")))?;

    Ok(next_first.signed_duration_since(first).num_days() as u32)
}

/// Fraction of in-window records in which each student is Present.
///
/// Window bounds are enforced by the store query that produced
/// `records`; this scan only tallies. A roll number that appears in no
/// record yields no key at all; callers must treat a missing key as
/// "no data", never as 0%. Entries are counted as-is: no roster
/// filtering, no deduplication within a record.
pub fn compute_window_percentages(records: &[AttendanceRecord]) -> HashMap<String, String> {
    #[derive(Default)]
    struct Tally {
        total: u32,
        present: u32,
    }

    let mut stats: HashMap<String, Tally> = HashMap::new();
    for record in records {
        for entry in &record.entries {
            let tally = stats.entry(entry.roll_no.clone()).or_default();
            tally.total += 1;
            if entry.status == AttendanceStatus::Present {
                tally.present += 1;
            }
        }
    }

    stats
        .into_iter()
        .map(|(roll_no, tally)| (roll_no, format_percentage(tally.present, tally.total)))
        .collect()
}

/// Day-by-day Present/Absent/NoData grid for every roster student.
///
/// The percentage denominator is the FULL month length, not the count
/// of days with data, so sparsely recorded months report deflated
/// percentages. That matches the reporting the product has always
/// shown; changing it would silently change every historical report.
pub fn compute_monthly_matrix(
    month: &str,
    roster: &[Student],
    records: &[AttendanceRecord],
) -> Result<MonthlyMatrix, ApiError> {
    let (year, month_num) = parse_month(month)?;
    let days = days_in_month(year, month_num)?;

    let by_date: HashMap<&str, &AttendanceRecord> =
        records.iter().map(|r| (r.date.as_str(), r)).collect();

    let mut rows = Vec::with_capacity(roster.len());
    for student in roster {
        let mut cells = Vec::with_capacity(days as usize);
        let mut total_present = 0u32;

        for day in 1..=days {
            let date = format!("{month}-{day:02}");
            let cell = by_date
                .get(date.as_str())
                .and_then(|record| {
                    record
                        .entries
                        .iter()
                        .find(|entry| entry.roll_no == student.roll_no)
                })
                .map(|entry| match entry.status {
                    AttendanceStatus::Present => DayCell::Present,
                    AttendanceStatus::Absent => DayCell::Absent,
                })
                .unwrap_or(DayCell::NoData);

            if cell == DayCell::Present {
                total_present += 1;
            }
            cells.push(cell);
        }

        rows.push(MonthlyRow {
            roll_no: student.roll_no.clone(),
            name: student.name.clone(),
            department: student.department.clone(),
            days: cells,
            total_present,
            percentage: format_percentage(total_present, days),
        });
    }

    Ok(MonthlyMatrix {
        month: month.to_string(),
        days_in_month: days,
        rows,
    })
}

/// Window percentages over `[window_start, window_end]`, fetched fresh
/// from the store.
pub async fn window_percentages(
    pool: &SqlitePool,
    window_start: &str,
    window_end: &str,
) -> Result<HashMap<String, String>, ApiError> {
    validate_date(window_start)?;
    validate_date(window_end)?;

    let records = store::attendance::find_by_date_range(pool, window_start, window_end).await?;
    Ok(compute_window_percentages(&records))
}

/// Monthly matrix for the given `YYYY-MM` month over the current
/// roster and that month's records.
pub async fn monthly_matrix(pool: &SqlitePool, month: &str) -> Result<MonthlyMatrix, ApiError> {
    let (year, month_num) = parse_month(month)?;
    let days = days_in_month(year, month_num)?;

    let start = format!("{month}-01");
    let end = format!("{month}-{days:02}");

    let roster = store::roster::list_students(pool).await?;
    let records = store::attendance::find_by_date_range(pool, &start, &end).await?;

    compute_monthly_matrix(month, &roster, &records)
}

/// Create or fully overwrite the record for `date`. Idempotent:
/// repeating the identical call leaves identical stored state.
pub async fn upsert_daily_record(
    pool: &SqlitePool,
    date: &str,
    entries: Vec<StatusEntry>,
) -> Result<AttendanceRecord, ApiError> {
    validate_date(date)?;

    let record = AttendanceRecord {
        date: date.to_string(),
        entries,
    };
    store::attendance::upsert(pool, &record).await?;
    Ok(record)
}

/// Remove the record for `date`; returns whether one existed.
pub async fn delete_daily_record(pool: &SqlitePool, date: &str) -> Result<bool, ApiError> {
    validate_date(date)?;
    store::attendance::delete(pool, date).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(roll_no: &str, status: AttendanceStatus) -> StatusEntry {
        StatusEntry {
            roll_no: roll_no.to_string(),
            name: format!("Student {roll_no}"),
            status,
        }
    }

    fn record(date: &str, entries: Vec<StatusEntry>) -> AttendanceRecord {
        AttendanceRecord {
            date: date.to_string(),
            entries,
        }
    }

    fn student(roll_no: &str) -> Student {
        Student {
            roll_no: roll_no.to_string(),
            name: format!("Student {roll_no}"),
            department: "CSE - C".to_string(),
        }
    }

    #[test]
    fn one_present_one_absent_is_fifty_percent() {
        let records = vec![
            record("2024-01-01", vec![entry("101", AttendanceStatus::Present)]),
            record("2024-01-02", vec![entry("101", AttendanceStatus::Absent)]),
        ];

        let percentages = compute_window_percentages(&records);
        assert_eq!(percentages.get("101").map(String::as_str), Some("50.0%"));
    }

    #[test]
    fn student_in_no_record_gets_no_key() {
        let records = vec![record(
            "2024-01-01",
            vec![entry("101", AttendanceStatus::Present)],
        )];

        let percentages = compute_window_percentages(&records);
        assert!(!percentages.contains_key("102"));
        assert_eq!(percentages.len(), 1);
    }

    #[test]
    fn denominator_counts_only_records_containing_the_student() {
        // 101 appears in 3 of 4 records, present in 2 of those 3.
        let records = vec![
            record("2024-01-01", vec![entry("101", AttendanceStatus::Present)]),
            record("2024-01-02", vec![entry("102", AttendanceStatus::Present)]),
            record("2024-01-03", vec![entry("101", AttendanceStatus::Present)]),
            record("2024-01-04", vec![entry("101", AttendanceStatus::Absent)]),
        ];

        let percentages = compute_window_percentages(&records);
        assert_eq!(percentages.get("101").map(String::as_str), Some("66.7%"));
        assert_eq!(percentages.get("102").map(String::as_str), Some("100.0%"));
    }

    #[test]
    fn non_roster_roll_numbers_still_contribute() {
        // No roster filtering: a roll number unknown to the current
        // roster still lands in the mapping under that key.
        let records = vec![record(
            "2024-01-01",
            vec![entry("999", AttendanceStatus::Present)],
        )];

        let percentages = compute_window_percentages(&records);
        assert_eq!(percentages.get("999").map(String::as_str), Some("100.0%"));
    }

    #[test]
    fn percentages_are_independent_of_record_order() {
        let mut records = vec![
            record("2024-01-01", vec![entry("101", AttendanceStatus::Present)]),
            record("2024-01-02", vec![entry("101", AttendanceStatus::Absent)]),
            record("2024-01-03", vec![entry("101", AttendanceStatus::Present)]),
        ];

        let forward = compute_window_percentages(&records);
        records.reverse();
        let backward = compute_window_percentages(&records);
        assert_eq!(forward, backward);
    }

    #[test]
    fn empty_month_yields_all_no_data_and_zero_percent() {
        let matrix = compute_monthly_matrix("2024-02", &[student("101")], &[]).unwrap();

        assert_eq!(matrix.days_in_month, 29); // 2024 is a leap year
        assert_eq!(matrix.rows.len(), 1);

        let row = &matrix.rows[0];
        assert_eq!(row.days.len(), 29);
        assert!(row.days.iter().all(|cell| *cell == DayCell::NoData));
        assert_eq!(row.total_present, 0);
        assert_eq!(row.percentage, "0.0%");
    }

    #[test]
    fn matrix_distinguishes_absent_from_no_data() {
        let records = vec![
            record("2024-01-01", vec![entry("101", AttendanceStatus::Present)]),
            record("2024-01-02", vec![entry("101", AttendanceStatus::Absent)]),
            // 2024-01-03: record exists but has no entry for 101.
            record("2024-01-03", vec![entry("102", AttendanceStatus::Present)]),
        ];

        let matrix = compute_monthly_matrix("2024-01", &[student("101")], &records).unwrap();
        let row = &matrix.rows[0];

        assert_eq!(row.days[0], DayCell::Present);
        assert_eq!(row.days[1], DayCell::Absent);
        assert_eq!(row.days[2], DayCell::NoData);
        assert_eq!(row.days[3], DayCell::NoData); // no record at all
        assert_eq!(row.total_present, 1);
    }

    #[test]
    fn matrix_percentage_denominator_is_full_month_length() {
        // 15 present days in a 31-day month is 48.4%, even though only
        // 15 days have any data at all.
        let records: Vec<_> = (1..=15)
            .map(|day| {
                record(
                    &format!("2024-01-{day:02}"),
                    vec![entry("101", AttendanceStatus::Present)],
                )
            })
            .collect();

        let matrix = compute_monthly_matrix("2024-01", &[student("101")], &records).unwrap();
        assert_eq!(matrix.rows[0].percentage, "48.4%");
    }

    #[test]
    fn bad_month_strings_are_validation_failures() {
        for month in ["2024", "2024-13", "2024-1", "January", "2024-00", ""] {
            let result = compute_monthly_matrix(month, &[], &[]);
            assert!(
                matches!(result, Err(ApiError::Validation(_))),
                "expected validation failure for {month:?}"
            );
        }
    }

    #[test]
    fn validate_date_requires_zero_padded_form() {
        assert!(validate_date("2024-01-02").is_ok());
        for date in ["2024-1-2", "24-01-02", "2024/01/02", "2024-02-30", "today"] {
            assert!(
                matches!(validate_date(date), Err(ApiError::Validation(_))),
                "expected rejection for {date:?}"
            );
        }
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2024, 2).unwrap(), 29);
        assert_eq!(days_in_month(2023, 2).unwrap(), 28);
        assert_eq!(days_in_month(2024, 12).unwrap(), 31);
        assert_eq!(days_in_month(2024, 4).unwrap(), 30);
    }

    mod with_store {
        use super::*;
        use crate::db::test_pool;

        #[actix_web::test]
        async fn upsert_then_window_percentages_end_to_end() {
            let pool = test_pool().await;

            upsert_daily_record(
                &pool,
                "2024-01-01",
                vec![entry("101", AttendanceStatus::Present)],
            )
            .await
            .unwrap();
            upsert_daily_record(
                &pool,
                "2024-01-02",
                vec![entry("101", AttendanceStatus::Absent)],
            )
            .await
            .unwrap();

            let percentages = window_percentages(&pool, "2024-01-01", "2024-01-02")
                .await
                .unwrap();
            assert_eq!(percentages.get("101").map(String::as_str), Some("50.0%"));
        }

        #[actix_web::test]
        async fn upsert_rejects_malformed_dates() {
            let pool = test_pool().await;

            let result = upsert_daily_record(&pool, "2024-1-2", vec![]).await;
            assert!(matches!(result, Err(ApiError::Validation(_))));
        }

        #[actix_web::test]
        async fn delete_daily_record_reports_found() {
            let pool = test_pool().await;

            upsert_daily_record(
                &pool,
                "2024-01-01",
                vec![entry("101", AttendanceStatus::Present)],
            )
            .await
            .unwrap();

            assert!(delete_daily_record(&pool, "2024-01-01").await.unwrap());
            assert!(!delete_daily_record(&pool, "2024-01-01").await.unwrap());
        }

        #[actix_web::test]
        async fn monthly_matrix_fetches_roster_and_records() {
            let pool = test_pool().await;

            store::roster::replace_all(&pool, &[student("101")])
                .await
                .unwrap();
            upsert_daily_record(
                &pool,
                "2024-02-01",
                vec![entry("101", AttendanceStatus::Present)],
            )
            .await
            .unwrap();

            let matrix = monthly_matrix(&pool, "2024-02").await.unwrap();
            assert_eq!(matrix.days_in_month, 29);
            assert_eq!(matrix.rows[0].days[0], DayCell::Present);
            assert_eq!(matrix.rows[0].total_present, 1);
        }
    }
}
