//! CSV rendering of the daily and monthly reports.

use std::collections::HashMap;

use crate::engine::MonthlyMatrix;
use crate::error::ApiError;
use crate::model::student::Student;

fn into_csv_string(wtr: csv::Writer<Vec<u8>>) -> Result<String, ApiError> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| ApiError::Render(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ApiError::Render(e.to_string()))
}

/// Monthly matrix as a sheet: one row per roster student, one column
/// per calendar day (P/A/-), then the Present count and percentage.
pub fn monthly_matrix_csv(matrix: &MonthlyMatrix) -> Result<String, ApiError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        "Roll No".to_string(),
        "Name".to_string(),
        "Department".to_string(),
    ];
    for day in 1..=matrix.days_in_month {
        header.push(day.to_string());
    }
    header.push("Total Present".to_string());
    header.push("Percentage".to_string());
    wtr.write_record(&header)
        .map_err(|e| ApiError::Render(e.to_string()))?;

    for row in &matrix.rows {
        let mut record = vec![row.roll_no.clone(), row.name.clone(), row.department.clone()];
        for cell in &row.days {
            record.push(cell.as_str().to_string());
        }
        record.push(row.total_present.to_string());
        record.push(row.percentage.clone());
        wtr.write_record(&record)
            .map_err(|e| ApiError::Render(e.to_string()))?;
    }

    into_csv_string(wtr)
}

/// Daily export: the roster with each student's trailing-30-day
/// percentage. Students missing from the mapping have no recorded data
/// and are shown as "0%".
pub fn daily_report_csv(
    roster: &[Student],
    percentages: &HashMap<String, String>,
) -> Result<String, ApiError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    wtr.write_record(["Roll No", "Name", "Department", "Attendance % (30 Days)"])
        .map_err(|e| ApiError::Render(e.to_string()))?;

    for student in roster {
        let percent = percentages
            .get(&student.roll_no)
            .cloned()
            .unwrap_or_else(|| "0%".to_string());
        wtr.write_record([
            student.roll_no.as_str(),
            student.name.as_str(),
            student.department.as_str(),
            percent.as_str(),
        ])
        .map_err(|e| ApiError::Render(e.to_string()))?;
    }

    into_csv_string(wtr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::compute_monthly_matrix;
    use crate::model::attendance::{AttendanceRecord, AttendanceStatus, StatusEntry};

    fn student(roll_no: &str, name: &str) -> Student {
        Student {
            roll_no: roll_no.to_string(),
            name: name.to_string(),
            department: "CSE - C".to_string(),
        }
    }

    #[test]
    fn monthly_csv_has_day_columns_and_summary() {
        let records = vec![AttendanceRecord {
            date: "2024-02-01".to_string(),
            entries: vec![StatusEntry {
                roll_no: "101".to_string(),
                name: "Alice".to_string(),
                status: AttendanceStatus::Present,
            }],
        }];
        let matrix =
            compute_monthly_matrix("2024-02", &[student("101", "Alice")], &records).unwrap();

        let csv = monthly_matrix_csv(&matrix).unwrap();
        let mut lines = csv.lines();

        let header = lines.next().unwrap();
        assert!(header.starts_with("Roll No,Name,Department,1,2,"));
        assert!(header.ends_with("29,Total Present,Percentage"));

        let row = lines.next().unwrap();
        assert!(row.starts_with("101,Alice,CSE - C,P,-,"));
        assert!(row.ends_with(",1,3.4%"));
    }

    #[test]
    fn daily_csv_defaults_missing_students_to_zero_percent() {
        let roster = vec![student("101", "Alice"), student("102", "Bob")];
        let mut percentages = HashMap::new();
        percentages.insert("101".to_string(), "50.0%".to_string());

        let csv = daily_report_csv(&roster, &percentages).unwrap();
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "Roll No,Name,Department,Attendance % (30 Days)"
        );
        assert_eq!(lines[1], "101,Alice,CSE - C,50.0%");
        assert_eq!(lines[2], "102,Bob,CSE - C,0%");
    }
}
