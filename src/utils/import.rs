//! Roster import from CSV.
//!
//! Spreadsheets arrive with headers like "REG NO" / "Reg No" / "Roll
//! Number", so columns are resolved by case-insensitive substring
//! match on the header row rather than exact names.

use std::io::Read;

use csv::StringRecord;

use crate::error::ApiError;
use crate::model::student::Student;

pub const DEFAULT_DEPARTMENT: &str = "CSE - C";

fn find_column(headers: &StringRecord, needle: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.to_lowercase().contains(needle))
}

/// Parse a roster sheet. Rows without a roll number are skipped; the
/// department column is optional and defaults. Output is sorted by
/// roll number.
pub fn students_from_csv<R: Read>(reader: R) -> Result<Vec<Student>, ApiError> {
    let mut rdr = csv::Reader::from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| ApiError::validation(format!("Unreadable CSV header row: {e}")))?
        .clone();

    let roll_idx = find_column(&headers, "reg")
        .or_else(|| find_column(&headers, "roll"))
        .ok_or_else(|| ApiError::validation("No roll number column found (expected a header containing 'reg' or 'roll')"))?;
    let name_idx = find_column(&headers, "name")
        .ok_or_else(|| ApiError::validation("No name column found (expected a header containing 'name')"))?;
    let dept_idx = find_column(&headers, "dept");

    let mut students = Vec::new();
    for row in rdr.records() {
        let row = row.map_err(|e| ApiError::validation(format!("Unreadable CSV row: {e}")))?;

        let roll_no = row.get(roll_idx).unwrap_or("").trim();
        if roll_no.is_empty() {
            continue;
        }

        let name = match row.get(name_idx).map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => "Unknown",
        };
        let department = dept_idx
            .and_then(|idx| row.get(idx))
            .map(str::trim)
            .filter(|dept| !dept.is_empty())
            .unwrap_or(DEFAULT_DEPARTMENT);

        students.push(Student {
            roll_no: roll_no.to_string(),
            name: name.to_string(),
            department: department.to_string(),
        });
    }

    students.sort_by(|a, b| a.roll_no.cmp(&b.roll_no));
    Ok(students)
}
