use sqlx::SqlitePool;

use crate::error::ApiError;
use crate::model::student::Student;

/// Roster read used by the API layer and the monthly report. Sorted by
/// roll number so list output is stable.
pub async fn list_students(pool: &SqlitePool) -> Result<Vec<Student>, ApiError> {
    let students = sqlx::query_as::<_, Student>(
        "SELECT roll_no, name, department FROM students ORDER BY roll_no",
    )
    .fetch_all(pool)
    .await?;

    Ok(students)
}

/// Wholesale roster replace. Import and seed both clear the previous
/// roster before inserting, matching the bulk-replace lifecycle; the
/// whole swap runs in one transaction.
pub async fn replace_all(pool: &SqlitePool, students: &[Student]) -> Result<usize, ApiError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM students").execute(&mut *tx).await?;

    for student in students {
        sqlx::query("INSERT INTO students (roll_no, name, department) VALUES (?, ?, ?)")
            .bind(&student.roll_no)
            .bind(&student.name)
            .bind(&student.department)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(students.len())
}
