use crate::auth::auth::AuthUser;
use crate::engine::{self, MonthlyMatrix};
use crate::error::ApiError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, StatusEntry};
use crate::store;
use crate::utils::export;
use actix_web::{HttpResponse, web};
use chrono::{Duration, Local};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct SaveAttendanceReq {
    #[schema(example = "2024-01-15", format = "date", value_type = String)]
    pub date: String,
    pub entries: Vec<StatusEntry>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MonthQuery {
    #[schema(example = "2024-01")]
    pub month: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DateQuery {
    #[schema(example = "2024-01-15", format = "date", value_type = String)]
    pub date: String,
}

/// Save or overwrite one day's attendance
#[utoipa::path(
    post,
    path = "/api/v1/attendance",
    request_body = SaveAttendanceReq,
    responses(
        (status = 201, description = "Attendance saved", body = AttendanceRecord),
        (status = 400, description = "Malformed date or entry list"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn save_attendance(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<SaveAttendanceReq>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    let record = engine::upsert_daily_record(pool.get_ref(), &payload.date, payload.entries).await?;

    info!(user = %auth.username, date = %record.date, entries = record.entries.len(), "Attendance saved");

    Ok(HttpResponse::Created().json(record))
}

/// Get attendance for a specific date
#[utoipa::path(
    get,
    path = "/api/v1/attendance/{date}",
    params(
        ("date", Path, description = "Calendar date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Attendance record", body = AttendanceRecord),
        (status = 404, description = "No record for this date", body = Object, example = json!({
            "message": "No attendance record found for this date"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn get_attendance(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let date = path.into_inner();
    engine::validate_date(&date)?;

    let record = store::attendance::find_by_date(pool.get_ref(), &date)
        .await?
        .ok_or_else(|| ApiError::NotFound("No attendance record found for this date".into()))?;

    Ok(HttpResponse::Ok().json(record))
}

/// Get absent students for a specific date
#[utoipa::path(
    get,
    path = "/api/v1/attendance/absent/{date}",
    params(
        ("date", Path, description = "Calendar date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Entries with status Absent", body = [StatusEntry]),
        (status = 404, description = "No record for this date"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn absent_students(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let date = path.into_inner();
    engine::validate_date(&date)?;

    let record = store::attendance::find_by_date(pool.get_ref(), &date)
        .await?
        .ok_or_else(|| ApiError::NotFound("No attendance record found for this date".into()))?;

    let absent: Vec<StatusEntry> = record
        .entries
        .into_iter()
        .filter(|entry| entry.status == AttendanceStatus::Absent)
        .collect();

    Ok(HttpResponse::Ok().json(absent))
}

/// Reset (delete) one day's attendance
#[utoipa::path(
    delete,
    path = "/api/v1/attendance/reset/{date}",
    params(
        ("date", Path, description = "Calendar date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Attendance reset", body = Object, example = json!({
            "message": "Attendance reset successfully"
        })),
        (status = 404, description = "Nothing to reset for this date"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn reset_attendance(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let date = path.into_inner();

    let found = engine::delete_daily_record(pool.get_ref(), &date).await?;
    if !found {
        return Err(ApiError::NotFound(
            "No attendance record found to reset".into(),
        ));
    }

    info!(user = %auth.username, date = %date, "Attendance reset");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance reset successfully"
    })))
}

fn trailing_window(end: chrono::NaiveDate) -> (String, String) {
    let start = end - Duration::days(30);
    (
        start.format("%Y-%m-%d").to_string(),
        end.format("%Y-%m-%d").to_string(),
    )
}

/// Per-student attendance percentage over the trailing 30 days
#[utoipa::path(
    get,
    path = "/api/v1/attendance/analytics/30days",
    responses(
        (status = 200, description = "Mapping of roll number to percentage; students with no data in the window have no key", body = Object, example = json!({
            "101": "93.3%",
            "102": "50.0%"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Analytics"
)]
pub async fn analytics_30days(pool: web::Data<SqlitePool>) -> Result<HttpResponse, ApiError> {
    let (start, end) = trailing_window(Local::now().date_naive());
    let percentages = engine::window_percentages(pool.get_ref(), &start, &end).await?;

    Ok(HttpResponse::Ok().json(percentages))
}

/// Day-by-day matrix for one month
#[utoipa::path(
    get,
    path = "/api/v1/attendance/report/monthly",
    params(
        ("month", Query, description = "Month in YYYY-MM form")
    ),
    responses(
        (status = 200, description = "Monthly matrix", body = MonthlyMatrix),
        (status = 400, description = "Malformed month"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Analytics"
)]
pub async fn monthly_report(
    pool: web::Data<SqlitePool>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, ApiError> {
    let matrix = engine::monthly_matrix(pool.get_ref(), &query.month).await?;
    Ok(HttpResponse::Ok().json(matrix))
}

/// Monthly matrix as a CSV download
#[utoipa::path(
    get,
    path = "/api/v1/attendance/report/monthly.csv",
    params(
        ("month", Query, description = "Month in YYYY-MM form")
    ),
    responses(
        (status = 200, description = "CSV sheet, one row per roster student", content_type = "text/csv"),
        (status = 400, description = "Malformed month"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Analytics"
)]
pub async fn monthly_report_csv(
    pool: web::Data<SqlitePool>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, ApiError> {
    let matrix = engine::monthly_matrix(pool.get_ref(), &query.month).await?;
    let csv = export::monthly_matrix_csv(&matrix)?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"Monthly_Attendance_{}.csv\"", query.month),
        ))
        .body(csv))
}

/// Daily report as a CSV download: roster plus trailing-30-day percentages
#[utoipa::path(
    get,
    path = "/api/v1/attendance/export/daily.csv",
    params(
        ("date", Query, description = "Window end date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "CSV sheet, one row per roster student", content_type = "text/csv"),
        (status = 400, description = "Malformed date"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Analytics"
)]
pub async fn daily_export_csv(
    pool: web::Data<SqlitePool>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse, ApiError> {
    let end = engine::validate_date(&query.date)?;
    let (start, end) = trailing_window(end);

    let roster = store::roster::list_students(pool.get_ref()).await?;
    let percentages = engine::window_percentages(pool.get_ref(), &start, &end).await?;
    let csv = export::daily_report_csv(&roster, &percentages)?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"Attendance_{}.csv\"", query.date),
        ))
        .body(csv))
}
