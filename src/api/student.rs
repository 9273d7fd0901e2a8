use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::{ApiError, is_unique_violation};
use crate::model::student::Student;
use crate::store;
use crate::utils::import;
use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::SqlitePool;
use std::fs::File;
use tracing::info;

/// List the roster
#[utoipa::path(
    get,
    path = "/api/v1/students",
    responses(
        (status = 200, description = "All students, sorted by roll number", body = [Student]),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
pub async fn list_students(pool: web::Data<SqlitePool>) -> Result<HttpResponse, ApiError> {
    let students = store::roster::list_students(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(students))
}

/// Bulk roster replace
#[utoipa::path(
    post,
    path = "/api/v1/students/bulk",
    request_body = [Student],
    responses(
        (status = 201, description = "Roster replaced", body = Object, example = json!({
            "message": "Successfully added 5 students"
        })),
        (status = 400, description = "Input must be an array of students"),
        (status = 409, description = "Duplicate roll number in input"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
pub async fn bulk_import(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<Vec<Student>>,
) -> Result<HttpResponse, ApiError> {
    let students = payload.into_inner();
    if students.is_empty() {
        return Err(ApiError::validation("Student list must not be empty"));
    }

    let count = store::roster::replace_all(pool.get_ref(), &students)
        .await
        .map_err(conflict_on_duplicate)?;

    info!(user = %auth.username, count, "Roster replaced via bulk import");

    Ok(HttpResponse::Created().json(json!({
        "message": format!("Successfully added {count} students")
    })))
}

/// Seed the roster from the configured CSV file
#[utoipa::path(
    post,
    path = "/api/v1/students/seed",
    responses(
        (status = 200, description = "Roster seeded from file", body = Object, example = json!({
            "message": "Successfully seeded 64 students from roster.csv"
        })),
        (status = 404, description = "Roster file not found"),
        (status = 400, description = "Unparseable roster file"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
pub async fn seed_students(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let path = &config.roster_csv_path;
    let file = File::open(path)
        .map_err(|_| ApiError::NotFound(format!("{path} not found")))?;

    let students = import::students_from_csv(file)?;
    let count = store::roster::replace_all(pool.get_ref(), &students)
        .await
        .map_err(conflict_on_duplicate)?;

    info!(user = %auth.username, count, path = %path, "Roster seeded from file");

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Successfully seeded {count} students from {path}")
    })))
}

fn conflict_on_duplicate(err: ApiError) -> ApiError {
    match err {
        ApiError::Storage(e) if is_unique_violation(&e) => {
            ApiError::Conflict("Duplicate roll number in import".to_string())
        }
        other => other,
    }
}
