use crate::api::attendance::{DateQuery, MonthQuery, SaveAttendanceReq};
use crate::engine::{DayCell, MonthlyMatrix, MonthlyRow};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, StatusEntry};
use crate::model::student::Student;
use crate::models::{LoginReqDto, UpdateCredentialsReq, UserReq};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Smart Attendance System API",
        version = "1.0.0",
        description = r#"
## Smart Attendance System

This API powers a classroom attendance tracker for a single class roster.

### Key Features
- **Roster Management**
  - List students, bulk-replace the roster, seed from a CSV sheet
- **Daily Attendance**
  - Save one record per calendar date (full overwrite), fetch it back,
    list absentees, reset a date
- **Analytics**
  - Trailing-30-day percentage per student
  - Day-by-day monthly matrix with Present/Absent/no-data cells
- **Reports**
  - Daily and monthly CSV downloads

### Security
All non-auth endpoints are protected using **JWT Bearer authentication**.

### Response Format
- JSON-based RESTful responses
- CSV for report downloads

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::student::list_students,
        crate::api::student::bulk_import,
        crate::api::student::seed_students,

        crate::api::attendance::save_attendance,
        crate::api::attendance::get_attendance,
        crate::api::attendance::absent_students,
        crate::api::attendance::reset_attendance,
        crate::api::attendance::analytics_30days,
        crate::api::attendance::monthly_report,
        crate::api::attendance::monthly_report_csv,
        crate::api::attendance::daily_export_csv,
    ),
    components(
        schemas(
            Student,
            AttendanceRecord,
            StatusEntry,
            AttendanceStatus,
            SaveAttendanceReq,
            MonthQuery,
            DateQuery,
            MonthlyMatrix,
            MonthlyRow,
            DayCell,
            UserReq,
            LoginReqDto,
            UpdateCredentialsReq
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Students", description = "Roster management APIs"),
        (name = "Attendance", description = "Daily attendance APIs"),
        (name = "Analytics", description = "Aggregation and report APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
