use crate::{
    api::{attendance, student},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/update")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::update_credentials)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(protected_limiter) // rate limiting
            .service(handlers::protected)
            .service(
                web::scope("/students")
                    // /students
                    .service(
                        web::resource("").route(web::get().to(student::list_students)),
                    )
                    // /students/bulk
                    .service(
                        web::resource("/bulk").route(web::post().to(student::bulk_import)),
                    )
                    // /students/seed
                    .service(
                        web::resource("/seed").route(web::post().to(student::seed_students)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("").route(web::post().to(attendance::save_attendance)),
                    )
                    // /attendance/analytics/30days
                    .service(
                        web::resource("/analytics/30days")
                            .route(web::get().to(attendance::analytics_30days)),
                    )
                    // /attendance/report/monthly (+ .csv)
                    .service(
                        web::resource("/report/monthly")
                            .route(web::get().to(attendance::monthly_report)),
                    )
                    .service(
                        web::resource("/report/monthly.csv")
                            .route(web::get().to(attendance::monthly_report_csv)),
                    )
                    // /attendance/export/daily.csv
                    .service(
                        web::resource("/export/daily.csv")
                            .route(web::get().to(attendance::daily_export_csv)),
                    )
                    // /attendance/absent/{date}
                    .service(
                        web::resource("/absent/{date}")
                            .route(web::get().to(attendance::absent_students)),
                    )
                    // /attendance/reset/{date}
                    .service(
                        web::resource("/reset/{date}")
                            .route(web::delete().to(attendance::reset_attendance)),
                    )
                    // /attendance/{date}
                    .service(
                        web::resource("/{date}").route(web::get().to(attendance::get_attendance)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use crate::db::test_pool;
    use crate::model::attendance::{AttendanceStatus, StatusEntry};
    use actix_web::http::StatusCode;
    use actix_web::{App, test, web::Data};
    use serde_json::json;

    fn peer() -> std::net::SocketAddr {
        "127.0.0.1:48000".parse().unwrap()
    }

    fn test_config() -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 604800,
            rate_login_per_min: 1000,
            rate_register_per_min: 1000,
            rate_refresh_per_min: 1000,
            rate_protected_per_min: 1000,
            api_prefix: "/api/v1".to_string(),
            roster_csv_path: "roster.csv".to_string(),
        }
    }

    #[actix_web::test]
    async fn login_save_fetch_reset_flow() {
        let pool = test_pool().await;
        crate::db::seed_default_admin(&pool).await.unwrap();

        let config = test_config();
        let app = test::init_service(
            App::new()
                .app_data(Data::new(pool.clone()))
                .app_data(Data::new(config.clone()))
                .configure(|cfg| configure(cfg, config.clone())),
        )
        .await;

        // Login with the seeded default credentials.
        let req = test::TestRequest::post()
            .peer_addr(peer())
            .uri("/auth/login")
            .set_json(json!({"username": "admin", "password": "admin"}))
            .to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let token = resp["access_token"].as_str().unwrap().to_string();
        let bearer = format!("Bearer {token}");

        // Save a day's attendance.
        let entries = vec![
            StatusEntry {
                roll_no: "101".to_string(),
                name: "Alice".to_string(),
                status: AttendanceStatus::Present,
            },
            StatusEntry {
                roll_no: "102".to_string(),
                name: "Bob".to_string(),
                status: AttendanceStatus::Absent,
            },
        ];
        let req = test::TestRequest::post()
            .peer_addr(peer())
            .uri("/api/v1/attendance")
            .insert_header(("Authorization", bearer.clone()))
            .set_json(json!({"date": "2024-01-15", "entries": entries}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        // Fetch it back.
        let req = test::TestRequest::get()
            .peer_addr(peer())
            .uri("/api/v1/attendance/2024-01-15")
            .insert_header(("Authorization", bearer.clone()))
            .to_request();
        let record: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(record["date"], "2024-01-15");
        assert_eq!(record["entries"].as_array().unwrap().len(), 2);

        // Absent list holds only Bob.
        let req = test::TestRequest::get()
            .peer_addr(peer())
            .uri("/api/v1/attendance/absent/2024-01-15")
            .insert_header(("Authorization", bearer.clone()))
            .to_request();
        let absent: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(absent.as_array().unwrap().len(), 1);
        assert_eq!(absent[0]["rollNo"], "102");

        // Reset, then the date 404s.
        let req = test::TestRequest::delete()
            .peer_addr(peer())
            .uri("/api/v1/attendance/reset/2024-01-15")
            .insert_header(("Authorization", bearer.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .peer_addr(peer())
            .uri("/api/v1/attendance/2024-01-15")
            .insert_header(("Authorization", bearer))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn api_rejects_requests_without_token() {
        let pool = test_pool().await;
        let config = test_config();
        let app = test::init_service(
            App::new()
                .app_data(Data::new(pool.clone()))
                .app_data(Data::new(config.clone()))
                .configure(|cfg| configure(cfg, config.clone())),
        )
        .await;

        let req = test::TestRequest::get()
            .peer_addr(peer())
            .uri("/api/v1/students")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn bulk_import_then_monthly_report() {
        let pool = test_pool().await;
        crate::db::seed_default_admin(&pool).await.unwrap();

        let config = test_config();
        let token = generate_access_token(1, "admin".to_string(), &config.jwt_secret, 900);
        let bearer = format!("Bearer {token}");

        let app = test::init_service(
            App::new()
                .app_data(Data::new(pool.clone()))
                .app_data(Data::new(config.clone()))
                .configure(|cfg| configure(cfg, config.clone())),
        )
        .await;

        let req = test::TestRequest::post()
            .peer_addr(peer())
            .uri("/api/v1/students/bulk")
            .insert_header(("Authorization", bearer.clone()))
            .set_json(json!([
                {"rollNo": "101", "name": "Alice", "department": "CSE - C"}
            ]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::get()
            .peer_addr(peer())
            .uri("/api/v1/attendance/report/monthly?month=2024-02")
            .insert_header(("Authorization", bearer))
            .to_request();
        let matrix: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(matrix["daysInMonth"], 29);
        assert_eq!(matrix["rows"][0]["rollNo"], "101");
        assert_eq!(matrix["rows"][0]["percentage"], "0.0%");
    }
}
