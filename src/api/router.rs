//! Console API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! JSON routes are nested under `/api/`; stored blobs are served read-only
//! under `/blobs/`.
//!
//! Middleware stack for protected routes (outermost → innermost):
//! 1. Session validator → 2. Access log

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the console API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

pub(crate) fn build_router(ctx: ApiContext) -> Router {
    let upload_limit = DefaultBodyLimit::max(ctx.core.config.max_upload_bytes);

    // Extension must be outermost so the session layer can extract ApiContext.
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/auth/logout", post(endpoints::auth::logout))
        .route("/auth/me", get(endpoints::auth::me))
        .route("/dashboard", get(endpoints::dashboard::summary))
        .route(
            "/doctors",
            get(endpoints::doctors::list).post(endpoints::doctors::create),
        )
        .route("/doctors/options", get(endpoints::doctors::options))
        .route(
            "/doctors/:id",
            get(endpoints::doctors::detail)
                .put(endpoints::doctors::update)
                .delete(endpoints::doctors::remove),
        )
        .route(
            "/doctors/:id/image",
            put(endpoints::doctors::upload_image).layer(upload_limit.clone()),
        )
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route(
            "/patients/:id",
            get(endpoints::patients::detail)
                .put(endpoints::patients::update)
                .delete(endpoints::patients::remove),
        )
        .route(
            "/patients/:id/report",
            put(endpoints::patients::upload_report).layer(upload_limit),
        )
        .route("/deleted/doctors", get(endpoints::deleted::doctors))
        .route("/deleted/patients", get(endpoints::deleted::patients))
        .route(
            "/deleted/doctors/:id/restore",
            post(endpoints::deleted::restore_doctor),
        )
        .route(
            "/deleted/patients/:id/restore",
            post(endpoints::deleted::restore_patient),
        )
        .route("/deleted/doctors/:id", delete(endpoints::deleted::purge_doctor))
        .route(
            "/deleted/patients/:id",
            delete(endpoints::deleted::purge_patient),
        )
        .route("/audit-logs", get(endpoints::audit_logs::list))
        .route("/admin/blobs/sweep", post(endpoints::admin::sweep_blobs))
        .route("/admin/users/:id/role", put(endpoints::admin::set_role))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::access_log::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_session))
        .layer(axum::Extension(ctx.clone()));

    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/signup", post(endpoints::auth::signup))
        .route("/auth/login", post(endpoints::auth::login))
        .route(
            "/auth/forgot-password",
            post(endpoints::auth::forgot_password),
        )
        .route("/auth/reset-password", post(endpoints::auth::reset_password))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::access_log::log_access));

    let blobs = Router::new()
        .nest_service("/blobs", ServeDir::new(ctx.core.config.blob_dir()))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ));

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
        .merge(blobs)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::AppConfig;

    fn test_app() -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::with_data_dir(dir.path());
        config.password_iterations = 1_000;
        let core = Arc::new(CoreState::new(config).unwrap());
        (api_router(core), dir)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let req = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Sign up and log in; the first account created becomes the admin.
    async fn signed_in(app: &Router, email: &str) -> String {
        let (status, _) = send(
            app,
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({"email": email, "password": "correct horse", "full_name": "Test"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, json) = send(
            app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": email, "password": "correct horse"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        json["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _dir) = test_app();
        let (status, json) = send(&app, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn protected_routes_require_token() {
        let (app, _dir) = test_app();
        let (status, json) = send(&app, "GET", "/api/patients", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "AUTH_REQUIRED");

        let (status, _) = send(&app, "GET", "/api/dashboard", Some("bogus"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_reports_first_user_as_admin() {
        let (app, _dir) = test_app();
        let admin = signed_in(&app, "admin@clinic.test").await;
        let staff = signed_in(&app, "staff@clinic.test").await;

        let (_, json) = send(&app, "GET", "/api/auth/me", Some(&admin), None).await;
        assert_eq!(json["role"], "admin");
        let (_, json) = send(&app, "GET", "/api/auth/me", Some(&staff), None).await;
        assert_eq!(json["role"], "staff");
    }

    #[tokio::test]
    async fn logout_revokes_token() {
        let (app, _dir) = test_app();
        let token = signed_in(&app, "admin@clinic.test").await;

        let (status, _) = send(&app, "POST", "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let (app, _dir) = test_app();
        signed_in(&app, "admin@clinic.test").await;
        let (status, json) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "admin@clinic.test", "password": "wrong password"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn staff_is_redirected_from_admin_views() {
        let (app, _dir) = test_app();
        signed_in(&app, "admin@clinic.test").await;
        let staff = signed_in(&app, "staff@clinic.test").await;

        for uri in ["/api/doctors", "/api/audit-logs", "/api/deleted/patients"] {
            let (status, json) = send(&app, "GET", uri, Some(&staff), None).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
            assert_eq!(json["error"]["redirect"], "/", "{uri}");
        }

        let (status, _) = send(&app, "GET", "/api/dashboard", Some(&staff), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "GET", "/api/doctors/options", Some(&staff), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_patient_names_the_field() {
        let (app, _dir) = test_app();
        signed_in(&app, "admin@clinic.test").await;
        let staff = signed_in(&app, "staff@clinic.test").await;

        let (status, json) = send(
            &app,
            "POST",
            "/api/patients",
            Some(&staff),
            Some(json!({"name": "Jane Smith", "age": 0, "gender": "Female"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["field"], "age");
    }

    #[tokio::test]
    async fn missing_name_is_a_validation_error() {
        let (app, _dir) = test_app();
        let admin = signed_in(&app, "admin@clinic.test").await;

        let (status, json) = send(
            &app,
            "POST",
            "/api/doctors",
            Some(&admin),
            Some(json!({"specialization": "Cardiology", "experience": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "VALIDATION");
        assert_eq!(json["error"]["field"], "name");

        let (status, json) = send(
            &app,
            "POST",
            "/api/patients",
            Some(&admin),
            Some(json!({"age": 30, "gender": "Male"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["field"], "name");
    }

    #[tokio::test]
    async fn malformed_id_is_bad_request() {
        let (app, _dir) = test_app();
        let admin = signed_in(&app, "admin@clinic.test").await;
        let (status, json) = send(&app, "GET", "/api/doctors/not-a-uuid", Some(&admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn patient_soft_delete_and_restore_round_trip() {
        let (app, _dir) = test_app();
        let admin = signed_in(&app, "admin@clinic.test").await;
        let staff = signed_in(&app, "staff@clinic.test").await;

        let (status, doctor) = send(
            &app,
            "POST",
            "/api/doctors",
            Some(&admin),
            Some(json!({"name": "Dr. Adams", "specialization": "Cardiology", "experience": 12})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, patient) = send(
            &app,
            "POST",
            "/api/patients",
            Some(&staff),
            Some(json!({
                "name": "Jane Smith",
                "age": 42,
                "gender": "Female",
                "diagnosis": "Hypertension",
                "assigned_doctor_id": doctor["id"],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = patient["id"].as_str().unwrap().to_string();

        let (_, list) = send(&app, "GET", "/api/patients?search=jane", Some(&staff), None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["assigned_doctor_name"], "Dr. Adams");

        let (status, removed) =
            send(&app, "DELETE", &format!("/api/patients/{id}"), Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(removed["changed"], true);

        let (_, list) = send(&app, "GET", "/api/patients", Some(&staff), None).await;
        assert!(list.as_array().unwrap().is_empty());
        let (_, deleted) = send(&app, "GET", "/api/deleted/patients", Some(&admin), None).await;
        assert_eq!(deleted[0]["name"], "Jane Smith");

        let (status, restored) = send(
            &app,
            "POST",
            &format!("/api/deleted/patients/{id}/restore"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(restored["changed"], true);

        let (_, list) = send(&app, "GET", "/api/patients", Some(&staff), None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, logs) = send(
            &app,
            "GET",
            &format!("/api/audit-logs?table=patients&record_id={id}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let actions: Vec<&str> = logs
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["action"].as_str().unwrap())
            .collect();
        assert_eq!(actions, vec!["RESTORE", "SOFT_DELETE", "INSERT"]);
    }

    #[tokio::test]
    async fn unknown_audit_action_is_bad_request() {
        let (app, _dir) = test_app();
        let admin = signed_in(&app, "admin@clinic.test").await;
        let (status, _) =
            send(&app, "GET", "/api/audit-logs?action=explode", Some(&admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn purge_requires_soft_delete_first() {
        let (app, _dir) = test_app();
        let admin = signed_in(&app, "admin@clinic.test").await;
        let (_, doctor) = send(
            &app,
            "POST",
            "/api/doctors",
            Some(&admin),
            Some(json!({"name": "Dr. Brown"})),
        )
        .await;
        let id = doctor["id"].as_str().unwrap().to_string();

        let (status, _) =
            send(&app, "DELETE", &format!("/api/deleted/doctors/{id}"), Some(&admin), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        send(&app, "DELETE", &format!("/api/doctors/{id}"), Some(&admin), None).await;
        let (status, _) =
            send(&app, "DELETE", &format!("/api/deleted/doctors/{id}"), Some(&admin), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, "GET", &format!("/api/doctors/{id}"), Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn uploaded_image_is_served_from_blobs() {
        let (app, _dir) = test_app();
        let admin = signed_in(&app, "admin@clinic.test").await;
        let (_, doctor) = send(
            &app,
            "POST",
            "/api/doctors",
            Some(&admin),
            Some(json!({"name": "Dr. Chen"})),
        )
        .await;
        let id = doctor["id"].as_str().unwrap();

        let boundary = "clinicvault-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"portrait.png\"\r\n\
             Content-Type: image/png\r\n\r\n\
             not really a png\r\n\
             --{boundary}--\r\n"
        );
        let req = Request::builder()
            .method("PUT")
            .uri(format!("/api/doctors/{id}/image"))
            .header("Authorization", format!("Bearer {admin}"))
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let updated: Value = serde_json::from_slice(&bytes).unwrap();
        let path = updated["image_path"].as_str().unwrap();
        assert!(path.ends_with(".png"));

        let req = Request::builder()
            .uri(format!("/blobs/doctor-images/{path}"))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"not really a png");
    }
}
