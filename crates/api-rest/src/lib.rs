//! # API REST
//!
//! HTTP surface of Clinica.
//!
//! Handles:
//! - JSON endpoints with axum, guarded by session-cookie authentication
//! - Server-rendered HTML pages (login, dashboard, listings, appointment form)
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, request tracing)
//!
//! Uses `api-shared` for transport types and `clinica-core` for everything else.

#![warn(rust_2018_idioms)]

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod pages;

use std::sync::Arc;

use api_shared::ErrorRes;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use clinica_core::{
    AppointmentService, CoreConfig, PatientService, ProfessionalService, ServiceCatalog,
    SessionService, UserService,
};
use sqlx::SqlitePool;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{appointments, health, patients, professionals, services};

/// Application state shared by every handler.
///
/// Each service holds a clone of the same pool; cloning the state is cheap.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub patients: PatientService,
    pub professionals: ProfessionalService,
    pub services: ServiceCatalog,
    pub appointments: AppointmentService,
    pub users: UserService,
    pub sessions: SessionService,
}

impl AppState {
    pub fn new(pool: SqlitePool, cfg: Arc<CoreConfig>) -> Self {
        Self {
            patients: PatientService::new(pool.clone()),
            professionals: ProfessionalService::new(pool.clone(), cfg.clone()),
            services: ServiceCatalog::new(pool.clone()),
            appointments: AppointmentService::new(pool.clone()),
            users: UserService::new(pool.clone(), cfg.clone()),
            sessions: SessionService::new(pool, cfg.clone()),
            cfg,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::check_auth,
        patients::list_patients,
        patients::create_patient,
        patients::get_patient,
        patients::update_patient,
        patients::delete_patient,
        professionals::list_professionals,
        professionals::create_professional,
        professionals::get_professional,
        professionals::update_professional,
        professionals::delete_professional,
        professionals::create_account,
        professionals::reset_password,
        services::list_services,
        services::create_service,
        services::get_service,
        services::update_service,
        services::delete_service,
        appointments::list_appointments,
        appointments::create_appointment,
        appointments::list_for_patient,
        appointments::get_appointment,
        appointments::update_appointment,
        appointments::delete_appointment,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::ErrorRes,
        api_shared::MessageRes,
        api_shared::ServiceSummary,
        api_shared::LoginReq,
        api_shared::LoginRes,
        api_shared::AuthUser,
        api_shared::CheckAuthRes,
        api_shared::CreateAccountReq,
        api_shared::CreateAccountRes,
        api_shared::ResetPasswordReq,
        api_shared::PatientReq,
        api_shared::Patient,
        api_shared::PatientRes,
        api_shared::ListPatientsRes,
        api_shared::ProfessionalReq,
        api_shared::Professional,
        api_shared::ProfessionalRes,
        api_shared::ListProfessionalsRes,
        api_shared::ServiceReq,
        api_shared::Service,
        api_shared::ServiceRes,
        api_shared::ListServicesRes,
        api_shared::AppointmentReq,
        api_shared::Appointment,
        api_shared::AppointmentRes,
        api_shared::ListAppointmentsRes,
    ))
)]
pub struct ApiDoc;

/// Builds the full application router.
///
/// Everything except health, login/logout and the API docs sits behind
/// [`auth::require_session`].
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(pages::index))
        .route("/health", get(health::health))
        .route("/auth/login", get(pages::login_form).post(pages::login_submit))
        .route("/auth/logout", get(pages::logout))
        .route("/auth/api/login", post(handlers::auth::login))
        .route("/auth/api/logout", post(handlers::auth::logout));

    let protected = Router::new()
        .route("/auth/api/check-auth", get(handlers::auth::check_auth))
        .route("/dashboard", get(pages::dashboard))
        .route("/patients/", get(pages::patients))
        .route("/patients/api/list", get(patients::list_patients))
        .route("/patients/api/create", post(patients::create_patient))
        .route(
            "/patients/api/:id",
            get(patients::get_patient)
                .put(patients::update_patient)
                .delete(patients::delete_patient),
        )
        .route("/professionals/", get(pages::professionals))
        .route("/professionals/api/list", get(professionals::list_professionals))
        .route("/professionals/api/create", post(professionals::create_professional))
        .route(
            "/professionals/api/:id",
            get(professionals::get_professional)
                .put(professionals::update_professional)
                .delete(professionals::delete_professional),
        )
        .route(
            "/professionals/api/:id/create-account",
            post(professionals::create_account),
        )
        .route(
            "/professionals/api/:id/reset-password",
            post(professionals::reset_password),
        )
        .route("/services/", get(pages::services))
        .route("/services/api/list", get(services::list_services))
        .route("/services/api/create", post(services::create_service))
        .route(
            "/services/api/:id",
            get(services::get_service)
                .put(services::update_service)
                .delete(services::delete_service),
        )
        .route("/atendimentos/novo", get(pages::new_appointment))
        .route("/atendimentos/api/list", get(appointments::list_appointments))
        .route("/atendimentos/api/create", post(appointments::create_appointment))
        .route(
            "/atendimentos/api/patient/:patient_id",
            get(appointments::list_for_patient),
        )
        .route(
            "/atendimentos/api/:id",
            get(appointments::get_appointment)
                .put(appointments::update_appointment)
                .delete(appointments::delete_appointment),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(fallback)
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn fallback(headers: HeaderMap) -> Response {
    let status = StatusCode::NOT_FOUND;
    if auth::accepts_json(&headers) {
        return (
            status,
            Json(ErrorRes {
                error: "Resource not found".into(),
            }),
        )
            .into_response();
    }
    (status, pages::html(pages::error_page(status, "Page not found"))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use clinica_core::{db, NewUser, Role};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const PASSWORD: &str = "S3cure!pass";

    async fn setup() -> (Router, AppState) {
        let pool = db::connect_in_memory().await.unwrap();
        let cfg = Arc::new(CoreConfig::new(2, 1_000, false).unwrap());
        let state = AppState::new(pool, cfg);
        (router(state.clone()), state)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, cookie: Option<&str>, accept: &str) -> Request<Body> {
        let mut builder = Request::builder().uri(uri).header(header::ACCEPT, accept);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    /// Logs in over the JSON API and returns the `name=value` cookie pair.
    async fn login(app: &Router, username: &str) -> String {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/api/login",
                None,
                json!({"username": username, "password": PASSWORD}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn admin_cookie(app: &Router, state: &AppState) -> String {
        state.users.ensure_admin(PASSWORD).await.unwrap();
        login(app, "admin").await
    }

    async fn receptionist_cookie(app: &Router, state: &AppState) -> String {
        state
            .users
            .create(NewUser {
                username: "rita".into(),
                email: "rita@clinica.local".into(),
                full_name: "Rita Reception".into(),
                role: Role::Receptionist,
                professional_id: None,
                password: PASSWORD.into(),
            })
            .await
            .unwrap();
        login(app, "rita").await
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _) = setup().await;
        let response = app
            .oneshot(get_request("/health", None, "application/json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["ok"], true);
    }

    #[tokio::test]
    async fn api_calls_without_a_session_get_401_json() {
        let (app, _) = setup().await;
        let response = app
            .oneshot(get_request("/patients/api/list", None, "*/*"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Authentication required");
    }

    #[tokio::test]
    async fn pages_without_a_session_redirect_to_login() {
        let (app, _) = setup().await;
        let response = app
            .oneshot(get_request("/patients/?search=ana", None, "text/html"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/auth/login?next=%2Fpatients%2F%3Fsearch%3Dana"
        );
    }

    #[tokio::test]
    async fn login_then_check_auth_reports_the_user() {
        let (app, state) = setup().await;
        let cookie = admin_cookie(&app, &state).await;
        assert!(cookie.starts_with("clinica_session="));

        let response = app
            .oneshot(get_request("/auth/api/check-auth", Some(&cookie), "application/json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["user"]["username"], "admin");
        assert_eq!(body["user"]["role"], "admin");
    }

    #[tokio::test]
    async fn wrong_password_is_401() {
        let (app, state) = setup().await;
        state.users.ensure_admin(PASSWORD).await.unwrap();
        let response = app
            .oneshot(json_request(
                "POST",
                "/auth/api/login",
                None,
                json!({"username": "admin", "password": "Wr0ng!pass"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn logout_revokes_the_session() {
        let (app, state) = setup().await;
        let cookie = admin_cookie(&app, &state).await;

        let response = app
            .clone()
            .oneshot(json_request("POST", "/auth/api/logout", Some(&cookie), json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get_request("/auth/api/check-auth", Some(&cookie), "application/json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn receptionist_cannot_create_services() {
        let (app, state) = setup().await;
        let cookie = receptionist_cookie(&app, &state).await;
        let response = app
            .oneshot(json_request(
                "POST",
                "/services/api/create",
                Some(&cookie),
                json!({"name": "Massage", "duration_minutes": 60, "price": 150.0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn receptionist_registers_patients_and_duplicates_conflict() {
        let (app, state) = setup().await;
        let cookie = receptionist_cookie(&app, &state).await;
        let patient = json!({
            "full_name": "Ana Souza",
            "cpf": "52998224725",
            "phone": "11987654321",
            "birth_date": "1990-04-12"
        });

        let response = app
            .clone()
            .oneshot(json_request("POST", "/patients/api/create", Some(&cookie), patient.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["patient"]["cpf"], "529.982.247-25");
        assert_eq!(body["patient"]["phone"], "(11) 98765-4321");

        let response = app
            .clone()
            .oneshot(json_request("POST", "/patients/api/create", Some(&cookie), patient))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "A patient with this CPF is already registered"
        );

        let response = app
            .oneshot(get_request("/patients/api/list", Some(&cookie), "application/json"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["total"], 1);
    }

    #[tokio::test]
    async fn malformed_json_is_a_400_with_an_error_body() {
        let (app, state) = setup().await;
        let cookie = admin_cookie(&app, &state).await;
        let request = Request::builder()
            .method("POST")
            .uri("/services/api/create")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, &cookie)
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn missing_records_are_404() {
        let (app, state) = setup().await;
        let cookie = admin_cookie(&app, &state).await;
        let response = app
            .oneshot(get_request("/services/api/999", Some(&cookie), "application/json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_routes_answer_404_in_the_requested_format() {
        let (app, _) = setup().await;

        let response = app
            .clone()
            .oneshot(get_request("/no/such/page", None, "text/html"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));

        let response = app
            .oneshot(get_request("/no/such/page", None, "application/json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Resource not found");
    }

    #[tokio::test]
    async fn html_login_sets_cookie_and_redirects_to_next() {
        let (app, state) = setup().await;
        state.users.ensure_admin(PASSWORD).await.unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "username=admin&password={}&next=%2Fservices%2F",
                PASSWORD.replace('!', "%21")
            )))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/services/");
        assert!(response.headers().get(header::SET_COOKIE).is_some());
    }

    #[tokio::test]
    async fn appointment_form_requires_a_known_patient() {
        let (app, state) = setup().await;
        let cookie = admin_cookie(&app, &state).await;
        let response = app
            .oneshot(get_request("/atendimentos/novo?patient_id=42", Some(&cookie), "text/html"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn receptionist_dashboard_hides_admin_sections() {
        let (app, state) = setup().await;
        let cookie = receptionist_cookie(&app, &state).await;
        let response = app
            .oneshot(get_request("/dashboard", Some(&cookie), "text/html"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains("/patients/"));
        assert!(!page.contains("/services/"));
    }

    #[tokio::test]
    async fn dashboard_appointment_count_is_not_a_link() {
        let (app, state) = setup().await;
        let cookie = receptionist_cookie(&app, &state).await;
        let response = app
            .oneshot(get_request("/dashboard", Some(&cookie), "text/html"))
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains(r#"<li><a href="/patients/">Patients: <strong>0</strong></a></li>"#));
        assert!(page.contains("<li>Appointments: <strong>0</strong></li>"));
    }

    #[test]
    fn openapi_lists_the_patient_endpoints() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/patients/api/{id}"));
        assert!(doc.paths.paths.contains_key("/atendimentos/api/patient/{patient_id}"));
    }
}
