//! Server-rendered HTML pages.
//!
//! Pages are plain `maud` templates around one shared layout. Data entry goes
//! through the JSON API; the appointment form posts to it with a small script.

use api_shared::ListQuery;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Extension;
use clinica_core::{ClinicError, CurrentUser, Page, PageRequest, Permission};
use maud::{html, Markup, DOCTYPE};
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::auth::{end_session, safe_next, session_cookie, session_user};
use crate::error::PageError;
use crate::extract::{PageForm, PageQuery};
use crate::AppState;

/// Page size used to fill selection lists.
const PICKER_PAGE_SIZE: i64 = 100;

/// Wraps rendered markup in a `text/html` response.
pub fn html(markup: Markup) -> Response {
    let headers = [(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    )];
    (headers, markup.into_string()).into_response()
}

fn layout(title: &str, user: Option<&CurrentUser>, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="pt-BR" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | Clinica" }
            }
            body {
                @if let Some(user) = user {
                    nav {
                        a href="/dashboard" { "Dashboard" }
                        @if user.has_permission(Permission::ViewPatients) {
                            " " a href="/patients/" { "Patients" }
                        }
                        @if user.has_permission(Permission::All) {
                            " " a href="/professionals/" { "Professionals" }
                            " " a href="/services/" { "Services" }
                        }
                        " " span.user { (user.full_name) " (" (user.role.as_str()) ")" }
                        " " a href="/auth/logout" { "Log out" }
                    }
                }
                main {
                    h1 { (title) }
                    (body)
                }
            }
        }
    }
}

pub fn error_page(status: StatusCode, message: &str) -> Markup {
    let title = status.canonical_reason().unwrap_or("Error");
    layout(
        title,
        None,
        html! {
            p.error { (message) }
            p { a href="/dashboard" { "Back to the dashboard" } }
        },
    )
}

/// `GET /`
pub async fn index() -> Redirect {
    Redirect::to("/dashboard")
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginPageQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

fn login_page(next: Option<&str>, username: &str, error: Option<&str>) -> Markup {
    layout(
        "Log in",
        None,
        html! {
            @if let Some(error) = error {
                p.error { (error) }
            }
            form method="post" action="/auth/login" {
                input type="hidden" name="next" value=(safe_next(next));
                label { "Username " input type="text" name="username" value=(username) required; }
                label { "Password " input type="password" name="password" required; }
                button type="submit" { "Log in" }
            }
        },
    )
}

/// `GET /auth/login`
pub async fn login_form(
    State(state): State<AppState>,
    cookies: Cookies,
    PageQuery(query): PageQuery<LoginPageQuery>,
) -> Result<Response, PageError> {
    if session_user(&state, &cookies).await?.is_some() {
        return Ok(Redirect::to(safe_next(query.next.as_deref())).into_response());
    }
    Ok(html(login_page(query.next.as_deref(), "", None)))
}

/// `POST /auth/login`
pub async fn login_submit(
    State(state): State<AppState>,
    cookies: Cookies,
    PageForm(form): PageForm<LoginForm>,
) -> Result<Response, PageError> {
    let user = match state.users.authenticate(&form.username, &form.password).await {
        Ok(user) => user,
        Err(err @ (ClinicError::InvalidCredentials | ClinicError::InactiveAccount)) => {
            let status = if matches!(err, ClinicError::InvalidCredentials) {
                StatusCode::UNAUTHORIZED
            } else {
                StatusCode::FORBIDDEN
            };
            tracing::info!("Rejected login for {:?}: {}", form.username, err);
            let page = login_page(form.next.as_deref(), &form.username, Some(&err.to_string()));
            return Ok((status, html(page)).into_response());
        }
        Err(err) => return Err(err.into()),
    };

    let token = state.sessions.create(user.id).await?;
    cookies.add(session_cookie(token, &state.cfg));
    Ok(Redirect::to(safe_next(form.next.as_deref())).into_response())
}

/// `GET /auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Redirect, PageError> {
    end_session(&state, &cookies).await?;
    Ok(Redirect::to("/auth/login"))
}

/// `GET /dashboard`
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, PageError> {
    let count = PageRequest::new(Some(1), Some(1));
    let mut tiles: Vec<(&str, Option<&str>, i64)> = Vec::new();

    if user.has_permission(Permission::ViewPatients) {
        let total = state.patients.list(None, count).await?.total;
        tiles.push(("Patients", Some("/patients/"), total));
    }
    if user.has_permission(Permission::ViewAppointments) {
        let own = user.professional_id.filter(|_| !user.has_permission(Permission::All));
        let total = state.appointments.list(None, own, count).await?.total;
        tiles.push(("Appointments", None, total));
    }
    if user.has_permission(Permission::All) {
        let total = state.professionals.list(None, count).await?.total;
        tiles.push(("Professionals", Some("/professionals/"), total));
        let total = state.services.list(None, count).await?.total;
        tiles.push(("Services", Some("/services/"), total));
    }

    let body = html! {
        p { "Welcome, " (user.full_name) "." }
        ul.tiles {
            @for (label, href, total) in &tiles {
                li {
                    @if let Some(href) = href {
                        a href=(href) { (label) ": " strong { (total) } }
                    } @else {
                        (label) ": " strong { (total) }
                    }
                }
            }
        }
    };
    Ok(html(layout("Dashboard", Some(&user), body)))
}

fn search_form(path: &str, query: &ListQuery) -> Markup {
    html! {
        form method="get" action=(path) {
            input type="search" name="search" value=[query.search.as_deref()] placeholder="Search";
            button type="submit" { "Search" }
        }
    }
}

fn pager<T>(path: &str, query: &ListQuery, page: &Page<T>) -> Markup {
    let search = urlencoding::encode(query.search.as_deref().unwrap_or_default());
    let link = |n: i64| format!("{path}?search={search}&page={n}&per_page={}", page.per_page);
    html! {
        p.pager {
            @if page.current_page > 1 {
                a href=(link(page.current_page - 1)) { "Previous" } " "
            }
            "Page " (page.current_page) " of " (page.pages.max(1)) " (" (page.total) " records)"
            @if page.current_page < page.pages {
                " " a href=(link(page.current_page + 1)) { "Next" }
            }
        }
    }
}

fn money(value: f64) -> String {
    format!("R$ {value:.2}")
}

/// `GET /patients/`
pub async fn patients(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PageQuery(query): PageQuery<ListQuery>,
) -> Result<Response, PageError> {
    user.require(Permission::ViewPatients)?;
    let page = state
        .patients
        .list(query.search.as_deref(), PageRequest::new(query.page, query.per_page))
        .await?;
    let can_book = user.has_permission(Permission::EditAppointments);

    let body = html! {
        (search_form("/patients/", &query))
        table {
            thead { tr { th { "Name" } th { "CPF" } th { "Phone" } th { "Birth date" } th {} } }
            tbody {
                @for patient in &page.items {
                    tr {
                        td { (patient.full_name) }
                        td { (patient.cpf) }
                        td { (patient.phone) }
                        td { (patient.birth_date.as_deref().unwrap_or("")) }
                        td {
                            @if can_book {
                                a href=(format!("/atendimentos/novo?patient_id={}", patient.id)) {
                                    "New appointment"
                                }
                            }
                        }
                    }
                }
            }
        }
        (pager("/patients/", &query, &page))
    };
    Ok(html(layout("Patients", Some(&user), body)))
}

/// `GET /professionals/`
pub async fn professionals(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PageQuery(query): PageQuery<ListQuery>,
) -> Result<Response, PageError> {
    user.require(Permission::All)?;
    let page = state
        .professionals
        .list(query.search.as_deref(), PageRequest::new(query.page, query.per_page))
        .await?;

    let body = html! {
        (search_form("/professionals/", &query))
        table {
            thead {
                tr {
                    th { "Name" } th { "Registration" } th { "Phone" }
                    th { "Services" } th { "Account" } th { "Active" }
                }
            }
            tbody {
                @for professional in &page.items {
                    tr {
                        td { (professional.full_name) }
                        td { (professional.registration_number.as_deref().unwrap_or("")) }
                        td { (professional.phone) }
                        td {
                            @for (i, service) in professional.services.iter().enumerate() {
                                @if i > 0 { ", " }
                                (service.name)
                            }
                        }
                        td { (professional.username.as_deref().unwrap_or("none")) }
                        td { @if professional.is_active { "yes" } @else { "no" } }
                    }
                }
            }
        }
        (pager("/professionals/", &query, &page))
    };
    Ok(html(layout("Professionals", Some(&user), body)))
}

/// `GET /services/`
pub async fn services(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PageQuery(query): PageQuery<ListQuery>,
) -> Result<Response, PageError> {
    user.require(Permission::All)?;
    let page = state
        .services
        .list(query.search.as_deref(), PageRequest::new(query.page, query.per_page))
        .await?;

    let body = html! {
        (search_form("/services/", &query))
        table {
            thead {
                tr {
                    th { "Name" } th { "Category" } th { "Duration" } th { "Price" } th { "Active" }
                }
            }
            tbody {
                @for service in &page.items {
                    tr {
                        td { (service.name) }
                        td { (service.category.as_deref().unwrap_or("")) }
                        td { (service.duration_minutes) " min" }
                        td { (money(service.price)) }
                        td { @if service.is_active { "yes" } @else { "no" } }
                    }
                }
            }
        }
        (pager("/services/", &query, &page))
    };
    Ok(html(layout("Services", Some(&user), body)))
}

#[derive(Debug, Default, Deserialize)]
pub struct NewAppointmentQuery {
    pub patient_id: Option<i64>,
}

const APPOINTMENT_FORM_SCRIPT: &str = r#"
document.getElementById('appointment-form').addEventListener('submit', async (event) => {
  event.preventDefault();
  const form = event.target;
  const amount = form.amount_charged.value;
  const body = {
    patient_id: Number(form.patient_id.value),
    professional_id: Number(form.professional_id.value),
    service_ids: [...form.querySelectorAll('input[name=service_ids]:checked')]
      .map((c) => Number(c.value)),
    scheduled_at: form.scheduled_at.value,
    notes: form.notes.value || null,
    amount_charged: amount === '' ? null : Number(amount),
  };
  const res = await fetch('/atendimentos/api/create', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json', 'Accept': 'application/json' },
    body: JSON.stringify(body),
  });
  const data = await res.json();
  document.getElementById('form-status').textContent = data.error || data.message;
  if (res.ok) form.reset();
});
"#;

/// `GET /atendimentos/novo?patient_id=`
///
/// Professionals only see themselves in the professional list; other staff pick
/// among the active professionals.
pub async fn new_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PageQuery(query): PageQuery<NewAppointmentQuery>,
) -> Result<Response, PageError> {
    user.require(Permission::EditAppointments)?;
    let patient_id = query
        .patient_id
        .ok_or_else(|| ClinicError::not_found("Patient not found"))?;
    let patient = state.patients.get(patient_id).await?;

    let picker = PageRequest::new(Some(1), Some(PICKER_PAGE_SIZE));
    let professionals = match user.professional_id {
        Some(id) => vec![state.professionals.get(id).await?],
        None => state
            .professionals
            .list(None, picker)
            .await?
            .items
            .into_iter()
            .filter(|p| p.is_active)
            .collect(),
    };
    let services: Vec<_> = state
        .services
        .list(None, picker)
        .await?
        .items
        .into_iter()
        .filter(|s| s.is_active)
        .collect();

    let body = html! {
        p { "Patient: " strong { (patient.full_name) } " (" (patient.cpf) ")" }
        form #appointment-form {
            input type="hidden" name="patient_id" value=(patient.id);
            label {
                "Professional "
                select name="professional_id" required {
                    @for professional in &professionals {
                        option value=(professional.id) { (professional.full_name) }
                    }
                }
            }
            fieldset {
                legend { "Services" }
                @for service in &services {
                    label {
                        input type="checkbox" name="service_ids" value=(service.id);
                        " " (service.name)
                        " (" (service.duration_minutes) " min, " (money(service.price)) ")"
                    }
                }
            }
            label { "Date and time " input type="datetime-local" name="scheduled_at" required; }
            label {
                "Amount charged "
                input type="number" name="amount_charged" step="0.01" min="0";
            }
            label { "Notes " textarea name="notes" {} }
            button type="submit" { "Save appointment" }
            p #form-status {}
        }
        script { (maud::PreEscaped(APPOINTMENT_FORM_SCRIPT)) }
    };
    Ok(html(layout("New appointment", Some(&user), body)))
}
