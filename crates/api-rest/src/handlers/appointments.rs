use api_shared::{
    Appointment, AppointmentListQuery, AppointmentReq, AppointmentRes, ErrorRes,
    ListAppointmentsRes, MessageRes,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use clinica_core::{AppointmentInput, CurrentUser, PageRequest, Permission};

use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/atendimentos/api/list",
    params(AppointmentListQuery),
    responses(
        (status = 200, description = "Appointments, latest first", body = ListAppointmentsRes),
        (status = 403, description = "Missing view_appointments", body = ErrorRes)
    )
)]
/// List appointments, optionally for one patient and/or professional
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    QueryParams(query): QueryParams<AppointmentListQuery>,
) -> Result<Json<ListAppointmentsRes>, ApiError> {
    user.require(Permission::ViewAppointments)?;
    let page = state
        .appointments
        .list(
            query.patient_id,
            query.professional_id,
            PageRequest::new(query.page, query.per_page),
        )
        .await?;

    Ok(Json(ListAppointmentsRes {
        atendimentos: page.items,
        total: page.total,
        pages: page.pages,
        current_page: page.current_page,
        per_page: page.per_page,
    }))
}

#[utoipa::path(
    post,
    path = "/atendimentos/api/create",
    request_body = AppointmentReq,
    responses(
        (status = 201, description = "Appointment recorded", body = AppointmentRes),
        (status = 400, description = "Missing fields or no services selected", body = ErrorRes),
        (status = 404, description = "Patient, professional or service not found", body = ErrorRes)
    )
)]
/// Record an appointment
#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(req): JsonBody<AppointmentReq>,
) -> Result<(StatusCode, Json<AppointmentRes>), ApiError> {
    user.require(Permission::EditAppointments)?;
    let input = AppointmentInput::from_request(&req)?;
    let atendimento = state.appointments.create(&input).await?;

    Ok((
        StatusCode::CREATED,
        Json(AppointmentRes {
            message: "Appointment recorded successfully".into(),
            atendimento,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/atendimentos/api/patient/{patient_id}",
    params(("patient_id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "The patient's appointments", body = [Appointment])
    )
)]
/// Every appointment of one patient
///
/// Answers with a bare array, empty for unknown patients.
#[axum::debug_handler]
pub async fn list_for_patient(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathParam(patient_id): PathParam<i64>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    user.require(Permission::ViewAppointments)?;
    Ok(Json(state.appointments.list_for_patient(patient_id).await?))
}

#[utoipa::path(
    get,
    path = "/atendimentos/api/{id}",
    params(("id" = i64, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "The appointment", body = Appointment),
        (status = 404, description = "No such appointment", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Appointment>, ApiError> {
    user.require(Permission::ViewAppointments)?;
    Ok(Json(state.appointments.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/atendimentos/api/{id}",
    params(("id" = i64, Path, description = "Appointment id")),
    request_body = AppointmentReq,
    responses(
        (status = 200, description = "Appointment updated", body = AppointmentRes),
        (status = 400, description = "Invalid input", body = ErrorRes),
        (status = 404, description = "Appointment or referenced record missing", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<AppointmentReq>,
) -> Result<Json<AppointmentRes>, ApiError> {
    user.require(Permission::EditAppointments)?;
    let input = AppointmentInput::from_request(&req)?;
    let atendimento = state.appointments.update(id, &input).await?;

    Ok(Json(AppointmentRes {
        message: "Appointment updated successfully".into(),
        atendimento,
    }))
}

#[utoipa::path(
    delete,
    path = "/atendimentos/api/{id}",
    params(("id" = i64, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment deleted", body = MessageRes),
        (status = 404, description = "No such appointment", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<MessageRes>, ApiError> {
    user.require(Permission::EditAppointments)?;
    state.appointments.delete(id).await?;
    Ok(Json(MessageRes {
        message: "Appointment deleted successfully".into(),
    }))
}
