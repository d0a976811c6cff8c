use api_shared::{ErrorRes, ListPatientsRes, ListQuery, MessageRes, Patient, PatientReq, PatientRes};
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use clinica_core::{CurrentUser, PageRequest, PatientInput, Permission};

use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/patients/api/list",
    params(ListQuery),
    responses(
        (status = 200, description = "One page of patients, newest first", body = ListPatientsRes),
        (status = 401, description = "No live session", body = ErrorRes),
        (status = 403, description = "Missing view_patients", body = ErrorRes)
    )
)]
/// List patients
///
/// `search` matches name, CPF or phone.
#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<ListPatientsRes>, ApiError> {
    user.require(Permission::ViewPatients)?;
    let page = state
        .patients
        .list(query.search.as_deref(), PageRequest::new(query.page, query.per_page))
        .await?;

    Ok(Json(ListPatientsRes {
        patients: page.items,
        total: page.total,
        pages: page.pages,
        current_page: page.current_page,
        per_page: page.per_page,
    }))
}

#[utoipa::path(
    post,
    path = "/patients/api/create",
    request_body = PatientReq,
    responses(
        (status = 201, description = "Patient created", body = PatientRes),
        (status = 400, description = "Invalid input or CPF already registered", body = ErrorRes),
        (status = 403, description = "Missing edit_patients", body = ErrorRes)
    )
)]
/// Register a patient
///
/// The CPF is validated and stored as `000.000.000-00`; the phone is normalised.
#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(req): JsonBody<PatientReq>,
) -> Result<(StatusCode, Json<PatientRes>), ApiError> {
    user.require(Permission::EditPatients)?;
    let input = PatientInput::from_request(&req)?;
    let patient = state.patients.create(&input, Some(user.id)).await?;

    Ok((
        StatusCode::CREATED,
        Json(PatientRes {
            message: "Patient registered successfully".into(),
            patient,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/patients/api/{id}",
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "The patient", body = Patient),
        (status = 404, description = "No such patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Patient>, ApiError> {
    user.require(Permission::ViewPatients)?;
    Ok(Json(state.patients.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/patients/api/{id}",
    params(("id" = i64, Path, description = "Patient id")),
    request_body = PatientReq,
    responses(
        (status = 200, description = "Patient updated", body = PatientRes),
        (status = 400, description = "Invalid input or CPF already registered", body = ErrorRes),
        (status = 404, description = "No such patient", body = ErrorRes)
    )
)]
/// Replace a patient's details
#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<PatientReq>,
) -> Result<Json<PatientRes>, ApiError> {
    user.require(Permission::EditPatients)?;
    let input = PatientInput::from_request(&req)?;
    let patient = state.patients.update(id, &input).await?;

    Ok(Json(PatientRes {
        message: "Patient updated successfully".into(),
        patient,
    }))
}

#[utoipa::path(
    delete,
    path = "/patients/api/{id}",
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient deleted", body = MessageRes),
        (status = 400, description = "Patient still has appointments", body = ErrorRes),
        (status = 404, description = "No such patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<MessageRes>, ApiError> {
    user.require(Permission::EditPatients)?;
    state.patients.delete(id).await?;
    Ok(Json(MessageRes {
        message: "Patient deleted successfully".into(),
    }))
}
