use api_shared::{
    CreateAccountReq, CreateAccountRes, ErrorRes, ListProfessionalsRes, ListQuery, MessageRes,
    Professional, ProfessionalReq, ProfessionalRes, ResetPasswordReq,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use clinica_core::{CurrentUser, PageRequest, Permission, ProfessionalInput};

use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/professionals/api/list",
    params(ListQuery),
    responses(
        (status = 200, description = "Professionals by name", body = ListProfessionalsRes),
        (status = 401, description = "No live session", body = ErrorRes)
    )
)]
/// List professionals
///
/// `search` matches name, CPF, registration number or e-mail.
#[axum::debug_handler]
pub async fn list_professionals(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<ListProfessionalsRes>, ApiError> {
    let page = state
        .professionals
        .list(query.search.as_deref(), PageRequest::new(query.page, query.per_page))
        .await?;

    Ok(Json(ListProfessionalsRes {
        professionals: page.items,
        total: page.total,
        pages: page.pages,
        current_page: page.current_page,
        per_page: page.per_page,
    }))
}

#[utoipa::path(
    post,
    path = "/professionals/api/create",
    request_body = ProfessionalReq,
    responses(
        (status = 201, description = "Professional created", body = ProfessionalRes),
        (status = 400, description = "Invalid input or duplicate record", body = ErrorRes),
        (status = 403, description = "Administrators only", body = ErrorRes)
    )
)]
/// Register a professional
///
/// Unknown ids in `service_ids` are ignored.
#[axum::debug_handler]
pub async fn create_professional(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(req): JsonBody<ProfessionalReq>,
) -> Result<(StatusCode, Json<ProfessionalRes>), ApiError> {
    user.require(Permission::All)?;
    let input = ProfessionalInput::from_request(&req)?;
    let professional = state.professionals.create(&input, Some(user.id)).await?;

    Ok((
        StatusCode::CREATED,
        Json(ProfessionalRes {
            message: "Professional registered successfully".into(),
            professional,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/professionals/api/{id}",
    params(("id" = i64, Path, description = "Professional id")),
    responses(
        (status = 200, description = "The professional", body = Professional),
        (status = 404, description = "No such professional", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_professional(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Professional>, ApiError> {
    Ok(Json(state.professionals.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/professionals/api/{id}",
    params(("id" = i64, Path, description = "Professional id")),
    request_body = ProfessionalReq,
    responses(
        (status = 200, description = "Professional updated", body = ProfessionalRes),
        (status = 400, description = "Invalid input or duplicate record", body = ErrorRes),
        (status = 404, description = "No such professional", body = ErrorRes)
    )
)]
/// Replace a professional's details
///
/// The offered services are replaced by `service_ids`; omitting it clears them.
#[axum::debug_handler]
pub async fn update_professional(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<ProfessionalReq>,
) -> Result<Json<ProfessionalRes>, ApiError> {
    user.require(Permission::All)?;
    let input = ProfessionalInput::from_request(&req)?;
    let professional = state.professionals.update(id, &input).await?;

    Ok(Json(ProfessionalRes {
        message: "Professional updated successfully".into(),
        professional,
    }))
}

#[utoipa::path(
    delete,
    path = "/professionals/api/{id}",
    params(("id" = i64, Path, description = "Professional id")),
    responses(
        (status = 200, description = "Professional and linked account deleted", body = MessageRes),
        (status = 400, description = "Professional still has appointments", body = ErrorRes),
        (status = 404, description = "No such professional", body = ErrorRes)
    )
)]
/// Delete a professional together with their login account
#[axum::debug_handler]
pub async fn delete_professional(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<MessageRes>, ApiError> {
    user.require(Permission::All)?;
    state.professionals.delete(id).await?;
    Ok(Json(MessageRes {
        message: "Professional deleted successfully".into(),
    }))
}

#[utoipa::path(
    post,
    path = "/professionals/api/{id}/create-account",
    params(("id" = i64, Path, description = "Professional id")),
    request_body = CreateAccountReq,
    responses(
        (status = 200, description = "Account created", body = CreateAccountRes),
        (status = 400, description = "Invalid input or existing account", body = ErrorRes),
        (status = 404, description = "No such professional", body = ErrorRes)
    )
)]
/// Give a professional a login
#[axum::debug_handler]
pub async fn create_account(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<CreateAccountReq>,
) -> Result<Json<CreateAccountRes>, ApiError> {
    user.require(Permission::All)?;
    let account = state.professionals.create_account(id, &req).await?;
    Ok(Json(CreateAccountRes {
        message: "User account created successfully".into(),
        username: account.username,
    }))
}

#[utoipa::path(
    post,
    path = "/professionals/api/{id}/reset-password",
    params(("id" = i64, Path, description = "Professional id")),
    request_body = ResetPasswordReq,
    responses(
        (status = 200, description = "Password changed and sessions revoked", body = MessageRes),
        (status = 400, description = "No account, or weak password", body = ErrorRes),
        (status = 404, description = "No such professional", body = ErrorRes)
    )
)]
/// Set a new password on a professional's login
#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<ResetPasswordReq>,
) -> Result<Json<MessageRes>, ApiError> {
    user.require(Permission::All)?;
    state.professionals.reset_password(id, &req).await?;
    Ok(Json(MessageRes {
        message: "Password changed successfully".into(),
    }))
}
