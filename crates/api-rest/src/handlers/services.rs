use api_shared::{ErrorRes, ListQuery, ListServicesRes, MessageRes, Service, ServiceReq, ServiceRes};
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use clinica_core::{CurrentUser, PageRequest, Permission, ServiceInput};

use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/services/api/list",
    params(ListQuery),
    responses(
        (status = 200, description = "One page of services, by name", body = ListServicesRes),
        (status = 401, description = "No live session", body = ErrorRes)
    )
)]
/// List the service catalogue
#[axum::debug_handler]
pub async fn list_services(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<ListServicesRes>, ApiError> {
    let page = state
        .services
        .list(query.search.as_deref(), PageRequest::new(query.page, query.per_page))
        .await?;

    Ok(Json(ListServicesRes {
        services: page.items,
        total: page.total,
        pages: page.pages,
        current_page: page.current_page,
        per_page: page.per_page,
    }))
}

#[utoipa::path(
    post,
    path = "/services/api/create",
    request_body = ServiceReq,
    responses(
        (status = 201, description = "Service created", body = ServiceRes),
        (status = 400, description = "Invalid input", body = ErrorRes),
        (status = 403, description = "Administrators only", body = ErrorRes)
    )
)]
/// Add a service to the catalogue
#[axum::debug_handler]
pub async fn create_service(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(req): JsonBody<ServiceReq>,
) -> Result<(StatusCode, Json<ServiceRes>), ApiError> {
    user.require(Permission::All)?;
    let input = ServiceInput::from_request(&req)?;
    let service = state.services.create(&input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ServiceRes {
            message: "Service registered successfully".into(),
            service,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/services/api/{id}",
    params(("id" = i64, Path, description = "Service id")),
    responses(
        (status = 200, description = "The service", body = Service),
        (status = 404, description = "No such service", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_service(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Service>, ApiError> {
    Ok(Json(state.services.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/services/api/{id}",
    params(("id" = i64, Path, description = "Service id")),
    request_body = ServiceReq,
    responses(
        (status = 200, description = "Service updated", body = ServiceRes),
        (status = 400, description = "Invalid input", body = ErrorRes),
        (status = 404, description = "No such service", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn update_service(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<ServiceReq>,
) -> Result<Json<ServiceRes>, ApiError> {
    user.require(Permission::All)?;
    let input = ServiceInput::from_request(&req)?;
    let service = state.services.update(id, &input).await?;

    Ok(Json(ServiceRes {
        message: "Service updated successfully".into(),
        service,
    }))
}

#[utoipa::path(
    delete,
    path = "/services/api/{id}",
    params(("id" = i64, Path, description = "Service id")),
    responses(
        (status = 200, description = "Service deleted", body = MessageRes),
        (status = 400, description = "Service is used by appointments", body = ErrorRes),
        (status = 404, description = "No such service", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn delete_service(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<MessageRes>, ApiError> {
    user.require(Permission::All)?;
    state.services.delete(id).await?;
    Ok(Json(MessageRes {
        message: "Service deleted successfully".into(),
    }))
}
