use api_shared::{AuthUser, CheckAuthRes, ErrorRes, LoginReq, LoginRes, MessageRes};
use axum::extract::State;
use axum::{Extension, Json};
use clinica_core::CurrentUser;
use tower_cookies::Cookies;

use crate::auth::{end_session, session_cookie};
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/auth/api/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = LoginRes),
        (status = 401, description = "Invalid username or password", body = ErrorRes),
        (status = 403, description = "Account disabled", body = ErrorRes)
    )
)]
/// Log in with a username and password
///
/// On success a session is opened and its token is returned in the `clinica_session` cookie.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    JsonBody(req): JsonBody<LoginReq>,
) -> Result<Json<LoginRes>, ApiError> {
    let user = state.users.authenticate(&req.username, &req.password).await?;
    let token = state.sessions.create(user.id).await?;
    cookies.add(session_cookie(token, &state.cfg));

    Ok(Json(LoginRes {
        message: "Login successful".into(),
        user: AuthUser::from(&user),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/api/logout",
    responses(
        (status = 200, description = "Session ended", body = MessageRes)
    )
)]
/// End the current session
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Json<MessageRes>, ApiError> {
    end_session(&state, &cookies).await?;
    Ok(Json(MessageRes {
        message: "Logged out".into(),
    }))
}

#[utoipa::path(
    get,
    path = "/auth/api/check-auth",
    responses(
        (status = 200, description = "The authenticated principal", body = CheckAuthRes),
        (status = 401, description = "No live session", body = ErrorRes)
    )
)]
/// Report who is logged in
#[axum::debug_handler(state = AppState)]
pub async fn check_auth(Extension(user): Extension<CurrentUser>) -> Json<CheckAuthRes> {
    Json(CheckAuthRes {
        authenticated: true,
        user: AuthUser::from(&user),
    })
}
