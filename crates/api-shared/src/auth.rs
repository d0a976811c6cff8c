//! Authentication payloads shared by the HTML login form and the JSON API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Name of the cookie carrying the opaque session token.
pub const SESSION_COOKIE: &str = "clinica_session";

/// Credentials posted by the login form or `POST /auth/api/login`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginReq {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// The authenticated principal as exposed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub professional_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRes {
    pub message: String,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckAuthRes {
    pub authenticated: bool,
    pub user: AuthUser,
}

/// Body of `POST /professionals/api/{id}/create-account`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateAccountReq {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAccountRes {
    pub message: String,
    pub username: String,
}

/// Body of `POST /professionals/api/{id}/reset-password`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ResetPasswordReq {
    pub password: Option<String>,
}
