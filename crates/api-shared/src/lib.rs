//! # API Shared
//!
//! Shared utilities and definitions for the Clinica APIs.
//!
//! Contains:
//! - JSON transport types (`schema` module), annotated for OpenAPI generation
//! - Shared services like `HealthService`
//! - Authentication definitions (session cookie name, login/account payloads)
//!
//! Used by `clinica-core` to render records and by `api-rest` for request and response bodies.

pub mod auth;
pub mod health;
pub mod schema;

pub use auth::{
    AuthUser, CheckAuthRes, CreateAccountReq, CreateAccountRes, LoginReq, LoginRes,
    ResetPasswordReq, SESSION_COOKIE,
};
pub use health::HealthService;
pub use schema::*;
