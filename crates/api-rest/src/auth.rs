//! Session-cookie authentication.
//!
//! [`require_session`] guards every protected route: it resolves the
//! `clinica_session` cookie to a [`CurrentUser`] and stores it in the request
//! extensions, where handlers pick it up with `Extension<CurrentUser>`.

use api_shared::SESSION_COOKIE;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use clinica_core::{ClinicError, ClinicResult, CoreConfig, CurrentUser};
use tower_cookies::cookie::time;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

use crate::error::ApiError;
use crate::AppState;

/// True when the client asked for JSON.
pub fn accepts_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

fn wants_json(req: &Request) -> bool {
    req.uri().path().contains("/api/") || accepts_json(req.headers())
}

/// The session cookie for a freshly issued token.
pub fn session_cookie(token: String, cfg: &CoreConfig) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(cfg.secure_cookies());
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::seconds(
        cfg.session_lifetime().num_seconds(),
    ));
    cookie
}

/// The user behind the request's session cookie, if any.
pub async fn session_user(
    state: &AppState,
    cookies: &Cookies,
) -> ClinicResult<Option<CurrentUser>> {
    match cookies.get(SESSION_COOKIE) {
        Some(cookie) => state.sessions.resolve(cookie.value()).await,
        None => Ok(None),
    }
}

/// Revokes the request's session, if any, and expires the cookie.
pub async fn end_session(state: &AppState, cookies: &Cookies) -> ClinicResult<()> {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        state.sessions.revoke(cookie.value()).await?;
        cookies.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    }
    Ok(())
}

/// Rejects requests without a live session.
///
/// API requests (paths containing `/api/`, or `Accept: application/json`) get a
/// 401 JSON body; page navigation is redirected to the login form.
pub async fn require_session(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Response {
    match session_user(&state, &cookies).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Ok(None) if wants_json(&req) => {
            ApiError::from(ClinicError::Unauthenticated).into_response()
        }
        Ok(None) => {
            let target = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            login_redirect(target).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Redirect to the login form, remembering where the user was heading.
fn login_redirect(target: &str) -> Redirect {
    Redirect::to(&format!("/auth/login?next={}", urlencoding::encode(target)))
}

/// A post-login destination that stays on this site.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/dashboard",
    }
}
