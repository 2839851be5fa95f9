// src/api/auth.rs — Login-session cookie and anti-forgery checks

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::Json;

use crate::api::types::{ErrorResponse, CSRF_HEADER, SESSION_COOKIE};
use crate::api::ApiState;
use crate::auth::constant_time_eq;
use crate::infra::errors::PomoError;
use crate::store::store::LoginSessionRow;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Log the cause, return an opaque 500.
pub fn internal(e: anyhow::Error) -> ApiError {
    tracing::error!("request failed: {e:#}");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Map a domain error onto a response: caller mistakes are 4xx, the rest 500.
pub fn rejected(e: PomoError) -> ApiError {
    match e {
        PomoError::Validation(msg) => api_error(StatusCode::BAD_REQUEST, msg),
        PomoError::UnsupportedDuration { .. } => api_error(StatusCode::BAD_REQUEST, e.to_string()),
        PomoError::NotFound { .. } => api_error(StatusCode::NOT_FOUND, e.to_string()),
        other => internal(anyhow::Error::new(other)),
    }
}

/// Session token from the `Cookie` header, if present.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the caller's login session, if any.
pub async fn current_session(
    state: &ApiState,
    headers: &HeaderMap,
) -> Result<Option<LoginSessionRow>, ApiError> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };
    state.store.find_login_session(token).await.map_err(internal)
}

/// Like `current_session` but unauthenticated callers get a 401.
pub async fn require_session(
    state: &ApiState,
    headers: &HeaderMap,
) -> Result<LoginSessionRow, ApiError> {
    current_session(state, headers)
        .await?
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Login required"))
}

/// Verify the anti-forgery token from the header, or failing that the form.
pub fn check_csrf(
    session: &LoginSessionRow,
    headers: &HeaderMap,
    form_token: Option<&str>,
) -> Result<(), ApiError> {
    let provided = headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .or(form_token)
        .filter(|t| !t.is_empty());

    let Some(provided) = provided else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "The CSRF token is missing.",
        ));
    };

    if constant_time_eq(provided.as_bytes(), session.csrf_token.as_bytes()) {
        Ok(())
    } else {
        Err(api_error(
            StatusCode::BAD_REQUEST,
            "The CSRF tokens do not match.",
        ))
    }
}

/// `Set-Cookie` value for a fresh login session.
pub fn session_cookie(token: &str, secure: bool) -> Result<HeaderValue, ApiError> {
    let mut cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|e| internal(e.into()))
}

/// `Set-Cookie` value that removes the session cookie.
pub fn cleared_cookie() -> HeaderValue {
    HeaderValue::from_static("pomotask_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
