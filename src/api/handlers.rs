// src/api/handlers.rs

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use chrono::{Duration, NaiveDate, Utc};

use crate::api::auth::{
    api_error, check_csrf, cleared_cookie, current_session, internal, rejected, require_session,
    session_cookie, session_token, ApiError,
};
use crate::api::page::{self, Dashboard};
use crate::api::types::*;
use crate::api::ApiState;
use crate::auth::{hash_password, random_token, verify_password, MIN_PASSWORD_LEN};
use crate::infra::errors::PomoError;
use crate::stats::{self, DayCount, StatsSummary, DAILY_BUCKETS};
use crate::store::store::{NewTask, Priority};

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

// -- Accounts --

/// GET /login
pub async fn login_page(State(state): State<ApiState>) -> Result<Html<String>, ApiError> {
    page::render_login(&state.templates, None)
        .map(Html)
        .map_err(|e| internal(e.into()))
}

/// POST /register
pub async fn register(
    State(state): State<ApiState>,
    Form(form): Form<RegisterForm>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let username = form.username.trim().to_string();
    validate_registration(&username, &form.password, &form.confirmation).map_err(rejected)?;

    if state
        .store
        .find_user_by_username(username.clone())
        .await
        .map_err(internal)?
        .is_some()
    {
        return Err(api_error(StatusCode::CONFLICT, "Username already exists."));
    }

    let password = form.password;
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| internal(e.into()))?
        .map_err(internal)?;
    let user_id = state
        .store
        .insert_user(username.clone(), hash)
        .await
        .map_err(internal)?;

    tracing::info!("registered user {username} (id {user_id})");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Registration successful! Please log in.".into(),
        }),
    ))
}

pub fn validate_registration(
    username: &str,
    password: &str,
    confirmation: &str,
) -> Result<(), PomoError> {
    let fail = |msg: &str| Err(PomoError::Validation(msg.into()));
    if username.is_empty() {
        return fail("Username is required.");
    }
    if password.is_empty() {
        return fail("Password is required.");
    }
    if password != confirmation {
        return fail("Passwords do not match.");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return fail("Password must be at least 6 characters.");
    }
    Ok(())
}

/// POST /login — starts a fresh login session and redirects to the dashboard.
pub async fn login(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    // Any previous session for this browser ends here.
    if let Some(old) = session_token(&headers) {
        state.store.delete_login_session(old).await.map_err(internal)?;
    }

    let username = form.username.trim().to_string();
    if username.is_empty() || form.password.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Username and password are required.",
        ));
    }

    let user = state
        .store
        .find_user_by_username(username.clone())
        .await
        .map_err(internal)?;
    let Some(user) = user else {
        return Err(invalid_credentials(&username));
    };

    let password = form.password;
    let stored = user.password_hash.clone();
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| internal(e.into()))?;
    if !ok {
        return Err(invalid_credentials(&username));
    }

    let token = random_token().map_err(internal)?;
    let csrf_token = random_token().map_err(internal)?;
    state
        .store
        .insert_login_session(token.clone(), user.id, csrf_token)
        .await
        .map_err(internal)?;

    tracing::info!("user {} logged in", user.username);
    let cookie = session_cookie(&token, state.secure_cookies)?;
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

fn invalid_credentials(username: &str) -> ApiError {
    tracing::debug!("failed login for {username}");
    api_error(StatusCode::UNAUTHORIZED, "Invalid username or password.")
}

/// GET|POST /logout
pub async fn logout(State(state): State<ApiState>, headers: HeaderMap) -> Result<Response, ApiError> {
    if let Some(token) = session_token(&headers) {
        state.store.delete_login_session(token).await.map_err(internal)?;
    }
    Ok(([(header::SET_COOKIE, cleared_cookie())], Redirect::to("/login")).into_response())
}

// -- Dashboard --

/// GET / — dashboard; logged-out visitors are sent to /login.
pub async fn dashboard(State(state): State<ApiState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let Some(session) = current_session(&state, &headers).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let today = Utc::now().date_naive();
    let tasks: Vec<TaskOption> = state
        .store
        .pending_tasks(session.user_id)
        .await
        .map_err(internal)?
        .into_iter()
        .map(TaskOption::from)
        .collect();
    let today_pomodoros = state
        .store
        .completed_pomodoros_since(session.user_id, today)
        .await
        .map_err(internal)?
        .iter()
        .filter(|p| p.started_at.date_naive() == today)
        .count() as u32;
    let today_tasks = state
        .store
        .tasks_completed_on(session.user_id, today)
        .await
        .map_err(internal)?;

    let html = page::render_dashboard(
        &state.templates,
        &Dashboard {
            username: &session.username,
            csrf_token: &session.csrf_token,
            durations: &state.timer.durations,
            default_duration: state.timer.default_duration,
            tasks: &tasks,
            today_pomodoros,
            today_tasks,
        },
    )
    .map_err(|e| internal(e.into()))?;
    Ok(Html(html).into_response())
}

// -- Tasks --

/// GET /api/tasks — pending tasks for the timer's task picker.
pub async fn list_tasks(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Vec<TaskOption>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let tasks = state
        .store
        .pending_tasks(session.user_id)
        .await
        .map_err(internal)?;
    Ok(Json(tasks.into_iter().map(TaskOption::from).collect()))
}

/// POST /tasks
pub async fn create_task(
    State(state): State<ApiState>,
    headers: HeaderMap,
    form: Result<Form<NewTaskForm>, FormRejection>,
) -> Result<(StatusCode, Json<TaskCreatedResponse>), ApiError> {
    let session = require_session(&state, &headers).await?;
    let form = form.map(|Form(f)| f).unwrap_or_default();
    check_csrf(&session, &headers, form.csrf_token.as_deref())?;

    let task = parse_new_task(form).map_err(rejected)?;
    let title = task.title.clone();
    let id = state
        .store
        .insert_task(session.user_id, task)
        .await
        .map_err(internal)?;

    Ok((
        StatusCode::CREATED,
        Json(TaskCreatedResponse {
            id,
            message: format!("Task created: {title}"),
        }),
    ))
}

pub fn parse_new_task(form: NewTaskForm) -> Result<NewTask, PomoError> {
    let title = form.title.trim().to_string();
    if title.is_empty() {
        return Err(PomoError::Validation("Task title is required.".into()));
    }

    let priority = match form.priority.as_deref().map(str::trim) {
        None | Some("") => Priority::default(),
        Some(p) => Priority::parse(p)
            .ok_or_else(|| PomoError::Validation(format!("Invalid priority '{p}'.")))?,
    };

    let deadline = match form.deadline.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(d) => Some(
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| PomoError::Validation("Invalid date format.".into()))?,
        ),
    };

    let description = form
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    Ok(NewTask {
        title,
        description,
        priority,
        deadline,
    })
}

/// POST /tasks/{id}/toggle
pub async fn toggle_task(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    form: Result<Form<CsrfForm>, FormRejection>,
) -> Result<Json<TaskToggledResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let form = form.map(|Form(f)| f).unwrap_or_default();
    check_csrf(&session, &headers, form.csrf_token.as_deref())?;

    let completed = state
        .store
        .toggle_task(session.user_id, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| rejected(PomoError::NotFound { what: "Task" }))?;
    Ok(Json(TaskToggledResponse { id, completed }))
}

// -- Pomodoro sessions --

/// POST /pomodoro/start — records a session that has not completed yet.
pub async fn start_pomodoro(
    State(state): State<ApiState>,
    headers: HeaderMap,
    form: Result<Form<StartForm>, FormRejection>,
) -> Result<Json<StartResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let form = form.map(|Form(f)| f).unwrap_or_default();
    check_csrf(&session, &headers, form.csrf_token.as_deref())?;

    let duration = parse_duration(
        form.duration.as_deref(),
        &state.timer.durations,
        state.timer.default_duration,
    )
    .map_err(rejected)?;

    let task_id = parse_task_ref(form.task_id.as_deref()).map_err(rejected)?;
    if let Some(task_id) = task_id {
        let owned = state
            .store
            .find_task(session.user_id, task_id)
            .await
            .map_err(internal)?;
        if owned.is_none() {
            return Err(rejected(PomoError::Validation("Invalid task".into())));
        }
    }

    let pomodoro_id = state
        .store
        .insert_pomodoro(session.user_id, task_id, duration, Utc::now())
        .await
        .map_err(internal)?;

    tracing::debug!("user {} started pomodoro {pomodoro_id} ({duration} min)", session.user_id);
    Ok(Json(StartResponse {
        pomodoro_id,
        duration,
    }))
}

/// Missing or blank means the default; anything else must be an allowed value.
pub fn parse_duration(raw: Option<&str>, allowed: &[u32], default: u32) -> Result<u32, PomoError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };
    let minutes: u32 = raw
        .parse()
        .map_err(|_| PomoError::Validation(format!("Invalid duration '{raw}'")))?;
    if allowed.contains(&minutes) {
        Ok(minutes)
    } else {
        Err(PomoError::UnsupportedDuration {
            minutes,
            allowed: allowed.to_vec(),
        })
    }
}

pub fn parse_task_ref(raw: Option<&str>) -> Result<Option<i64>, PomoError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(id) => id
            .parse()
            .map(Some)
            .map_err(|_| PomoError::Validation("Invalid task".into())),
    }
}

/// POST /pomodoro/{id}/complete — idempotent.
pub async fn complete_pomodoro(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    form: Result<Form<CsrfForm>, FormRejection>,
) -> Result<Json<CompleteResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let form = form.map(|Form(f)| f).unwrap_or_default();
    check_csrf(&session, &headers, form.csrf_token.as_deref())?;

    let found = state
        .store
        .complete_pomodoro(session.user_id, id)
        .await
        .map_err(internal)?;
    if !found {
        return Err(rejected(PomoError::NotFound { what: "Pomodoro" }));
    }
    Ok(Json(CompleteResponse { success: true }))
}

// -- Statistics --

/// GET /stats
pub async fn stats(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<StatsSummary>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let today = Utc::now().date_naive();

    let records = state
        .store
        .completed_pomodoros_since(session.user_id, stats::window_start(today))
        .await
        .map_err(internal)?;
    let tasks = state
        .store
        .task_counts(session.user_id)
        .await
        .map_err(internal)?;
    Ok(Json(stats::summarize(&records, tasks, today)))
}

/// GET /api/stats/weekly
pub async fn weekly_stats(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Vec<DayCount>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let today = Utc::now().date_naive();

    let records = state
        .store
        .completed_pomodoros_since(session.user_id, today - Duration::days(DAILY_BUCKETS - 1))
        .await
        .map_err(internal)?;
    Ok(Json(stats::daily_counts(&records, today, "%a %d")))
}
