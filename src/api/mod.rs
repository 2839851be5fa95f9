// src/api/mod.rs — HTTP server: accounts, tasks and session records

pub mod auth;
pub mod handlers;
pub mod page;
pub mod types;

use std::sync::Arc;

use axum::http::header::{
    CONTENT_SECURITY_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
};
use axum::http::HeaderValue;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use minijinja::Environment;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::infra::config::{ServerConfig, TimerConfig};
use crate::store::StoreHandle;

const CSP: &str = "default-src 'self'; \
    script-src 'self' cdn.jsdelivr.net 'unsafe-inline'; \
    style-src 'self' cdn.jsdelivr.net 'unsafe-inline'; \
    font-src 'self' cdn.jsdelivr.net; \
    img-src 'self' data:";
const HSTS: &str = "max-age=31536000; includeSubDomains";

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: StoreHandle,
    /// Allowed durations and the default for `/pomodoro/start`.
    pub timer: TimerConfig,
    /// Adds `Secure` to the session cookie and sends HSTS.
    pub secure_cookies: bool,
    pub templates: Arc<Environment<'static>>,
}

impl ApiState {
    pub fn new(store: StoreHandle, timer: TimerConfig, secure_cookies: bool) -> anyhow::Result<Self> {
        Ok(Self {
            store,
            timer,
            secure_cookies,
            templates: Arc::new(page::environment()?),
        })
    }
}

/// Build the axum router with all routes and security headers.
pub fn build_router(state: ApiState) -> Router {
    let force_https = state.secure_cookies;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/logout", get(handlers::logout).post(handlers::logout))
        .route("/", get(handlers::dashboard))
        .route("/api/tasks", get(handlers::list_tasks))
        .route("/tasks", post(handlers::create_task))
        .route("/tasks/{id}/toggle", post(handlers::toggle_task))
        .route("/pomodoro/start", post(handlers::start_pomodoro))
        .route("/pomodoro/{id}/complete", post(handlers::complete_pomodoro))
        .route("/stats", get(handlers::stats))
        .route("/api/stats/weekly", get(handlers::weekly_stats))
        .layer(SetResponseHeaderLayer::if_not_present(
            CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CSP),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            STRICT_TRANSPORT_SECURITY,
            move |_: &Response| force_https.then(|| HeaderValue::from_static(HSTS)),
        ))
        .with_state(state)
}

/// Start the HTTP server (runs until the process exits).
pub async fn start_server(config: &ServerConfig, state: ApiState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("pomotask server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
