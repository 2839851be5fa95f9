// tests/lifecycle_test.rs — Timer client against a live server

use std::sync::Arc;

use pomotask::api::{build_router, ApiState};
use pomotask::auth::hash_password;
use pomotask::infra::config::TimerConfig;
use pomotask::infra::errors::PomoError;
use pomotask::store::{open_in_memory, spawn_store_server};
use pomotask::timer::cues::TerminalCues;
use pomotask::timer::lifecycle::{HttpSessionClient, SessionLifecycle};
use pomotask::timer::{Input, Phase, Timer, TimerController};

/// Serve a fresh database with one account; returns the base URL.
async fn spawn_server() -> String {
    let store = open_in_memory().unwrap();
    store
        .insert_user("ada", &hash_password("secret1").unwrap())
        .unwrap();
    let (handle, _) = spawn_store_server(store);
    let app = build_router(ApiState::new(handle, TimerConfig::default(), false).unwrap());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_login_and_bracket_a_session() {
    let base = spawn_server().await;
    let client = HttpSessionClient::login(&base, "ada", "secret1").await.unwrap();

    assert!(client.pending_tasks().await.unwrap().is_empty());
    let id = client.begin(25, None).await.unwrap();
    client.complete(id).await.unwrap();
    // Completing again is harmless.
    client.complete(id).await.unwrap();

    let stats = client.stats().await.unwrap();
    assert_eq!(stats.today_pomodoros, 1);
    assert_eq!(stats.total_focus_minutes, 25);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let base = spawn_server().await;
    let err = HttpSessionClient::login(&base, "ada", "nope123").await.err().unwrap();
    assert!(matches!(err, PomoError::UnexpectedStatus { status: 401, .. }));
}

#[tokio::test]
async fn test_unknown_record_surfaces_status() {
    let base = spawn_server().await;
    let client = HttpSessionClient::login(&base, "ada", "secret1").await.unwrap();
    let err = client.complete(4242).await.unwrap_err();
    assert!(matches!(
        err,
        PomoError::UnexpectedStatus {
            call: "complete",
            status: 404,
            ..
        }
    ));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_full_run_is_recorded_once() {
    let base = spawn_server().await;
    let client = Arc::new(HttpSessionClient::login(&base, "ada", "secret1").await.unwrap());

    let timer = Timer::new(vec![25, 50], 25).unwrap();
    let mut controller = TimerController::new(timer, client.clone(), Arc::new(TerminalCues::new(false)));

    controller.dispatch(Input::Start).unwrap();
    assert!(controller.pump().await);
    assert!(controller.timer().session_id().is_some());

    for _ in 0..25 * 60 {
        controller.dispatch(Input::Tick).unwrap();
    }
    assert_eq!(controller.timer().phase(), Phase::Idle);
    assert_eq!(controller.completed_runs(), 1);
    controller.drain().await;

    let stats = client.stats().await.unwrap();
    assert_eq!(stats.today_pomodoros, 1);
}

#[tokio::test]
async fn test_reset_run_stays_incomplete() {
    let base = spawn_server().await;
    let client = Arc::new(HttpSessionClient::login(&base, "ada", "secret1").await.unwrap());

    let timer = Timer::new(vec![25, 50], 25).unwrap();
    let mut controller = TimerController::new(timer, client.clone(), Arc::new(TerminalCues::new(false)));

    controller.dispatch(Input::Start).unwrap();
    controller.dispatch(Input::Tick).unwrap();
    controller.dispatch(Input::Reset).unwrap();
    controller.drain().await;

    assert_eq!(controller.timer().phase(), Phase::Idle);
    assert_eq!(client.stats().await.unwrap().today_pomodoros, 0);
}
