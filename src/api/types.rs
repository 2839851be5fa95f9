// src/api/types.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::store::store::{Priority, TaskRow};

/// Header carrying the anti-forgery token on state-changing calls.
pub const CSRF_HEADER: &str = "X-CSRFToken";
/// Cookie holding the login session token.
pub const SESSION_COOKIE: &str = "pomotask_session";

/// Client side of `POST /pomodoro/start`.
#[derive(Debug, Clone, Serialize)]
pub struct StartRequest {
    pub duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
}

/// Server side of `POST /pomodoro/start`: browsers send blanks for "no task".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartForm {
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub pomodoro_id: i64,
    pub duration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteResponse {
    pub success: bool,
}

/// Body-less POSTs may still carry the token as a form field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CsrfForm {
    #[serde(default)]
    pub csrf_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirmation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTaskForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

/// Entry in the timer's task picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOption {
    pub id: i64,
    pub title: String,
    pub priority: Priority,
    pub deadline: Option<NaiveDate>,
}

impl From<TaskRow> for TaskOption {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            priority: row.priority,
            deadline: row.deadline,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskCreatedResponse {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskToggledResponse {
    pub id: i64,
    pub completed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
