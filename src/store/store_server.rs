// src/store/store_server.rs — Async message passing for Store
//
// rusqlite's Connection is not Sync, so one background task owns the Store
// and HTTP handlers talk to it through a cloneable handle.

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{mpsc, oneshot};

use crate::store::store::{
    LoginSessionRow, NewTask, PomodoroRow, Store, TaskCounts, TaskRow, UserRow,
};

type Reply<T> = oneshot::Sender<anyhow::Result<T>>;

#[derive(Debug)]
pub enum StoreCommand {
    InsertUser {
        username: String,
        password_hash: String,
        resp: Reply<i64>,
    },
    FindUserByUsername {
        username: String,
        resp: Reply<Option<UserRow>>,
    },
    InsertLoginSession {
        token: String,
        user_id: i64,
        csrf_token: String,
        resp: Reply<()>,
    },
    FindLoginSession {
        token: String,
        resp: Reply<Option<LoginSessionRow>>,
    },
    DeleteLoginSession {
        token: String,
        resp: Reply<()>,
    },
    InsertTask {
        user_id: i64,
        task: NewTask,
        resp: Reply<i64>,
    },
    FindTask {
        user_id: i64,
        task_id: i64,
        resp: Reply<Option<TaskRow>>,
    },
    PendingTasks {
        user_id: i64,
        resp: Reply<Vec<TaskRow>>,
    },
    ToggleTask {
        user_id: i64,
        task_id: i64,
        resp: Reply<Option<bool>>,
    },
    TaskCounts {
        user_id: i64,
        resp: Reply<TaskCounts>,
    },
    TasksCompletedOn {
        user_id: i64,
        day: NaiveDate,
        resp: Reply<u32>,
    },
    InsertPomodoro {
        user_id: i64,
        task_id: Option<i64>,
        duration: u32,
        started_at: DateTime<Utc>,
        resp: Reply<i64>,
    },
    CompletePomodoro {
        user_id: i64,
        id: i64,
        resp: Reply<bool>,
    },
    CompletedPomodorosSince {
        user_id: i64,
        since: NaiveDate,
        resp: Reply<Vec<PomodoroRow>>,
    },
}

/// A handle to the Store that uses message passing.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    pub fn new(tx: mpsc::Sender<StoreCommand>) -> Self {
        Self { tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> StoreCommand,
    ) -> anyhow::Result<T> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx.send(build(resp_tx)).await?;
        resp_rx.await?
    }

    pub async fn insert_user(&self, username: String, password_hash: String) -> anyhow::Result<i64> {
        self.request(|resp| StoreCommand::InsertUser {
            username,
            password_hash,
            resp,
        })
        .await
    }

    pub async fn find_user_by_username(&self, username: String) -> anyhow::Result<Option<UserRow>> {
        self.request(|resp| StoreCommand::FindUserByUsername { username, resp })
            .await
    }

    pub async fn insert_login_session(
        &self,
        token: String,
        user_id: i64,
        csrf_token: String,
    ) -> anyhow::Result<()> {
        self.request(|resp| StoreCommand::InsertLoginSession {
            token,
            user_id,
            csrf_token,
            resp,
        })
        .await
    }

    pub async fn find_login_session(&self, token: String) -> anyhow::Result<Option<LoginSessionRow>> {
        self.request(|resp| StoreCommand::FindLoginSession { token, resp })
            .await
    }

    pub async fn delete_login_session(&self, token: String) -> anyhow::Result<()> {
        self.request(|resp| StoreCommand::DeleteLoginSession { token, resp })
            .await
    }

    pub async fn insert_task(&self, user_id: i64, task: NewTask) -> anyhow::Result<i64> {
        self.request(|resp| StoreCommand::InsertTask {
            user_id,
            task,
            resp,
        })
        .await
    }

    pub async fn find_task(&self, user_id: i64, task_id: i64) -> anyhow::Result<Option<TaskRow>> {
        self.request(|resp| StoreCommand::FindTask {
            user_id,
            task_id,
            resp,
        })
        .await
    }

    pub async fn pending_tasks(&self, user_id: i64) -> anyhow::Result<Vec<TaskRow>> {
        self.request(|resp| StoreCommand::PendingTasks { user_id, resp })
            .await
    }

    pub async fn toggle_task(&self, user_id: i64, task_id: i64) -> anyhow::Result<Option<bool>> {
        self.request(|resp| StoreCommand::ToggleTask {
            user_id,
            task_id,
            resp,
        })
        .await
    }

    pub async fn task_counts(&self, user_id: i64) -> anyhow::Result<TaskCounts> {
        self.request(|resp| StoreCommand::TaskCounts { user_id, resp })
            .await
    }

    pub async fn tasks_completed_on(&self, user_id: i64, day: NaiveDate) -> anyhow::Result<u32> {
        self.request(|resp| StoreCommand::TasksCompletedOn { user_id, day, resp })
            .await
    }

    pub async fn insert_pomodoro(
        &self,
        user_id: i64,
        task_id: Option<i64>,
        duration: u32,
        started_at: DateTime<Utc>,
    ) -> anyhow::Result<i64> {
        self.request(|resp| StoreCommand::InsertPomodoro {
            user_id,
            task_id,
            duration,
            started_at,
            resp,
        })
        .await
    }

    pub async fn complete_pomodoro(&self, user_id: i64, id: i64) -> anyhow::Result<bool> {
        self.request(|resp| StoreCommand::CompletePomodoro { user_id, id, resp })
            .await
    }

    pub async fn completed_pomodoros_since(
        &self,
        user_id: i64,
        since: NaiveDate,
    ) -> anyhow::Result<Vec<PomodoroRow>> {
        self.request(|resp| StoreCommand::CompletedPomodorosSince {
            user_id,
            since,
            resp,
        })
        .await
    }
}

/// Helper to spawn the store server and return a handle.
pub fn spawn_store_server(store: Store) -> (StoreHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(100);
    let handle = StoreHandle::new(tx);
    let join_handle = tokio::spawn(run_store_server(store, rx));
    (handle, join_handle)
}

/// The background task that owns the Store.
pub async fn run_store_server(store: Store, mut rx: mpsc::Receiver<StoreCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            StoreCommand::InsertUser {
                username,
                password_hash,
                resp,
            } => {
                let _ = resp.send(store.insert_user(&username, &password_hash));
            }
            StoreCommand::FindUserByUsername { username, resp } => {
                let _ = resp.send(store.find_user_by_username(&username));
            }
            StoreCommand::InsertLoginSession {
                token,
                user_id,
                csrf_token,
                resp,
            } => {
                let _ = resp.send(store.insert_login_session(&token, user_id, &csrf_token));
            }
            StoreCommand::FindLoginSession { token, resp } => {
                let _ = resp.send(store.find_login_session(&token));
            }
            StoreCommand::DeleteLoginSession { token, resp } => {
                let _ = resp.send(store.delete_login_session(&token));
            }
            StoreCommand::InsertTask {
                user_id,
                task,
                resp,
            } => {
                let _ = resp.send(store.insert_task(user_id, &task));
            }
            StoreCommand::FindTask {
                user_id,
                task_id,
                resp,
            } => {
                let _ = resp.send(store.find_task(user_id, task_id));
            }
            StoreCommand::PendingTasks { user_id, resp } => {
                let _ = resp.send(store.pending_tasks(user_id));
            }
            StoreCommand::ToggleTask {
                user_id,
                task_id,
                resp,
            } => {
                let _ = resp.send(store.toggle_task(user_id, task_id));
            }
            StoreCommand::TaskCounts { user_id, resp } => {
                let _ = resp.send(store.task_counts(user_id));
            }
            StoreCommand::TasksCompletedOn { user_id, day, resp } => {
                let _ = resp.send(store.tasks_completed_on(user_id, day));
            }
            StoreCommand::InsertPomodoro {
                user_id,
                task_id,
                duration,
                started_at,
                resp,
            } => {
                let _ = resp.send(store.insert_pomodoro(user_id, task_id, duration, started_at));
            }
            StoreCommand::CompletePomodoro { user_id, id, resp } => {
                let _ = resp.send(store.complete_pomodoro(user_id, id));
            }
            StoreCommand::CompletedPomodorosSince {
                user_id,
                since,
                resp,
            } => {
                let _ = resp.send(store.completed_pomodoros_since(user_id, since));
            }
        }
    }
    tracing::debug!("store server stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::open_in_memory;

    #[tokio::test]
    async fn test_handle_round_trip() {
        let (handle, _join) = spawn_store_server(open_in_memory().unwrap());

        let user = handle
            .insert_user("ada".into(), "hash".into())
            .await
            .unwrap();
        let found = handle
            .find_user_by_username("ada".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user);

        let id = handle
            .insert_pomodoro(user, None, 25, Utc::now())
            .await
            .unwrap();
        assert!(handle.complete_pomodoro(user, id).await.unwrap());
        assert!(handle.complete_pomodoro(user, id).await.unwrap());
        assert!(!handle.complete_pomodoro(user + 1, id).await.unwrap());

        let today = Utc::now().date_naive();
        let done = handle.completed_pomodoros_since(user, today).await.unwrap();
        assert_eq!(done.len(), 1);
    }

    #[tokio::test]
    async fn test_handle_fails_after_server_stops() {
        let (handle, join) = spawn_store_server(open_in_memory().unwrap());
        join.abort();
        let _ = join.await;
        assert!(handle.task_counts(1).await.is_err());
    }
}
