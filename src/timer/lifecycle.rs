// src/timer/lifecycle.rs — begin/complete calls that bracket a timer run

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Response, StatusCode};
use url::Url;

use crate::api::types::{
    CompleteResponse, StartRequest, StartResponse, TaskOption, CSRF_HEADER,
};
use crate::infra::errors::PomoError;
use crate::stats::StatsSummary;

/// Server-side bookkeeping for a timer run.
///
/// Neither call blocks the countdown: the controller spawns them and feeds
/// the outcome back as an input. Failures are logged, never retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionLifecycle: Send + Sync {
    /// Create a session record; returns its identifier.
    async fn begin(&self, duration_minutes: u32, task_ref: Option<i64>) -> Result<i64, PomoError>;

    /// Mark a session record completed.
    async fn complete(&self, session_id: i64) -> Result<(), PomoError>;
}

/// Talks to the pomotask HTTP server with a logged-in cookie session.
pub struct HttpSessionClient {
    base: Url,
    client: reqwest::Client,
    csrf_token: String,
}

impl HttpSessionClient {
    /// Log in, then read the anti-forgery token off the dashboard page.
    pub async fn login(base_url: &str, username: &str, password: &str) -> Result<Self, PomoError> {
        let base = Url::parse(base_url)
            .map_err(|e| PomoError::Config(format!("invalid server url '{base_url}': {e}")))?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        let resp = client
            .post(endpoint(&base, "/login")?)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        let status = resp.status();
        if !(status.is_success() || status == StatusCode::SEE_OTHER) {
            return Err(unexpected("login", resp).await);
        }

        let page = client.get(endpoint(&base, "/")?).send().await?;
        if !page.status().is_success() {
            return Err(unexpected("dashboard", page).await);
        }
        let html = page.text().await?;
        let csrf_token = extract_csrf_token(&html).ok_or(PomoError::MissingCsrfToken)?;

        tracing::debug!("logged in to {base} as {username}");
        Ok(Self {
            base,
            client,
            csrf_token,
        })
    }

    /// Pending tasks for the task picker.
    pub async fn pending_tasks(&self) -> Result<Vec<TaskOption>, PomoError> {
        let resp = self
            .client
            .get(endpoint(&self.base, "/api/tasks")?)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(unexpected("tasks", resp).await);
        }
        Ok(resp.json().await?)
    }

    /// Aggregates shown after a session completes.
    pub async fn stats(&self) -> Result<StatsSummary, PomoError> {
        let resp = self
            .client
            .get(endpoint(&self.base, "/stats")?)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(unexpected("stats", resp).await);
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl SessionLifecycle for HttpSessionClient {
    async fn begin(&self, duration_minutes: u32, task_ref: Option<i64>) -> Result<i64, PomoError> {
        let resp = self
            .client
            .post(endpoint(&self.base, "/pomodoro/start")?)
            .header(CSRF_HEADER, &self.csrf_token)
            .form(&StartRequest {
                duration: duration_minutes,
                task_id: task_ref,
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(unexpected("begin", resp).await);
        }
        let body: StartResponse = resp.json().await?;
        Ok(body.pomodoro_id)
    }

    async fn complete(&self, session_id: i64) -> Result<(), PomoError> {
        let resp = self
            .client
            .post(endpoint(
                &self.base,
                &format!("/pomodoro/{session_id}/complete"),
            )?)
            .header(CSRF_HEADER, &self.csrf_token)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(unexpected("complete", resp).await);
        }
        let _: CompleteResponse = resp.json().await?;
        Ok(())
    }
}

fn endpoint(base: &Url, path: &str) -> Result<Url, PomoError> {
    base.join(path)
        .map_err(|e| PomoError::Config(format!("invalid endpoint '{path}': {e}")))
}

async fn unexpected(call: &'static str, resp: Response) -> PomoError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    PomoError::UnexpectedStatus { call, status, body }
}

/// Pull the token out of `<meta name="csrf-token" content="...">`.
pub fn extract_csrf_token(html: &str) -> Option<String> {
    let marker = "name=\"csrf-token\"";
    let tag_start = html[..html.find(marker)?].rfind('<')?;
    let tag_end = tag_start + html[tag_start..].find('>')?;
    let tag = &html[tag_start..tag_end];

    let content_at = tag.find("content=\"")? + "content=\"".len();
    let len = tag[content_at..].find('"')?;
    let token = &tag[content_at..content_at + len];
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_csrf_token() {
        let html = r#"<html><head>
<meta charset="utf-8">
<meta name="csrf-token" content="abc123">
</head></html>"#;
        assert_eq!(extract_csrf_token(html), Some("abc123".into()));
    }

    #[test]
    fn test_extract_csrf_token_attribute_order() {
        let html = r#"<meta content="tok-9" name="csrf-token" />"#;
        assert_eq!(extract_csrf_token(html), Some("tok-9".into()));
    }

    #[test]
    fn test_extract_csrf_token_missing_or_empty() {
        assert_eq!(extract_csrf_token("<html></html>"), None);
        assert_eq!(
            extract_csrf_token(r#"<meta name="csrf-token" content="">"#),
            None
        );
    }

    #[test]
    fn test_endpoint_joins_from_root() {
        let base = Url::parse("http://127.0.0.1:5000").unwrap();
        assert_eq!(
            endpoint(&base, "/pomodoro/7/complete").unwrap().as_str(),
            "http://127.0.0.1:5000/pomodoro/7/complete"
        );
    }

    #[tokio::test]
    async fn test_login_unreachable_server_is_transport_error() {
        let err = HttpSessionClient::login("http://127.0.0.1:9", "u", "p")
            .await
            .err()
            .unwrap();
        assert!(err.is_transport());
    }

    #[test]
    fn test_login_rejects_bad_url() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let err = rt
            .block_on(HttpSessionClient::login("not a url", "u", "p"))
            .err()
            .unwrap();
        assert!(matches!(err, PomoError::Config(_)));
    }
}
