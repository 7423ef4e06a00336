//! Task worker client
//!
//! A pull-based worker for the task queue: polls `tasks/handle` for a
//! named task, hands claims to a caller-supplied handler, and reports the
//! outcome through `tasks/<uuid>` with the claim's worker secret. The
//! secret is opaque to the worker and never logged.

use crate::error::{Error, Result};
use crate::protocol::{
    parse_request, Header, TaskHandleReply, TaskHandleRequest, TaskUpdateReply, TaskUpdateRequest,
    PROTOCOL_TASK_HANDLE, PROTOCOL_TASK_UPDATE,
};
use crate::types::TaskState;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// A claim as seen by the worker.
#[derive(Debug, Clone)]
pub struct WorkerTask {
    /// Task identifier
    pub uuid: String,
    /// Task name
    pub name: String,
    /// Caller-supplied parameters
    pub parameters: HashMap<String, String>,
    worker_secret: String,
}

/// HTTP client for the task endpoints.
pub struct TaskWorker {
    http_client: reqwest::Client,
    base_url: String,
    worker_name: String,
}

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    #[serde(flatten)]
    header: Header,
    #[serde(flatten)]
    body: T,
}

impl TaskWorker {
    /// Create a worker client against a server base URL, authenticating
    /// with an already-issued bearer token.
    pub fn new(base_url: &str, token: &str, worker_name: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = format!("Bearer {}", token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| Error::Worker(format!("invalid token: {}", e)))?,
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Worker(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            worker_name: worker_name.to_string(),
        })
    }

    async fn post_envelope<T: Serialize>(
        &self,
        url: &str,
        protocol: &str,
        body: T,
    ) -> Result<Vec<u8>> {
        let envelope = Envelope {
            header: Header::new(protocol),
            body,
        };

        let response = self
            .http_client
            .post(url)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| Error::Worker(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Worker(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::Worker(format!(
                "API error ({}): {}",
                status,
                String::from_utf8_lossy(&bytes)
            )));
        }

        Ok(bytes.to_vec())
    }

    /// Ask the queue for the most recent eligible task of a name.
    ///
    /// Returns `None` when the queue has nothing to hand out.
    pub async fn poll_once(&self, task_name: &str) -> Result<Option<WorkerTask>> {
        let url = format!("{}/tasks/handle", self.base_url);
        let body = self
            .post_envelope(
                &url,
                PROTOCOL_TASK_HANDLE,
                TaskHandleRequest {
                    name: task_name.to_string(),
                    worker: self.worker_name.clone(),
                },
            )
            .await?;

        let reply: TaskHandleReply = parse_request(&body, PROTOCOL_TASK_HANDLE)?;

        if reply.uuid.is_empty() {
            return Ok(None);
        }

        Ok(Some(WorkerTask {
            uuid: reply.uuid,
            name: reply.name,
            parameters: reply.parameters,
            worker_secret: reply.worker_secret,
        }))
    }

    /// Report a claimed task's outcome.
    pub async fn complete(
        &self,
        task: &WorkerTask,
        state: TaskState,
        results: HashMap<String, String>,
    ) -> Result<()> {
        let url = format!("{}/tasks/{}", self.base_url, task.uuid);
        let body = self
            .post_envelope(
                &url,
                PROTOCOL_TASK_UPDATE,
                TaskUpdateRequest {
                    status: state.as_str().to_string(),
                    worker_secret: task.worker_secret.clone(),
                    results,
                },
            )
            .await?;

        let _: TaskUpdateReply = parse_request(&body, PROTOCOL_TASK_UPDATE)?;
        Ok(())
    }

    /// Poll for tasks on an interval and run each claim through the
    /// handler. A handler error reports ERROR with empty results.
    pub async fn run<F>(&self, task_name: &str, interval: Duration, handler: F) -> Result<()>
    where
        F: Fn(&WorkerTask) -> Result<HashMap<String, String>>,
    {
        loop {
            match self.poll_once(task_name).await {
                Ok(Some(task)) => {
                    tracing::info!(task = %task.uuid, name = %task.name, "claimed task");
                    match handler(&task) {
                        Ok(results) => self.complete(&task, TaskState::Success, results).await?,
                        Err(err) => {
                            tracing::warn!(task = %task.uuid, error = %err, "task handler failed");
                            self.complete(&task, TaskState::Error, HashMap::new())
                                .await?;
                        }
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "task poll failed");
                }
            }

            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let worker = TaskWorker::new("http://localhost:8650/", "token", "w1").unwrap();
        assert_eq!(worker.base_url, "http://localhost:8650");
    }

    #[test]
    fn test_new_rejects_unprintable_token() {
        assert!(TaskWorker::new("http://localhost:8650", "bad\ntoken", "w1").is_err());
    }

    #[test]
    fn test_handle_envelope_shape() {
        let envelope = Envelope {
            header: Header::new(PROTOCOL_TASK_HANDLE),
            body: TaskHandleRequest {
                name: "build".to_string(),
                worker: "w1".to_string(),
            },
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["protocol"], PROTOCOL_TASK_HANDLE);
        assert_eq!(json["name"], "build");
        assert_eq!(json["worker"], "w1");
    }
}
