// Remote service capability
//
// The projection core only ever talks to the remote service through the
// RemoteClient trait. AsanaHttpClient is the production implementation.

pub mod http;
pub mod models;

use async_trait::async_trait;
#[cfg(any(test, feature = "mockall"))]
use mockall::automock;

pub use http::AsanaHttpClient;
pub use models::{Gid, Project, Task, TaskDetail, TaskSummary, User, Workspace};

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors raised by a remote fetch. These are never cached.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("Remote returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid access token")]
    InvalidToken,
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout
        } else if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Http(err.to_string())
        }
    }
}

#[cfg_attr(any(test, feature = "mockall"), automock)]
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn list_workspaces(&self) -> RemoteResult<Vec<Workspace>>;
    async fn list_projects(&self, workspace_gid: &str) -> RemoteResult<Vec<Project>>;
    async fn list_tasks(&self, project_gid: &str) -> RemoteResult<Vec<TaskSummary>>;
    async fn get_task(&self, task_gid: &str) -> RemoteResult<TaskDetail>;
    async fn get_user(&self, user_gid: &str) -> RemoteResult<User>;
}
