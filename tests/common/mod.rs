#![allow(dead_code)]

use asanafs::cache::Catalog;
use asanafs::fuse::AsanaBackend;
use asanafs::remote::{
    Project, RemoteClient, RemoteError, RemoteResult, TaskDetail, TaskSummary, User, Workspace,
};
use asanafs::render::TaskRenderer;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Remote call counters, one per endpoint.
#[derive(Debug, Default)]
pub struct Calls {
    pub workspaces: AtomicUsize,
    pub projects: AtomicUsize,
    pub task_listings: AtomicUsize,
    pub tasks: AtomicUsize,
    pub users: AtomicUsize,
}

impl Calls {
    pub fn total(&self) -> usize {
        self.workspaces.load(Ordering::SeqCst)
            + self.projects.load(Ordering::SeqCst)
            + self.task_listings.load(Ordering::SeqCst)
            + self.tasks.load(Ordering::SeqCst)
            + self.users.load(Ordering::SeqCst)
    }
}

/// In-memory remote tree with call counting, optional latency and injected
/// workspace-listing failures.
#[derive(Default)]
pub struct FakeRemote {
    workspaces: Vec<Workspace>,
    projects: HashMap<String, Vec<Project>>,
    task_listings: HashMap<String, Vec<TaskSummary>>,
    tasks: HashMap<String, TaskDetail>,
    users: HashMap<String, User>,
    delay: Duration,
    failures_left: AtomicUsize,
    pub calls: Calls,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workspace(mut self, gid: &str, name: &str) -> Self {
        self.workspaces.push(Workspace { gid: gid.to_string(), name: name.to_string() });
        self
    }

    pub fn project(mut self, workspace_gid: &str, gid: &str, name: &str) -> Self {
        self.projects.entry(workspace_gid.to_string()).or_default().push(Project {
            gid: gid.to_string(),
            name: name.to_string(),
            workspace_gid: workspace_gid.to_string(),
        });
        self
    }

    pub fn task(mut self, project_gid: &str, detail: TaskDetail) -> Self {
        self.task_listings
            .entry(project_gid.to_string())
            .or_default()
            .push(TaskSummary { gid: detail.gid.clone(), name: detail.name.clone() });
        self.tasks.insert(detail.gid.clone(), detail);
        self
    }

    pub fn user(mut self, gid: &str, name: &str, email: &str) -> Self {
        let user = User { gid: gid.to_string(), name: name.to_string(), email: Some(email.into()) };
        self.users.insert(gid.to_string(), user);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the next `n` workspace listings.
    pub fn failing_workspaces(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    async fn latency(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

fn missing(kind: &str, gid: &str) -> RemoteError {
    RemoteError::Status { status: 404, body: format!("{} {} not found", kind, gid) }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn list_workspaces(&self) -> RemoteResult<Vec<Workspace>> {
        self.calls.workspaces.fetch_add(1, Ordering::SeqCst);
        self.latency().await;
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RemoteError::Timeout);
        }
        Ok(self.workspaces.clone())
    }

    async fn list_projects(&self, workspace_gid: &str) -> RemoteResult<Vec<Project>> {
        self.calls.projects.fetch_add(1, Ordering::SeqCst);
        self.latency().await;
        Ok(self.projects.get(workspace_gid).cloned().unwrap_or_default())
    }

    async fn list_tasks(&self, project_gid: &str) -> RemoteResult<Vec<TaskSummary>> {
        self.calls.task_listings.fetch_add(1, Ordering::SeqCst);
        self.latency().await;
        Ok(self.task_listings.get(project_gid).cloned().unwrap_or_default())
    }

    async fn get_task(&self, task_gid: &str) -> RemoteResult<TaskDetail> {
        self.calls.tasks.fetch_add(1, Ordering::SeqCst);
        self.latency().await;
        self.tasks.get(task_gid).cloned().ok_or_else(|| missing("task", task_gid))
    }

    async fn get_user(&self, user_gid: &str) -> RemoteResult<User> {
        self.calls.users.fetch_add(1, Ordering::SeqCst);
        self.latency().await;
        self.users.get(user_gid).cloned().ok_or_else(|| missing("user", user_gid))
    }
}

pub const PACK_LISTS_NOTES: &str = "Tent, stove, filter and two headlamps ok";

pub fn detail(gid: &str, name: &str, notes: &str) -> TaskDetail {
    TaskDetail {
        gid: gid.to_string(),
        name: name.to_string(),
        completed: false,
        permalink_url: format!("https://app.asana.com/0/p1/{}", gid),
        notes: notes.to_string(),
        assignee: Some("u1".to_string()),
        followers: vec!["u1".to_string()],
        due_on: Some("2024-06-10".to_string()),
        created_at: "2024-06-01T08:00:00.000Z".to_string(),
        modified_at: "2024-06-02T11:30:00.000Z".to_string(),
    }
}

/// "My workspace" / "burn" / "Pack lists", plus an empty second workspace.
pub fn burn_tree() -> FakeRemote {
    FakeRemote::new()
        .workspace("w1", "My workspace")
        .workspace("w2", "Archive")
        .project("w1", "p1", "burn")
        .task("p1", detail("t1", "Pack lists", PACK_LISTS_NOTES))
        .user("u1", "Alice", "alice@example.com")
}

pub fn backend(remote: Arc<FakeRemote>) -> AsanaBackend {
    AsanaBackend::new(Arc::new(Catalog::new(remote)), TaskRenderer::default())
}
