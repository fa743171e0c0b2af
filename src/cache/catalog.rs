use super::directory::{FetchResult, ResourceDirectory};
use crate::remote::{Project, RemoteClient, Task, TaskDetail, TaskSummary, User, Workspace};
use std::sync::Arc;

/// Entry counts per resource class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub workspaces: u64,
    pub projects: u64,
    pub task_listings: u64,
    pub tasks: u64,
    pub users: u64,
}

/// Point-in-time snapshot of the remote tree, materialized on first access.
///
/// Child sets are cached as whole listings so a caller sees either nothing or
/// the complete set, never a partial one.
pub struct Catalog {
    client: Arc<dyn RemoteClient>,
    workspaces: ResourceDirectory<(), Arc<Vec<Workspace>>>,
    projects: ResourceDirectory<String, Arc<Vec<Project>>>,
    task_listings: ResourceDirectory<String, Arc<Vec<TaskSummary>>>,
    tasks: ResourceDirectory<String, Arc<TaskDetail>>,
    users: ResourceDirectory<String, Arc<User>>,
}

impl Catalog {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self {
            client,
            workspaces: ResourceDirectory::new("workspaces"),
            projects: ResourceDirectory::new("projects"),
            task_listings: ResourceDirectory::new("task_listings"),
            tasks: ResourceDirectory::new("tasks"),
            users: ResourceDirectory::new("users"),
        }
    }

    pub async fn workspaces(&self) -> FetchResult<Arc<Vec<Workspace>>> {
        self.workspaces
            .get_or_fetch((), async { self.client.list_workspaces().await.map(Arc::new) })
            .await
    }

    pub async fn projects(&self, workspace_gid: &str) -> FetchResult<Arc<Vec<Project>>> {
        self.projects
            .get_or_fetch(workspace_gid.to_string(), async {
                self.client.list_projects(workspace_gid).await.map(Arc::new)
            })
            .await
    }

    pub async fn task_listing(&self, project_gid: &str) -> FetchResult<Arc<Vec<TaskSummary>>> {
        self.task_listings
            .get_or_fetch(project_gid.to_string(), async {
                self.client.list_tasks(project_gid).await.map(Arc::new)
            })
            .await
    }

    pub async fn user(&self, user_gid: &str) -> FetchResult<Arc<User>> {
        self.users
            .get_or_fetch(user_gid.to_string(), async {
                self.client.get_user(user_gid).await.map(Arc::new)
            })
            .await
    }

    pub async fn task_detail(&self, task_gid: &str) -> FetchResult<Arc<TaskDetail>> {
        self.tasks
            .get_or_fetch(task_gid.to_string(), async {
                self.client.get_task(task_gid).await.map(Arc::new)
            })
            .await
    }

    /// Fetch a task and resolve its assignee and followers. An identity that
    /// cannot be fetched is left out rather than failing the whole task.
    ///
    /// Only the raw record is cached here; identities go through the users
    /// directory on every call, so a user that failed to load is retried.
    pub async fn task(&self, task_gid: &str) -> FetchResult<Arc<Task>> {
        let detail = self.task_detail(task_gid).await?;

        let assignee = match detail.assignee.as_deref() {
            Some(gid) => self.resolve_user(task_gid, gid).await,
            None => None,
        };

        let mut followers = Vec::with_capacity(detail.followers.len());
        for gid in &detail.followers {
            if let Some(user) = self.resolve_user(task_gid, gid).await {
                followers.push(user);
            }
        }

        Ok(Arc::new(Task::from_detail(detail.as_ref().clone(), assignee, followers)))
    }

    async fn resolve_user(&self, task_gid: &str, user_gid: &str) -> Option<User> {
        match self.user(user_gid).await {
            Ok(user) => Some(user.as_ref().clone()),
            Err(e) => {
                tracing::warn!(
                    task = task_gid,
                    user = user_gid,
                    error = %e,
                    "treating unresolved user as absent"
                );
                None
            }
        }
    }

    /// Populate workspaces, their projects and every project's task listing.
    pub async fn warm(&self) -> FetchResult<CatalogStats> {
        tracing::info!("Eagerly populating cache");

        let workspaces = self.workspaces().await?;
        for workspace in workspaces.iter() {
            let projects = self.projects(&workspace.gid).await?;
            for project in projects.iter() {
                self.task_listing(&project.gid).await?;
            }
        }

        let stats = self.stats().await;
        tracing::info!(?stats, "Cache warm-up finished");
        Ok(stats)
    }

    pub async fn stats(&self) -> CatalogStats {
        let workspaces = match self.workspaces.get(&()).await {
            Some(list) => list.len() as u64,
            None => 0,
        };

        CatalogStats {
            workspaces,
            projects: self.projects.len().await,
            task_listings: self.task_listings.len().await,
            tasks: self.tasks.len().await,
            users: self.users.len().await,
        }
    }
}
