use crate::cache::Catalog;
use crate::fs::error::{FsError, FsResult};
use crate::fs::path::segment_name;
use crate::remote::{Project, TaskSummary, Workspace};
use std::sync::Arc;

/// What a path points at. Tasks are leaves; nothing lives below them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedNode {
    Root,
    Workspace(Workspace),
    Project { workspace: Workspace, project: Project },
    Task { project: Project, task: TaskSummary },
}

impl ResolvedNode {
    pub fn is_dir(&self) -> bool {
        !matches!(self, ResolvedNode::Task { .. })
    }
}

/// Walks catalog layers segment by segment, matching display names exactly
/// after `/` substitution.
/// When two siblings share a name the first one listed wins.
#[derive(Clone)]
pub struct PathResolver {
    catalog: Arc<Catalog>,
}

impl PathResolver {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub async fn resolve<S: AsRef<str>>(&self, segments: &[S]) -> FsResult<ResolvedNode> {
        let not_found = || {
            let joined: Vec<&str> = segments.iter().map(|s| s.as_ref()).collect();
            FsError::NotFound(format!("/{}", joined.join("/")))
        };

        match segments {
            [] => Ok(ResolvedNode::Root),
            [ws] => {
                let workspace = self.workspace(ws.as_ref()).await?.ok_or_else(not_found)?;
                Ok(ResolvedNode::Workspace(workspace))
            }
            [ws, proj] => {
                let workspace = self.workspace(ws.as_ref()).await?.ok_or_else(not_found)?;
                let project =
                    self.project(&workspace, proj.as_ref()).await?.ok_or_else(not_found)?;
                Ok(ResolvedNode::Project { workspace, project })
            }
            [ws, proj, task] => {
                let workspace = self.workspace(ws.as_ref()).await?.ok_or_else(not_found)?;
                let project =
                    self.project(&workspace, proj.as_ref()).await?.ok_or_else(not_found)?;
                let task = self.task(&project, task.as_ref()).await?.ok_or_else(not_found)?;
                Ok(ResolvedNode::Task { project, task })
            }
            _ => Err(not_found()),
        }
    }

    async fn workspace(&self, name: &str) -> FsResult<Option<Workspace>> {
        let workspaces = self.catalog.workspaces().await?;
        Ok(workspaces.iter().find(|w| segment_name(&w.name) == name).cloned())
    }

    async fn project(&self, workspace: &Workspace, name: &str) -> FsResult<Option<Project>> {
        let projects = self.catalog.projects(&workspace.gid).await?;
        Ok(projects.iter().find(|p| segment_name(&p.name) == name).cloned())
    }

    async fn task(&self, project: &Project, name: &str) -> FsResult<Option<TaskSummary>> {
        let tasks = self.catalog.task_listing(&project.gid).await?;
        Ok(tasks.iter().find(|t| segment_name(&t.name) == name).cloned())
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }
}
