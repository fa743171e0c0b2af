use serde::{Deserialize, Serialize};

/// Opaque identifier assigned by the remote service.
pub type Gid = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub gid: Gid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub gid: Gid,
    pub name: String,
    pub workspace_gid: Gid,
}

/// Compact task record as returned by a project listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub gid: Gid,
    pub name: String,
}

/// Full task record as returned by the remote service. User references are
/// still identifiers here; see [`Task`] for the resolved form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub gid: Gid,
    pub name: String,
    pub completed: bool,
    pub permalink_url: String,
    pub notes: String,
    pub assignee: Option<Gid>,
    pub followers: Vec<Gid>,
    pub due_on: Option<String>,
    pub created_at: String,
    pub modified_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub gid: Gid,
    pub name: String,
    pub email: Option<String>,
}

impl User {
    /// `Name <email>`, or just the name when the address is hidden.
    pub fn display(&self) -> String {
        match &self.email {
            Some(email) => format!("{} <{}>", self.name, email),
            None => self.name.clone(),
        }
    }
}

/// A task with its user references resolved. This is what gets cached and
/// rendered into file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub gid: Gid,
    pub name: String,
    pub done: bool,
    pub link: String,
    pub notes: String,
    pub assignee: Option<User>,
    pub followers: Vec<User>,
    pub due_on: Option<String>,
    pub created_at: String,
    pub modified_at: String,
}

impl Task {
    pub fn from_detail(detail: TaskDetail, assignee: Option<User>, followers: Vec<User>) -> Self {
        Self {
            gid: detail.gid,
            name: detail.name,
            done: detail.completed,
            link: detail.permalink_url,
            notes: detail.notes,
            assignee,
            followers,
            due_on: detail.due_on,
            created_at: detail.created_at,
            modified_at: detail.modified_at,
        }
    }
}
