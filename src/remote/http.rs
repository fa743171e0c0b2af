// Asana REST client
//
// Speaks the `{"data": ...}` envelope of the Asana API and walks offset
// pagination for list endpoints.

use super::models::{Project, TaskDetail, TaskSummary, User, Workspace};
use super::{RemoteClient, RemoteError, RemoteResult};
use crate::config::RemoteConfig;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const TASK_FIELDS: &str =
    "name,completed,permalink_url,notes,assignee,followers,due_on,created_at,modified_at";
const USER_FIELDS: &str = "name,email";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
    #[serde(default)]
    next_page: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
struct NextPage {
    offset: String,
}

#[derive(Debug, Deserialize)]
struct Compact {
    gid: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireTask {
    gid: String,
    name: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    permalink_url: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    assignee: Option<Compact>,
    #[serde(default)]
    followers: Vec<Compact>,
    #[serde(default)]
    due_on: Option<String>,
    created_at: String,
    modified_at: String,
}

impl From<WireTask> for TaskDetail {
    fn from(wire: WireTask) -> Self {
        Self {
            gid: wire.gid,
            name: wire.name,
            completed: wire.completed,
            permalink_url: wire.permalink_url.unwrap_or_default(),
            notes: wire.notes.unwrap_or_default(),
            assignee: wire.assignee.map(|a| a.gid),
            followers: wire.followers.into_iter().map(|f| f.gid).collect(),
            due_on: wire.due_on,
            created_at: wire.created_at,
            modified_at: wire.modified_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireUser {
    gid: String,
    name: String,
    #[serde(default)]
    email: Option<String>,
}

pub struct AsanaHttpClient {
    http: Client,
    base_url: String,
    page_size: u32,
}

impl AsanaHttpClient {
    pub fn new(token: &str, config: &RemoteConfig) -> RemoteResult<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| RemoteError::InvalidToken)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("asanafs/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> RemoteResult<Envelope<T>> {
        let url = self.url(path);
        tracing::debug!(%url, ?query, "GET");

        let response = self.http.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status { status: status.as_u16(), body });
        }

        Ok(response.json::<Envelope<T>>().await?)
    }

    async fn get_one<T: DeserializeOwned>(&self, path: &str, fields: &str) -> RemoteResult<T> {
        let envelope = self.fetch::<T>(path, &[("opt_fields", fields.to_string())]).await?;
        Ok(envelope.data)
    }

    /// Follow `next_page.offset` until the listing is exhausted.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> RemoteResult<Vec<T>> {
        let mut items = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut params: Vec<(&str, String)> = query.to_vec();
            params.push(("limit", self.page_size.to_string()));
            if let Some(ref token) = offset {
                params.push(("offset", token.clone()));
            }

            let page = self.fetch::<Vec<T>>(path, &params).await?;
            items.extend(page.data);

            match page.next_page {
                Some(next) => offset = Some(next.offset),
                None => break,
            }
        }

        Ok(items)
    }
}

fn named(compact: Compact) -> (String, String) {
    let name = compact.name.unwrap_or_default();
    (compact.gid, name)
}

#[async_trait]
impl RemoteClient for AsanaHttpClient {
    async fn list_workspaces(&self) -> RemoteResult<Vec<Workspace>> {
        let items: Vec<Compact> =
            self.get_all("workspaces", &[("opt_fields", "name".to_string())]).await?;
        Ok(items
            .into_iter()
            .map(named)
            .map(|(gid, name)| Workspace { gid, name })
            .collect())
    }

    async fn list_projects(&self, workspace_gid: &str) -> RemoteResult<Vec<Project>> {
        let items: Vec<Compact> = self
            .get_all(
                "projects",
                &[("workspace", workspace_gid.to_string()), ("opt_fields", "name".to_string())],
            )
            .await?;
        Ok(items
            .into_iter()
            .map(named)
            .map(|(gid, name)| Project { gid, name, workspace_gid: workspace_gid.to_string() })
            .collect())
    }

    async fn list_tasks(&self, project_gid: &str) -> RemoteResult<Vec<TaskSummary>> {
        let path = format!("projects/{}/tasks", project_gid);
        let items: Vec<Compact> =
            self.get_all(&path, &[("opt_fields", "name".to_string())]).await?;
        Ok(items
            .into_iter()
            .map(named)
            .map(|(gid, name)| TaskSummary { gid, name })
            .collect())
    }

    async fn get_task(&self, task_gid: &str) -> RemoteResult<TaskDetail> {
        let wire: WireTask = self.get_one(&format!("tasks/{}", task_gid), TASK_FIELDS).await?;
        Ok(wire.into())
    }

    async fn get_user(&self, user_gid: &str) -> RemoteResult<User> {
        let wire: WireUser = self.get_one(&format!("users/{}", user_gid), USER_FIELDS).await?;
        Ok(User { gid: wire.gid, name: wire.name, email: wire.email })
    }
}
