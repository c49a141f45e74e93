use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::{Container, Source, SourceTask, TaskScope};
use crate::config::HttpConfig;
use crate::model::ticket::Comment;

pub struct ClickUpClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl ClickUpClient {
    pub fn new(base_url: String, api_key: String, http: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(http.timeout())
            .build()
            .context("Failed to build ClickUp HTTP client")?;
        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    async fn get_value(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}/{path}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("Authorization", &self.api_key)
            .query(query)
            .send()
            .await
            .with_context(|| format!("ClickUp request to {path} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("ClickUp {path} returned {status}: {body}");
        }
        resp.json()
            .await
            .with_context(|| format!("Failed to parse ClickUp response from {path}"))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let value = self.get_value(path, query).await?;
        serde_json::from_value(value)
            .with_context(|| format!("Unexpected ClickUp payload from {path}"))
    }

    async fn list_tasks_of(&self, list: &Container) -> Result<Vec<SourceTask>> {
        let path = format!("list/{}/task", list.id);
        let mut tasks = Vec::new();
        let mut page = 0u32;
        loop {
            let page_str = page.to_string();
            let resp: TasksResponse = self
                .get(
                    &path,
                    &[
                        ("include_closed", "true"),
                        ("subtasks", "true"),
                        ("page", page_str.as_str()),
                    ],
                )
                .await?;
            let count = resp.tasks.len();
            tracing::debug!("list {} page {page}: {count} tasks", list.name);
            tasks.extend(resp.tasks.into_iter().map(SourceTask::from));

            let last = resp.last_page.unwrap_or(count < PAGE_SIZE);
            if last || count == 0 {
                break;
            }
            page += 1;
        }
        Ok(tasks)
    }
}

const PAGE_SIZE: usize = 100;

#[derive(Deserialize)]
struct TeamsResponse {
    teams: Vec<Named>,
}

#[derive(Deserialize)]
struct SpacesResponse {
    spaces: Vec<Named>,
}

#[derive(Deserialize)]
struct FoldersResponse {
    folders: Vec<Named>,
}

#[derive(Deserialize)]
struct ListsResponse {
    lists: Vec<Named>,
}

#[derive(Deserialize)]
struct Named {
    id: String,
    name: String,
}

impl From<Named> for Container {
    fn from(n: Named) -> Self {
        Container {
            id: n.id,
            name: n.name,
        }
    }
}

#[derive(Deserialize)]
struct TasksResponse {
    #[serde(default)]
    tasks: Vec<ClickUpTask>,
    last_page: Option<bool>,
}

#[derive(Deserialize)]
struct ClickUpTask {
    id: String,
    name: String,
    description: Option<String>,
    status: Option<TaskStatus>,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    assignees: Vec<User>,
    parent: Option<String>,
    folder: Option<FolderRef>,
}

#[derive(Deserialize)]
struct TaskStatus {
    status: String,
}

#[derive(Deserialize)]
struct Tag {
    name: String,
}

#[derive(Deserialize)]
struct User {
    email: Option<String>,
}

#[derive(Deserialize)]
struct FolderRef {
    name: Option<String>,
}

impl From<ClickUpTask> for SourceTask {
    fn from(task: ClickUpTask) -> Self {
        SourceTask {
            id: task.id,
            name: task.name,
            description: task.description.unwrap_or_default(),
            status: task.status.map(|s| s.status).unwrap_or_default(),
            tags: task.tags.into_iter().map(|t| t.name).collect(),
            assignees: task.assignees.into_iter().filter_map(|u| u.email).collect(),
            parent: task.parent,
            folder: task.folder.and_then(|f| f.name),
            ..SourceTask::default()
        }
    }
}

#[derive(Deserialize)]
struct ClickUpComment {
    id: Value,
    comment_text: Option<String>,
    user: Option<User>,
}

/// Decode a comment listing. Anything other than an object with a
/// `comments` array is treated as "no comments".
pub fn parse_comments(value: &Value) -> Vec<Comment> {
    let Some(raw) = value.as_object().and_then(|o| o.get("comments")) else {
        return Vec::new();
    };
    let Ok(comments) = Vec::<ClickUpComment>::deserialize(raw) else {
        tracing::warn!("ignoring malformed ClickUp comment listing");
        return Vec::new();
    };

    comments
        .into_iter()
        .map(|c| Comment {
            id: match c.id {
                Value::String(s) => s,
                other => other.to_string(),
            },
            text: c.comment_text,
            commenter: c.user.and_then(|u| u.email).unwrap_or_default(),
        })
        .collect()
}

#[async_trait]
impl Source for ClickUpClient {
    fn name(&self) -> &str {
        "ClickUp"
    }

    async fn teams(&self) -> Result<Vec<Container>> {
        let resp: TeamsResponse = self.get("team", &[]).await?;
        Ok(resp.teams.into_iter().map(Container::from).collect())
    }

    async fn spaces(&self, team: &Container) -> Result<Vec<Container>> {
        let resp: SpacesResponse = self
            .get(&format!("team/{}/space", team.id), &[("archived", "false")])
            .await?;
        Ok(resp.spaces.into_iter().map(Container::from).collect())
    }

    async fn folders(&self, space: &Container) -> Result<Vec<Container>> {
        let resp: FoldersResponse = self
            .get(&format!("space/{}/folder", space.id), &[("archived", "false")])
            .await?;
        Ok(resp.folders.into_iter().map(Container::from).collect())
    }

    async fn lists(&self, folder: &Container) -> Result<Vec<Container>> {
        let resp: ListsResponse = self
            .get(&format!("folder/{}/list", folder.id), &[("archived", "false")])
            .await?;
        Ok(resp.lists.into_iter().map(Container::from).collect())
    }

    async fn list_tasks(&self, scope: &TaskScope) -> Result<Vec<SourceTask>> {
        match scope {
            TaskScope::List(list) => self.list_tasks_of(list).await,
            TaskScope::Folder(folder) => {
                let mut tasks = Vec::new();
                for list in self.lists(folder).await? {
                    tasks.extend(self.list_tasks_of(&list).await?);
                }
                Ok(tasks)
            }
        }
    }

    async fn fetch_comments(&self, task_id: &str) -> Result<Vec<Comment>> {
        let value = self
            .get_value(&format!("task/{task_id}/comment"), &[])
            .await?;
        Ok(parse_comments(&value))
    }
}
