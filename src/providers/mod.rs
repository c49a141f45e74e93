pub mod clickup;
pub mod jira;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{ClickUpConfig, HttpConfig, JiraConfig};
use crate::model::ticket::Comment;

/// A named node of the source hierarchy (team, space, folder or list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    pub name: String,
}

/// Where tasks are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskScope {
    /// Every list of a folder.
    Folder(Container),
    List(Container),
}

/// A task as decoded from the source, before conversion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceTask {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: String,
    pub tags: Vec<String>,
    /// Assignee emails, in source order.
    pub assignees: Vec<String>,
    /// Source id of the parent task.
    pub parent: Option<String>,
    pub folder: Option<String>,
    pub comments: Vec<Comment>,
    /// Filled by hierarchy linking.
    pub parent_title: Option<String>,
    pub subtasks: Vec<SourceTask>,
}

#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;
    async fn teams(&self) -> Result<Vec<Container>>;
    async fn spaces(&self, team: &Container) -> Result<Vec<Container>>;
    async fn folders(&self, space: &Container) -> Result<Vec<Container>>;
    async fn lists(&self, folder: &Container) -> Result<Vec<Container>>;
    /// All tasks of the scope, closed ones and subtasks included.
    async fn list_tasks(&self, scope: &TaskScope) -> Result<Vec<SourceTask>>;
    /// Comments of a task. An unstructured response yields an empty list.
    async fn fetch_comments(&self, task_id: &str) -> Result<Vec<Comment>>;
}

/// An issue that exists on the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub id: String,
    pub key: String,
    pub summary: String,
    pub issue_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub id: String,
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    pub name: String,
    /// Name of the status the transition leads to.
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub project: String,
    pub issue_type: String,
    pub summary: String,
    pub description: String,
    /// Key of the parent issue.
    pub parent: Option<String>,
}

#[async_trait]
pub trait Destination: Send + Sync {
    fn name(&self) -> &str;
    async fn projects(&self) -> Result<Vec<ProjectInfo>>;
    /// Issue type names available in the project, standard types before sub-task types.
    async fn issue_types(&self, project: &str) -> Result<Vec<String>>;
    /// Full-text summary search. Hits are not guaranteed to match exactly.
    async fn find_by_title(&self, project: &str, title: &str) -> Result<Vec<Issue>>;
    async fn create(&self, issue: &NewIssue) -> Result<Issue>;
    /// Account id of the user with this email, if any.
    async fn find_user(&self, email: &str) -> Result<Option<String>>;
    async fn assign(&self, issue: &Issue, account_id: &str) -> Result<()>;
    async fn transitions(&self, issue: &Issue) -> Result<Vec<Transition>>;
    async fn transition(&self, issue: &Issue, transition: &Transition) -> Result<()>;
    async fn add_comment(&self, issue: &Issue, text: &str) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}


pub fn create_source(config: &ClickUpConfig, http: &HttpConfig) -> Result<Box<dyn Source>> {
    Ok(Box::new(clickup::ClickUpClient::new(
        config.base_url.clone(),
        config.api_key.clone(),
        http,
    )?))
}

pub fn create_destination(config: &JiraConfig, http: &HttpConfig) -> Result<Box<dyn Destination>> {
    Ok(Box::new(jira::JiraClient::new(
        config.url.clone(),
        config.email.clone(),
        config.api_token.clone(),
        http,
    )?))
}
