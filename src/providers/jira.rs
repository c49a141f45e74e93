use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Destination, Issue, NewIssue, ProjectInfo, Transition};
use crate::config::HttpConfig;
use crate::util::adf::document_from_text;

const SEARCH_LIMIT: u32 = 50;

pub struct JiraClient {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

impl JiraClient {
    pub fn new(base_url: String, email: String, api_token: String, http: &HttpConfig) -> Result<Self> {
        let creds = format!("{email}:{api_token}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        let client = reqwest::Client::builder()
            .timeout(http.timeout())
            .build()
            .context("Failed to build JIRA HTTP client")?;
        Ok(Self {
            base_url,
            auth_header: format!("Basic {encoded}"),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/api/3/{path}", self.base_url)
    }

    async fn send(&self, req: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let resp = req
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("JIRA {what} request failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("JIRA {what} returned {status}: {body}");
        }
        Ok(resp)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let resp = self.send(self.client.get(self.url(path)), what).await?;
        resp.json()
            .await
            .with_context(|| format!("Failed to parse JIRA {what} response"))
    }
}

#[derive(Deserialize)]
struct ProjectResponse {
    id: String,
    key: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectDetail {
    #[serde(default)]
    issue_types: Vec<IssueTypeField>,
}

#[derive(Deserialize)]
struct IssueTypeField {
    name: String,
    #[serde(default)]
    subtask: bool,
}

/// Distinct type names, standard types before sub-task types.
fn issue_type_names(types: Vec<IssueTypeField>) -> Vec<String> {
    let (standard, subtasks): (Vec<_>, Vec<_>) = types.into_iter().partition(|t| !t.subtask);
    let mut names: Vec<String> = Vec::new();
    for t in standard.into_iter().chain(subtasks) {
        if !names.contains(&t.name) {
            names.push(t.name);
        }
    }
    names
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

#[derive(Deserialize)]
struct JiraIssue {
    id: String,
    key: String,
    fields: IssueFields,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueFields {
    summary: Option<String>,
    issuetype: Option<IssueTypeField>,
}

impl From<JiraIssue> for Issue {
    fn from(issue: JiraIssue) -> Self {
        Issue {
            id: issue.id,
            key: issue.key,
            summary: issue.fields.summary.unwrap_or_default(),
            issue_type: issue.fields.issuetype.map(|t| t.name).unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct CreatedIssue {
    id: String,
    key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    account_id: String,
}

#[derive(Deserialize)]
struct TransitionsResponse {
    #[serde(default)]
    transitions: Vec<TransitionField>,
}

#[derive(Deserialize)]
struct TransitionField {
    id: String,
    name: String,
    to: StatusField,
}

#[derive(Deserialize)]
struct StatusField {
    name: String,
}

/// JQL for a summary search within a project.
pub fn summary_jql(project: &str, title: &str) -> String {
    format!(
        "project = \"{}\" AND summary ~ \"{}\"",
        escape_jql(project),
        escape_jql(title)
    )
}

fn escape_jql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Request body for issue creation.
pub fn create_payload(issue: &NewIssue) -> Value {
    let mut fields = json!({
        "project": { "key": issue.project },
        "issuetype": { "name": issue.issue_type },
        "summary": issue.summary,
        "description": document_from_text(&issue.description),
    });
    if let Some(parent) = &issue.parent {
        fields["parent"] = json!({ "key": parent });
    }
    json!({ "fields": fields })
}

#[async_trait]
impl Destination for JiraClient {
    fn name(&self) -> &str {
        "JIRA"
    }

    async fn projects(&self) -> Result<Vec<ProjectInfo>> {
        let projects: Vec<ProjectResponse> = self.get("project", "project listing").await?;
        Ok(projects
            .into_iter()
            .map(|p| ProjectInfo {
                id: p.id,
                key: p.key,
                name: p.name,
            })
            .collect())
    }

    async fn issue_types(&self, project: &str) -> Result<Vec<String>> {
        let path = format!("project/{}", urlencoding::encode(project));
        let detail: ProjectDetail = self.get(&path, "project detail").await?;
        Ok(issue_type_names(detail.issue_types))
    }

    async fn find_by_title(&self, project: &str, title: &str) -> Result<Vec<Issue>> {
        let path = format!(
            "search/jql?jql={}&maxResults={SEARCH_LIMIT}&fields=summary,issuetype",
            urlencoding::encode(&summary_jql(project, title))
        );
        let search: SearchResponse = self.get(&path, "search").await?;
        Ok(search.issues.into_iter().map(Issue::from).collect())
    }

    async fn create(&self, issue: &NewIssue) -> Result<Issue> {
        let req = self.client.post(self.url("issue")).json(&create_payload(issue));
        let created: CreatedIssue = self
            .send(req, "issue creation")
            .await?
            .json()
            .await
            .context("Failed to parse JIRA issue creation response")?;
        Ok(Issue {
            id: created.id,
            key: created.key,
            summary: issue.summary.clone(),
            issue_type: issue.issue_type.clone(),
        })
    }

    async fn find_user(&self, email: &str) -> Result<Option<String>> {
        let path = format!("user/search?query={}", urlencoding::encode(email));
        let users: Vec<UserResponse> = self.get(&path, "user search").await?;
        Ok(users.into_iter().next().map(|u| u.account_id))
    }

    async fn assign(&self, issue: &Issue, account_id: &str) -> Result<()> {
        let req = self
            .client
            .put(self.url(&format!("issue/{}/assignee", issue.key)))
            .json(&json!({ "accountId": account_id }));
        self.send(req, "assignment").await?;
        Ok(())
    }

    async fn transitions(&self, issue: &Issue) -> Result<Vec<Transition>> {
        let path = format!("issue/{}/transitions", issue.key);
        let resp: TransitionsResponse = self.get(&path, "transition listing").await?;
        Ok(resp
            .transitions
            .into_iter()
            .map(|t| Transition {
                id: t.id,
                name: t.name,
                to: t.to.name,
            })
            .collect())
    }

    async fn transition(&self, issue: &Issue, transition: &Transition) -> Result<()> {
        let req = self
            .client
            .post(self.url(&format!("issue/{}/transitions", issue.key)))
            .json(&json!({ "transition": { "id": transition.id } }));
        self.send(req, "transition").await?;
        Ok(())
    }

    async fn add_comment(&self, issue: &Issue, text: &str) -> Result<()> {
        let req = self
            .client
            .post(self.url(&format!("issue/{}/comment", issue.key)))
            .json(&json!({ "body": document_from_text(text) }));
        self.send(req, "comment").await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let req = self.client.delete(self.url(&format!("issue/{key}")));
        self.send(req, "deletion").await?;
        Ok(())
    }
}
