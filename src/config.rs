use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CLICKUP_URL: &str = "https://api.clickup.com/api/v2";
/// ClickUp allows roughly 100 requests per minute per token; 0.66s keeps a margin.
const DEFAULT_REQUEST_DELAY_MS: u64 = 660;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Contents of `config.toml`. Every field is optional; environment variables
/// and CLI flags fill or override them in [`AppConfig::resolve`].
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub clickup: ClickUpSection,
    pub jira: JiraSection,
    pub mapping: MappingConfig,
    pub prompts: PromptConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ClickUpSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub request_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct JiraSection {
    /// Full base URL, or just the Atlassian Cloud site name.
    pub url: Option<String>,
    pub email: Option<String>,
    pub api_token: Option<String>,
    pub project: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ParentLink {
    /// Search the destination for an issue whose summary equals the parent title.
    Title,
    /// Use the issue created for the parent's source id; search by title only when unknown.
    #[default]
    SourceId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub default_type: String,
    pub default_status: String,
    pub parent_link: ParentLink,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            default_type: "Story".into(),
            default_status: "Open".into(),
            parent_link: ParentLink::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PromptConfig {
    /// Give up after this many invalid answers. Unset re-asks forever.
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClickUpConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub url: String,
    pub email: String,
    pub api_token: String,
    pub project: Option<String>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub clickup: ClickUpConfig,
    pub jira: JiraConfig,
    pub mapping: MappingConfig,
    pub prompts: PromptConfig,
    pub http: HttpConfig,
}

/// Resolved settings for `delete`.
#[derive(Debug, Clone)]
pub struct CleanupSettings {
    pub jira: JiraConfig,
    pub prompts: PromptConfig,
    pub http: HttpConfig,
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clickup-to-jira")
        .join("config.toml")
}

/// Load `path`, or the default location when `None`. A missing default file
/// is an empty config; a missing explicit file is an error.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (config_path(), false),
    };
    if !path.exists() {
        if explicit {
            bail!("Config file {} does not exist", path.display());
        }
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

impl AppConfig {
    /// Log level from `LOGGING_LEVEL`, falling back to the file.
    pub fn log_level(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        env("LOGGING_LEVEL").or_else(|| self.logging.level.clone())
    }

    /// JIRA connection from the environment, falling back to the file.
    pub fn resolve_jira(&self, env: impl Fn(&str) -> Option<String>) -> Result<JiraConfig> {
        let url = env("JIRA_URL").or_else(|| self.jira.url.clone());
        let email = env("JIRA_USER").or_else(|| self.jira.email.clone());
        let api_token = env("JIRA_API_KEY").or_else(|| self.jira.api_token.clone());

        let Some(url) = url.filter(|u| !u.is_empty()) else {
            bail!("Missing JIRA URL: set JIRA_URL or [jira] url");
        };
        let (Some(email), Some(api_token)) = (email, api_token) else {
            bail!("Missing JIRA credentials: set JIRA_USER and JIRA_API_KEY or [jira] email and api_token");
        };
        Ok(JiraConfig {
            url: jira_base_url(&url),
            email,
            api_token,
            project: env("JIRA_PROJECT").or_else(|| self.jira.project.clone()),
        })
    }

    /// Settings for `delete`, which only talks to JIRA.
    pub fn resolve_cleanup(self, env: impl Fn(&str) -> Option<String>) -> Result<CleanupSettings> {
        Ok(CleanupSettings {
            jira: self.resolve_jira(env)?,
            prompts: self.prompts,
            http: self.http,
        })
    }

    /// Merge environment variables over the file and check both sets of credentials.
    pub fn resolve(self, env: impl Fn(&str) -> Option<String>) -> Result<Settings> {
        let Some(api_key) = env("CLICKUP_API_KEY")
            .or_else(|| self.clickup.api_key.clone())
            .filter(|k| !k.is_empty())
        else {
            bail!("Missing ClickUp API key: set CLICKUP_API_KEY or [clickup] api_key");
        };
        let jira = self.resolve_jira(env)?;

        Ok(Settings {
            clickup: ClickUpConfig {
                api_key,
                base_url: self
                    .clickup
                    .base_url
                    .unwrap_or_else(|| DEFAULT_CLICKUP_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                request_delay: Duration::from_millis(
                    self.clickup.request_delay_ms.unwrap_or(DEFAULT_REQUEST_DELAY_MS),
                ),
            },
            jira,
            mapping: self.mapping,
            prompts: self.prompts,
            http: self.http,
        })
    }
}

/// Accept either a full URL or an Atlassian Cloud site name.
fn jira_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{url}.atlassian.net")
    }
}
