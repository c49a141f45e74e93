use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};

use crate::config::ParentLink;
use crate::convert::{convert, link_hierarchy};
use crate::mapping::MappingEngine;
use crate::model::ticket::Ticket;
use crate::order::order_for_creation;
use crate::providers::{Destination, Issue, NewIssue, Source, TaskScope};
use crate::resolve::{choose, Resolver};
use crate::selection::{resolve_scope, ScopeFilter};
use crate::util::pacer::Pacer;

/// Counts of what a run did. Partial success is normal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub fetched: usize,
    pub comment_fetch_failures: usize,
    pub created: usize,
    pub skipped_existing: usize,
    pub failed: usize,
    pub assign_failures: usize,
    pub transition_failures: usize,
    pub comments_posted: usize,
    pub comment_failures: usize,
}

impl MigrationReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            fetched: 0,
            comment_fetch_failures: 0,
            created: 0,
            skipped_existing: 0,
            failed: 0,
            assign_failures: 0,
            transition_failures: 0,
            comments_posted: 0,
            comment_failures: 0,
        }
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Fetched {} tickets: {} created, {} already present, {} failed",
            self.fetched, self.created, self.skipped_existing, self.failed
        )?;
        writeln!(
            f,
            "Comments: {} posted, {} failed to post, {} tickets with unreadable comments",
            self.comments_posted, self.comment_failures, self.comment_fetch_failures
        )?;
        write!(
            f,
            "Assignment failures: {}, transition failures: {}",
            self.assign_failures, self.transition_failures
        )?;
        if let Some(finished) = self.finished_at {
            let secs = (finished - self.started_at).num_seconds();
            write!(f, "\nStarted {}, took {secs}s", self.started_at.to_rfc3339())?;
        }
        Ok(())
    }
}

/// One migration run: owns the mapping state and the source id → issue table.
pub struct Migrator<'a> {
    source: &'a dyn Source,
    destination: &'a dyn Destination,
    resolver: &'a mut dyn Resolver,
    engine: MappingEngine,
    parent_link: ParentLink,
    pacer: Pacer,
    migrated: HashMap<String, Issue>,
    created_keys: HashSet<String>,
    report: MigrationReport,
}

impl<'a> Migrator<'a> {
    pub fn new(
        source: &'a dyn Source,
        destination: &'a dyn Destination,
        resolver: &'a mut dyn Resolver,
        engine: MappingEngine,
        parent_link: ParentLink,
        request_delay: Duration,
    ) -> Self {
        Self {
            source,
            destination,
            resolver,
            engine,
            parent_link,
            pacer: Pacer::new(request_delay),
            migrated: HashMap::new(),
            created_keys: HashSet::new(),
            report: MigrationReport::new(),
        }
    }

    pub fn report(&self) -> &MigrationReport {
        &self.report
    }

    /// Select the scope, fetch and convert its tasks, then create them in `project`
    /// (or a project chosen by the operator).
    pub async fn run(&mut self, filter: &ScopeFilter, project: Option<&str>) -> Result<MigrationReport> {
        let scope = resolve_scope(self.source, filter, &mut *self.resolver).await?;
        let tickets = self.fetch_tickets(&scope).await?;
        let project = self.resolve_project(project).await?;
        self.create_issues(tickets, &project).await?;
        self.report.finished_at = Some(Utc::now());
        Ok(self.report.clone())
    }

    /// Fetch every task of the scope with its comments and convert them.
    /// Comment requests are paced; a failed one leaves the task without comments.
    pub async fn fetch_tickets(&mut self, scope: &TaskScope) -> Result<Vec<Ticket>> {
        let mut tasks = self
            .source
            .list_tasks(scope)
            .await
            .with_context(|| format!("Failed to list {} tasks", self.source.name()))?;
        tracing::info!("fetched {} tasks from {}", tasks.len(), self.source.name());

        for task in &mut tasks {
            self.pacer.wait().await;
            tracing::info!("retrieving comments of {}", task.name);
            match self.source.fetch_comments(&task.id).await {
                Ok(comments) => task.comments = comments,
                Err(e) => {
                    tracing::warn!("could not fetch comments of {}: {e:#}", task.name);
                    self.report.comment_fetch_failures += 1;
                }
            }
        }

        let tickets: Vec<Ticket> = link_hierarchy(tasks).iter().map(convert).collect();
        self.report.fetched = tickets.len();
        Ok(tickets)
    }

    /// The configured project key, or one chosen among the destination's projects.
    pub async fn resolve_project(&mut self, configured: Option<&str>) -> Result<String> {
        if let Some(key) = configured {
            return Ok(key.to_string());
        }
        let projects = self
            .destination
            .projects()
            .await
            .context("Failed to list destination projects")?;
        for p in &projects {
            tracing::debug!("project {} ({}, id {})", p.key, p.name, p.id);
        }
        let keys: Vec<String> = projects.into_iter().map(|p| p.key).collect();
        if keys.is_empty() {
            bail!("{} has no projects to migrate into", self.destination.name());
        }
        Ok(choose(&mut *self.resolver, "destination project", &keys)?.to_string())
    }

    /// Build the type mapping, then create every ticket, parents first.
    pub async fn create_issues(&mut self, tickets: Vec<Ticket>, project: &str) -> Result<&MigrationReport> {
        let types = self
            .destination
            .issue_types(project)
            .await
            .with_context(|| format!("Failed to list issue types of {project}"))?;
        self.engine
            .build_type_mapping(&tickets, &types, &mut *self.resolver)
            .context("Failed to build the type mapping")?;

        for ticket in order_for_creation(tickets) {
            self.migrate_ticket(&ticket, project).await;
        }
        Ok(&self.report)
    }

    async fn migrate_ticket(&mut self, ticket: &Ticket, project: &str) {
        tracing::debug!(
            "migrating {} from {} into {project}",
            ticket.title,
            ticket.project.as_deref().unwrap_or("(no folder)")
        );
        match self.existing_issue(project, &ticket.title).await {
            Ok(Some(issue)) => {
                tracing::info!("{} already exists as {}, skipping", ticket.title, issue.key);
                self.migrated.insert(ticket.id.clone(), issue);
                self.report.skipped_existing += 1;
                return;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("could not check whether {} exists: {e:#}", ticket.title);
                self.report.failed += 1;
                return;
            }
        }

        let parent = self.parent_key(ticket, project).await;
        let Some(issue) = self.create_base_issue(ticket, project, parent).await else {
            self.report.failed += 1;
            return;
        };
        tracing::info!("created {} (id {}) for {}", issue.key, issue.id, ticket.title);
        self.report.created += 1;
        self.created_keys.insert(issue.key.clone());
        self.migrated.insert(ticket.id.clone(), issue.clone());

        if !self.assign_issue(&issue, ticket).await {
            self.report.assign_failures += 1;
        }
        if !self.transition_issue(&issue, ticket).await {
            self.report.transition_failures += 1;
        }
        self.add_comments(&issue, ticket).await;
    }

    /// First issue whose summary equals `title` exactly. With source-id parent
    /// linking, issues created by this run do not count, so equal titles in
    /// the source stay distinct issues.
    async fn existing_issue(&self, project: &str, title: &str) -> Result<Option<Issue>> {
        let hits = self.destination.find_by_title(project, title).await?;
        let mut exact = hits.into_iter().filter(|issue| {
            issue.summary == title
                && (self.parent_link == ParentLink::Title || !self.created_keys.contains(&issue.key))
        });
        let first = exact.next();
        if first.is_some() && exact.next().is_some() {
            tracing::debug!("several issues are titled {title:?}, using the first");
        }
        Ok(first)
    }

    async fn parent_key(&self, ticket: &Ticket, project: &str) -> Option<String> {
        let title = ticket.parent.as_deref()?;

        if self.parent_link == ParentLink::SourceId {
            if let Some(issue) = ticket.parent_id.as_ref().and_then(|id| self.migrated.get(id)) {
                return Some(issue.key.clone());
            }
        }

        let hits = match self.destination.find_by_title(project, title).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("could not look up parent {title} of {}: {e:#}", ticket.title);
                return None;
            }
        };
        match hits.into_iter().find(|issue| issue.summary == title) {
            Some(issue) => Some(issue.key),
            None => {
                tracing::warn!("parent {title} of {} not found, creating it unparented", ticket.title);
                None
            }
        }
    }

    async fn create_base_issue(&self, ticket: &Ticket, project: &str, parent: Option<String>) -> Option<Issue> {
        let new = NewIssue {
            project: project.to_string(),
            issue_type: self.engine.type_for(ticket),
            summary: ticket.title.clone(),
            description: ticket.description.clone(),
            parent,
        };
        match self.destination.create(&new).await {
            Ok(issue) => Some(issue),
            Err(e) => {
                tracing::warn!("could not create {}: {e:#}", ticket.title);
                None
            }
        }
    }

    /// Best effort; `false` when an assignee was wanted but not set.
    async fn assign_issue(&self, issue: &Issue, ticket: &Ticket) -> bool {
        let Some(email) = ticket.assignee.as_deref() else {
            return true;
        };
        let account = match self.destination.find_user(email).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                tracing::warn!("no {} user for {email}, {} stays unassigned", self.destination.name(), issue.key);
                return false;
            }
            Err(e) => {
                tracing::warn!("could not look up {email}: {e:#}");
                return false;
            }
        };
        match self.destination.assign(issue, &account).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("could not assign {} to {email}: {e:#}", issue.key);
                false
            }
        }
    }

    /// Move the issue to the status mapped from the ticket's status.
    /// `false` when a wanted transition did not happen.
    async fn transition_issue(&mut self, issue: &Issue, ticket: &Ticket) -> bool {
        let transitions = match self.destination.transitions(issue).await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("could not list transitions of {}: {e:#}", issue.key);
                return false;
            }
        };
        let mut targets: Vec<String> = Vec::new();
        for t in &transitions {
            if !targets.contains(&t.to) {
                targets.push(t.to.clone());
            }
        }

        let target = match self.engine.resolve_status(
            &issue.issue_type,
            &ticket.status,
            &targets,
            &mut *self.resolver,
        ) {
            Ok(Some(target)) => target,
            Ok(None) => {
                tracing::debug!("{} keeps its initial status", issue.key);
                return true;
            }
            Err(e) => {
                tracing::warn!("could not map status {:?} of {}: {e}", ticket.status, issue.key);
                return false;
            }
        };

        let Some(transition) = transitions.iter().find(|t| t.to == target) else {
            return false;
        };
        tracing::debug!("applying {:?} to {}", transition.name, issue.key);
        match self.destination.transition(issue, transition).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("could not move {} to {target}: {e:#}", issue.key);
                false
            }
        }
    }

    async fn add_comments(&mut self, issue: &Issue, ticket: &Ticket) {
        for comment in &ticket.comments {
            let Some(body) = comment.attributed_text() else {
                tracing::debug!("skipping empty comment {}", comment.id);
                continue;
            };
            match self.destination.add_comment(issue, &body).await {
                Ok(()) => self.report.comments_posted += 1,
                Err(e) => {
                    tracing::warn!("could not add comment {} to {}: {e:#}", comment.id, issue.key);
                    self.report.comment_failures += 1;
                }
            }
        }
    }
}
