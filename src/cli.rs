use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::cleanup;
use crate::config::{CleanupSettings, ParentLink, Settings};
use crate::mapping::MappingEngine;
use crate::migrate::Migrator;
use crate::providers;
use crate::resolve::{Resolver, ScriptedResolver, TerminalResolver};
use crate::selection::ScopeFilter;

#[derive(Parser, Debug)]
#[command(name = "migrate-to-jira")]
#[command(version, about = "Move ClickUp tasks into a JIRA project")]
pub struct Cli {
    /// Config file (default: <config dir>/clickup-to-jira/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Read operator answers from a file, one per line, instead of the terminal
    #[arg(long, global = true, value_name = "FILE")]
    pub answers: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy tasks of a ClickUp folder or list into JIRA
    Migrate(MigrateArgs),
    /// Delete a range of JIRA issues, e.g. after a test migration
    Delete(DeleteArgs),
}

/// Name filters are substring matches; a level left out is asked for.
#[derive(Args, Debug, Default)]
pub struct MigrateArgs {
    /// ClickUp team (workspace)
    #[arg(long)]
    pub team: Option<String>,

    /// ClickUp space
    #[arg(long)]
    pub space: Option<String>,

    /// ClickUp project (folder)
    #[arg(long)]
    pub project: Option<String>,

    /// ClickUp list inside the project
    #[arg(long)]
    pub list: Option<String>,

    /// JIRA project key to create issues in
    #[arg(long, value_name = "KEY")]
    pub jira_project: Option<String>,

    /// How children find their parent issue
    #[arg(long, value_enum)]
    pub parent_link: Option<ParentLink>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// JIRA project key
    #[arg(long, value_name = "KEY")]
    pub project: String,

    /// First issue number to delete
    #[arg(long)]
    pub from: u32,

    /// Issue number to stop before
    #[arg(long)]
    pub to: u32,
}

impl Cli {
    /// Log level implied by `-v` flags, if any.
    pub fn verbosity_level(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}

fn operator(answers: Option<&Path>, max_attempts: Option<u32>) -> Result<Box<dyn Resolver>> {
    match answers {
        Some(path) => {
            let scripted = ScriptedResolver::from_file(path)
                .with_context(|| format!("Failed to read answers from {}", path.display()))?;
            Ok(Box::new(scripted))
        }
        None => Ok(Box::new(TerminalResolver::new(max_attempts))),
    }
}

/// Run `migrate` against the configured ClickUp and JIRA accounts.
pub async fn handle_migrate(args: MigrateArgs, settings: Settings, answers: Option<&Path>) -> Result<()> {
    let source = providers::create_source(&settings.clickup, &settings.http)?;
    let destination = providers::create_destination(&settings.jira, &settings.http)?;
    let mut resolver = operator(answers, settings.prompts.max_attempts)?;

    let engine = MappingEngine::new(
        settings.mapping.default_type.clone(),
        settings.mapping.default_status.clone(),
    );
    let parent_link = args.parent_link.unwrap_or(settings.mapping.parent_link);
    let filter = ScopeFilter {
        team: args.team,
        space: args.space,
        project: args.project,
        list: args.list,
    };
    let project = args.jira_project.or(settings.jira.project);

    let mut migrator = Migrator::new(
        source.as_ref(),
        destination.as_ref(),
        resolver.as_mut(),
        engine,
        parent_link,
        settings.clickup.request_delay,
    );
    let report = migrator.run(&filter, project.as_deref()).await?;
    println!("{report}");
    Ok(())
}

/// Run `delete` for `{project}-{from}` up to, not including, `{project}-{to}`.
pub async fn handle_delete(args: DeleteArgs, settings: CleanupSettings, answers: Option<&Path>) -> Result<()> {
    let destination = providers::create_destination(&settings.jira, &settings.http)?;
    let mut resolver = operator(answers, settings.prompts.max_attempts)?;

    let report = cleanup::delete_range(
        destination.as_ref(),
        &args.project,
        args.from,
        args.to,
        resolver.as_mut(),
    )
    .await?;
    if report.aborted {
        return Ok(());
    }
    println!(
        "Deleted {} issues, {} could not be deleted",
        report.deleted.len(),
        report.failed.len()
    );
    if !report.failed.is_empty() {
        bail!("Failed to delete: {}", report.failed.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("migrate-to-jira").chain(args.iter().copied()))
    }

    #[test]
    fn parse_migrate_without_filters() {
        let cli = parse(&["migrate"]).unwrap();
        let Command::Migrate(args) = cli.command else {
            panic!("expected migrate");
        };
        assert_eq!(args.team, None);
        assert_eq!(args.list, None);
        assert_eq!(args.parent_link, None);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parse_migrate_with_filters() {
        let cli = parse(&[
            "migrate",
            "--team",
            "Acme",
            "--space",
            "Engineering",
            "--project",
            "Backend",
            "--list",
            "Sprint 4",
            "--jira-project",
            "PRO",
            "--parent-link",
            "title",
        ])
        .unwrap();
        let Command::Migrate(args) = cli.command else {
            panic!("expected migrate");
        };
        assert_eq!(args.team.as_deref(), Some("Acme"));
        assert_eq!(args.space.as_deref(), Some("Engineering"));
        assert_eq!(args.project.as_deref(), Some("Backend"));
        assert_eq!(args.list.as_deref(), Some("Sprint 4"));
        assert_eq!(args.jira_project.as_deref(), Some("PRO"));
        assert_eq!(args.parent_link, Some(ParentLink::Title));
    }

    #[test]
    fn parse_parent_link_source_id() {
        let cli = parse(&["migrate", "--parent-link", "source-id"]).unwrap();
        let Command::Migrate(args) = cli.command else {
            panic!("expected migrate");
        };
        assert_eq!(args.parent_link, Some(ParentLink::SourceId));
    }

    #[test]
    fn parse_unknown_parent_link_fails() {
        assert!(parse(&["migrate", "--parent-link", "guess"]).is_err());
    }

    #[test]
    fn parse_delete_range() {
        let cli = parse(&["delete", "--project", "PRO", "--from", "200", "--to", "290"]).unwrap();
        let Command::Delete(args) = cli.command else {
            panic!("expected delete");
        };
        assert_eq!(args.project, "PRO");
        assert_eq!(args.from, 200);
        assert_eq!(args.to, 290);
    }

    #[test]
    fn parse_delete_requires_bounds() {
        assert!(parse(&["delete", "--project", "PRO", "--from", "1"]).is_err());
        assert!(parse(&["delete", "--project", "PRO", "--from", "x", "--to", "2"]).is_err());
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = parse(&["migrate", "-vv", "--config", "/tmp/c.toml", "--answers", "a.txt"]).unwrap();
        assert_eq!(cli.answers, Some(PathBuf::from("a.txt")));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.verbosity_level(), Some("trace"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn parse_requires_subcommand() {
        assert!(parse(&[]).is_err());
    }
}
