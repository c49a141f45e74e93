use anyhow::{bail, Result};

use crate::providers::{Container, Source, TaskScope};
use crate::resolve::{choose, confirm, Resolver};

/// Name filters for the source hierarchy. A missing level is chosen by the operator.
#[derive(Debug, Clone, Default)]
pub struct ScopeFilter {
    pub team: Option<String>,
    pub space: Option<String>,
    pub project: Option<String>,
    pub list: Option<String>,
}

/// Walk team → space → folder (→ list) down to the scope whose tasks are migrated.
pub async fn resolve_scope(
    source: &dyn Source,
    filter: &ScopeFilter,
    resolver: &mut dyn Resolver,
) -> Result<TaskScope> {
    let team = pick("team", source.teams().await?, filter.team.as_deref(), resolver)?;
    let space = pick("space", source.spaces(&team).await?, filter.space.as_deref(), resolver)?;
    let folder = pick(
        "project",
        source.folders(&space).await?,
        filter.project.as_deref(),
        resolver,
    )?;

    let scope = match filter.list.as_deref() {
        Some(name) => TaskScope::List(pick("list", source.lists(&folder).await?, Some(name), resolver)?),
        None if confirm(resolver, &format!("Migrate a single list of {}?", folder.name))? => {
            TaskScope::List(pick("list", source.lists(&folder).await?, None, resolver)?)
        }
        None => TaskScope::Folder(folder),
    };
    tracing::info!("migrating from {} / {} / {scope:?}", team.name, space.name);
    Ok(scope)
}

/// First container whose name contains `filter`, or the operator's choice
/// when there is no filter.
fn pick(
    kind: &str,
    items: Vec<Container>,
    filter: Option<&str>,
    resolver: &mut dyn Resolver,
) -> Result<Container> {
    if items.is_empty() {
        bail!("No {kind} available in the source");
    }
    let found = match filter {
        Some(name) => items.into_iter().find(|c| c.name.contains(name)),
        None => {
            let names: Vec<String> = items.iter().map(|c| c.name.clone()).collect();
            let chosen = choose(resolver, kind, &names)?.to_string();
            items.into_iter().find(|c| c.name == chosen)
        }
    };
    match found {
        Some(container) => Ok(container),
        None => bail!("No {kind} matching {:?}", filter.unwrap_or_default()),
    }
}
