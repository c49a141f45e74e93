use anyhow::{bail, Result};

use crate::providers::Destination;
use crate::resolve::{confirm, Resolver};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
    pub aborted: bool,
}

/// Delete `{project}-{n}` for every `n` in `from..to` after the operator
/// confirms. A failed deletion is logged and the sweep moves on.
pub async fn delete_range(
    destination: &dyn Destination,
    project: &str,
    from: u32,
    to: u32,
    resolver: &mut dyn Resolver,
) -> Result<CleanupReport> {
    if from >= to {
        bail!("Empty range {from}..{to}: the upper bound is exclusive");
    }

    let question = format!(
        "Delete {project}-{from} through {project}-{} from {}?",
        to - 1,
        destination.name()
    );
    let mut report = CleanupReport::default();
    if !confirm(resolver, &question)? {
        tracing::info!("deletion cancelled");
        report.aborted = true;
        return Ok(report);
    }

    for n in from..to {
        let key = format!("{project}-{n}");
        match destination.delete(&key).await {
            Ok(()) => {
                tracing::info!("deleted {key}");
                report.deleted.push(key);
            }
            Err(e) => {
                tracing::warn!("could not delete {key}: {e:#}");
                report.failed.push(key);
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::tests::MockDestination;
    use crate::resolve::ScriptedResolver;

    #[tokio::test]
    async fn deletes_exclusive_range_and_skips_failures() {
        let mut dest = MockDestination::default();
        dest.fail_delete.insert("PRO-201".into());
        let mut resolver = ScriptedResolver::new(["Y"]);

        let report = delete_range(&dest, "PRO", 200, 203, &mut resolver).await.unwrap();

        assert_eq!(report.deleted, vec!["PRO-200", "PRO-202"]);
        assert_eq!(report.failed, vec!["PRO-201"]);
        assert_eq!(dest.log.lock().unwrap().deleted, vec!["PRO-200", "PRO-202"]);
    }

    #[tokio::test]
    async fn declining_deletes_nothing() {
        let dest = MockDestination::default();
        let mut resolver = ScriptedResolver::new(["maybe", "N"]);

        let report = delete_range(&dest, "PRO", 1, 5, &mut resolver).await.unwrap();

        assert!(report.aborted);
        assert!(report.deleted.is_empty());
        assert!(dest.log.lock().unwrap().deleted.is_empty());
        assert_eq!(resolver.asked(), 2);
    }

    #[tokio::test]
    async fn empty_range_is_rejected_before_asking() {
        let dest = MockDestination::default();
        let mut resolver = ScriptedResolver::new(["Y"]);
        assert!(delete_range(&dest, "PRO", 5, 5, &mut resolver).await.is_err());
        assert_eq!(resolver.asked(), 0);
    }
}
