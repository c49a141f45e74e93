//! Label → issue type and status → transition target mappings for one run.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use thiserror::Error;

use crate::model::ticket::Ticket;
use crate::resolve::{choose, confirm, ResolveError, Resolver};

pub type TypeMapping = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("the destination project declares no issue types")]
    NoDestinationTypes,
    #[error("no transition is available for status {status:?}")]
    NoTransitions { status: String },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StatusKey {
    issue_type: String,
    status: String,
}

/// Mapping state owned by a single migration run.
#[derive(Debug)]
pub struct MappingEngine {
    default_type_name: String,
    default_status: String,
    default_type: Option<String>,
    types: TypeMapping,
    statuses: HashMap<StatusKey, String>,
}

impl MappingEngine {
    pub fn new(default_type_name: impl Into<String>, default_status: impl Into<String>) -> Self {
        Self {
            default_type_name: default_type_name.into(),
            default_status: default_status.into(),
            default_type: None,
            types: TypeMapping::new(),
            statuses: HashMap::new(),
        }
    }

    /// Build the label mapping from every label found on `tickets` and their
    /// subtasks. The operator either accepts the default (all labels to the
    /// default type) or picks a type per label.
    pub fn build_type_mapping(
        &mut self,
        tickets: &[Ticket],
        destination_types: &[String],
        resolver: &mut dyn Resolver,
    ) -> Result<&TypeMapping, MappingError> {
        // Destinations list sub-task types last, so the fallback is a standard type.
        let default_type = destination_types
            .iter()
            .find(|t| **t == self.default_type_name)
            .or_else(|| destination_types.first())
            .cloned()
            .ok_or(MappingError::NoDestinationTypes)?;

        let labels = collect_labels(tickets);
        let mut mapping: TypeMapping = labels
            .iter()
            .map(|label| (label.clone(), default_type.clone()))
            .collect();

        if !labels.is_empty() {
            let listing = mapping
                .iter()
                .map(|(label, target)| format!("  {label} -> {target}"))
                .collect::<Vec<_>>()
                .join("\n");
            let question = format!("Default type mappings:\n{listing}\nUse the default mappings?");

            if !confirm(resolver, &question)? {
                for label in &labels {
                    let subject = format!("issue type for label {label:?}");
                    let target = choose(resolver, &subject, destination_types)?;
                    mapping.insert(label.clone(), target.to_string());
                }
            }
        }

        tracing::info!("type mappings: {mapping:?}");
        self.default_type = Some(default_type);
        self.types = mapping;
        Ok(&self.types)
    }

    /// Destination type for a ticket: the mapping of its first mapped label,
    /// else the default type.
    pub fn type_for(&self, ticket: &Ticket) -> String {
        ticket
            .labels()
            .find_map(|label| self.types.get(label))
            .or(self.default_type.as_ref())
            .cloned()
            .unwrap_or_else(|| self.default_type_name.clone())
    }

    /// Target status for `status` on an issue of `issue_type`, given the
    /// targets that issue can move to right now.
    ///
    /// Answers are cached per issue type and source status. A cached answer
    /// that is not a valid target for this issue is discarded and asked again.
    /// A blank source status maps to the default status when that is a valid
    /// target, and to `None` otherwise.
    pub fn resolve_status(
        &mut self,
        issue_type: &str,
        status: &str,
        valid_targets: &[String],
        resolver: &mut dyn Resolver,
    ) -> Result<Option<String>, MappingError> {
        if status.trim().is_empty() {
            return Ok(valid_targets
                .iter()
                .find(|t| **t == self.default_status)
                .cloned());
        }

        let key = StatusKey {
            issue_type: issue_type.to_string(),
            status: status.to_string(),
        };
        if let Some(target) = self.statuses.get(&key) {
            if valid_targets.contains(target) {
                return Ok(Some(target.clone()));
            }
            tracing::warn!(
                "status {status:?} was mapped to {target:?}, which is not reachable here; asking again"
            );
        }

        if valid_targets.is_empty() {
            return Err(MappingError::NoTransitions {
                status: status.to_string(),
            });
        }

        let subject = format!("{issue_type} status for {status:?}");
        let target = choose(resolver, &subject, valid_targets)?.to_string();
        self.statuses.insert(key, target.clone());
        Ok(Some(target))
    }
}

fn collect_labels(tickets: &[Ticket]) -> BTreeSet<String> {
    let mut labels = BTreeSet::new();
    let mut stack: Vec<&Ticket> = tickets.iter().collect();
    while let Some(ticket) = stack.pop() {
        labels.extend(ticket.labels().map(String::from));
        stack.extend(ticket.subtasks.iter());
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ScriptedResolver;

    fn ticket(issue_type: &str) -> Ticket {
        Ticket {
            id: "1".into(),
            issue_type: issue_type.into(),
            project: None,
            title: "Title".into(),
            description: String::new(),
            subtasks: vec![],
            status: "open".into(),
            assignee: None,
            parent: None,
            parent_id: None,
            comments: vec![],
        }
    }

    fn names(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    fn expected(pairs: &[(&str, &str)]) -> TypeMapping {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn default_mapping_uses_story() {
        let mut engine = MappingEngine::new("Story", "Open");
        let mut resolver = ScriptedResolver::new(["Y"]);
        let mapping = engine
            .build_type_mapping(&[ticket("bug,ci")], &names(&["Story", "Bug"]), &mut resolver)
            .unwrap();
        assert_eq!(mapping, &expected(&[("bug", "Story"), ("ci", "Story")]));
        assert_eq!(resolver.asked(), 1);
    }

    #[test]
    fn default_mapping_without_story_uses_first_type() {
        let mut engine = MappingEngine::new("Story", "Open");
        let mut resolver = ScriptedResolver::new(["Y"]);
        let mapping = engine
            .build_type_mapping(&[ticket("bug,ci")], &names(&["Bug"]), &mut resolver)
            .unwrap();
        assert_eq!(mapping, &expected(&[("bug", "Bug"), ("ci", "Bug")]));
    }

    #[test]
    fn custom_mapping_reasks_invalid_types() {
        let mut engine = MappingEngine::new("Story", "Open");
        let mut resolver = ScriptedResolver::new(["N", "Error", "Bug", "Story"]);
        let mapping = engine
            .build_type_mapping(&[ticket("bug,ci")], &names(&["Story", "Bug"]), &mut resolver)
            .unwrap();
        assert_eq!(mapping, &expected(&[("bug", "Bug"), ("ci", "Story")]));
        assert_eq!(resolver.asked(), 4);
    }

    #[test]
    fn invalid_confirmation_then_default() {
        let mut engine = MappingEngine::new("Story", "Open");
        let mut resolver = ScriptedResolver::new(["Error", "Y"]);
        let mapping = engine
            .build_type_mapping(&[ticket("bug,ci")], &names(&["Story"]), &mut resolver)
            .unwrap();
        assert_eq!(mapping, &expected(&[("bug", "Story"), ("ci", "Story")]));
        assert_eq!(resolver.asked(), 2);
    }

    #[test]
    fn same_answers_give_same_mapping() {
        let tickets = vec![ticket("ci, bug"), ticket("docs"), ticket("bug")];
        let types = names(&["Story", "Bug", "Task"]);
        let answers = ["N", "Bug", "Task", "Story"];

        let mut first = MappingEngine::new("Story", "Open");
        let a = first
            .build_type_mapping(&tickets, &types, &mut ScriptedResolver::new(answers))
            .unwrap()
            .clone();
        let mut second = MappingEngine::new("Story", "Open");
        let b = second
            .build_type_mapping(&tickets, &types, &mut ScriptedResolver::new(answers))
            .unwrap()
            .clone();
        let c = first
            .build_type_mapping(&tickets, &types, &mut ScriptedResolver::new(answers))
            .unwrap()
            .clone();

        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, expected(&[("bug", "Bug"), ("ci", "Task"), ("docs", "Story")]));
    }

    #[test]
    fn subtask_labels_are_collected() {
        let mut parent = ticket("feature");
        parent.subtasks.push(ticket("chore"));
        let mut engine = MappingEngine::new("Story", "Open");
        let mapping = engine
            .build_type_mapping(&[parent], &names(&["Story"]), &mut ScriptedResolver::new(["Y"]))
            .unwrap();
        assert_eq!(mapping.keys().collect::<Vec<_>>(), vec!["chore", "feature"]);
    }

    #[test]
    fn no_labels_means_no_prompt() {
        let mut engine = MappingEngine::new("Story", "Open");
        let mut resolver = ScriptedResolver::new(Vec::<String>::new());
        let mapping = engine
            .build_type_mapping(&[ticket("")], &names(&["Story"]), &mut resolver)
            .unwrap();
        assert!(mapping.is_empty());
        assert_eq!(engine.type_for(&ticket("")), "Story");
    }

    #[test]
    fn empty_destination_types_is_an_error() {
        let mut engine = MappingEngine::new("Story", "Open");
        let err = engine
            .build_type_mapping(&[ticket("bug")], &[], &mut ScriptedResolver::new(["Y"]))
            .unwrap_err();
        assert!(matches!(err, MappingError::NoDestinationTypes));
    }

    #[test]
    fn type_for_uses_first_mapped_label_then_default() {
        let mut engine = MappingEngine::new("Story", "Open");
        engine
            .build_type_mapping(
                &[ticket("bug,ci")],
                &names(&["Story", "Bug"]),
                &mut ScriptedResolver::new(["N", "Bug", "Story"]),
            )
            .unwrap();
        assert_eq!(engine.type_for(&ticket("bug,ci")), "Bug");
        assert_eq!(engine.type_for(&ticket("ci,bug")), "Story");
        assert_eq!(engine.type_for(&ticket("unseen,bug")), "Bug");
        assert_eq!(engine.type_for(&ticket("unseen")), "Story");
    }

    #[test]
    fn status_is_asked_once_then_cached() {
        let mut engine = MappingEngine::new("Story", "Open");
        let targets = names(&["To Do", "Done"]);
        let mut resolver = ScriptedResolver::new(["Error", "Done"]);

        let first = engine
            .resolve_status("Story", "complete", &targets, &mut resolver)
            .unwrap();
        let second = engine
            .resolve_status("Story", "complete", &targets, &mut resolver)
            .unwrap();

        assert_eq!(first.as_deref(), Some("Done"));
        assert_eq!(second.as_deref(), Some("Done"));
        assert_eq!(resolver.asked(), 2);
    }

    #[test]
    fn cached_status_unreachable_on_another_issue_is_asked_again() {
        let mut engine = MappingEngine::new("Story", "Open");
        let mut resolver = ScriptedResolver::new(["Done", "Closed"]);

        engine
            .resolve_status("Story", "complete", &names(&["To Do", "Done"]), &mut resolver)
            .unwrap();
        let again = engine
            .resolve_status("Story", "complete", &names(&["Closed"]), &mut resolver)
            .unwrap();

        assert_eq!(again.as_deref(), Some("Closed"));
        assert_eq!(resolver.asked(), 2);
    }

    #[test]
    fn status_cache_is_per_issue_type() {
        let mut engine = MappingEngine::new("Story", "Open");
        let targets = names(&["To Do", "Done"]);
        let mut resolver = ScriptedResolver::new(["Done", "To Do"]);

        let story = engine
            .resolve_status("Story", "review", &targets, &mut resolver)
            .unwrap();
        let bug = engine
            .resolve_status("Bug", "review", &targets, &mut resolver)
            .unwrap();

        assert_eq!(story.as_deref(), Some("Done"));
        assert_eq!(bug.as_deref(), Some("To Do"));
    }

    #[test]
    fn blank_status_falls_back_to_default() {
        let mut engine = MappingEngine::new("Story", "Open");
        let mut resolver = ScriptedResolver::new(Vec::<String>::new());
        let open = engine
            .resolve_status("Story", "", &names(&["Open", "Done"]), &mut resolver)
            .unwrap();
        let none = engine
            .resolve_status("Story", " ", &names(&["Done"]), &mut resolver)
            .unwrap();
        assert_eq!(open.as_deref(), Some("Open"));
        assert_eq!(none, None);
        assert_eq!(resolver.asked(), 0);
    }

    #[test]
    fn no_targets_is_an_error() {
        let mut engine = MappingEngine::new("Story", "Open");
        let err = engine
            .resolve_status("Story", "complete", &[], &mut ScriptedResolver::new(["Done"]))
            .unwrap_err();
        assert!(matches!(err, MappingError::NoTransitions { ref status } if status == "complete"));
    }
}
