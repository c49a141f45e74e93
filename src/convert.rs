use std::collections::{HashMap, HashSet};

use crate::model::ticket::Ticket;
use crate::providers::SourceTask;

/// Resolve each task's parent id to the parent's title and attach child
/// tasks as subtasks, both within the fetched set. A parent id that is not
/// part of the set is dropped, so the task counts as top-level.
pub fn link_hierarchy(tasks: Vec<SourceTask>) -> Vec<SourceTask> {
    let titles: HashMap<&str, &str> = tasks
        .iter()
        .map(|t| (t.id.as_str(), t.name.as_str()))
        .collect();

    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut parent_titles: Vec<Option<String>> = Vec::with_capacity(tasks.len());
    for (idx, task) in tasks.iter().enumerate() {
        let parent = task
            .parent
            .as_deref()
            .filter(|p| *p != task.id)
            .and_then(|p| titles.get(p).map(|title| (p, *title)));
        match parent {
            Some((parent_id, title)) => {
                children.entry(parent_id).or_default().push(idx);
                parent_titles.push(Some(title.to_string()));
            }
            None => {
                if task.parent.is_some() {
                    tracing::info!("task {} has no parent in this scope", task.name);
                }
                parent_titles.push(None);
            }
        }
    }

    let subtasks: Vec<Vec<SourceTask>> = (0..tasks.len())
        .map(|idx| {
            let mut path = HashSet::from([idx]);
            build_subtasks(idx, &tasks, &children, &mut path)
        })
        .collect();

    tasks
        .iter()
        .zip(parent_titles)
        .zip(subtasks)
        .map(|((task, parent_title), subtasks)| {
            let mut task = task.clone();
            if parent_title.is_none() {
                task.parent = None;
            }
            task.parent_title = parent_title;
            task.subtasks = subtasks;
            task
        })
        .collect()
}

fn build_subtasks(
    idx: usize,
    tasks: &[SourceTask],
    children: &HashMap<&str, Vec<usize>>,
    path: &mut HashSet<usize>,
) -> Vec<SourceTask> {
    let Some(child_ids) = children.get(tasks[idx].id.as_str()) else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(child_ids.len());
    for &child in child_ids {
        if !path.insert(child) {
            tracing::warn!("cyclic parent link at task {}", tasks[child].name);
            continue;
        }
        let mut task = tasks[child].clone();
        task.parent_title = Some(tasks[idx].name.clone());
        task.subtasks = build_subtasks(child, tasks, children, path);
        path.remove(&child);
        out.push(task);
    }
    out
}

/// Convert a linked source task into a [`Ticket`].
pub fn convert(task: &SourceTask) -> Ticket {
    Ticket {
        id: task.id.clone(),
        issue_type: task.tags.join(","),
        project: task.folder.clone(),
        title: task.name.clone(),
        // Passed through as-is; no markup dialect translation.
        description: task.description.clone(),
        subtasks: task.subtasks.iter().map(convert).collect(),
        status: task.status.clone(),
        assignee: task.assignees.first().cloned(),
        parent: task.parent_title.clone(),
        parent_id: task.parent_title.as_ref().and(task.parent.clone()),
        comments: task.comments.clone(),
    }
}
