/// A tracker-neutral ticket, built from a fetched source task and consumed
/// once by the destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: String,
    /// Comma-joined source labels. Mapped to a destination type at creation time.
    pub issue_type: String,
    pub project: Option<String>,
    pub title: String,
    pub description: String,
    pub subtasks: Vec<Ticket>,
    pub status: String,
    pub assignee: Option<String>,
    /// Title of the parent ticket. A ticket with a parent is a child, whatever its depth.
    pub parent: Option<String>,
    /// Source id of the parent, when it was found among the fetched tasks.
    pub parent_id: Option<String>,
    pub comments: Vec<Comment>,
}

impl Ticket {
    /// Individual labels of `issue_type`, trimmed, empties dropped.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.issue_type
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
    }

    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub text: Option<String>,
    pub commenter: String,
}

impl Comment {
    /// Body posted on the destination, or `None` when there is nothing to say.
    pub fn attributed_text(&self) -> Option<String> {
        let text = self.text.as_deref().filter(|t| !t.trim().is_empty())?;
        Some(format!("{} said: {text}", self.commenter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn labels_split_on_comma() {
        let t = ticket("bug, ci");
        assert_eq!(t.labels().collect::<Vec<_>>(), vec!["bug", "ci"]);
    }

    #[test]
    fn empty_type_has_no_labels() {
        assert_eq!(ticket("").labels().count(), 0);
        assert_eq!(ticket(" , ").labels().count(), 0);
    }

    #[test]
    fn comment_is_attributed_to_commenter() {
        let comment = Comment {
            id: "c1".into(),
            text: Some("hi".into()),
            commenter: "u@x.com".into(),
        };
        assert_eq!(comment.attributed_text().as_deref(), Some("u@x.com said: hi"));
    }

    #[test]
    fn empty_comment_has_no_body() {
        let mut comment = Comment {
            id: "c1".into(),
            text: Some(String::new()),
            commenter: "u@x.com".into(),
        };
        assert_eq!(comment.attributed_text(), None);
        comment.text = None;
        assert_eq!(comment.attributed_text(), None);
    }
}
