use crate::model::ticket::Ticket;

/// Creation order: every parentless ticket first, then every child, each
/// group in input order.
///
/// Parents exist before their children only for one level of nesting; a
/// grandchild listed before its own parent is not reordered.
pub fn order_for_creation(tickets: Vec<Ticket>) -> Vec<Ticket> {
    let (mut ordered, children): (Vec<Ticket>, Vec<Ticket>) =
        tickets.into_iter().partition(|t| !t.is_child());
    ordered.extend(children);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(title: &str, parent: Option<&str>) -> Ticket {
        Ticket {
            id: title.to_lowercase(),
            issue_type: String::new(),
            project: None,
            title: title.into(),
            description: String::new(),
            subtasks: vec![],
            status: String::new(),
            assignee: None,
            parent: parent.map(String::from),
            parent_id: None,
            comments: vec![],
        }
    }

    fn titles(tickets: &[Ticket]) -> Vec<&str> {
        tickets.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn parentless_first_in_input_order() {
        let ordered = order_for_creation(vec![
            ticket("Child 1", Some("Root 1")),
            ticket("Root 1", None),
            ticket("Child 2", Some("Root 2")),
            ticket("Root 2", None),
        ]);
        assert_eq!(titles(&ordered), vec!["Root 1", "Root 2", "Child 1", "Child 2"]);
    }

    #[test]
    fn parent_precedes_child() {
        let ordered = order_for_creation(vec![
            ticket("B", Some("A")),
            ticket("A", None),
        ]);
        assert_eq!(titles(&ordered), vec!["A", "B"]);
    }

    #[test]
    fn no_parented_ticket_before_its_parent() {
        let input = vec![
            ticket("A", None),
            ticket("A1", Some("A")),
            ticket("B1", Some("B")),
            ticket("B", None),
            ticket("A2", Some("A")),
            ticket("C", None),
        ];
        let ordered = order_for_creation(input);
        for (pos, t) in ordered.iter().enumerate() {
            if let Some(parent) = &t.parent {
                let parent_pos = ordered.iter().position(|p| &p.title == parent).unwrap();
                assert!(parent_pos < pos, "{} placed before {}", t.title, parent);
            }
        }
        assert_eq!(titles(&ordered), vec!["A", "B", "C", "A1", "B1", "A2"]);
    }

    #[test]
    fn empty_input() {
        assert!(order_for_creation(Vec::new()).is_empty());
    }
}
