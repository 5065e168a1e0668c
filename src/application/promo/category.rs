use crate::domain::entities::ContentNode;
use crate::domain::types::TermId;

/// The single primary category of a content item, if it has one.
pub fn primary_category(item: Option<&ContentNode>) -> Option<TermId> {
    item.and_then(|node| node.primary_term)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::domain::types::{NodeId, NodeStatus};

    #[test]
    fn reads_primary_term_with_null_handling() {
        let mut article = ContentNode {
            id: NodeId(1),
            bundle: "article".to_string(),
            title: "Article".to_string(),
            status: NodeStatus::Published,
            changed: datetime!(2024-01-01 00:00 UTC),
            primary_term: Some(TermId(8)),
            target_term: None,
            paragraph_offset: None,
            body: Vec::new(),
        };

        assert_eq!(primary_category(Some(&article)), Some(TermId(8)));
        article.primary_term = None;
        assert_eq!(primary_category(Some(&article)), None);
        assert_eq!(primary_category(None), None);
    }
}
