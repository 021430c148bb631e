//! Sibling-run grouping: runs of spans sharing (service, name, status) are
//! pre-grouped at ingest; until a group is expanded only its representative
//! span is visible, carrying the aggregate duration.

use crate::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupToggle {
    Expand,
    Collapse,
}

/// Reduce the span list to the spans that should reach row generation: a
/// span survives when it is ungrouped, the representative of its group, or
/// a member of an explicitly expanded group.
pub fn apply_grouping(spans: &[Span]) -> Vec<Span> {
    spans
        .iter()
        .filter(|span| match &span.group {
            None => true,
            Some(group) => group.id == span.id || group.is_expand,
        })
        .cloned()
        .collect()
}

/// Rewrite `is_expand` on every member of `group_id`, producing a new list.
/// Spans outside the group are untouched; an unknown id changes nothing.
pub fn toggle_group(spans: &[Span], group_id: &str, toggle: GroupToggle) -> Vec<Span> {
    spans
        .iter()
        .map(|span| match &span.group {
            Some(group) if group.id == group_id => {
                let mut span = span.clone();
                if let Some(group) = span.group.as_mut() {
                    group.is_expand = toggle == GroupToggle::Expand;
                }
                span
            }
            _ => span.clone(),
        })
        .collect()
}

/// Bar length for a span: the group aggregate while the span stands in for
/// a collapsed group, its own duration otherwise.
pub fn rendered_duration(span: &Span) -> i64 {
    match &span.group {
        Some(group) if group.id == span.id && !group.is_expand => group.duration_micros,
        _ => span.duration_micros,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GroupInfo;

    fn grouped(id: &str, group_id: &str, is_expand: bool) -> Span {
        Span {
            id: id.to_string(),
            duration_micros: 10,
            group: Some(GroupInfo {
                id: group_id.to_string(),
                duration_micros: 70,
                members: vec!["g1".into(), "g2".into(), "g3".into()],
                is_expand,
            }),
            ..Span::default()
        }
    }

    #[test]
    fn collapsed_group_keeps_representative_only() {
        let spans = vec![
            Span {
                id: "a".into(),
                ..Span::default()
            },
            grouped("g1", "g1", false),
            grouped("g2", "g1", false),
            grouped("g3", "g1", false),
        ];
        let visible = apply_grouping(&spans);
        let ids: Vec<_> = visible.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "g1"]);
    }

    #[test]
    fn expanded_group_keeps_members() {
        let spans = vec![grouped("g1", "g1", true), grouped("g2", "g1", true)];
        assert_eq!(apply_grouping(&spans).len(), 2);
    }

    #[test]
    fn toggle_is_idempotent() {
        let spans = vec![
            grouped("g1", "g1", false),
            grouped("g2", "g1", false),
            Span {
                id: "b".into(),
                ..Span::default()
            },
        ];
        let once = toggle_group(&spans, "g1", GroupToggle::Expand);
        let twice = toggle_group(&once, "g1", GroupToggle::Expand);
        assert_eq!(once, twice);
        assert_eq!(apply_grouping(&once), apply_grouping(&twice));
        assert!(once[0].group.as_ref().map_or(false, |g| g.is_expand));
        assert_eq!(once[2].group, None);
    }

    #[test]
    fn toggle_unknown_group_changes_nothing() {
        let spans = vec![grouped("g1", "g1", false)];
        assert_eq!(toggle_group(&spans, "nope", GroupToggle::Expand), spans);
    }

    #[test]
    fn representative_duration_is_aggregate_until_expanded() {
        let rep = grouped("g1", "g1", false);
        assert_eq!(rendered_duration(&rep), 70);
        let expanded = toggle_group(&[rep], "g1", GroupToggle::Expand);
        assert_eq!(rendered_duration(&expanded[0]), 10);
        let member = grouped("g2", "g1", false);
        assert_eq!(rendered_duration(&member), 10);
    }
}
