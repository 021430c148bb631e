//! Full-text span filtering and next/prev match navigation.

use std::collections::BTreeSet;

use crate::rows::{Row, RowKind};
use crate::{Span, Tag};

/// Find spans matching a query. The query splits on whitespace; tokens
/// starting with `-` are exclusion keys that stop matching against tag/log
/// pairs with that key (they never veto a whole span), all other tokens are
/// case-insensitive substring filters OR'd together over operation name,
/// service name, tag and log-field keys/values, and the span id with
/// leading zeros stripped from both sides.
///
/// Empty queries and queries with no hits both yield an empty set.
pub fn filter_spans(query: &str, spans: &[Span]) -> BTreeSet<String> {
    let mut include: Vec<String> = Vec::new();
    let mut exclude_keys: Vec<String> = Vec::new();
    for token in query.split_whitespace() {
        match token.strip_prefix('-') {
            Some(key) if !key.is_empty() => exclude_keys.push(key.to_lowercase()),
            _ => include.push(token.to_lowercase()),
        }
    }
    if include.is_empty() {
        return BTreeSet::new();
    }

    let text_matches = |text: &str| {
        let text = text.to_lowercase();
        include.iter().any(|filter| text.contains(filter))
    };
    let key_excluded = |key: &str| {
        let key = key.to_lowercase();
        exclude_keys.iter().any(|excluded| key.contains(excluded))
    };
    let pairs_match = |pairs: &[Tag]| {
        pairs.iter().any(|pair| {
            !key_excluded(&pair.key) && (text_matches(&pair.key) || text_matches(&pair.value))
        })
    };
    let id_matches = |id: &str| {
        let id = id.to_lowercase();
        let id = id.trim_start_matches('0');
        include.iter().any(|filter| {
            let filter = filter.trim_start_matches('0');
            !filter.is_empty() && id.contains(filter)
        })
    };

    spans
        .iter()
        .filter(|span| {
            text_matches(&span.name)
                || text_matches(&span.service)
                || pairs_match(&span.tags)
                || span.logs.iter().any(|log| pairs_match(&log.fields))
                || id_matches(&span.id)
        })
        .map(|span| span.id.clone())
        .collect()
}

/// Re-sort a match set into the order spans appear in the visible row
/// list, so next/prev navigation moves monotonically down the tree.
/// Matches on hidden spans are left out.
pub fn order_matches(matches: &BTreeSet<String>, rows: &[Row]) -> Vec<String> {
    rows.iter()
        .filter(|row| row.kind == RowKind::Bar && matches.contains(&row.span_id))
        .map(|row| row.span_id.clone())
        .collect()
}

/// Wrap-around cursor over an ordered match list.
#[derive(Debug, Default, Clone)]
pub struct MatchCursor {
    focus: Option<usize>,
}

impl MatchCursor {
    /// Forget the focus, e.g. when the query or the row order changed.
    pub fn reset(&mut self) {
        self.focus = None;
    }

    pub fn next<'a>(&mut self, ordered: &'a [String]) -> Option<&'a str> {
        if ordered.is_empty() {
            self.focus = None;
            return None;
        }
        let next = match self.focus {
            Some(i) => (i + 1) % ordered.len(),
            None => 0,
        };
        self.focus = Some(next);
        Some(&ordered[next])
    }

    pub fn prev<'a>(&mut self, ordered: &'a [String]) -> Option<&'a str> {
        if ordered.is_empty() {
            self.focus = None;
            return None;
        }
        let prev = match self.focus {
            Some(0) | None => ordered.len() - 1,
            Some(i) => i - 1,
        };
        self.focus = Some(prev);
        Some(&ordered[prev])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::generate_rows;
    use crate::{LogEntry, Span, Tag};

    fn span(id: &str, name: &str, service: &str, tags: Vec<Tag>) -> Span {
        Span {
            id: id.to_string(),
            name: name.to_string(),
            service: service.to_string(),
            tags,
            ..Span::default()
        }
    }

    #[test]
    fn empty_query_matches_nothing() {
        let spans = vec![span("1", "op", "svc", vec![])];
        assert!(filter_spans("", &spans).is_empty());
        assert!(filter_spans("   ", &spans).is_empty());
        assert!(filter_spans("-only_exclusions", &spans).is_empty());
    }

    #[test]
    fn tokens_are_ored_over_all_fields() {
        let spans = vec![
            span("1", "fetch_user", "db", vec![]),
            span("2", "render", "frontend", vec![Tag::new("peer", "db-primary")]),
            span("3", "unrelated", "other", vec![]),
        ];
        let matches = filter_spans("user frontend", &spans);
        assert_eq!(matches, ["1".to_string(), "2".to_string()].into());

        // tag value match, case-insensitive
        let matches = filter_spans("DB-PRIMARY", &spans);
        assert_eq!(matches, ["2".to_string()].into());
    }

    #[test]
    fn exclusion_suppresses_matching_on_that_key_only() {
        // tag key "bar" is excluded, so its value "foo" may not match
        let excluded = span("1", "op", "svc", vec![Tag::new("bar", "foo")]);
        let allowed = span("2", "op", "svc", vec![Tag::new("baz", "foo")]);
        let spans = vec![excluded, allowed];

        let matches = filter_spans("foo -bar", &spans);
        assert_eq!(matches, ["2".to_string()].into());
    }

    #[test]
    fn exclusion_does_not_veto_other_fields_of_the_span() {
        let spans = vec![span(
            "1",
            "process_payment",
            "svc",
            vec![Tag::new("service_name", "payment-svc")],
        )];
        // the tag pair is suppressed but operationName still matches
        let matches = filter_spans("payment -service_name", &spans);
        assert_eq!(matches, ["1".to_string()].into());
    }

    #[test]
    fn log_fields_match_unless_excluded() {
        let mut s = span("1", "op", "svc", vec![]);
        s.logs.push(LogEntry {
            timestamp_micros: 5,
            fields: vec![Tag::new("event", "timeout")],
        });
        let spans = vec![s];
        assert_eq!(filter_spans("timeout", &spans), ["1".to_string()].into());
        assert!(filter_spans("timeout -event", &spans).is_empty());
    }

    #[test]
    fn span_id_matches_with_leading_zeros_stripped() {
        let spans = vec![span("00ab12", "op", "svc", vec![])];
        assert_eq!(filter_spans("ab12", &spans), ["00ab12".to_string()].into());
        assert_eq!(filter_spans("0ab1", &spans), ["00ab12".to_string()].into());
        assert!(filter_spans("cd", &spans).is_empty());
        // a token of only zeros never matches everything
        assert!(filter_spans("000", &spans).is_empty());
    }

    #[test]
    fn matches_are_ordered_by_visible_rows() {
        let spans = vec![
            Span {
                id: "a".into(),
                name: "hit".into(),
                depth: 0,
                has_children: true,
                ..Span::default()
            },
            Span {
                id: "b".into(),
                name: "hit".into(),
                depth: 1,
                ..Span::default()
            },
            Span {
                id: "c".into(),
                name: "hit".into(),
                depth: 0,
                ..Span::default()
            },
        ];
        let matches = filter_spans("hit", &spans);
        assert_eq!(matches.len(), 3);

        // "b" is hidden under "a", so navigation skips it
        let hidden = ["a".to_string()].into();
        let rows = generate_rows(&spans, &hidden, &std::collections::BTreeSet::new());
        let ordered = order_matches(&matches, &rows);
        assert_eq!(ordered, vec!["a".to_string(), "c".to_string()]);

        let mut cursor = MatchCursor::default();
        assert_eq!(cursor.next(&ordered), Some("a"));
        assert_eq!(cursor.next(&ordered), Some("c"));
        assert_eq!(cursor.next(&ordered), Some("a"));
        assert_eq!(cursor.prev(&ordered), Some("c"));
    }

    #[test]
    fn cursor_over_empty_matches() {
        let mut cursor = MatchCursor::default();
        assert_eq!(cursor.next(&[]), None);
        assert_eq!(cursor.prev(&[]), None);
    }
}
