//! Projection of the span tree plus collapse/detail state into the ordered
//! list of renderable rows.

use std::collections::BTreeSet;

use crate::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// The span's waterfall bar.
    Bar,
    /// Inline drill-down row shown under the bar.
    Detail { has_logs: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Index into the span list the rows were generated from.
    pub span_index: usize,
    pub span_id: String,
    pub depth: usize,
    pub kind: RowKind,

    /// Background stripe index. Increments whenever the depth differs from
    /// the previous visible row's depth, so each run of same-depth rows
    /// shares one band. This is deliberately not `depth % n`.
    pub bg_color_index: usize,
}

/// Materialize the visible row list for one span tree.
///
/// `hidden_subtree_ids` marks spans whose descendant subtree is hidden (the
/// span itself stays visible as a collapsed parent); `detail_expanded_ids`
/// marks spans that get an inline detail row after their bar.
pub fn generate_rows(
    spans: &[Span],
    hidden_subtree_ids: &BTreeSet<String>,
    detail_expanded_ids: &BTreeSet<String>,
) -> Vec<Row> {
    let mut rows = Vec::with_capacity(spans.len());
    let mut collapse_depth: Option<usize> = None;

    for (i, span) in spans.iter().enumerate() {
        if let Some(depth) = collapse_depth {
            if span.depth >= depth {
                continue;
            }
            collapse_depth = None;
        }
        if hidden_subtree_ids.contains(&span.id) {
            collapse_depth = Some(span.depth + 1);
        }

        rows.push(Row {
            span_index: i,
            span_id: span.id.clone(),
            depth: span.depth,
            kind: RowKind::Bar,
            bg_color_index: 0,
        });
        if detail_expanded_ids.contains(&span.id) {
            rows.push(Row {
                span_index: i,
                span_id: span.id.clone(),
                depth: span.depth,
                kind: RowKind::Detail {
                    has_logs: !span.logs.is_empty(),
                },
                bg_color_index: 0,
            });
        }
    }

    let mut stripe = 0;
    for i in 0..rows.len() {
        if i > 0 && rows[i].depth != rows[i - 1].depth {
            stripe += 1;
        }
        rows[i].bg_color_index = stripe;
    }
    rows
}

/// Spans that survive the collapse walk, in order. Shared between one-level
/// operations so they see the same visibility as [`generate_rows`].
fn visible_spans<'a>(spans: &'a [Span], hidden: &BTreeSet<String>) -> Vec<&'a Span> {
    let mut visible = Vec::new();
    let mut collapse_depth: Option<usize> = None;
    for span in spans {
        if let Some(depth) = collapse_depth {
            if span.depth >= depth {
                continue;
            }
            collapse_depth = None;
        }
        if hidden.contains(&span.id) {
            collapse_depth = Some(span.depth + 1);
        }
        visible.push(span);
    }
    visible
}

/// Toggle one span's subtree, returning the new collapse state.
pub fn children_toggle(hidden: &BTreeSet<String>, span_id: &str) -> BTreeSet<String> {
    let mut next = hidden.clone();
    if !next.remove(span_id) {
        next.insert(span_id.to_string());
    }
    next
}

pub fn collapse_all(spans: &[Span]) -> BTreeSet<String> {
    spans
        .iter()
        .filter(|s| s.has_children)
        .map(|s| s.id.clone())
        .collect()
}

pub fn expand_all() -> BTreeSet<String> {
    BTreeSet::new()
}

/// Collapse the deepest still-expanded parents, shrinking the expanded
/// frontier by one level. No-op once every parent is collapsed.
pub fn collapse_one_level(spans: &[Span], hidden: &BTreeSet<String>) -> BTreeSet<String> {
    let deepest_expanded = visible_spans(spans, hidden)
        .iter()
        .filter(|s| s.has_children && !hidden.contains(&s.id))
        .map(|s| s.depth)
        .max();
    let Some(depth) = deepest_expanded else {
        return hidden.clone();
    };

    let mut next = hidden.clone();
    for span in visible_spans(spans, hidden) {
        if span.has_children && span.depth == depth {
            next.insert(span.id.clone());
        }
    }
    next
}

/// Expand the shallowest collapsed parents, growing the visible tree by one
/// level. No-op when nothing is collapsed.
pub fn expand_one_level(spans: &[Span], hidden: &BTreeSet<String>) -> BTreeSet<String> {
    let shallowest_collapsed = visible_spans(spans, hidden)
        .iter()
        .filter(|s| hidden.contains(&s.id))
        .map(|s| s.depth)
        .min();
    let Some(depth) = shallowest_collapsed else {
        return hidden.clone();
    };

    let mut next = hidden.clone();
    for span in visible_spans(spans, hidden) {
        if span.depth == depth {
            next.remove(&span.id);
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Span;

    fn span(id: &str, depth: usize, has_children: bool) -> Span {
        Span {
            id: id.to_string(),
            depth,
            has_children,
            ..Span::default()
        }
    }

    /// Depths [0, 1, 2, 1, 0]; the first span owns indices 1..=3.
    fn fixture() -> Vec<Span> {
        vec![
            span("a", 0, true),
            span("b", 1, true),
            span("c", 2, false),
            span("d", 1, false),
            span("e", 0, false),
        ]
    }

    fn ids(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r.span_id.as_str()).collect()
    }

    #[test]
    fn empty_spans_yield_empty_rows() {
        assert!(generate_rows(&[], &BTreeSet::new(), &BTreeSet::new()).is_empty());
    }

    #[test]
    fn collapsing_root_hides_descendants_only() {
        let spans = fixture();
        let hidden = children_toggle(&BTreeSet::new(), "a");

        let rows = generate_rows(&spans, &hidden, &BTreeSet::new());
        assert_eq!(ids(&rows), vec!["a", "e"]);

        let restored = children_toggle(&hidden, "a");
        let rows = generate_rows(&spans, &restored, &BTreeSet::new());
        assert_eq!(ids(&rows), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn collapsing_mid_tree_keeps_siblings() {
        let spans = fixture();
        let hidden = children_toggle(&BTreeSet::new(), "b");
        let rows = generate_rows(&spans, &hidden, &BTreeSet::new());
        assert_eq!(ids(&rows), vec!["a", "b", "d", "e"]);
    }

    #[test]
    fn detail_row_follows_its_bar() {
        let mut spans = fixture();
        spans[1].logs.push(crate::LogEntry::default());
        let detail: BTreeSet<String> = ["b".to_string()].into();

        let rows = generate_rows(&spans, &BTreeSet::new(), &detail);
        assert_eq!(ids(&rows), vec!["a", "b", "b", "c", "d", "e"]);
        assert_eq!(rows[2].kind, RowKind::Detail { has_logs: true });
        // detail row sits at its span's depth, so it shares the stripe
        assert_eq!(rows[1].bg_color_index, rows[2].bg_color_index);
    }

    #[test]
    fn detail_row_of_hidden_span_is_not_emitted() {
        let spans = fixture();
        let hidden = children_toggle(&BTreeSet::new(), "a");
        let detail: BTreeSet<String> = ["c".to_string()].into();
        let rows = generate_rows(&spans, &hidden, &detail);
        assert_eq!(ids(&rows), vec!["a", "e"]);
    }

    #[test]
    fn stripes_increment_per_depth_run() {
        let spans = fixture();
        let rows = generate_rows(&spans, &BTreeSet::new(), &BTreeSet::new());
        let stripes: Vec<_> = rows.iter().map(|r| r.bg_color_index).collect();
        // depths 0,1,2,1,0 -> a new band at every change
        assert_eq!(stripes, vec![0, 1, 2, 3, 4]);

        // runs of equal depth share a band
        let flat = vec![span("x", 0, true), span("y", 1, false), span("z", 1, false)];
        let rows = generate_rows(&flat, &BTreeSet::new(), &BTreeSet::new());
        let stripes: Vec<_> = rows.iter().map(|r| r.bg_color_index).collect();
        assert_eq!(stripes, vec![0, 1, 1]);
    }

    #[test]
    fn grouping_narrows_spans_before_collapse() {
        let group = crate::GroupInfo {
            id: "g1".to_string(),
            duration_micros: 30,
            members: vec!["g1".into(), "g2".into(), "g3".into()],
            is_expand: false,
        };
        let mut g1 = span("g1", 1, true);
        g1.group = Some(group.clone());
        let mut g2 = span("g2", 1, false);
        g2.group = Some(group.clone());
        let mut g3 = span("g3", 1, false);
        g3.group = Some(group);
        let spans = vec![span("a", 0, true), g1, span("c", 2, false), g2, g3];

        // collapsed group members never reach row generation
        let visible = crate::group::apply_grouping(&spans);
        let rows = generate_rows(&visible, &BTreeSet::new(), &BTreeSet::new());
        assert_eq!(ids(&rows), vec!["a", "g1", "c"]);

        // collapsing the representative still hides its subtree
        let hidden = children_toggle(&BTreeSet::new(), "g1");
        let rows = generate_rows(&visible, &hidden, &BTreeSet::new());
        assert_eq!(ids(&rows), vec!["a", "g1"]);
    }

    #[test]
    fn collapse_all_then_expand_all_round_trips() {
        let spans = fixture();
        let hidden = collapse_all(&spans);
        assert_eq!(
            hidden,
            ["a".to_string(), "b".to_string()].into_iter().collect()
        );
        let rows = generate_rows(&spans, &hidden, &BTreeSet::new());
        assert_eq!(ids(&rows), vec!["a", "e"]);

        let rows = generate_rows(&spans, &expand_all(), &BTreeSet::new());
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn collapse_one_level_walks_up_from_the_deepest_parents() {
        let spans = fixture();

        let once = collapse_one_level(&spans, &BTreeSet::new());
        assert_eq!(once, ["b".to_string()].into_iter().collect());

        let twice = collapse_one_level(&spans, &once);
        assert_eq!(
            twice,
            ["a".to_string(), "b".to_string()].into_iter().collect()
        );

        // everything collapsed, further calls change nothing
        assert_eq!(collapse_one_level(&spans, &twice), twice);
    }

    #[test]
    fn expand_one_level_walks_down_from_the_shallowest_collapsed() {
        let spans = fixture();
        let all = collapse_all(&spans);

        let once = expand_one_level(&spans, &all);
        assert_eq!(once, ["b".to_string()].into_iter().collect());

        let twice = expand_one_level(&spans, &once);
        assert!(twice.is_empty());
        assert_eq!(expand_one_level(&spans, &twice), twice);
    }
}
