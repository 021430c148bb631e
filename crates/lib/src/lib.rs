use std::{
    collections::{BTreeSet, HashMap},
    io::Read,
    path::Path,
};

pub mod collector;
pub mod generation;
pub mod group;
pub mod ingest;
pub mod position;
pub mod prefs;
pub mod rows;
pub mod search;
pub mod view_range;
pub mod window;

use tracing::error;

pub fn parse_file(file_path: &Path) -> Result<Vec<Span>, String> {
    let mut contents = String::new();
    std::fs::File::open(file_path)
        .and_then(|mut f| f.read_to_string(&mut contents))
        .map_err(|e| e.to_string())?;
    Ok(contents
        .lines()
        .enumerate()
        .map(|(line, contents)| {
            serde_json::from_str(contents)
                .map_err(|e| format!("unable to parse line {line}: {e}", line = line + 1))
        })
        .collect::<Result<Vec<ingest::Span>, _>>()?
        .into_iter()
        .map(Span::from)
        .collect())
}

pub fn build_traces(spans: Vec<Span>) -> Result<Vec<Trace>, String> {
    let (roots, rest): (Vec<Span>, Vec<Span>) =
        spans.into_iter().partition(|s| s.parent_id.is_none());

    let rest: HashMap<String, Vec<Span>> = rest.into_iter().fold(HashMap::new(), |mut m, span| {
        m.entry(span.trace_id.clone()).or_default().push(span);
        m
    });

    roots
        .into_iter()
        .map(|root| {
            let descendants = rest.get(&root.trace_id).cloned().unwrap_or_default();
            Trace::new(root, descendants)
        })
        .collect()
}

/// A key/value annotation on a [`Span`] or a log line. Order within the
/// owning span is preserved.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Timestamped event recorded inside a span.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Microseconds relative to the owning span's start.
    pub timestamp_micros: i64,
    pub fields: Vec<Tag>,
}

/// How the span relates to its peer: the caller/callee side of a sync or
/// async edge, or a span inferred from partial data.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    #[default]
    Unspecified,
    Internal,
    SyncServer,
    SyncClient,
    AsyncClient,
    AsyncServer,
    Inferred,
}

impl SpanKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "internal" => Self::Internal,
            "sync-server" | "server" => Self::SyncServer,
            "sync-client" | "client" => Self::SyncClient,
            "async-client" | "producer" => Self::AsyncClient,
            "async-server" | "consumer" => Self::AsyncServer,
            "inferred" => Self::Inferred,
            _ => Self::Unspecified,
        }
    }
}

/// Membership of a span in a run of grouped siblings. `id` names the
/// representative span; a collapsed group renders only the representative,
/// with `duration_micros` as the aggregate bar length.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub id: String,
    pub duration_micros: i64,
    pub members: Vec<String>,
    pub is_expand: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Span {
    pub id: String,
    pub name: String,
    pub service: String,
    pub kind: SpanKind,
    pub start: chrono::DateTime<chrono::Utc>,

    /// Microsecond relative offset from beginning of root span.
    pub offset_micros: i64,

    /// Microsecond duration of span.
    pub duration_micros: i64,

    /// Depth within [`Trace`]. Root is 0.
    pub depth: usize,

    /// Whether any span in the pre-order sequence is a direct child.
    pub has_children: bool,

    pub trace_id: String,
    pub parent_id: Option<String>, // None == root span
    pub tags: Vec<Tag>,
    pub logs: Vec<LogEntry>,
    pub group: Option<GroupInfo>,
}

/// Structural-integrity failure of a span tree. The pre-order flat form
/// only renders correctly when each span is at most one level deeper than
/// its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("trace {trace_id} starts at depth {depth}, expected 0")]
    RootDepth { trace_id: String, depth: usize },
    #[error("span {id} at depth {depth} follows a span at depth {prev_depth}")]
    DepthJump {
        id: String,
        depth: usize,
        prev_depth: usize,
    },
}

#[derive(Debug, Clone)]
pub struct Trace {
    pub id: String,

    /// Depth-first pre-order; a span's descendants are the contiguous run
    /// of strictly-deeper spans that follows it.
    pub spans: Vec<Span>,
}

impl Trace {
    pub fn new(root: Span, descendants: Vec<Span>) -> Result<Self, String> {
        /// Build `Vec<Span>` in pre-order (for simpler rendering)
        fn build_tree_vec(
            id: &String,
            connections: &HashMap<String, Vec<String>>,
            spans: &HashMap<String, Span>,
            mut acc: Vec<Span>,
            depth: usize,
        ) -> Vec<Span> {
            if let Some(children) = connections.get(id) {
                let mut more_spans = Vec::new();
                let mut children = children
                    .iter()
                    .filter_map(|child_id| match spans.get(child_id).cloned() {
                        Some(child) => Some(child),
                        None => {
                            error!("child {child_id} not found for parent {id}");
                            None
                        }
                    })
                    .collect::<Vec<_>>();
                children.sort_by_key(|child| child.start);

                for mut child in children {
                    let id = child.id.clone();
                    child.depth = depth + 1;
                    more_spans.push(child);
                    more_spans = build_tree_vec(&id, connections, spans, more_spans, depth + 1);
                }
                acc.append(&mut more_spans);
            }
            acc
        }

        let descendants = descendants
            .into_iter()
            .map(|mut span| {
                span.offset_micros = (span.start - root.start)
                    .num_microseconds()
                    .unwrap_or_default();
                (span.id.clone(), span)
            })
            .collect::<HashMap<_, _>>();
        let connections: HashMap<String, Vec<String>> =
            descendants.values().fold(HashMap::new(), |mut m, span| {
                if let Some(parent_id) = span.parent_id.clone() {
                    m.entry(parent_id).or_default().push(span.id.clone());
                } else {
                    error!("attempted to access non-existent parent of {}", span.id);
                }
                m
            });

        let trace_id = root.trace_id.clone();
        let root_id = root.id.clone();

        // build in render order, then mark parents
        let mut spans = build_tree_vec(&root_id, &connections, &descendants, vec![root], 0);
        for i in 0..spans.len() {
            let has_children = spans
                .get(i + 1)
                .map_or(false, |next| next.depth == spans[i].depth + 1);
            spans[i].has_children = has_children;
        }

        let trace = Trace {
            id: trace_id,
            spans,
        };
        trace.validate().map_err(|e| e.to_string())?;
        Ok(trace)
    }

    /// Check the pre-order depth invariant. A violating trace would render
    /// with wrong indentation and wrong collapse scopes, so it is rejected
    /// outright.
    pub fn validate(&self) -> Result<(), TreeError> {
        if let Some(first) = self.spans.first() {
            if first.depth != 0 {
                return Err(TreeError::RootDepth {
                    trace_id: self.id.clone(),
                    depth: first.depth,
                });
            }
        }
        for pair in self.spans.windows(2) {
            if pair[1].depth > pair[0].depth + 1 {
                return Err(TreeError::DepthJump {
                    id: pair[1].id.clone(),
                    depth: pair[1].depth,
                    prev_depth: pair[0].depth,
                });
            }
        }
        Ok(())
    }

    pub fn duration_micros(&self) -> i64 {
        self.spans
            .iter()
            .map(|s| s.offset_micros + s.duration_micros)
            .max()
            .unwrap_or_default()
    }

    /// Structural union with another trace (cross-application merge). The
    /// result is a fresh pre-order build over the combined span set; this
    /// trace's root stays the root, and any parentless span from `other`
    /// is attached beneath it.
    pub fn merge(self, other: Trace) -> Result<Trace, String> {
        let mut seen: BTreeSet<String> = self.spans.iter().map(|s| s.id.clone()).collect();
        let mut spans = self.spans;
        let root_id = spans
            .first()
            .map(|s| s.id.clone())
            .ok_or("cannot merge empty traces")?;

        for mut span in other.spans {
            if !seen.insert(span.id.clone()) {
                continue;
            }
            if span.parent_id.is_none() {
                span.parent_id = Some(root_id.clone());
            }
            spans.push(span);
        }

        let mut spans = spans.into_iter();
        let root = spans.next().ok_or("cannot merge empty traces")?;
        Trace::new(root, spans.collect())
    }
}

/// Default collapse state applied when a trace is loaded: everything below
/// depth 1 starts hidden.
pub fn default_hidden_ids(spans: &[Span]) -> BTreeSet<String> {
    spans
        .iter()
        .filter(|s| s.has_children && s.depth >= 1)
        .map(|s| s.id.clone())
        .collect()
}
