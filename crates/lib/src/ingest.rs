//! External span schema: the JSON shape emitted by exporters, one span per
//! line in files and batched in collector requests.

use serde::Deserialize;

/// Span as represented in the exported stream.
#[derive(Debug, Deserialize)]
pub struct Span {
    pub span_id: String,
    pub trace_id: String,
    #[serde(default)]
    pub parent_span_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub kind: Option<String>,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub logs: Vec<Log>,
    #[serde(default)]
    pub group: Option<Group>,
}

#[derive(Debug, Deserialize)]
pub struct Tag {
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub fields: Vec<Tag>,
}

/// Sibling-run grouping computed by the exporter. `representative` names
/// the span that stands in for the collapsed run.
#[derive(Debug, Deserialize)]
pub struct Group {
    pub representative: String,
    pub duration_us: i64,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub expanded: bool,
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl From<Tag> for crate::Tag {
    fn from(tag: Tag) -> Self {
        Self {
            value: value_to_string(&tag.value),
            key: tag.key,
        }
    }
}

impl From<Span> for crate::Span {
    fn from(value: Span) -> Self {
        let start = value.start_time;
        let logs = value
            .logs
            .into_iter()
            .map(|log| crate::LogEntry {
                timestamp_micros: (log.timestamp - start).num_microseconds().unwrap_or_default(),
                fields: log.fields.into_iter().map(crate::Tag::from).collect(),
            })
            .collect();
        let group = value.group.map(|g| crate::GroupInfo {
            id: g.representative,
            duration_micros: g.duration_us,
            members: g.members,
            is_expand: g.expanded,
        });

        Self {
            id: value.span_id,
            name: value.name,
            service: value.service,
            kind: value.kind.as_deref().map(crate::SpanKind::parse).unwrap_or_default(),
            start,
            duration_micros: (value.end_time - start).num_microseconds().unwrap_or_default(),
            trace_id: value.trace_id,
            parent_id: value.parent_span_id,
            tags: value.tags.into_iter().map(crate::Tag::from).collect(),
            logs,
            group,
            ..Default::default()
        }
    }
}
