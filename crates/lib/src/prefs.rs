//! Persisted UI preferences: the temporary comparison-trace list and
//! per-table column visibility. Stored as one JSON file; a missing or
//! unreadable file loads as defaults, never as an error.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Most recent comparison-trace ids kept; the oldest are evicted first.
pub const MAX_COMPARISON_TRACES: usize = 10;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefs {
    #[serde(default)]
    pub comparison_traces: Vec<String>,

    /// Visible column names per table id. A table with no entry shows its
    /// built-in default columns.
    #[serde(default)]
    pub columns: BTreeMap<String, Vec<String>>,
}

impl Prefs {
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&contents) {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!("ignoring unreadable preferences at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let contents = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, contents).map_err(|e| e.to_string())
    }

    /// Remember a trace id for comparison. Re-adding an id moves it to the
    /// back; the list stays capped.
    pub fn push_comparison(&mut self, trace_id: &str) {
        self.comparison_traces.retain(|id| id != trace_id);
        self.comparison_traces.push(trace_id.to_string());
        while self.comparison_traces.len() > MAX_COMPARISON_TRACES {
            self.comparison_traces.remove(0);
        }
    }

    pub fn clear_comparisons(&mut self) {
        self.comparison_traces.clear();
    }

    pub fn visible_columns(&self, table: &str) -> Option<&[String]> {
        self.columns.get(table).map(Vec::as_slice)
    }

    pub fn set_visible_columns(&mut self, table: &str, columns: Vec<String>) {
        self.columns.insert(table.to_string(), columns);
    }
}
