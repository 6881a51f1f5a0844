//! Parent remapping
//!
//! Removing a record would leave its children pointing at nothing. For each
//! removed id we find the nearest ancestor that survives, walking an
//! id-to-parent map rather than live links between records.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::extract;
use crate::record::TranscriptLine;

/// Parent reference of every decoded record, keyed by id
#[derive(Debug, Clone, Default)]
pub struct ParentGraph {
    parents: HashMap<String, String>,
}

impl ParentGraph {
    /// Build from decoded lines. A repeated id keeps its last parent.
    pub fn from_lines(lines: &[TranscriptLine]) -> Self {
        let parents = lines
            .iter()
            .filter_map(|line| line.record.as_ref())
            .map(|record| {
                (
                    extract::identity(record).to_string(),
                    extract::parent(record).to_string(),
                )
            })
            .collect();
        Self { parents }
    }

    /// Parent of `id`; unknown ids behave as roots
    pub fn parent_of(&self, id: &str) -> &str {
        self.parents.get(id).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Nearest ancestor of `id` that is not in `removed`.
    ///
    /// The walk stops early if it revisits an id, returning the candidate it
    /// was holding at that point. Only a cyclic parent graph triggers this.
    pub fn surviving_ancestor(&self, id: &str, removed: &BTreeSet<String>) -> String {
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(id);
        let mut ancestor = self.parent_of(id);
        while removed.contains(ancestor) {
            if !seen.insert(ancestor) {
                tracing::warn!(record = id, at = ancestor, "Cycle in parent chain");
                break;
            }
            ancestor = self.parent_of(ancestor);
        }
        ancestor.to_string()
    }
}

/// Replacement parent for every removed id
pub fn parent_fixes(graph: &ParentGraph, removed: &BTreeSet<String>) -> BTreeMap<String, String> {
    removed
        .iter()
        .map(|id| (id.clone(), graph.surviving_ancestor(id, removed)))
        .collect()
}
