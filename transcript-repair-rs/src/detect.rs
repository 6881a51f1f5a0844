//! Corruption detection
//!
//! Four passes over a decoded transcript:
//!
//! 1. broken assistant records (stream error with a partial tool-call payload);
//!    their tool-call ids form the poisoned set
//! 2. tool results answering a poisoned id
//! 3. empty assistant records whose error message names a poisoned id
//! 4. the removal set, the union of the above
//!
//! Unparseable lines are reported alongside but never removed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::extract::{self, Role};
use crate::record::TranscriptLine;

/// Number of characters of an error message kept in a broken-assistant reason
pub const REASON_EXCERPT_CHARS: usize = 80;

/// Why a record is being removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Corruption {
    /// Assistant stream failed mid tool call
    BrokenAssistant { error_excerpt: String },
    /// Tool result answering a call that never completed
    OrphanResult { tool_call_id: String },
    /// Upstream rejection triggered by the orphaned result
    CascadeError { tool_call_id: String },
}

impl fmt::Display for Corruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Corruption::BrokenAssistant { error_excerpt } => {
                write!(f, "error+partialJson: {}", error_excerpt)
            }
            Corruption::OrphanResult { tool_call_id } => {
                write!(f, "orphan toolResult for {}", tool_call_id)
            }
            Corruption::CascadeError { tool_call_id } => {
                write!(f, "cascade 400 referencing {}", tool_call_id)
            }
        }
    }
}

/// A classified record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub line_number: usize,
    pub corruption: Corruption,
}

/// A user `tool_result` block answering a call no assistant record carries.
/// Reported for inspection only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingResult {
    pub line_number: usize,
    pub record_id: String,
    pub tool_call_id: String,
}

/// Output of a detection run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    /// Every record to remove, keyed by id
    pub findings: BTreeMap<String, Finding>,
    /// Tool-call ids carried by broken assistant records
    pub poisoned_ids: BTreeSet<String>,
    pub unparseable_lines: Vec<usize>,
    pub dangling_results: Vec<DanglingResult>,
    /// Non-empty lines scanned
    pub line_count: usize,
}

impl Detection {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty() && self.unparseable_lines.is_empty()
    }

    pub fn removal_set(&self) -> BTreeSet<String> {
        self.findings.keys().cloned().collect()
    }

    pub fn is_removed(&self, id: &str) -> bool {
        self.findings.contains_key(id)
    }

    pub fn reasons(&self) -> BTreeMap<String, String> {
        self.findings
            .iter()
            .map(|(id, finding)| (id.clone(), finding.corruption.to_string()))
            .collect()
    }

    pub fn line_of(&self) -> BTreeMap<String, usize> {
        self.findings
            .iter()
            .map(|(id, finding)| (id.clone(), finding.line_number))
            .collect()
    }

    fn ids_where(&self, pred: impl Fn(&Corruption) -> bool) -> Vec<String> {
        self.findings
            .iter()
            .filter(|(_, finding)| pred(&finding.corruption))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn broken_assistants(&self) -> Vec<String> {
        self.ids_where(|c| matches!(c, Corruption::BrokenAssistant { .. }))
    }

    pub fn orphan_results(&self) -> Vec<String> {
        self.ids_where(|c| matches!(c, Corruption::OrphanResult { .. }))
    }

    pub fn cascade_errors(&self) -> Vec<String> {
        self.ids_where(|c| matches!(c, Corruption::CascadeError { .. }))
    }

    fn classify(&mut self, id: &str, line_number: usize, corruption: Corruption) {
        // Classes are disjoint in practice; the earlier pass keeps its claim.
        self.findings
            .entry(id.to_string())
            .or_insert(Finding {
                line_number,
                corruption,
            });
    }
}

fn excerpt(message: &str) -> String {
    message.chars().take(REASON_EXCERPT_CHARS).collect()
}

/// Classify every record of a decoded transcript
pub fn detect(lines: &[TranscriptLine]) -> Detection {
    let mut detection = Detection {
        line_count: lines.len(),
        unparseable_lines: lines
            .iter()
            .filter(|line| line.is_unparseable())
            .map(|line| line.line_number)
            .collect(),
        ..Detection::default()
    };

    let records = || {
        lines
            .iter()
            .filter_map(|line| line.record.as_ref().map(|record| (line.line_number, record)))
    };

    // Pass 1: broken assistants
    for (line_number, record) in records() {
        if extract::is_error_assistant(record) && extract::has_partial_payload(record) {
            detection
                .poisoned_ids
                .extend(extract::tool_call_ids(record));
            detection.classify(
                extract::identity(record),
                line_number,
                Corruption::BrokenAssistant {
                    error_excerpt: excerpt(extract::error_message(record)),
                },
            );
        }
    }

    // Pass 2: orphan results, standalone or embedded in a user message
    for (line_number, record) in records() {
        let standalone = extract::tool_result_reference(record)
            .filter(|id| detection.poisoned_ids.contains(*id))
            .map(str::to_string);
        let orphaned = standalone.or_else(|| {
            extract::tool_result_refs_in_user(record)
                .into_iter()
                .find(|id| detection.poisoned_ids.contains(id))
        });
        if let Some(tool_call_id) = orphaned {
            detection.classify(
                extract::identity(record),
                line_number,
                Corruption::OrphanResult { tool_call_id },
            );
        }
    }

    // Pass 3: cascade errors, substring match against the poisoned ids
    for (line_number, record) in records() {
        if !extract::is_empty_error_assistant(record) {
            continue;
        }
        let message = extract::error_message(record);
        let hit = detection
            .poisoned_ids
            .iter()
            .find(|id| message.contains(id.as_str()))
            .cloned();
        if let Some(tool_call_id) = hit {
            detection.classify(
                extract::identity(record),
                line_number,
                Corruption::CascadeError { tool_call_id },
            );
        }
    }

    // Report-only: user tool results with no matching call anywhere
    let valid_calls = extract::valid_tool_call_ids(lines);
    for (line_number, record) in records() {
        if extract::role(record) != Some(Role::User) {
            continue;
        }
        for tool_call_id in extract::tool_result_refs_in_user(record) {
            if !valid_calls.contains(&tool_call_id) && !detection.poisoned_ids.contains(&tool_call_id) {
                detection.dangling_results.push(DanglingResult {
                    line_number,
                    record_id: extract::identity(record).to_string(),
                    tool_call_id,
                });
            }
        }
    }

    if !detection.is_clean() {
        tracing::debug!(
            removals = detection.findings.len(),
            poisoned = detection.poisoned_ids.len(),
            unparseable = detection.unparseable_lines.len(),
            "Transcript corruption detected"
        );
    }

    detection
}
