//! Reporting
//!
//! [`SessionReport`] is the serializable summary handed to front ends; the
//! `render_*` functions produce the human-readable text for a scan or fix.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::detect::DanglingResult;
use crate::repair::{Analysis, RepairOutcome};

/// Summary of one transcript's analysis
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SessionReport {
    pub file: String,
    pub lines: usize,
    pub corrupted: bool,
    pub broken_assistants: Vec<String>,
    pub orphan_results: Vec<String>,
    pub cascade_errors: Vec<String>,
    pub unparseable_lines: Vec<usize>,
    pub remove_ids: Vec<String>,
    pub remove_count: usize,
    pub parent_fixes: BTreeMap<String, String>,
    pub reasons: BTreeMap<String, String>,
    pub line_map: BTreeMap<String, usize>,
    pub broken_tool_call_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dangling_tool_results: Vec<DanglingResult>,
    /// Set once a repair has been applied and re-checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

impl SessionReport {
    pub fn from_analysis(file: impl Into<String>, analysis: &Analysis) -> Self {
        let detection = &analysis.detection;
        let remove_ids: Vec<String> = detection.removal_set().into_iter().collect();
        Self {
            file: file.into(),
            lines: detection.line_count,
            corrupted: analysis.is_corrupted(),
            broken_assistants: detection.broken_assistants(),
            orphan_results: detection.orphan_results(),
            cascade_errors: detection.cascade_errors(),
            unparseable_lines: detection.unparseable_lines.clone(),
            remove_count: remove_ids.len(),
            remove_ids,
            parent_fixes: analysis.parent_fixes.clone(),
            reasons: detection.reasons(),
            line_map: detection.line_of(),
            broken_tool_call_ids: detection.poisoned_ids.iter().cloned().collect(),
            dangling_tool_results: detection.dangling_results.clone(),
            verified: None,
        }
    }

    /// Record the verification verdict of an applied repair
    pub fn record_outcome(&mut self, outcome: &RepairOutcome) {
        self.verified = Some(outcome.verified());
    }

    /// Removed ids ordered by the line they occupy
    pub fn ids_by_line(&self) -> Vec<(&str, usize)> {
        let mut ids: Vec<(&str, usize)> = self
            .line_map
            .iter()
            .map(|(id, line)| (id.as_str(), *line))
            .collect();
        ids.sort_by_key(|(_, line)| *line);
        ids
    }

    /// `L3, L7, L9`
    pub fn lines_info(&self) -> String {
        self.ids_by_line()
            .iter()
            .map(|(_, line)| format!("L{}", line))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Text for a transcript that was scanned but not modified
pub fn render_scan(report: &SessionReport, verbose: bool) -> String {
    if !report.corrupted {
        return format!("  {}: clean, nothing to do.", report.file);
    }

    let mut out = vec![
        format!("  {}:", report.file),
        format!("    Total lines: {}", report.lines),
        format!("    Broken assistant messages: {}", report.broken_assistants.len()),
        format!("    Orphan synthetic toolResults: {}", report.orphan_results.len()),
        format!("    Cascade error responses: {}", report.cascade_errors.len()),
    ];
    if !report.unparseable_lines.is_empty() {
        let listed = report
            .unparseable_lines
            .iter()
            .map(|l| format!("L{}", l))
            .collect::<Vec<_>>()
            .join(", ");
        out.push(format!(
            "    Unparseable JSONL lines: {} ({})",
            report.unparseable_lines.len(),
            listed
        ));
    }
    out.push(format!("    Lines to remove ({}): {}", report.remove_count, report.lines_info()));
    out.push(format!("    Poisoned tool_call IDs: {}", report.broken_tool_call_ids.join(", ")));
    out.push(format!("    Parent chain fixes: {}", report.parent_fixes.len()));

    if !report.dangling_tool_results.is_empty() {
        out.push(format!(
            "    Dangling tool_result blocks (not removed): {}",
            report.dangling_tool_results.len()
        ));
    }

    if verbose && !report.reasons.is_empty() {
        out.push("    Details:".to_string());
        for (id, line) in report.ids_by_line() {
            if let Some(reason) = report.reasons.get(id) {
                out.push(format!("      L{}: {}", line, reason));
            }
        }
        for dangling in &report.dangling_tool_results {
            out.push(format!(
                "      L{}: dangling tool_result for {} (kept)",
                dangling.line_number, dangling.tool_call_id
            ));
        }
    }
    out.join("\n")
}

/// Text for a transcript that was rewritten
pub fn render_fix(report: &SessionReport, outcome: &RepairOutcome, backup: &str) -> String {
    let verdict = if outcome.verified() {
        "CLEAN"
    } else {
        "STILL CORRUPTED (may need another pass)"
    };
    [
        format!("  {}:", report.file),
        format!("    Backup: {}", backup),
        format!("    Removed {} corrupted lines: {}", outcome.removed, report.lines_info()),
        format!("    Fixed {} parent references", outcome.parents_rewritten),
        format!("    Lines: {} -> {}", outcome.lines_before, outcome.lines_after),
        format!("    Verified: {}", verdict),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::repair;

    const CORRUPT: &str = concat!(
        r#"{"id":"A","parentId":"","message":{"role":"assistant","stopReason":"error","errorMessage":"terminated","content":[{"type":"toolCall","id":"T1","partialJson":"{"}]}}"#, "\n",
        r#"{"id":"R1","parentId":"A","message":{"role":"toolResult","toolCallId":"T1"}}"#, "\n",
        r#"{"id":"B","parentId":"R1"}"#, "\n",
        "garbage\n",
    );

    #[test]
    fn test_report_fields() {
        let (analysis, _) = repair(CORRUPT);
        let report = SessionReport::from_analysis("s.jsonl", &analysis);
        assert!(report.corrupted);
        assert_eq!(report.lines, 4);
        assert_eq!(report.remove_ids, vec!["A", "R1"]);
        assert_eq!(report.remove_count, 2);
        assert_eq!(report.unparseable_lines, vec![4]);
        assert_eq!(report.broken_tool_call_ids, vec!["T1"]);
        assert_eq!(report.lines_info(), "L1, L2");
    }

    #[test]
    fn test_render_scan_verbose_lists_details_in_line_order() {
        let (analysis, _) = repair(CORRUPT);
        let report = SessionReport::from_analysis("s.jsonl", &analysis);
        let text = render_scan(&report, true);
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("  s.jsonl:"));
        assert_eq!(lines.next(), Some("    Total lines: 4"));
        assert!(!text.ends_with('\n'));
        assert!(text.contains("Unparseable JSONL lines: 1 (L4)"));
        assert!(text.contains("Lines to remove (2): L1, L2"));
        let first = text.find("L1: error+partialJson: terminated").unwrap();
        let second = text.find("L2: orphan toolResult for T1").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_render_fix_reports_verdict() {
        let (analysis, outcome) = repair(CORRUPT);
        let report = SessionReport::from_analysis("s.jsonl", &analysis);
        let text = render_fix(&report, &outcome, "s.jsonl.backup-20260101_000000");
        assert!(text.contains("Removed 2 corrupted lines: L1, L2"));
        assert!(text.contains("Lines: 4 -> 2"));
        // The garbage line survives, so the result is still flagged.
        assert!(text.contains("STILL CORRUPTED"));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let (analysis, _) = repair(CORRUPT);
        let report = SessionReport::from_analysis("s.jsonl", &analysis);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["remove_count"], 2);
        assert_eq!(value["parent_fixes"]["R1"], "");
        assert!(value.get("dangling_tool_results").is_none());
        assert!(value.get("verified").is_none());
    }

    #[test]
    fn test_record_outcome_sets_verified() {
        let (analysis, outcome) = repair(CORRUPT);
        let mut report = SessionReport::from_analysis("s.jsonl", &analysis);
        report.record_outcome(&outcome);
        assert_eq!(report.verified, Some(false));
    }
}
