//! Repair application
//!
//! Drops removed records, re-points children of removed records at their
//! nearest surviving ancestor, and re-runs detection on the result. Lines
//! that are neither removed nor re-pointed are emitted exactly as read.

use std::collections::BTreeMap;

use crate::detect::{detect, Detection};
use crate::extract;
use crate::record::{self, TranscriptLine};
use crate::remap::{parent_fixes, ParentGraph};

/// Detection plus the parent rewrites a repair would apply
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub detection: Detection,
    /// Removed id -> nearest surviving ancestor
    pub parent_fixes: BTreeMap<String, String>,
}

impl Analysis {
    pub fn is_corrupted(&self) -> bool {
        !self.detection.is_clean()
    }
}

/// Result of applying a repair to a transcript
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    /// Repaired transcript text, newline terminated
    pub content: String,
    pub removed: usize,
    pub parents_rewritten: usize,
    pub lines_before: usize,
    pub lines_after: usize,
    /// Detection re-run over `content`
    pub verification: Detection,
}

impl RepairOutcome {
    pub fn verified(&self) -> bool {
        self.verification.is_clean()
    }
}

/// Detect corruption and compute parent fixes for decoded lines
pub fn analyze_lines(lines: &[TranscriptLine]) -> Analysis {
    let detection = detect(lines);
    if detection.findings.is_empty() {
        return Analysis {
            detection,
            parent_fixes: BTreeMap::new(),
        };
    }
    let graph = ParentGraph::from_lines(lines);
    let fixes = parent_fixes(&graph, &detection.removal_set());
    Analysis {
        detection,
        parent_fixes: fixes,
    }
}

/// Decode and analyze transcript text
pub fn analyze(text: &str) -> Analysis {
    analyze_lines(&record::decode_all(text))
}

/// Produce the repaired sequence and verify it.
///
/// The caller decides whether a clean analysis warrants calling this at all;
/// [`repair`] does not.
pub fn apply(lines: &[TranscriptLine], analysis: &Analysis) -> RepairOutcome {
    let mut output: Vec<String> = Vec::with_capacity(lines.len());
    let mut removed = 0;
    let mut parents_rewritten = 0;

    for line in lines {
        let Some(record) = line.record.as_ref() else {
            output.push(line.raw.clone());
            continue;
        };

        if analysis.detection.is_removed(extract::identity(record)) {
            removed += 1;
            continue;
        }

        let parent = extract::parent(record);
        match analysis.parent_fixes.get(parent) {
            Some(replacement) if !parent.is_empty() => {
                parents_rewritten += 1;
                let mut rewritten = record.with_parent(replacement).to_line();
                if line.raw.ends_with('\r') {
                    rewritten.push('\r');
                }
                output.push(rewritten);
            }
            _ => output.push(line.raw.clone()),
        }
    }

    let content = record::encode(output.iter().map(String::as_str));
    let verification = detect(&record::decode_all(&content));

    tracing::info!(
        removed,
        parents_rewritten,
        lines_before = lines.len(),
        lines_after = output.len(),
        verified = verification.is_clean(),
        "Transcript repair applied"
    );

    RepairOutcome {
        content,
        removed,
        parents_rewritten,
        lines_before: lines.len(),
        lines_after: output.len(),
        verification,
    }
}

/// Analyze and repair in one step. A clean transcript comes back unchanged.
pub fn repair(text: &str) -> (Analysis, RepairOutcome) {
    let lines = record::decode_all(text);
    let analysis = analyze_lines(&lines);
    if !analysis.is_corrupted() {
        let outcome = RepairOutcome {
            content: text.to_string(),
            removed: 0,
            parents_rewritten: 0,
            lines_before: lines.len(),
            lines_after: lines.len(),
            verification: analysis.detection.clone(),
        };
        return (analysis, outcome);
    }
    let outcome = apply(&lines, &analysis);
    (analysis, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_input_is_untouched() {
        let text = "{\"id\":\"1\",\"parentId\":\"\"}\n\n{\"id\":\"2\", \"parentId\": \"1\"}";
        let (analysis, outcome) = repair(text);
        assert!(!analysis.is_corrupted());
        assert_eq!(outcome.content, text);
        assert!(outcome.verified());
    }

    #[test]
    fn test_removed_record_children_are_repointed() {
        let text = concat!(
            r#"{"id":"P","parentId":""}"#, "\n",
            r#"{"id":"A","parentId":"P","message":{"role":"assistant","stopReason":"error","content":[{"type":"toolCall","id":"T1","partialJson":"{"}]}}"#, "\n",
            r#"{"id":"B", "parentId": "A"}"#, "\n",
        );
        let (analysis, outcome) = repair(text);
        assert_eq!(analysis.parent_fixes["A"], "P");
        assert_eq!(outcome.removed, 1);
        assert_eq!(outcome.parents_rewritten, 1);
        assert_eq!(
            outcome.content,
            "{\"id\":\"P\",\"parentId\":\"\"}\n{\"id\":\"B\",\"parentId\":\"P\"}\n"
        );
        assert!(outcome.verified());
    }

    #[test]
    fn test_root_children_are_never_rewritten() {
        // A broken record without an id keys the removal set on "", which
        // must not drag every root record along with it.
        let text = concat!(
            r#"{"message":{"role":"assistant","stopReason":"error","content":[{"type":"toolCall","id":"T1","partialJson":"{"}]}}"#, "\n",
            r#"{"id":"1","parentId":""}"#, "\n",
        );
        let (_, outcome) = repair(text);
        assert_eq!(outcome.parents_rewritten, 0);
        assert_eq!(outcome.content, "{\"id\":\"1\",\"parentId\":\"\"}\n");
    }

    #[test]
    fn test_rewritten_line_keeps_crlf_terminator() {
        let text = concat!(
            r#"{"id":"A","parentId":"","message":{"role":"assistant","stopReason":"error","content":[{"type":"toolCall","id":"T1","partialJson":"{"}]}}"#, "\r\n",
            r#"{"id":"B","parentId":"A"}"#, "\r\n",
            r#"{"id":"C","parentId":"B"}"#, "\r\n",
        );
        let (_, outcome) = repair(text);
        assert_eq!(outcome.parents_rewritten, 1);
        assert_eq!(
            outcome.content,
            "{\"id\":\"B\",\"parentId\":\"\"}\r\n{\"id\":\"C\",\"parentId\":\"B\"}\r\n"
        );
        assert!(outcome.verified());
    }

    #[test]
    fn test_unparseable_only_passes_lines_through_unverified() {
        let text = "{\"id\":\"1\"}\nnot json\n";
        let (analysis, outcome) = repair(text);
        assert!(analysis.is_corrupted());
        assert_eq!(outcome.content, text);
        assert!(!outcome.verified());
        assert_eq!(outcome.verification.unparseable_lines, vec![2]);
    }
}
