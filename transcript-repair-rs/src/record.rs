//! Record decoding
//!
//! A transcript is newline-delimited JSON. Each non-empty line becomes a
//! [`TranscriptLine`]; a line that does not decode to a JSON object keeps its
//! raw text and carries no record, so one bad line never aborts the scan.

use serde_json::{Map, Value};

/// Key holding a record's own identity
pub const ID_KEY: &str = "id";

/// Key holding the identity of a record's parent
pub const PARENT_ID_KEY: &str = "parentId";

/// A decoded transcript record.
///
/// The decoded object is kept whole so that a record can be re-emitted with
/// only its parent reference changed and every other key in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    object: Map<String, Value>,
}

impl Record {
    /// Decode a single line. Anything other than a JSON object is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(object)) => Some(Self { object }),
            _ => None,
        }
    }

    /// Field lookup on the top-level object
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.object.get(key)
    }

    /// The `message` object, if present and actually an object
    pub fn message(&self) -> Option<&Map<String, Value>> {
        self.object.get("message").and_then(Value::as_object)
    }

    /// Copy of this record pointing at a different parent
    pub fn with_parent(&self, parent_id: &str) -> Self {
        let mut object = self.object.clone();
        object.insert(PARENT_ID_KEY.to_string(), Value::String(parent_id.to_string()));
        Self { object }
    }

    /// Compact single-line JSON. Only used for records that were rewritten.
    pub fn to_line(&self) -> String {
        Value::Object(self.object.clone()).to_string()
    }
}

/// One non-empty line of a transcript
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptLine {
    /// 1-based physical line number, blank lines included in the count
    pub line_number: usize,
    /// Decoded record, `None` when the line is unparseable
    pub record: Option<Record>,
    /// The line exactly as read, without its terminator
    pub raw: String,
}

impl TranscriptLine {
    pub fn is_unparseable(&self) -> bool {
        self.record.is_none()
    }
}

/// Lazily decode a transcript into positioned lines.
///
/// Blank lines (including a lone carriage return) are skipped and never
/// re-emitted.
pub fn decode(text: &str) -> impl Iterator<Item = TranscriptLine> + '_ {
    text.split('\n')
        .enumerate()
        .filter(|(_, raw)| !raw.trim_end_matches('\r').is_empty())
        .map(|(index, raw)| TranscriptLine {
            line_number: index + 1,
            record: Record::parse(raw),
            raw: raw.to_string(),
        })
}

/// Decode eagerly; the detector makes several passes over the same lines.
pub fn decode_all(text: &str) -> Vec<TranscriptLine> {
    decode(text).collect()
}

/// Join lines back into transcript text with a single trailing newline
pub fn encode<'a, I>(lines: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_skips_blank_lines_but_keeps_numbering() {
        let text = "{\"id\":\"1\"}\n\n{\"id\":\"2\"}\n";
        let lines = decode_all(text);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line_number, 1);
        assert_eq!(lines[1].line_number, 3);
        assert_eq!(lines[1].raw, "{\"id\":\"2\"}");
    }

    #[test]
    fn test_decode_keeps_unparseable_raw_text() {
        let lines = decode_all("{\"id\":\"1\"}\n{not json\n");
        assert_eq!(lines.len(), 2);
        assert!(lines[1].is_unparseable());
        assert_eq!(lines[1].raw, "{not json");
        assert_eq!(lines[1].line_number, 2);
    }

    #[test]
    fn test_non_object_json_is_unparseable() {
        let lines = decode_all("[1,2,3]\n42\n\"text\"\n");
        assert!(lines.iter().all(TranscriptLine::is_unparseable));
    }

    #[test]
    fn test_carriage_return_only_line_is_blank() {
        let lines = decode_all("{\"id\":\"1\"}\r\n\r\n{\"id\":\"2\"}\r\n");
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| !l.is_unparseable()));
        assert_eq!(lines[0].raw, "{\"id\":\"1\"}\r");
    }

    #[test]
    fn test_with_parent_preserves_key_order() {
        let record = Record::parse(r#"{"type":"message","id":"B","parentId":"R1","message":{"role":"user"}}"#)
            .unwrap();
        let rewritten = record.with_parent("X");
        assert_eq!(
            rewritten.to_line(),
            r#"{"type":"message","id":"B","parentId":"X","message":{"role":"user"}}"#
        );
    }

    #[test]
    fn test_encode_appends_single_trailing_newline() {
        assert_eq!(encode(vec!["a", "b"]), "a\nb\n");
        assert_eq!(encode(Vec::<&str>::new()), "");
    }
}
