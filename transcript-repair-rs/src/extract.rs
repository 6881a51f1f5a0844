//! Reference extraction
//!
//! Pure accessors over a decoded [`Record`]. Every function tolerates missing
//! or mistyped nested structure and answers with an empty result instead of
//! failing, since the records being inspected are by definition suspect.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::record::{Record, TranscriptLine, ID_KEY, PARENT_ID_KEY};

/// Content block tags that denote a tool invocation
pub const TOOL_CALL_TYPES: [&str; 3] = ["toolCall", "toolUse", "functionCall"];

/// Message roles that denote a standalone tool result record
pub const TOOL_RESULT_ROLES: [&str; 2] = ["toolResult", "tool_result"];

/// Block key present on a tool call whose arguments never finished streaming
pub const PARTIAL_PAYLOAD_KEY: &str = "partialJson";

/// Marker an upstream validator leaves in a rejected-transcript error message
pub const TOOL_USE_ID_MARKER: &str = "tool_use_id";

/// Declared role of a record's message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Assistant,
    User,
    ToolResult,
    Other(String),
}

impl Role {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "assistant" => Role::Assistant,
            "user" => Role::User,
            t if TOOL_RESULT_ROLES.contains(&t) => Role::ToolResult,
            other => Role::Other(other.to_string()),
        }
    }
}

fn str_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

fn content_blocks(record: &Record) -> impl Iterator<Item = &Map<String, Value>> {
    record
        .message()
        .and_then(|msg| msg.get("content"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn is_tool_call_block(block: &Map<String, Value>) -> bool {
    str_field(block, "type").is_some_and(|t| TOOL_CALL_TYPES.contains(&t))
}

/// Role of the record's message, `None` when absent or not a string
pub fn role(record: &Record) -> Option<Role> {
    record
        .message()
        .and_then(|msg| str_field(msg, "role"))
        .map(Role::from_tag)
}

/// The record's `id`, empty when absent
pub fn identity(record: &Record) -> &str {
    record.get(ID_KEY).and_then(Value::as_str).unwrap_or("")
}

/// The record's `parentId`, empty when absent or null
pub fn parent(record: &Record) -> &str {
    record.get(PARENT_ID_KEY).and_then(Value::as_str).unwrap_or("")
}

/// Identities of every tool-call block in the record's content
pub fn tool_call_ids(record: &Record) -> BTreeSet<String> {
    content_blocks(record)
        .filter(|block| is_tool_call_block(block))
        .filter_map(|block| str_field(block, "id"))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// True if any tool-call block still carries a partial argument payload
pub fn has_partial_payload(record: &Record) -> bool {
    content_blocks(record)
        .any(|block| is_tool_call_block(block) && block.contains_key(PARTIAL_PAYLOAD_KEY))
}

/// `errorMessage` of the record's message, empty when absent
pub fn error_message(record: &Record) -> &str {
    record
        .message()
        .and_then(|msg| str_field(msg, "errorMessage"))
        .unwrap_or("")
}

fn stop_reason(record: &Record) -> Option<&str> {
    record.message().and_then(|msg| str_field(msg, "stopReason"))
}

/// Assistant record whose stream ended in error
pub fn is_error_assistant(record: &Record) -> bool {
    role(record) == Some(Role::Assistant) && stop_reason(record) == Some("error")
}

/// Assistant record with no content that recorded an API rejection
pub fn is_empty_error_assistant(record: &Record) -> bool {
    if role(record) != Some(Role::Assistant) {
        return false;
    }
    let empty = match record.message().and_then(|msg| msg.get("content")) {
        None | Some(Value::Null) => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    };
    empty && error_message(record).contains(TOOL_USE_ID_MARKER)
}

/// Tool-call identity answered by a standalone tool-result record
pub fn tool_result_reference(record: &Record) -> Option<&str> {
    if role(record) != Some(Role::ToolResult) {
        return None;
    }
    let msg = record.message()?;
    [str_field(msg, "toolCallId"), str_field(msg, "toolUseId")]
        .into_iter()
        .flatten()
        .find(|id| !id.is_empty())
}

/// Tool-call identities answered by `tool_result` blocks inside a user message
pub fn tool_result_refs_in_user(record: &Record) -> BTreeSet<String> {
    if role(record) != Some(Role::User) {
        return BTreeSet::new();
    }
    content_blocks(record)
        .filter(|block| str_field(block, "type") == Some("tool_result"))
        .filter_map(|block| str_field(block, "tool_use_id"))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tool-call identities carried by every assistant record that did not error
pub fn valid_tool_call_ids(lines: &[TranscriptLine]) -> BTreeSet<String> {
    lines
        .iter()
        .filter_map(|line| line.record.as_ref())
        .filter(|record| role(record) == Some(Role::Assistant) && !is_error_assistant(record))
        .flat_map(tool_call_ids)
        .collect()
}
