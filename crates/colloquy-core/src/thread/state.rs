//! Conversation state for a single thread.
//!
//! `ConversationState` is owned exclusively by the turn loop for the duration
//! of one turn. Everything here is serde-serializable so a suspended turn
//! (awaiting an approval decision) stays inspectable.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolDescriptor;

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model.
///
/// Arguments are raw, exactly as the model emitted them; they may be
/// malformed until the schema validator has seen them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider call id, used to pair the result message
    pub id: String,
    pub name: String,
    pub arguments: Value,
    /// Turn index on which the model requested this call
    #[serde(default)]
    pub turn: u64,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            turn: 0,
        }
    }
}

/// Structured outcome of a tool call: produced by the executor, by the
/// schema validator (on rejection), or by the approval gate (on denial).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success { payload: Value },
    Error { error_type: String, message: String },
}

impl ToolResult {
    pub fn success(payload: Value) -> Self {
        Self::Success { payload }
    }

    pub fn error(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Serialize for a tool-role message body
    pub fn to_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"status\":\"error\"}".to_string())
    }
}

/// One message in the conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Tool calls attached to an assistant message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    /// Pairing id for a tool-role message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCallRequest>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, result: &ToolResult) -> Self {
        Self {
            role: Role::Tool,
            content: result.to_content(),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }

    /// Whether this assistant message carries tool calls
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|tc| !tc.is_empty())
    }
}

/// Per-thread conversation state, single-writer.
///
/// The retry counter is monotone within a turn and reset only when a new
/// user message starts a turn. The pending-approval slot is the suspension
/// point of the turn state machine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    /// Malformed-call retries consumed this turn
    pub retry_count: u32,
    /// Tool call awaiting an external approve/deny decision
    pub pending_approval: Option<ToolCallRequest>,
    /// Intent classifier output, cached for the remainder of the turn
    pub active_tools: Option<Vec<ToolDescriptor>>,
    /// Index of the current user turn (increments per user message)
    pub turn_index: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new user turn: reset the retry budget and drop the cached
    /// tool set and any stale pending approval.
    pub fn begin_turn(&mut self, content: impl Into<String>) {
        self.turn_index += 1;
        self.retry_count = 0;
        self.pending_approval = None;
        self.active_tools = None;
        self.messages.push(Message::user(content));
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Roll back to a snapshot taken at turn start (turn abandoned)
    pub fn truncate_to(&mut self, len: usize) {
        self.messages.truncate(len);
        self.pending_approval = None;
        self.active_tools = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn begin_turn_resets_retry_budget() {
        let mut state = ConversationState::new();
        state.begin_turn("first");
        state.retry_count = 2;
        state.pending_approval = Some(ToolCallRequest::new("c1", "web_search", json!({})));

        state.begin_turn("second");
        assert_eq!(state.retry_count, 0);
        assert!(state.pending_approval.is_none());
        assert!(state.active_tools.is_none());
        assert_eq!(state.turn_index, 2);
    }

    #[test]
    fn tool_result_serializes_with_status_tag() {
        let ok = ToolResult::success(json!({"result": 8}));
        let text = ok.to_content();
        assert!(text.contains("\"status\":\"success\""));

        let err = ToolResult::error("denied_by_user", "Rejected");
        let text = err.to_content();
        assert!(text.contains("\"status\":\"error\""));
        assert!(text.contains("denied_by_user"));
    }

    #[test]
    fn message_roundtrips_through_serde() {
        let call = ToolCallRequest::new("c1", "calculator", json!({"first_num": 5}));
        let message = Message::assistant_with_tool_calls("", vec![call]);
        let text = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&text).unwrap();
        assert!(back.has_tool_calls());
        assert_eq!(back.tool_calls.unwrap()[0].name, "calculator");
    }
}
