//! Thread I/O protocol.
//!
//! These types define the input/output contract between frontends (CLI, UI)
//! and the turn loops running in colloquy-core.

use serde::{Deserialize, Serialize};

/// Unique identifier for a conversation thread
pub type ThreadId = String;

/// Input messages sent TO a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadInput {
    /// User sends a message, starting a new turn
    UserMessage { content: String },
    /// User approves a pending tool execution
    ApproveTool { tool_call_id: String },
    /// User denies a pending tool execution
    DenyTool {
        tool_call_id: String,
        reason: Option<String>,
    },
    /// User abandons the current turn
    Cancel,
}

impl ThreadInput {
    pub fn user_message(content: impl Into<String>) -> Self {
        Self::UserMessage {
            content: content.into(),
        }
    }

    pub fn approve_tool(tool_call_id: impl Into<String>) -> Self {
        Self::ApproveTool {
            tool_call_id: tool_call_id.into(),
        }
    }

    pub fn deny_tool(tool_call_id: impl Into<String>, reason: Option<String>) -> Self {
        Self::DenyTool {
            tool_call_id: tool_call_id.into(),
            reason,
        }
    }

    pub fn cancel() -> Self {
        Self::Cancel
    }
}

/// Output messages sent FROM a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadOutput {
    /// Thread is ready to receive input
    Ready,
    /// Turn finished; thread is waiting for the next input
    Idle,
    /// Echo of the user message (for UI display)
    UserMessage { content: String },
    /// Final assistant message for the turn
    AssistantMessage { content: String },
    /// Tool execution starting (schema-valid, approved where required)
    ToolStart {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },
    /// Tool call suspended awaiting an approve/deny decision
    ToolPending {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },
    /// Tool call finished (success, failure, schema rejection, or denial)
    ToolDone {
        id: String,
        name: String,
        success: bool,
        output: String,
    },
    /// Turn-level failure; the turn produced no assistant message
    Error { message: String },
    /// Turn was abandoned by the user
    Cancelled,
}

impl ThreadOutput {
    pub fn ready() -> Self {
        Self::Ready
    }

    pub fn idle() -> Self {
        Self::Idle
    }

    pub fn user_message(content: impl Into<String>) -> Self {
        Self::UserMessage {
            content: content.into(),
        }
    }

    pub fn assistant_message(content: impl Into<String>) -> Self {
        Self::AssistantMessage {
            content: content.into(),
        }
    }

    pub fn tool_start(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self::ToolStart {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    pub fn tool_pending(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self::ToolPending {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    pub fn tool_done(
        id: impl Into<String>,
        name: impl Into<String>,
        success: bool,
        output: impl Into<String>,
    ) -> Self {
        Self::ToolDone {
            id: id.into(),
            name: name.into(),
            success,
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_roundtrips_through_serde() {
        let input = ThreadInput::deny_tool("call-1", Some("not today".to_string()));
        let json = serde_json::to_string(&input).unwrap();
        assert!(json.contains("deny_tool"));

        match serde_json::from_str::<ThreadInput>(&json).unwrap() {
            ThreadInput::DenyTool {
                tool_call_id,
                reason,
            } => {
                assert_eq!(tool_call_id, "call-1");
                assert_eq!(reason.as_deref(), Some("not today"));
            }
            _ => panic!("expected DenyTool"),
        }
    }

    #[test]
    fn output_serializes_with_type_tag() {
        let output = ThreadOutput::tool_pending("c1", "web_search", serde_json::json!({"query": "x"}));
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"type\":\"tool_pending\""));
        assert!(json.contains("web_search"));
    }
}
