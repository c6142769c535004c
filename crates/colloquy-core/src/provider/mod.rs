//! Model invocation boundary.
//!
//! The turn loop only ever talks to `ModelClient`; the production
//! implementation wraps the genai framework, and tests script the trait
//! directly. A model failure here is the one unrecoverable error of a turn:
//! the orchestrator propagates it instead of synthesizing a response.

mod genai_client;

pub use genai_client::GenAiClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::thread::{Message, ToolCallRequest};
use crate::tools::ToolDescriptor;

/// One model response: either a final assistant message or tool requests
#[derive(Debug, Clone, Default)]
pub struct ModelTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ModelTurn {
    pub fn message(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: None,
            tool_calls: calls,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Dyn-compatible client for chat-completion style model invocation.
///
/// `tools` may be empty; the implementation must then invoke the model with
/// no tool access at all (the exhaustion fallback depends on this).
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(&self, history: &[Message], tools: &[ToolDescriptor]) -> Result<ModelTurn>;
}
