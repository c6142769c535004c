//! Colloquy Core - Conversational turn orchestration
//!
//! This crate provides the core control logic for a tool-using chat agent:
//! - Tool registry with typed parameter schemas
//! - Intent classification to narrow the tool set per turn
//! - Schema validation of model-proposed tool calls with bounded retry
//! - Human-in-the-loop approval gate with an explicit suspend point
//! - Fault-contained tool execution
//! - The per-thread turn loop tying the above together

pub mod approval;
pub mod config;
pub mod error;
pub mod executor;
pub mod intent;
pub mod provider;
pub mod schema;
pub mod thread;
pub mod tools;

pub use approval::{ApprovalGate, Decision, GateState, DENIED_ERROR_TYPE};
pub use config::{ApiKeys, Config, OrchestrationConfig, ProviderConfig};
pub use error::{Error, Result, ToolError};
pub use executor::run_tool;
pub use intent::IntentClassifier;
pub use provider::{GenAiClient, ModelClient, ModelTurn};
pub use schema::{validate_call, SchemaError};
pub use thread::{
    ConversationState, Message, Role, ThreadId, ThreadInput, ThreadManager, ThreadOutput,
    ThreadStore, ToolCallRequest, ToolResult, TurnLoop,
};
pub use tools::{
    standard_registry, ParamKind, ParamSpec, Tool, ToolDescriptor, ToolOutput, ToolRegistry,
};
