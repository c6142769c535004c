//! Conversation threads: state, persistence, and the per-thread turn loop.

mod manager;
mod state;
mod store;
mod turn_loop;
mod types;

pub use manager::{OutputReceiver, ThreadManager};
pub use state::{ConversationState, Message, Role, ToolCallRequest, ToolResult};
pub use store::ThreadStore;
pub use turn_loop::TurnLoop;
pub use types::{ThreadId, ThreadInput, ThreadOutput};
