//! Approval gate for human-in-the-loop tool execution.
//!
//! The gate is an explicit finite-state machine rather than a suspended
//! callback: while a decision is outstanding the pending request lives in
//! `ConversationState::pending_approval`, so a suspended turn can be
//! inspected and the turn loop can keep servicing its control channel. There
//! is no timeout; the turn stays suspended until a decision arrives or the
//! thread is abandoned.

use serde::{Deserialize, Serialize};

use crate::thread::{ToolCallRequest, ToolResult};

/// Error type recorded when a human rejects a flagged tool call
pub const DENIED_ERROR_TYPE: &str = "denied_by_user";

/// External decision resolving an `AwaitingDecision` gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Denied { reason: Option<String> },
}

/// Gate states; one gate instance serves one turn at a time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    #[default]
    Idle,
    AwaitingDecision {
        request: ToolCallRequest,
    },
    Resolved {
        decision: Decision,
    },
}

#[derive(Debug, Default)]
pub struct ApprovalGate {
    state: GateState,
}

impl ApprovalGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Whether the gate is currently suspending a turn
    pub fn is_awaiting(&self) -> bool {
        matches!(self.state, GateState::AwaitingDecision { .. })
    }

    /// `Idle -> AwaitingDecision`: suspend the turn for the given call.
    ///
    /// Returns the request to surface on the output channel. Calling this
    /// while a decision is already outstanding is a turn-loop bug.
    pub fn suspend(&mut self, request: ToolCallRequest) -> ToolCallRequest {
        debug_assert!(matches!(self.state, GateState::Idle));
        self.state = GateState::AwaitingDecision {
            request: request.clone(),
        };
        request
    }

    /// `AwaitingDecision -> Resolved`: apply an external decision.
    ///
    /// Returns `None` if the gate was not awaiting (stale or duplicate
    /// decision) — the caller logs and ignores those.
    pub fn resolve(&mut self, decision: Decision) -> Option<ToolCallRequest> {
        match std::mem::take(&mut self.state) {
            GateState::AwaitingDecision { request } => {
                self.state = GateState::Resolved {
                    decision: decision.clone(),
                };
                Some(request)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Return to `Idle` once the turn loop has consumed the resolution
    pub fn reset(&mut self) {
        self.state = GateState::Idle;
    }

    /// Synthesize the tool result for a denial. Denials consume no retry
    /// budget; the model sees them exactly like an execution failure.
    pub fn denial_result(reason: Option<&str>) -> ToolResult {
        ToolResult::error(
            DENIED_ERROR_TYPE,
            reason.unwrap_or("The user declined to run this tool"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ToolCallRequest {
        ToolCallRequest::new("c1", "web_search", json!({"query": "rust"}))
    }

    #[test]
    fn suspend_then_approve() {
        let mut gate = ApprovalGate::new();
        assert!(!gate.is_awaiting());

        gate.suspend(request());
        assert!(gate.is_awaiting());

        let resolved = gate.resolve(Decision::Approved).unwrap();
        assert_eq!(resolved.name, "web_search");
        assert!(matches!(
            gate.state(),
            GateState::Resolved {
                decision: Decision::Approved
            }
        ));

        gate.reset();
        assert!(matches!(gate.state(), GateState::Idle));
    }

    #[test]
    fn decision_without_pending_request_is_ignored() {
        let mut gate = ApprovalGate::new();
        assert!(gate.resolve(Decision::Approved).is_none());
        assert!(matches!(gate.state(), GateState::Idle));
    }

    #[test]
    fn denial_yields_denied_by_user_result() {
        let result = ApprovalGate::denial_result(Some("too risky"));
        match result {
            ToolResult::Error {
                error_type,
                message,
            } => {
                assert_eq!(error_type, DENIED_ERROR_TYPE);
                assert_eq!(message, "too risky");
            }
            _ => panic!("expected error result"),
        }
    }
}
