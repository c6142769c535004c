//! Turn loop: the per-thread state machine driving each user turn.
//!
//! One loop instance owns one thread's `ConversationState` (single-writer:
//! no two turns of the same thread ever run concurrently). A turn moves
//! through classify -> model -> branch on tool calls -> validate -> approve /
//! execute / retry -> model again, until the model produces a plain assistant
//! message or the schema-retry budget forces a tool-free final pass.
//!
//! Messages are persisted only when a turn reaches its terminal state; a
//! cancelled or failed turn rolls the in-memory history back to the turn
//! boundary and writes nothing.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::state::{ConversationState, Message, ToolCallRequest, ToolResult};
use super::store::ThreadStore;
use super::types::{ThreadId, ThreadInput, ThreadOutput};
use crate::approval::{ApprovalGate, Decision};
use crate::config::Config;
use crate::executor::run_tool;
use crate::intent::IntentClassifier;
use crate::provider::ModelClient;
use crate::schema::{validate_call, SchemaError};
use crate::tools::{standard_registry, ToolDescriptor, ToolRegistry};

/// How a turn ended
enum TurnOutcome {
    /// Terminal assistant message produced; new messages are persistable
    Completed,
    /// Turn abandoned by the user (or the control channel closed)
    Cancelled,
}

/// What the approval gate resolved to for one pending call
enum GateOutcome {
    Approved,
    Denied(Option<String>),
    Abandoned,
}

pub struct TurnLoop {
    thread_id: ThreadId,
    /// User messages, each starting a turn
    message_rx: mpsc::UnboundedReceiver<String>,
    /// Approvals, denials, and cancellation
    control_rx: mpsc::UnboundedReceiver<ThreadInput>,
    output_tx: mpsc::Sender<(ThreadId, ThreadOutput)>,
    chat_client: Arc<dyn ModelClient>,
    classifier: IntentClassifier,
    registry: Arc<ToolRegistry>,
    store: ThreadStore,
    gate: ApprovalGate,
    max_schema_retries: u32,
    state: ConversationState,
}

impl TurnLoop {
    /// Create a turn loop for one thread, loading any persisted history.
    ///
    /// The input channel is split by a dispatcher task: user messages queue
    /// on one internal channel, control inputs on another, so approvals and
    /// cancellation remain deliverable while a turn is in flight.
    pub fn new(
        thread_id: ThreadId,
        mut input_rx: mpsc::Receiver<ThreadInput>,
        output_tx: mpsc::Sender<(ThreadId, ThreadOutput)>,
        config: &Config,
        chat_client: Arc<dyn ModelClient>,
        classifier_client: Arc<dyn ModelClient>,
    ) -> crate::error::Result<Self> {
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let tid = thread_id.clone();
        tokio::spawn(async move {
            while let Some(input) = input_rx.recv().await {
                let sent = match input {
                    ThreadInput::UserMessage { content } => message_tx.send(content).is_ok(),
                    control => control_tx.send(control).is_ok(),
                };
                if !sent {
                    break;
                }
            }
            debug!(thread = %tid, "Dispatcher ended (input channel closed)");
        });

        let registry = Arc::new(standard_registry(config));
        let store = ThreadStore::new(config.threads_dir());

        let mut state = ConversationState::new();
        state.messages = store.load(&thread_id)?;

        // The classifier shares the schema-retry budget for its own
        // parse-and-retry cycle
        let classifier = IntentClassifier::new(
            classifier_client,
            config.orchestration.intent_window_turns,
            config.orchestration.max_schema_retries,
        );

        Ok(Self {
            thread_id,
            message_rx,
            control_rx,
            output_tx,
            chat_client,
            classifier,
            registry,
            store,
            gate: ApprovalGate::new(),
            max_schema_retries: config.orchestration.max_schema_retries,
            state,
        })
    }

    /// Run until the input channel closes
    pub async fn run(mut self) {
        info!(thread = %self.thread_id, history = self.state.messages.len(), "Turn loop starting");

        while let Some(content) = self.message_rx.recv().await {
            let snapshot = self.state.messages.len();
            match self.handle_user_turn(content, snapshot).await {
                Ok(TurnOutcome::Completed) => {
                    if let Err(e) = self
                        .store
                        .append(&self.thread_id, &self.state.messages[snapshot..])
                    {
                        error!(thread = %self.thread_id, error = %e, "Failed to persist turn");
                        self.emit(ThreadOutput::error(format!("Failed to persist turn: {}", e)))
                            .await;
                    }
                }
                Ok(TurnOutcome::Cancelled) => {
                    self.emit(ThreadOutput::cancelled()).await;
                }
                Err(e) => {
                    // The turn produced no assistant message; report and move on
                    error!(thread = %self.thread_id, error = %e, "Turn failed");
                    self.emit(ThreadOutput::error(e.to_string())).await;
                }
            }
            self.emit(ThreadOutput::idle()).await;
        }

        info!(thread = %self.thread_id, "Turn loop ended");
    }

    /// Drive one user turn through the state machine
    async fn handle_user_turn(
        &mut self,
        content: String,
        snapshot: usize,
    ) -> crate::error::Result<TurnOutcome> {
        self.state.begin_turn(&content);
        self.emit(ThreadOutput::user_message(content)).await;

        // Classifying: exactly once per turn, cached for every retry cycle
        let active = self
            .classifier
            .classify(&self.state.messages, &self.registry)
            .await;
        self.state.active_tools = Some(active);

        // Set once the retry budget is exhausted; the final pass then runs
        // with tool access withheld, guaranteeing a plain-text response
        let mut tools_withheld = false;

        loop {
            if self.cancel_requested() {
                self.state.truncate_to(snapshot);
                return Ok(TurnOutcome::Cancelled);
            }

            let tools: Vec<ToolDescriptor> = if tools_withheld {
                Vec::new()
            } else {
                self.state.active_tools.clone().unwrap_or_default()
            };

            // ModelInvoking: a failure here is the one unrecoverable error
            let turn = match self.chat_client.invoke(&self.state.messages, &tools).await {
                Ok(turn) => turn,
                Err(e) => {
                    self.state.truncate_to(snapshot);
                    return Err(e);
                }
            };

            // Responding: terminal for this turn
            if tools_withheld || !turn.has_tool_calls() {
                let text = turn.content.unwrap_or_default();
                self.state.push(Message::assistant(text.clone()));
                self.emit(ThreadOutput::assistant_message(text)).await;
                return Ok(TurnOutcome::Completed);
            }

            // ToolRequested: stamp and validate the whole batch first
            let mut calls = turn.tool_calls;
            for call in &mut calls {
                if call.id.is_empty() {
                    call.id = uuid::Uuid::new_v4().to_string();
                }
                call.turn = self.state.turn_index;
            }

            let validated: Vec<(ToolCallRequest, Result<Map<String, Value>, SchemaError>)> = calls
                .iter()
                .map(|call| (call.clone(), validate_call(call, &self.registry)))
                .collect();

            // Any malformed call in the batch consumes one retry unit for
            // the whole turn; execution failures and denials never do
            if validated.iter().any(|(_, outcome)| outcome.is_err()) {
                self.state.retry_count += 1;
                warn!(
                    thread = %self.thread_id,
                    retry = self.state.retry_count,
                    max = self.max_schema_retries,
                    "Model emitted a malformed tool call"
                );

                if self.state.retry_count >= self.max_schema_retries {
                    // Exhaustion: discard all pending calls, append nothing,
                    // and force one final model pass without tools
                    warn!(thread = %self.thread_id, "Schema-retry budget exhausted; withholding tools");
                    tools_withheld = true;
                    continue;
                }
            }

            self.state.push(Message::assistant_with_tool_calls(
                turn.content.unwrap_or_default(),
                calls,
            ));

            for (call, outcome) in validated {
                let result = match outcome {
                    Err(schema_err) => {
                        debug!(thread = %self.thread_id, tool = %call.name, error = %schema_err, "Schema rejection");
                        ToolResult::error(schema_err.error_type(), schema_err.feedback())
                    }
                    Ok(args) => match self.approve_and_run(&call, args).await? {
                        Some(result) => result,
                        None => {
                            // Turn abandoned while suspended
                            self.state.truncate_to(snapshot);
                            return Ok(TurnOutcome::Cancelled);
                        }
                    },
                };

                self.emit(ThreadOutput::tool_done(
                    &call.id,
                    &call.name,
                    result.is_success(),
                    result.to_content(),
                ))
                .await;
                self.state.push(Message::tool_result(&call.id, &result));
            }
            // Loop back to ModelInvoking with the results appended
        }
    }

    /// Run one schema-valid call through the approval gate (when flagged)
    /// and the executor. Returns `None` when the turn was abandoned while
    /// awaiting a decision.
    async fn approve_and_run(
        &mut self,
        call: &ToolCallRequest,
        args: Map<String, Value>,
    ) -> crate::error::Result<Option<ToolResult>> {
        let requires_approval = self
            .registry
            .descriptor(&call.name)
            .is_some_and(|d| d.requires_approval);

        if requires_approval {
            match self.await_decision(call).await {
                GateOutcome::Approved => {}
                GateOutcome::Denied(reason) => {
                    info!(thread = %self.thread_id, tool = %call.name, "Tool call denied by user");
                    return Ok(Some(ApprovalGate::denial_result(reason.as_deref())));
                }
                GateOutcome::Abandoned => return Ok(None),
            }
        }

        let Some(tool) = self.registry.get(&call.name) else {
            // Validation already vouched for the name; registry and
            // descriptors can only disagree through a bug
            return Ok(Some(ToolResult::error(
                "unknown_tool",
                format!("Tool '{}' is not registered", call.name),
            )));
        };

        self.emit(ThreadOutput::tool_start(
            &call.id,
            &call.name,
            Value::Object(args.clone()),
        ))
        .await;

        Ok(Some(run_tool(tool, args).await))
    }

    /// AwaitingDecision: suspend until an approve/deny for this call
    /// arrives on the control channel. Stale decisions are ignored; there
    /// is no timeout.
    async fn await_decision(&mut self, call: &ToolCallRequest) -> GateOutcome {
        let pending = self.gate.suspend(call.clone());
        self.state.pending_approval = Some(pending.clone());
        self.emit(ThreadOutput::tool_pending(
            &pending.id,
            &pending.name,
            pending.arguments.clone(),
        ))
        .await;

        let outcome = loop {
            match self.control_rx.recv().await {
                Some(ThreadInput::ApproveTool { tool_call_id }) if tool_call_id == call.id => {
                    self.gate.resolve(Decision::Approved);
                    break GateOutcome::Approved;
                }
                Some(ThreadInput::DenyTool {
                    tool_call_id,
                    reason,
                }) if tool_call_id == call.id => {
                    self.gate.resolve(Decision::Denied {
                        reason: reason.clone(),
                    });
                    break GateOutcome::Denied(reason);
                }
                Some(ThreadInput::Cancel) => break GateOutcome::Abandoned,
                Some(other) => {
                    warn!(thread = %self.thread_id, input = ?other, "Ignoring stale control input");
                }
                None => break GateOutcome::Abandoned,
            }
        };

        self.gate.reset();
        self.state.pending_approval = None;
        outcome
    }

    /// Non-blocking check for a cancel between state transitions.
    /// Approve/deny inputs with no pending request are stale; drop them.
    fn cancel_requested(&mut self) -> bool {
        loop {
            match self.control_rx.try_recv() {
                Ok(ThreadInput::Cancel) => return true,
                Ok(other) => {
                    warn!(thread = %self.thread_id, input = ?other, "Ignoring stale control input");
                }
                Err(_) => return false,
            }
        }
    }

    async fn emit(&self, output: ThreadOutput) {
        let _ = self.output_tx.send((self.thread_id.clone(), output)).await;
    }
}
