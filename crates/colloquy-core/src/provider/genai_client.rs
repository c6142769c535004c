//! GenAI-backed model client.
//!
//! Uses the genai framework for multi-provider chat completion with manual
//! tool control, which keeps validation and approval in our hands instead of
//! the provider SDK's.

use async_trait::async_trait;
use futures::StreamExt;
use genai::chat::{
    ChatMessage, ChatOptions, ChatRequest, ChatStreamEvent, Tool, ToolCall, ToolResponse,
};
use genai::resolver::{AuthData, AuthResolver};
use genai::Client;
use tracing::{debug, error};

use super::{ModelClient, ModelTurn};
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::thread::{Message, Role, ToolCallRequest};
use crate::tools::ToolDescriptor;

/// Default model per provider id
fn default_model(provider: &str) -> &'static str {
    match provider {
        "groq" => "llama-3.3-70b-versatile",
        "openai" => "gpt-4o-mini",
        "anthropic" => "claude-sonnet-4-20250514",
        "gemini" => "gemini-2.0-flash",
        "ollama" => "llama3.2",
        _ => "gpt-4o-mini",
    }
}

pub struct GenAiClient {
    client: Client,
    model: String,
    system_prompt: Option<String>,
    temperature: Option<f64>,
}

impl GenAiClient {
    /// Build a client from provider configuration. The API key falls back to
    /// the provider's usual environment variable when not set explicitly.
    pub fn new(config: &ProviderConfig) -> Self {
        let client = match config.api_key.clone() {
            Some(key) => {
                let resolver = AuthResolver::from_resolver_fn(
                    move |_model_iden| -> std::result::Result<
                        Option<AuthData>,
                        genai::resolver::Error,
                    > { Ok(Some(AuthData::from_single(key.clone()))) },
                );
                Client::builder().with_auth_resolver(resolver).build()
            }
            None => Client::default(),
        };

        let model = config
            .model
            .clone()
            .unwrap_or_else(|| default_model(&config.provider).to_string());

        Self {
            client,
            model,
            system_prompt: None,
            temperature: Some(config.temperature),
        }
    }

    /// Set the system prompt prepended to every request
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Override the sampling temperature (classification wants 0.0)
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, history: &[Message], tools: &[ToolDescriptor]) -> ChatRequest {
        let mut chat_req = ChatRequest::default();

        if let Some(system) = &self.system_prompt {
            chat_req = chat_req.with_system(system.as_str());
        }

        for msg in history {
            match msg.role {
                Role::User => {
                    chat_req = chat_req.append_message(ChatMessage::user(msg.content.as_str()));
                }
                Role::Assistant => {
                    if let Some(calls) = msg.tool_calls.as_ref().filter(|c| !c.is_empty()) {
                        // Tool calls must land in a single assistant message
                        let genai_calls: Vec<ToolCall> = calls
                            .iter()
                            .map(|call| ToolCall {
                                call_id: call.id.clone(),
                                fn_name: call.name.clone(),
                                fn_arguments: call.arguments.clone(),
                                thought_signatures: None,
                            })
                            .collect();
                        chat_req = chat_req.append_message(genai_calls);
                    } else {
                        chat_req =
                            chat_req.append_message(ChatMessage::assistant(msg.content.as_str()));
                    }
                }
                Role::Tool => {
                    if let Some(call_id) = &msg.tool_call_id {
                        let response = ToolResponse::new(call_id.clone(), msg.content.clone());
                        chat_req = chat_req.append_message(response);
                    }
                }
            }
        }

        // An empty tool set means a tool-free invocation, not an empty list:
        // some providers reject `tools: []`
        if !tools.is_empty() {
            let genai_tools: Vec<Tool> = tools
                .iter()
                .map(|t| {
                    Tool::new(&t.name)
                        .with_description(&t.description)
                        .with_schema(t.json_schema())
                })
                .collect();
            chat_req = chat_req.with_tools(genai_tools);
        }

        chat_req
    }
}

#[async_trait]
impl ModelClient for GenAiClient {
    async fn invoke(&self, history: &[Message], tools: &[ToolDescriptor]) -> Result<ModelTurn> {
        let chat_req = self.build_request(history, tools);

        let options = self
            .temperature
            .map(|t| ChatOptions::default().with_temperature(t));

        debug!(model = %self.model, messages = history.len(), tools = tools.len(), "Invoking model");

        let stream_response = self
            .client
            .exec_chat_stream(&self.model, chat_req, options.as_ref())
            .await
            .map_err(|e| {
                error!(error = ?e, model = %self.model, "Model request failed");
                Error::Provider(format!("GenAI error: {:?}", e))
            })?;

        // Accumulate content and tool calls from the stream
        let mut content = String::new();
        let mut tool_calls: Vec<ToolCallRequest> = Vec::new();
        let mut stream = stream_response.stream;

        while let Some(event) = stream.next().await {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) => {
                    content.push_str(&chunk.content);
                }
                Ok(ChatStreamEvent::ToolCallChunk(tc)) => {
                    // Each chunk carries a complete tool call
                    let call = tc.tool_call;
                    tool_calls.push(ToolCallRequest::new(
                        call.call_id,
                        call.fn_name,
                        call.fn_arguments,
                    ));
                }
                Ok(ChatStreamEvent::End(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    error!(error = ?e, model = %self.model, "Model stream error");
                    return Err(Error::Provider(format!("GenAI stream error: {:?}", e)));
                }
            }
        }

        Ok(ModelTurn {
            content: if content.is_empty() {
                None
            } else {
                Some(content)
            },
            tool_calls,
        })
    }
}
