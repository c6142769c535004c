//! Intent classification: selects the subset of registered tools relevant to
//! the current user request.
//!
//! The classifier runs at most once per user turn; the turn loop caches its
//! output in `ConversationState::active_tools` so schema-retry cycles reuse
//! it (the user's intent has not changed, only the model's malformed
//! attempt). When classification cannot determine any relevant tool — an
//! empty answer, exhausted parse retries, or a classifier-side model failure
//! — it returns the empty set and the turn proceeds tool-free.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::provider::ModelClient;
use crate::thread::{Message, Role};
use crate::tools::{ToolDescriptor, ToolRegistry};

const CLASSIFIER_SYSTEM_PROMPT: &str = "\
You are an intent classifier. Your job is to analyze the user's message and \
determine which tools are relevant.

You must determine the user's intent based solely on the current user query. \
Prior conversation is provided only to clarify context and must not override \
the current query. Give higher importance to the most recent interactions.

Rules:
- Return tool names as a JSON array, e.g., [\"calculator\", \"get_weather\"]
- If no tools are needed, return an empty array: []
- Only include tools that are directly relevant to answering the current question
- If the user's intent requires multiple tools, return all necessary tools
- Be conservative: when in doubt, include the tool rather than exclude it

Your response must be valid JSON containing only the array of tool names.";

pub struct IntentClassifier {
    client: Arc<dyn ModelClient>,
    window_turns: usize,
    max_retries: u32,
}

impl IntentClassifier {
    pub fn new(client: Arc<dyn ModelClient>, window_turns: usize, max_retries: u32) -> Self {
        Self {
            client,
            window_turns,
            max_retries,
        }
    }

    /// Classify the current request and return the relevant descriptors.
    ///
    /// `history` must end with the current user message.
    pub async fn classify(
        &self,
        history: &[Message],
        registry: &ToolRegistry,
    ) -> Vec<ToolDescriptor> {
        let Some(current) = history.last().filter(|m| m.role == Role::User) else {
            warn!("Classifier called without a trailing user message");
            return Vec::new();
        };

        let context = extract_window(&history[..history.len() - 1], self.window_turns);
        let mut prompt = self.build_prompt(current, &context, registry);

        for attempt in 0..self.max_retries {
            debug!(attempt = attempt + 1, "Intent classifier attempt");

            let request = vec![Message::user(prompt.clone())];
            let response = match self.client.invoke(&request, &[]).await {
                Ok(turn) => turn.content.unwrap_or_default(),
                Err(e) => {
                    warn!(error = %e, "Classifier model invocation failed; proceeding tool-free");
                    return Vec::new();
                }
            };

            match parse_tool_names(&response) {
                Ok(names) => {
                    let selected: Vec<ToolDescriptor> = names
                        .iter()
                        .filter_map(|name| registry.descriptor(name).cloned())
                        .collect();
                    info!(
                        count = selected.len(),
                        tools = ?selected.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
                        "Intent classifier selected tools"
                    );
                    return selected;
                }
                Err(parse_err) => {
                    warn!(attempt = attempt + 1, error = %parse_err, "Classifier reply was not a JSON array");
                    prompt.push_str(&format!(
                        "\n\nYour previous response was invalid JSON ({}). Respond with ONLY a \
                         valid JSON array of tool names, e.g. [\"calculator\"]. If no tools are \
                         needed, return: []",
                        parse_err
                    ));
                }
            }
        }

        warn!(
            max_retries = self.max_retries,
            "Intent classifier retries exhausted; proceeding tool-free"
        );
        Vec::new()
    }

    fn build_prompt(
        &self,
        current: &Message,
        context: &[&Message],
        registry: &ToolRegistry,
    ) -> String {
        let mut prompt = String::from(CLASSIFIER_SYSTEM_PROMPT);

        prompt.push_str("\n\nAvailable tools:\n");
        for descriptor in registry.descriptors() {
            prompt.push_str(&format!("- {}: {}\n", descriptor.name, descriptor.description));
        }

        if !context.is_empty() {
            prompt.push_str("\nRecent conversation context:\n");
            for msg in context {
                let role = match msg.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                };
                prompt.push_str(&format!("{}:\n{}\n\n", role, msg.content));
            }
        }

        prompt.push_str(&format!("\nCurrent user query:\n{}\n", current.content));
        prompt.push_str("\nRespond with only a JSON array of relevant tool names:");
        prompt
    }
}

/// Extract the last `n` completed turns: each turn is the user message plus
/// the final assistant message that answered it, skipping intermediate tool
/// traffic and assistant tool-call messages.
fn extract_window(messages: &[Message], n: usize) -> Vec<&Message> {
    let mut turns: Vec<(&Message, &Message)> = Vec::new();
    let mut i = messages.len();

    while i > 0 && turns.len() < n {
        i -= 1;
        let msg = &messages[i];
        if msg.role == Role::Assistant && !msg.has_tool_calls() && !msg.content.is_empty() {
            // Find the user message that opened this turn
            let mut j = i;
            let mut found = None;
            while j > 0 {
                j -= 1;
                if messages[j].role == Role::User {
                    found = Some(&messages[j]);
                    break;
                }
            }
            if let Some(user) = found {
                turns.push((user, msg));
                i = j;
            }
        }
    }

    turns.reverse();
    turns
        .into_iter()
        .flat_map(|(user, assistant)| [user, assistant])
        .collect()
}

/// Parse a classifier reply into tool names, tolerating markdown fences
fn parse_tool_names(content: &str) -> Result<Vec<String>, String> {
    let mut text = content.trim();

    if let Some(stripped) = text.strip_prefix("```") {
        let stripped = stripped.strip_prefix("json").unwrap_or(stripped);
        text = stripped.split("```").next().unwrap_or(stripped).trim();
    }

    serde_json::from_str::<Vec<String>>(text).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_array() {
        let names = parse_tool_names(r#"["calculator", "get_weather"]"#).unwrap();
        assert_eq!(names, vec!["calculator", "get_weather"]);
    }

    #[test]
    fn parses_fenced_array() {
        let names = parse_tool_names("```json\n[\"web_search\"]\n```").unwrap();
        assert_eq!(names, vec!["web_search"]);
    }

    #[test]
    fn parses_empty_array() {
        let names = parse_tool_names("[]").unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn rejects_prose() {
        assert!(parse_tool_names("I think you need the calculator.").is_err());
    }

    #[test]
    fn window_pairs_user_with_final_assistant_message() {
        let messages = vec![
            Message::user("what is 2+2"),
            Message::assistant_with_tool_calls(
                "",
                vec![crate::thread::ToolCallRequest::new(
                    "c1",
                    "calculator",
                    serde_json::json!({}),
                )],
            ),
            Message::tool_result("c1", &crate::thread::ToolResult::success(serde_json::json!(4))),
            Message::assistant("2 + 2 = 4"),
            Message::user("and the weather in Paris?"),
            Message::assistant("It is sunny."),
        ];

        let window = extract_window(&messages, 5);
        let contents: Vec<&str> = window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "what is 2+2",
                "2 + 2 = 4",
                "and the weather in Paris?",
                "It is sunny."
            ]
        );
    }

    #[test]
    fn window_is_bounded() {
        let mut messages = Vec::new();
        for i in 0..10 {
            messages.push(Message::user(format!("q{}", i)));
            messages.push(Message::assistant(format!("a{}", i)));
        }
        let window = extract_window(&messages, 3);
        assert_eq!(window.len(), 6);
        assert_eq!(window[0].content, "q7");
    }
}
