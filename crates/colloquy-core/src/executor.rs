//! Tool executor: runs one approved, schema-valid call and always produces a
//! `ToolResult`. A tool's internal fault — an error return or a panic — never
//! escapes into the turn loop.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::ToolError;
use crate::thread::ToolResult;
use crate::tools::Tool;

fn error_type_for(err: &ToolError) -> &'static str {
    match err {
        ToolError::NotFound(_) => "unknown_tool",
        ToolError::InvalidParams(_) => "invalid_params",
        ToolError::ExecutionFailed(_) => "execution_failed",
        ToolError::Rejected(_) => "rejected",
        ToolError::Io(_) => "io_error",
    }
}

/// Invoke a tool with a validated, normalized argument map.
///
/// The tool future runs in a spawned task so a panic is caught as a join
/// error instead of unwinding through the orchestrator. Execution is
/// synchronous with respect to the turn: the caller awaits the result before
/// the next model invocation.
pub async fn run_tool(tool: Arc<dyn Tool>, args: Map<String, Value>) -> ToolResult {
    let name = tool.name().to_string();
    debug!(tool = %name, "Executing tool");

    let handle = tokio::spawn(async move { tool.execute(args).await });

    match handle.await {
        Ok(Ok(output)) => {
            if output.success {
                ToolResult::success(output.content)
            } else {
                ToolResult::error(
                    output.error_type.unwrap_or_else(|| "tool_error".to_string()),
                    output.error.unwrap_or_else(|| "Tool reported failure".to_string()),
                )
            }
        }
        Ok(Err(err)) => {
            error!(tool = %name, error = %err, "Tool returned an error");
            ToolResult::error(error_type_for(&err), err.to_string())
        }
        Err(join_err) => {
            error!(tool = %name, error = %join_err, "Tool task panicked");
            ToolResult::error("tool_panic", format!("Tool '{}' crashed during execution", name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{BoxFuture, ParamSpec, ToolOutput};
    use serde_json::json;

    struct Panicking;

    impl Tool for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }
        fn description(&self) -> &str {
            "always panics"
        }
        fn parameters(&self) -> Vec<ParamSpec> {
            Vec::new()
        }
        fn execute(&self, _args: Map<String, Value>) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
            Box::pin(async { panic!("boom") })
        }
    }

    struct Failing;

    impl Tool for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn description(&self) -> &str {
            "always errors"
        }
        fn parameters(&self) -> Vec<ParamSpec> {
            Vec::new()
        }
        fn execute(&self, _args: Map<String, Value>) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
            Box::pin(async { Err(ToolError::ExecutionFailed("disk on fire".to_string())) })
        }
    }

    #[tokio::test]
    async fn panic_is_contained_as_tool_result() {
        let result = run_tool(Arc::new(Panicking), Map::new()).await;
        match result {
            ToolResult::Error { error_type, .. } => assert_eq!(error_type, "tool_panic"),
            _ => panic!("expected error result"),
        }
    }

    #[tokio::test]
    async fn tool_error_maps_to_error_result() {
        let result = run_tool(Arc::new(Failing), Map::new()).await;
        match result {
            ToolResult::Error {
                error_type,
                message,
            } => {
                assert_eq!(error_type, "execution_failed");
                assert!(message.contains("disk on fire"));
            }
            _ => panic!("expected error result"),
        }
    }

    #[tokio::test]
    async fn success_output_maps_to_success_result() {
        let result = run_tool(
            Arc::new(crate::tools::calculator::Calculator),
            serde_json::from_value(json!({"first_num": 5, "second_num": 3, "operation": "add"}))
                .unwrap(),
        )
        .await;
        assert!(result.is_success());
    }
}
