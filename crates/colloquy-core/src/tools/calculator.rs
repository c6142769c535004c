//! Calculator tool for basic arithmetic operations.

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::{BoxFuture, ParamKind, ParamSpec, Tool, ToolOutput};
use crate::error::ToolError;

pub struct Calculator;

impl Tool for Calculator {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Perform a basic arithmetic operation on two numbers. \
         Supported operations: add, sub, mul, div."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("first_num", ParamKind::Number, "First operand"),
            ParamSpec::required("second_num", ParamKind::Number, "Second operand"),
            ParamSpec::required(
                "operation",
                ParamKind::String,
                "Operation to perform: 'add', 'sub', 'mul', 'div'",
            ),
        ]
    }

    fn execute(&self, args: Map<String, Value>) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let first = args["first_num"].as_f64().unwrap_or(0.0);
            let second = args["second_num"].as_f64().unwrap_or(0.0);
            let operation = args["operation"].as_str().unwrap_or("");
            info!(first, second, operation, "Calculator called");

            let result = match operation {
                "add" => first + second,
                "sub" => first - second,
                "mul" => first * second,
                "div" => {
                    if second == 0.0 {
                        warn!("Division by zero attempted");
                        return Ok(ToolOutput::error(
                            "division_by_zero",
                            "Division by zero is not allowed",
                        ));
                    }
                    first / second
                }
                other => {
                    warn!(operation = other, "Unsupported operation");
                    return Ok(ToolOutput::error(
                        "invalid_operation",
                        format!("Unsupported operation '{}'. Use: add, sub, mul, div", other),
                    ));
                }
            };

            Ok(ToolOutput::success(json!({
                "first_num": first,
                "second_num": second,
                "operation": operation,
                "result": result,
            })))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(first: f64, second: f64, op: &str) -> ToolOutput {
        let mut args = Map::new();
        args.insert("first_num".to_string(), json!(first));
        args.insert("second_num".to_string(), json!(second));
        args.insert("operation".to_string(), json!(op));
        Calculator.execute(args).await.unwrap()
    }

    #[tokio::test]
    async fn addition_works() {
        let out = run(5.0, 3.0, "add").await;
        assert!(out.success);
        assert_eq!(out.content["result"], json!(8.0));
    }

    #[tokio::test]
    async fn division_by_zero_is_a_structured_error() {
        let out = run(1.0, 0.0, "div").await;
        assert!(!out.success);
        assert_eq!(out.error_type.as_deref(), Some("division_by_zero"));
    }

    #[tokio::test]
    async fn unknown_operation_is_rejected() {
        let out = run(1.0, 2.0, "pow").await;
        assert!(!out.success);
        assert_eq!(out.error_type.as_deref(), Some("invalid_operation"));
    }
}
