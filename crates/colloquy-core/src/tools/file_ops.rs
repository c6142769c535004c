//! File operations tool for reading and writing text files.
//!
//! All files live in a sandboxed user-files directory; filenames are reduced
//! to their final path component to prevent traversal.

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::{BoxFuture, ParamKind, ParamSpec, Tool, ToolOutput};
use crate::error::ToolError;

pub struct FileOperations {
    root: PathBuf,
}

impl FileOperations {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let safe = Path::new(filename).file_name()?;
        Some(self.root.join(safe))
    }
}

impl Tool for FileOperations {
    fn name(&self) -> &str {
        "file_operations"
    }

    fn description(&self) -> &str {
        "Perform file operations (read, write, append, list, delete) on text \
         files in a dedicated user-files directory."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required(
                "operation",
                ParamKind::String,
                "Operation to perform: 'read', 'write', 'append', 'list', 'delete'",
            ),
            ParamSpec::required(
                "filename",
                ParamKind::String,
                "Name of the file (without path); ignored for 'list'",
            ),
            ParamSpec::optional(
                "content",
                ParamKind::String,
                "Content for write/append operations",
                json!(""),
            ),
        ]
    }

    fn requires_approval(&self) -> bool {
        true
    }

    fn execute(&self, args: Map<String, Value>) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let operation = args["operation"].as_str().unwrap_or("");
            let filename = args["filename"].as_str().unwrap_or("");
            let content = args["content"].as_str().unwrap_or("");
            info!(operation, filename, "File operation");

            std::fs::create_dir_all(&self.root)?;

            if operation == "list" {
                let mut files = Vec::new();
                for entry in std::fs::read_dir(&self.root)? {
                    let entry = entry?;
                    if entry.file_type()?.is_file() {
                        files.push(entry.file_name().to_string_lossy().to_string());
                    }
                }
                files.sort();
                return Ok(ToolOutput::success(json!({
                    "operation": "list",
                    "count": files.len(),
                    "files": files,
                })));
            }

            let Some(path) = self.resolve(filename) else {
                warn!(filename, "Rejected unsafe filename");
                return Ok(ToolOutput::error(
                    "invalid_filename",
                    format!("Invalid filename '{}'", filename),
                ));
            };
            let safe_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            match operation {
                "read" => {
                    if !path.exists() {
                        warn!(filename = %safe_name, "File not found");
                        return Ok(ToolOutput::error(
                            "file_not_found",
                            format!("File '{}' not found", safe_name),
                        ));
                    }
                    let text = std::fs::read_to_string(&path)?;
                    Ok(ToolOutput::success(json!({
                        "operation": "read",
                        "filename": safe_name,
                        "content": text,
                    })))
                }
                "write" => {
                    std::fs::write(&path, content)?;
                    Ok(ToolOutput::success(json!({
                        "operation": "write",
                        "filename": safe_name,
                        "bytes_written": content.len(),
                    })))
                }
                "append" => {
                    use std::io::Write;
                    let mut file = std::fs::OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(&path)?;
                    file.write_all(content.as_bytes())?;
                    Ok(ToolOutput::success(json!({
                        "operation": "append",
                        "filename": safe_name,
                        "bytes_written": content.len(),
                    })))
                }
                "delete" => {
                    if !path.exists() {
                        return Ok(ToolOutput::error(
                            "file_not_found",
                            format!("File '{}' not found", safe_name),
                        ));
                    }
                    std::fs::remove_file(&path)?;
                    Ok(ToolOutput::success(json!({
                        "operation": "delete",
                        "filename": safe_name,
                    })))
                }
                other => Ok(ToolOutput::error(
                    "invalid_operation",
                    format!(
                        "Invalid operation '{}'. Use: read, write, append, list, delete",
                        other
                    ),
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(operation: &str, filename: &str, content: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("operation".to_string(), json!(operation));
        map.insert("filename".to_string(), json!(filename));
        map.insert("content".to_string(), json!(content));
        map
    }

    #[tokio::test]
    async fn write_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileOperations::new(dir.path().to_path_buf());

        let out = tool.execute(args("write", "notes.txt", "Hello")).await.unwrap();
        assert!(out.success);

        let out = tool.execute(args("read", "notes.txt", "")).await.unwrap();
        assert!(out.success);
        assert_eq!(out.content["content"], json!("Hello"));
    }

    #[tokio::test]
    async fn traversal_is_confined_to_sandbox() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileOperations::new(dir.path().to_path_buf());

        let out = tool
            .execute(args("write", "../../etc/passwd", "x"))
            .await
            .unwrap();
        assert!(out.success);
        // The path component is stripped, so the file lands inside the sandbox
        assert!(dir.path().join("passwd").exists());
    }

    #[tokio::test]
    async fn missing_file_read_is_structured_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileOperations::new(dir.path().to_path_buf());

        let out = tool.execute(args("read", "nope.txt", "")).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.error_type.as_deref(), Some("file_not_found"));
    }

    #[tokio::test]
    async fn list_reports_written_files() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileOperations::new(dir.path().to_path_buf());

        tool.execute(args("write", "a.txt", "1")).await.unwrap();
        tool.execute(args("write", "b.txt", "2")).await.unwrap();

        let out = tool.execute(args("list", "", "")).await.unwrap();
        assert!(out.success);
        assert_eq!(out.content["count"], json!(2));
    }
}
