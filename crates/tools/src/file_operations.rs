//! File tool — read, write, list, and delete with path validation.

use async_trait::async_trait;
use localmind_core::error::ToolError;
use localmind_core::tool::{Tool, ToolSchema, parse_args};
use localmind_security::PathPolicy;
use serde::Deserialize;
use tracing::debug;

const NAME: &str = "file_operations";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Operation {
    Read,
    Write,
    List,
    Delete,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    operation: Operation,
    path: String,
    #[serde(default)]
    content: Option<String>,
}

pub struct FileOperationsTool {
    policy: PathPolicy,
}

impl FileOperationsTool {
    pub fn new(policy: PathPolicy) -> Self {
        Self { policy }
    }
}

impl Default for FileOperationsTool {
    fn default() -> Self {
        Self::new(PathPolicy::unrestricted())
    }
}

fn failed(reason: impl Into<String>) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: NAME.into(),
        reason: reason.into(),
    }
}

#[async_trait]
impl Tool for FileOperationsTool {
    fn name(&self) -> &str {
        NAME
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            NAME,
            "Perform file operations (read, write, list, delete)",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "operation": {
                        "type": "string",
                        "enum": ["read", "write", "list", "delete"],
                        "description": "File operation to perform"
                    },
                    "path": {
                        "type": "string",
                        "description": "File or directory path"
                    },
                    "content": {
                        "type": "string",
                        "description": "Content to write (for write operation)"
                    }
                },
                "required": ["operation", "path"]
            }),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let Args { operation, path, content } = parse_args(arguments)?;

        let resolved = self.policy.check(&path).map_err(|e| ToolError::PermissionDenied {
            tool_name: NAME.into(),
            reason: e.to_string(),
        })?;
        debug!(?operation, path = %resolved.display(), "File operation");

        match operation {
            Operation::Read => {
                if !resolved.is_file() {
                    return Err(failed(format!("File not found: {path}")));
                }
                let text = tokio::fs::read_to_string(&resolved)
                    .await
                    .map_err(|e| failed(format!("Failed to read '{path}': {e}")))?;
                Ok(serde_json::json!({ "content": text, "size": text.len() }))
            }
            Operation::Write => {
                let content = content.ok_or_else(|| {
                    ToolError::InvalidArguments("content is required for write operation".into())
                })?;
                tokio::fs::write(&resolved, &content)
                    .await
                    .map_err(|e| failed(format!("Failed to write '{path}': {e}")))?;
                Ok(serde_json::json!({
                    "message": format!("File written: {path}"),
                    "size": content.len(),
                }))
            }
            Operation::List => {
                if !resolved.exists() {
                    return Err(failed(format!("Path not found: {path}")));
                }
                if !resolved.is_dir() {
                    return Err(failed("Path is not a directory"));
                }
                let mut entries = tokio::fs::read_dir(&resolved)
                    .await
                    .map_err(|e| failed(format!("Failed to list '{path}': {e}")))?;
                let mut files = Vec::new();
                while let Some(entry) = entries
                    .next_entry()
                    .await
                    .map_err(|e| failed(format!("Failed to list '{path}': {e}")))?
                {
                    files.push(entry.file_name().to_string_lossy().into_owned());
                }
                files.sort();
                Ok(serde_json::json!({ "count": files.len(), "files": files }))
            }
            Operation::Delete => {
                if !resolved.exists() {
                    return Err(failed(format!("File not found: {path}")));
                }
                if resolved.is_dir() {
                    return Err(failed("Refusing to delete a directory"));
                }
                tokio::fs::remove_file(&resolved)
                    .await
                    .map_err(|e| failed(format!("Failed to delete '{path}': {e}")))?;
                Ok(serde_json::json!({ "message": format!("File deleted: {path}") }))
            }
        }
    }
}

/// Decode arguments without executing; used to keep the schema and `Args` in step.
#[cfg(test)]
pub(crate) fn decode_args(arguments: serde_json::Value) -> Result<(), ToolError> {
    parse_args::<Args>(arguments).map(|_| ())
}
