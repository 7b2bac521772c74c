//! Log search tool — regex search over a log file or directory tree.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use localmind_core::error::ToolError;
use localmind_core::tool::{Tool, ToolSchema, parse_args};
use localmind_security::PathPolicy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

const NAME: &str = "search_logs";

/// Matches returned per call.
pub const MAX_MATCHES: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    pattern: String,
    #[serde(default)]
    log_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct LogMatch {
    file: String,
    line: usize,
    content: String,
}

pub struct SearchLogsTool {
    policy: PathPolicy,
    default_path: String,
}

impl SearchLogsTool {
    /// `default_path` is searched when the call gives no `log_path`.
    pub fn new(policy: PathPolicy, default_path: impl Into<String>) -> Self {
        Self {
            policy,
            default_path: default_path.into(),
        }
    }
}

/// Scan `root` (a file, or every file under a directory, in name order).
/// Returns up to `MAX_MATCHES` matches and whether more were cut off.
fn scan(root: &Path, regex: &Regex) -> (Vec<LogMatch>, bool) {
    let files: Vec<PathBuf> = if root.is_file() {
        vec![root.to_path_buf()]
    } else {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect()
    };

    let mut matches = Vec::new();
    for path in files {
        // Binary or unreadable files are skipped
        let Ok(contents) = std::fs::read_to_string(&path) else {
            continue;
        };
        let file = path
            .strip_prefix(root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .unwrap_or(path.as_path())
            .to_string_lossy()
            .into_owned();

        for (idx, line) in contents.lines().enumerate() {
            if !regex.is_match(line) {
                continue;
            }
            if matches.len() == MAX_MATCHES {
                return (matches, true);
            }
            matches.push(LogMatch {
                file: file.clone(),
                line: idx + 1,
                content: line.trim_end().to_string(),
            });
        }
    }
    (matches, false)
}

#[async_trait]
impl Tool for SearchLogsTool {
    fn name(&self) -> &str {
        NAME
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            NAME,
            "Search through log files for patterns",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "pattern": {
                        "type": "string",
                        "description": "Search pattern or regex"
                    },
                    "log_path": {
                        "type": "string",
                        "description": "Path to log file or directory"
                    }
                },
                "required": ["pattern"]
            }),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let Args { pattern, log_path } = parse_args(arguments)?;

        let regex = Regex::new(&pattern)
            .map_err(|e| ToolError::InvalidArguments(format!("invalid pattern: {e}")))?;

        let requested = log_path.unwrap_or_else(|| self.default_path.clone());
        let root = self.policy.check(&requested).map_err(|e| ToolError::PermissionDenied {
            tool_name: NAME.into(),
            reason: e.to_string(),
        })?;
        if !root.exists() {
            return Err(ToolError::ExecutionFailed {
                tool_name: NAME.into(),
                reason: format!("Path not found: {requested}"),
            });
        }

        let (matches, truncated) = tokio::task::spawn_blocking(move || scan(&root, &regex))
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: NAME.into(),
                reason: e.to_string(),
            })?;

        debug!(pattern = %pattern, matches = matches.len(), truncated, "Log search complete");

        Ok(serde_json::json!({
            "pattern": pattern,
            "total_matches": matches.len(),
            "truncated": truncated,
            "matches": matches,
        }))
    }
}

/// Decode arguments without executing; used to keep the schema and `Args` in step.
#[cfg(test)]
pub(crate) fn decode_args(arguments: serde_json::Value) -> Result<(), ToolError> {
    parse_args::<Args>(arguments).map(|_| ())
}
