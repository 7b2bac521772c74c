//! Patch tool — apply a unified diff with `git apply`, then optionally test.

use std::time::Duration;

use async_trait::async_trait;
use localmind_core::error::ToolError;
use localmind_core::tool::{Tool, ToolSchema, parse_args};
use localmind_security::PathPolicy;
use serde::Deserialize;
use tracing::{info, warn};

use crate::process;

const NAME: &str = "apply_patch";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    repo: String,
    patch: String,
}

pub struct ApplyPatchTool {
    policy: PathPolicy,
    /// Shell command run in the repo after a successful apply.
    test_command: Option<String>,
    timeout: Duration,
}

impl ApplyPatchTool {
    pub fn new(policy: PathPolicy, test_command: Option<String>, timeout: Duration) -> Self {
        Self {
            policy,
            test_command,
            timeout,
        }
    }

    fn failed(reason: impl Into<String>) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: NAME.into(),
            reason: reason.into(),
        }
    }
}

/// File paths from `git apply --numstat` output (`added\tdeleted\tpath`).
fn parse_numstat(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.splitn(3, '\t').nth(2))
        .map(|path| path.trim().to_string())
        .filter(|path| !path.is_empty())
        .collect()
}

#[async_trait]
impl Tool for ApplyPatchTool {
    fn name(&self) -> &str {
        NAME
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            NAME,
            "Apply a code or data patch and run tests",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "repo": {
                        "type": "string",
                        "description": "Path to the repository or project directory"
                    },
                    "patch": {
                        "type": "string",
                        "description": "The patch to apply, in unified diff format"
                    }
                },
                "required": ["repo", "patch"]
            }),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let Args { repo, patch } = parse_args(arguments)?;

        let dir = self.policy.check(&repo).map_err(|e| ToolError::PermissionDenied {
            tool_name: NAME.into(),
            reason: e.to_string(),
        })?;
        if !dir.is_dir() {
            return Err(Self::failed(format!("Repository not found: {repo}")));
        }
        if patch.trim().is_empty() {
            return Err(ToolError::InvalidArguments("patch is empty".into()));
        }
        // git apply rejects a final hunk without a trailing newline
        let patch = if patch.ends_with('\n') { patch } else { format!("{patch}\n") };

        let check = process::run(NAME, "git", &["apply", "--check", "-"], &dir, Some(patch.as_str()), self.timeout).await?;
        if !check.success {
            warn!(repo = %repo, "Patch does not apply");
            return Err(Self::failed(format!("Patch does not apply: {}", check.combined())));
        }

        let numstat = process::run(NAME, "git", &["apply", "--numstat", "-"], &dir, Some(patch.as_str()), self.timeout).await?;
        let changes = parse_numstat(&numstat.stdout);

        let applied = process::run(NAME, "git", &["apply", "-"], &dir, Some(patch.as_str()), self.timeout).await?;
        if !applied.success {
            return Err(Self::failed(format!("git apply failed: {}", applied.combined())));
        }
        info!(repo = %repo, files = changes.len(), "Patch applied");

        let mut result = serde_json::json!({
            "repo": repo,
            "patch_applied": true,
            "changes": changes,
            "tests_passed": null,
            "message": "Patch applied successfully",
        });

        if let Some(test_command) = &self.test_command {
            let tests = process::run(NAME, "sh", &["-c", test_command.as_str()], &dir, None, self.timeout).await?;
            result["tests_passed"] = serde_json::json!(tests.success);
            result["test_output"] = serde_json::json!(process::tail(&tests.combined(), 40));
            if !tests.success {
                result["message"] = serde_json::json!("Patch applied; tests failed");
            }
        }

        Ok(result)
    }
}

/// Decode arguments without executing; used to keep the schema and `Args` in step.
#[cfg(test)]
pub(crate) fn decode_args(arguments: serde_json::Value) -> Result<(), ToolError> {
    parse_args::<Args>(arguments).map(|_| ())
}
