//! Built-in tool implementations for localmind.
//!
//! Five tools give the model hands on the local machine: a keyed data
//! lookup, patch application, log search, test running, and file access.
//! Every tool that takes a path resolves it through the same
//! [`PathPolicy`](localmind_security::PathPolicy).

pub mod apply_patch;
pub mod file_operations;
pub mod get_map;
mod process;
pub mod search_logs;

use std::time::Duration;

use localmind_config::ToolsConfig;
use localmind_core::tool::ToolRegistry;
use localmind_security::PathPolicy;

pub use apply_patch::ApplyPatchTool;
pub use file_operations::FileOperationsTool;
pub use get_map::GetMapTool;
pub use run_tests::{RunTestsTool, TestRunner};
pub use search_logs::SearchLogsTool;

/// Create the registry of built-in tools, in the order they are offered to the model:
/// `get_map`, `apply_patch`, `search_logs`, `run_tests`, `file_operations`.
pub fn default_registry(config: &ToolsConfig) -> ToolRegistry {
    let policy = PathPolicy::new(config.workspace_root.as_deref(), &config.forbidden_paths);
    let timeout = Duration::from_secs(config.command_timeout_secs);

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(GetMapTool::new()));
    registry.register(Box::new(ApplyPatchTool::new(
        policy.clone(),
        config.test_command.clone(),
        timeout,
    )));
    registry.register(Box::new(SearchLogsTool::new(policy.clone(), &config.log_dir)));
    registry.register(Box::new(RunTestsTool::new(policy.clone(), timeout)));
    registry.register(Box::new(FileOperationsTool::new(policy)));
    registry
}
