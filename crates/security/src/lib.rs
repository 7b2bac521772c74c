//! Security policy for localmind tools.
//!
//! Tools that touch the filesystem (`file_operations`, `search_logs`,
//! `run_tests`, `apply_patch`) resolve every model-supplied path through a
//! [`PathPolicy`] before acting on it.

pub mod path;

pub use path::{PathPolicy, PathValidationError};
