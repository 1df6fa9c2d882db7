use crate::traits::Tool;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub mod edit_file;
pub mod git;
pub mod list_files;
pub mod read_file;

pub use edit_file::EditFileTool;
pub use git::GitTool;
pub use list_files::ListFilesTool;
pub use read_file::ReadFileTool;

/// The tools every session starts with, in catalog order.
pub fn default_tools(workspace: impl AsRef<Path>) -> Vec<Box<dyn Tool>> {
    let workspace = workspace.as_ref();
    vec![
        Box::new(ReadFileTool::new(workspace)),
        Box::new(ListFilesTool::new(workspace)),
        Box::new(EditFileTool::new(workspace)),
        Box::new(GitTool::new(workspace)),
    ]
}

/// Decode the model's raw input into a tool's input type.
pub fn parse_input<T: DeserializeOwned>(tool: &str, input: Value) -> anyhow::Result<T> {
    serde_json::from_value(input).with_context(|| format!("invalid input for {tool}"))
}

/// Relative paths are taken from the workspace, absolute ones as given.
pub fn resolve_path(workspace: &Path, path: &str) -> PathBuf {
    workspace.join(path)
}
