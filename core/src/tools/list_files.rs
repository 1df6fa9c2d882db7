use crate::schema::generate_schema;
use crate::tools::{parse_input, resolve_path};
use crate::traits::Tool;
use anyhow::Context;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListFilesInput {
    /// Optional relative path to list files from. Defaults to current directory if not provided.
    pub path: Option<String>,
}

pub struct ListFilesTool {
    workspace: PathBuf,
}

impl ListFilesTool {
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
        }
    }
}

/// Every entry below `dir`, relative to it, directories suffixed with `/`.
fn walk(dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        let rel = entry
            .path()
            .strip_prefix(dir)
            .with_context(|| format!("{} escaped {}", entry.path().display(), dir.display()))?;
        let mut rel = rel.to_string_lossy().into_owned();
        if entry.file_type().is_dir() {
            rel.push('/');
        }
        files.push(rel);
    }

    Ok(files)
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files and directories at a given path. If no path is provided, lists files in the current directory."
    }

    fn input_schema(&self) -> serde_json::Value {
        generate_schema::<ListFilesInput>()
    }

    async fn execute(&self, input: serde_json::Value) -> anyhow::Result<String> {
        let input: ListFilesInput = if input.is_null() {
            ListFilesInput::default()
        } else {
            parse_input(self.name(), input)?
        };

        let dir = match input.path.as_deref() {
            Some(path) if !path.is_empty() => resolve_path(&self.workspace, path),
            _ => self.workspace.clone(),
        };

        let files = tokio::task::spawn_blocking(move || walk(&dir))
            .await
            .context("list_files task failed")??;
        Ok(serde_json::to_string(&files)?)
    }
}
