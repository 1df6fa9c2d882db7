use crate::schema::generate_schema;
use crate::tools::{parse_input, resolve_path};
use crate::traits::Tool;
use anyhow::{Context, bail};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EditFileInput {
    /// The path to the file
    pub path: String,
    /// Text to search for - must match exactly and must only have one match exactly
    pub old_str: String,
    /// Text to replace old_str with
    pub new_str: String,
}

pub struct EditFileTool {
    workspace: PathBuf,
}

impl EditFileTool {
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
        }
    }
}

async fn create_new_file(full_path: &Path, display: &str, content: &str) -> anyhow::Result<String> {
    if let Some(parent) = full_path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .context("failed to create directory")?;
    }

    tokio::fs::write(full_path, content)
        .await
        .context("failed to create file")?;

    Ok(format!("Successfully created file {display}"))
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Make edits to a text file.

Replaces 'old_str' with 'new_str' in the given file. 'old_str' and 'new_str' MUST be different from each other.

If the file specified with path doesn't exist, it will be created.
"
    }

    fn input_schema(&self) -> serde_json::Value {
        generate_schema::<EditFileInput>()
    }

    async fn execute(&self, input: serde_json::Value) -> anyhow::Result<String> {
        let input: EditFileInput = parse_input(self.name(), input)?;

        if input.path.is_empty() || input.old_str == input.new_str {
            bail!("invalid input parameters");
        }

        let full_path = resolve_path(&self.workspace, &input.path);

        let old_content = match tokio::fs::read_to_string(&full_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound && input.old_str.is_empty() => {
                return create_new_file(&full_path, &input.path, &input.new_str).await;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", input.path));
            }
        };

        let new_content = old_content.replace(&input.old_str, &input.new_str);

        if old_content == new_content && !input.old_str.is_empty() {
            bail!("old_str not found in file");
        }

        tokio::fs::write(&full_path, new_content)
            .await
            .with_context(|| format!("failed to write {}", input.path))?;

        Ok("OK".to_string())
    }
}
