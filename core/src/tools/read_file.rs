use crate::schema::generate_schema;
use crate::tools::{parse_input, resolve_path};
use crate::traits::Tool;
use anyhow::Context;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadFileInput {
    /// The relative path of a file in the working directory.
    pub path: String,
}

pub struct ReadFileTool {
    workspace: PathBuf,
}

impl ReadFileTool {
    pub fn new(workspace: impl AsRef<std::path::Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Reads a file's contents, given a relative path. Useful for inspecting a file but does not work with directory names."
    }

    fn input_schema(&self) -> serde_json::Value {
        generate_schema::<ReadFileInput>()
    }

    async fn execute(&self, input: serde_json::Value) -> anyhow::Result<String> {
        let input: ReadFileInput = parse_input(self.name(), input)?;
        let full_path = resolve_path(&self.workspace, &input.path);

        tokio::fs::read_to_string(&full_path)
            .await
            .with_context(|| format!("failed to read {}", input.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_relative_to_workspace() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "hello\nworld\n").unwrap();

        let tool = ReadFileTool::new(tmp.path());
        let out = tool.execute(json!({"path": "notes.txt"})).await.unwrap();
        assert_eq!(out, "hello\nworld\n");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let tool = ReadFileTool::new(tmp.path());

        let err = tool.execute(json!({"path": "nope.txt"})).await.unwrap_err();
        assert!(err.to_string().contains("nope.txt"));
    }

    #[tokio::test]
    async fn directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("src")).unwrap();
        let tool = ReadFileTool::new(tmp.path());

        assert!(tool.execute(json!({"path": "src"})).await.is_err());
    }

    #[tokio::test]
    async fn malformed_input_is_an_error() {
        let tool = ReadFileTool::new(".");
        assert!(tool.execute(json!("notes.txt")).await.is_err());
        assert!(tool.execute(json!({"path": 7})).await.is_err());
    }

    #[test]
    fn schema_requires_path() {
        let schema = ReadFileTool::new(".").input_schema();
        assert_eq!(schema["required"], json!(["path"]));
        assert_eq!(
            schema["properties"]["path"]["description"],
            "The relative path of a file in the working directory."
        );
    }
}
