use crate::schema::generate_schema;
use crate::tools::{parse_input, resolve_path};
use crate::traits::Tool;
use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

const LOG_LIMIT: &str = "10";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GitInput {
    /// Git command to execute. Supported commands: init, clone, add, commit, status, log, branch, diff, reset
    pub command: String,
    /// Path where the repository is located or should be created
    pub path: Option<String>,
    /// URL of the repository to clone
    pub url: Option<String>,
    /// Files to add, comma-separated or glob pattern
    pub files: Option<String>,
    /// Commit message
    pub message: Option<String>,
    /// Branch name for branch operations
    pub branch_name: Option<String>,
}

/// Version-control operations backed by the `git` executable.
pub struct GitTool {
    workspace: PathBuf,
}

impl GitTool {
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn split_files(files: &str) -> Vec<&str> {
    files
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect()
}

async fn run_git(dir: &Path, args: &[&str]) -> anyhow::Result<String> {
    debug!(dir = %dir.display(), ?args, "running git");

    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .context("failed to run git")?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.is_empty() {
            Err(anyhow!("git exited with {}", output.status))
        } else {
            Err(anyhow!(stderr))
        }
    }
}

impl GitTool {
    async fn init(&self, path: &str) -> anyhow::Result<String> {
        run_git(&self.workspace, &["init", path])
            .await
            .context("failed to initialize git repository")?;
        Ok(format!("Initialized empty Git repository in {path}"))
    }

    async fn clone_repo(&self, url: Option<&str>, path: &str) -> anyhow::Result<String> {
        let Some(url) = url else {
            bail!("URL is required for clone operation");
        };
        run_git(&self.workspace, &["clone", url, path])
            .await
            .context("failed to clone repository")?;
        Ok(format!("Cloned repository {url} to {path}"))
    }

    async fn add(&self, repo: &Path, files: Option<&str>) -> anyhow::Result<String> {
        let Some(files) = files else {
            bail!("files parameter is required for add operation");
        };
        for file in split_files(files) {
            run_git(repo, &["add", "--", file])
                .await
                .with_context(|| format!("failed to add file {file}"))?;
        }
        Ok(format!("Added files: {files}"))
    }

    async fn commit(&self, repo: &Path, message: Option<&str>) -> anyhow::Result<String> {
        let Some(message) = message else {
            bail!("commit message is required");
        };
        run_git(repo, &["commit", "-m", message])
            .await
            .context("failed to commit")?;
        let hash = run_git(repo, &["rev-parse", "HEAD"])
            .await
            .context("failed to get commit object")?;
        Ok(format!(
            "Created commit: {} with message: {message}",
            hash.trim()
        ))
    }

    async fn status(&self, repo: &Path) -> anyhow::Result<String> {
        run_git(repo, &["status", "--short"])
            .await
            .context("failed to get status")
    }

    async fn log(&self, repo: &Path) -> anyhow::Result<String> {
        let log = run_git(repo, &["log", "-n", LOG_LIMIT])
            .await
            .context("failed to get log")?;
        if log.trim().is_empty() {
            return Ok("No commits found".to_string());
        }
        Ok(log)
    }

    async fn branch(&self, repo: &Path, name: Option<&str>) -> anyhow::Result<String> {
        match name {
            Some(name) => {
                run_git(repo, &["branch", name])
                    .await
                    .context("failed to create branch")?;
                Ok(format!("Created branch: {name}"))
            }
            None => {
                let list = run_git(repo, &["branch", "--format=%(refname:short)"])
                    .await
                    .context("failed to get branches")?;
                if list.trim().is_empty() {
                    return Ok("No branches found".to_string());
                }
                Ok(list.trim_end().to_string())
            }
        }
    }

    async fn reset(&self, repo: &Path) -> anyhow::Result<String> {
        run_git(repo, &["reset", "--hard"])
            .await
            .context("failed to reset")?;
        Ok("Reset to HEAD".to_string())
    }

    /// Tracked changes against HEAD, followed by a `New file` entry for every
    /// path HEAD does not know about. Before the first commit every staged or
    /// untracked path is new.
    async fn diff(&self, repo: &Path, files: Option<&str>) -> anyhow::Result<String> {
        let pathspec = files.map(split_files).unwrap_or_default();
        let has_head = run_git(repo, &["rev-parse", "--verify", "--quiet", "HEAD"])
            .await
            .is_ok();

        let mut output = String::new();
        let mut new_files_args = vec!["ls-files", "--others", "--exclude-standard"];

        if has_head {
            let mut args = vec!["diff", "HEAD", "--"];
            args.extend(&pathspec);
            let tracked = run_git(repo, &args).await.context("failed to get diff")?;
            output.push_str(tracked.trim_end());
        } else {
            new_files_args.push("--cached");
        }

        new_files_args.push("--");
        new_files_args.extend(&pathspec);
        let new_files = run_git(repo, &new_files_args)
            .await
            .context("failed to list new files")?;

        for path in new_files.lines().filter(|p| !p.is_empty()) {
            let content = match tokio::fs::read(repo.join(path)).await {
                Ok(content) => content,
                // staged, then removed from the worktree
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e).with_context(|| format!("failed to read {path}")),
            };
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&format!(
                "New file: {path}\n{}",
                String::from_utf8_lossy(&content).trim_end()
            ));
        }

        if output.trim().is_empty() {
            let message = if files.is_some() {
                "No changes detected in specified files"
            } else {
                "No changes detected"
            };
            return Ok(message.to_string());
        }
        Ok(output)
    }
}

#[async_trait]
impl Tool for GitTool {
    fn name(&self) -> &str {
        "git"
    }

    fn description(&self) -> &str {
        "Perform Git operations like init, clone, add, commit, and status on repositories"
    }

    fn input_schema(&self) -> serde_json::Value {
        generate_schema::<GitInput>()
    }

    async fn execute(&self, input: serde_json::Value) -> anyhow::Result<String> {
        let input: GitInput = parse_input(self.name(), input)?;

        let path = non_empty(&input.path).unwrap_or(".");
        let repo = resolve_path(&self.workspace, path);
        let files = non_empty(&input.files);

        match input.command.trim() {
            "init" => self.init(path).await,
            "clone" => self.clone_repo(non_empty(&input.url), path).await,
            "add" => self.add(&repo, files).await,
            "commit" => self.commit(&repo, non_empty(&input.message)).await,
            "status" => self.status(&repo).await,
            "log" => self.log(&repo).await,
            "branch" => self.branch(&repo, non_empty(&input.branch_name)).await,
            "reset" => self.reset(&repo).await,
            "diff" => self.diff(&repo, files).await,
            other => bail!("unsupported git command: {other}"),
        }
    }
}
