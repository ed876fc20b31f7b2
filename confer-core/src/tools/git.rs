//! Git history tools
//!
//! Both tools read the repository that contains the workspace root through
//! git2 on the blocking pool, and render output close to `git log`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use git2::{Commit, Delta, Diff, DiffFormat, DiffOptions, Repository, Sort};
use serde::Deserialize;
use serde_json::{json, Value};

use super::sandbox::Sandbox;
use super::{parse_args, Tool};

const NOT_A_REPO: &str = "Not a git repository.";
const NO_FILE_HISTORY: &str = "No history found for this file.";

const DEFAULT_LOG_LIMIT: i64 = 5;
const DEFAULT_FILE_LIMIT: i64 = 3;

fn default_log_limit() -> i64 {
    DEFAULT_LOG_LIMIT
}

fn default_file_limit() -> i64 {
    DEFAULT_FILE_LIMIT
}

/// Non-positive limits fall back to the default
fn effective_limit(limit: i64, default: i64) -> usize {
    if limit <= 0 {
        default as usize
    } else {
        limit as usize
    }
}

fn open_repo(path: &Path) -> Result<Repository, String> {
    Repository::discover(path).map_err(|e| {
        if e.code() == git2::ErrorCode::NotFound {
            NOT_A_REPO.to_string()
        } else {
            history_error(e)
        }
    })
}

fn history_error(e: git2::Error) -> String {
    format!("Unable to read git history: {}", e.message())
}

/// Commits reachable from HEAD, newest first
fn walk_head(repo: &Repository) -> Result<git2::Revwalk<'_>, String> {
    let mut revwalk = repo.revwalk().map_err(history_error)?;
    revwalk.push_head().map_err(history_error)?;
    revwalk
        .set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
        .map_err(history_error)?;
    Ok(revwalk)
}

/// Diff of a commit against its first parent, optionally limited to a path
fn commit_diff<'r>(
    repo: &'r Repository,
    commit: &Commit<'_>,
    pathspec: Option<&Path>,
) -> Result<Diff<'r>, git2::Error> {
    let tree = commit.tree()?;
    let parent_tree = match commit.parent(0) {
        Ok(parent) => Some(parent.tree()?),
        Err(_) => None,
    };
    let mut opts = DiffOptions::new();
    if let Some(path) = pathspec {
        opts.pathspec(path);
    }
    repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))
}

fn format_header(commit: &Commit<'_>) -> String {
    let author = commit.author();
    let time = commit.time();
    let date = FixedOffset::east_opt(time.offset_minutes() * 60)
        .and_then(|offset| {
            DateTime::from_timestamp(time.seconds(), 0).map(|utc| utc.with_timezone(&offset))
        })
        .map(|date| date.format("%a %b %e %H:%M:%S %Y %z").to_string())
        .unwrap_or_else(|| time.seconds().to_string());

    let mut out = format!(
        "commit {}\nAuthor: {} <{}>\nDate:   {}\n\n",
        commit.id(),
        author.name().unwrap_or("unknown"),
        author.email().unwrap_or(""),
        date
    );
    for line in commit.message().unwrap_or("").trim_end().lines() {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn status_letter(status: Delta) -> char {
    match status {
        Delta::Added => 'A',
        Delta::Deleted => 'D',
        Delta::Renamed => 'R',
        Delta::Copied => 'C',
        Delta::Typechange => 'T',
        _ => 'M',
    }
}

fn git_log(root: &Path, limit: usize) -> Result<String, String> {
    let repo = open_repo(root)?;
    let mut blocks = Vec::new();

    for oid in walk_head(&repo)?.take(limit) {
        let commit = oid
            .and_then(|oid| repo.find_commit(oid))
            .map_err(history_error)?;
        let mut block = format_header(&commit);

        let diff = commit_diff(&repo, &commit, None).map_err(history_error)?;
        let changes: Vec<String> = diff
            .deltas()
            .map(|delta| {
                let path = delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                format!("{}\t{}", status_letter(delta.status()), path)
            })
            .collect();
        if !changes.is_empty() {
            block.push('\n');
            block.push_str(&changes.join("\n"));
        }
        blocks.push(block.trim_end().to_string());
    }

    Ok(blocks.join("\n\n"))
}

fn file_log(root: &Path, target: &Path, limit: usize) -> Result<String, String> {
    let repo = open_repo(root)?;
    let workdir = repo
        .workdir()
        .ok_or_else(|| NOT_A_REPO.to_string())?
        .canonicalize()
        .map_err(|e| format!("Unable to read git history: {}", e))?;
    let relative = match target.strip_prefix(&workdir) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => return Ok(NO_FILE_HISTORY.to_string()),
    };

    let mut blocks = Vec::new();
    for oid in walk_head(&repo)? {
        if blocks.len() == limit {
            break;
        }
        let commit = oid
            .and_then(|oid| repo.find_commit(oid))
            .map_err(history_error)?;
        let diff = commit_diff(&repo, &commit, Some(&relative)).map_err(history_error)?;
        if diff.deltas().len() == 0 {
            continue;
        }

        let mut block = format_header(&commit);
        block.push('\n');
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                block.push(line.origin());
            }
            block.push_str(&String::from_utf8_lossy(line.content()));
            true
        })
        .map_err(history_error)?;
        blocks.push(block.trim_end().to_string());
    }

    if blocks.is_empty() {
        return Ok(NO_FILE_HISTORY.to_string());
    }
    Ok(blocks.join("\n\n"))
}

async fn run_blocking<F>(task: F) -> String
where
    F: FnOnce() -> Result<String, String> + Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(Ok(text)) | Ok(Err(text)) => text,
        Err(e) => format!("Unable to read git history: {}", e),
    }
}

#[derive(Deserialize)]
struct GitHistoryArgs {
    #[serde(default = "default_log_limit")]
    limit: i64,
}

/// `get_git_history`: recent commits with changed paths
pub struct GitHistoryTool {
    root: PathBuf,
}

impl GitHistoryTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self {
            root: sandbox.root().to_path_buf(),
        }
    }
}

#[async_trait]
impl Tool for GitHistoryTool {
    fn name(&self) -> &'static str {
        "get_git_history"
    }

    fn description(&self) -> &'static str {
        "Get git commit history with the specified limit."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "description": "Number of commits",
                    "default": DEFAULT_LOG_LIMIT
                }
            }
        })
    }

    async fn call(&self, args: Value) -> String {
        let args: GitHistoryArgs = match parse_args(self.name(), args) {
            Ok(args) => args,
            Err(e) => return e,
        };
        let limit = effective_limit(args.limit, DEFAULT_LOG_LIMIT);
        let root = self.root.clone();
        run_blocking(move || git_log(&root, limit)).await
    }
}

#[derive(Deserialize)]
struct FileHistoryArgs {
    filepath: String,
    #[serde(default = "default_file_limit")]
    limit: i64,
}

/// `get_file_history`: commits touching one file, each with its patch
pub struct FileHistoryTool {
    sandbox: Sandbox,
}

impl FileHistoryTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for FileHistoryTool {
    fn name(&self) -> &'static str {
        "get_file_history"
    }

    fn description(&self) -> &'static str {
        "Get git commit history and diffs for a specific file."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filepath": {"type": "string", "description": "Path relative to the project root"},
                "limit": {
                    "type": "integer",
                    "description": "Number of commits",
                    "default": DEFAULT_FILE_LIMIT
                }
            },
            "required": ["filepath"]
        })
    }

    async fn call(&self, args: Value) -> String {
        let args: FileHistoryArgs = match parse_args(self.name(), args) {
            Ok(args) => args,
            Err(e) => return e,
        };
        let target = match self.sandbox.resolve(&args.filepath) {
            Ok(path) => path,
            Err(denied) => return denied.to_string(),
        };
        let limit = effective_limit(args.limit, DEFAULT_FILE_LIMIT);
        let root = self.sandbox.root().to_path_buf();
        run_blocking(move || file_log(&root, &target, limit)).await
    }
}
