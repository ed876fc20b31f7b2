//! File read and directory listing tools

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

use super::sandbox::Sandbox;
use super::{parse_args, Tool};

const FILE_NOT_FOUND: &str = "File not found.";
const NOT_A_FILE: &str = "Target is not a file.";
const NOT_TEXT: &str = "Unable to read file as text.";
const DIR_NOT_FOUND: &str = "Directory not found.";
const NOT_A_DIR: &str = "Target is not a directory.";
const PERMISSION_DENIED: &str = "Permission denied.";

const IGNORE_FILES: [&str; 2] = [".gitignore", ".dockerignore"];

/// Read a workspace file as UTF-8
///
/// `Err` carries the text to show the model instead of the content.
pub async fn read_text(sandbox: &Sandbox, filepath: &str) -> Result<String, String> {
    let path = sandbox.resolve(filepath).map_err(|denied| denied.to_string())?;

    let metadata = tokio::fs::metadata(&path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => FILE_NOT_FOUND.to_string(),
        ErrorKind::PermissionDenied => PERMISSION_DENIED.to_string(),
        _ => format!("Unable to read file: {}", e),
    })?;
    if !metadata.is_file() {
        return Err(NOT_A_FILE.to_string());
    }

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => PERMISSION_DENIED.to_string(),
        _ => format!("Unable to read file: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|_| NOT_TEXT.to_string())
}

#[derive(Deserialize)]
struct ReadFileArgs {
    filepath: String,
}

/// `read_file_content`: return a file's text
pub struct ReadFileTool {
    sandbox: Sandbox,
}

impl ReadFileTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file_content"
    }

    fn description(&self) -> &'static str {
        "Read the content of a file from the project directory."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filepath": {"type": "string", "description": "Path relative to the project root"}
            },
            "required": ["filepath"]
        })
    }

    async fn call(&self, args: Value) -> String {
        let args: ReadFileArgs = match parse_args(self.name(), args) {
            Ok(args) => args,
            Err(e) => return e,
        };
        match read_text(&self.sandbox, &args.filepath).await {
            Ok(text) | Err(text) => text,
        }
    }
}

fn default_directory() -> String {
    ".".to_string()
}

#[derive(Deserialize)]
struct ListDirectoryArgs {
    #[serde(default = "default_directory")]
    directory: String,
}

/// `list_directory`: render a directory as a tree
///
/// Entries matching `.gitignore` or `.dockerignore` patterns of the listed
/// directory are left out, as is `.git` itself.
pub struct ListDirectoryTool {
    sandbox: Sandbox,
}

impl ListDirectoryTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &'static str {
        "list_directory"
    }

    fn description(&self) -> &'static str {
        "List the structure of the project directory or of a subdirectory."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "Directory to list, relative to the project root",
                    "default": "."
                }
            }
        })
    }

    async fn call(&self, args: Value) -> String {
        let args: ListDirectoryArgs = match parse_args(self.name(), args) {
            Ok(args) => args,
            Err(e) => return e,
        };

        let path = match self.sandbox.resolve(&args.directory) {
            Ok(path) => path,
            Err(denied) => return denied.to_string(),
        };

        match tokio::task::spawn_blocking(move || list_tree(&path)).await {
            Ok(text) => text,
            Err(e) => format!("Error listing directory: {}", e),
        }
    }
}

struct Entry {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

fn list_tree(path: &Path) -> String {
    match std::fs::metadata(path) {
        Ok(meta) if !meta.is_dir() => return NOT_A_DIR.to_string(),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return DIR_NOT_FOUND.to_string(),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => return PERMISSION_DENIED.to_string(),
        Err(e) => return format!("Error listing directory: {}", e),
    }

    let matcher = load_ignore(path);
    let entries = match read_entries(path, matcher.as_ref()) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => return PERMISSION_DENIED.to_string(),
        Err(e) => return format!("Error listing directory: {}", e),
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut lines = vec![format!("{}/", name)];

    if entries.is_empty() {
        lines.push("└── (empty)".to_string());
    } else {
        render(&entries, "", matcher.as_ref(), &mut lines);
    }
    lines.join("\n")
}

fn render(entries: &[Entry], prefix: &str, matcher: Option<&Gitignore>, lines: &mut Vec<String>) {
    for (i, entry) in entries.iter().enumerate() {
        let last = i + 1 == entries.len();
        let branch = if last { "└── " } else { "├── " };
        let suffix = if entry.is_dir { "/" } else { "" };
        lines.push(format!("{}{}{}{}", prefix, branch, entry.name, suffix));

        if entry.is_dir {
            // Unreadable subdirectories are shown without children.
            if let Ok(children) = read_entries(&entry.path, matcher) {
                let extension = if last { "    " } else { "│   " };
                render(&children, &format!("{}{}", prefix, extension), matcher, lines);
            }
        }
    }
}

/// Directory entries minus ignored ones, directories first then by name
fn read_entries(dir: &Path, matcher: Option<&Gitignore>) -> std::io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for item in std::fs::read_dir(dir)? {
        let item = item?;
        let name = item.file_name().to_string_lossy().into_owned();
        if name == ".git" {
            continue;
        }
        // Symlinked directories are listed but not followed.
        let is_dir = item.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let path = item.path();
        if let Some(matcher) = matcher {
            if matcher.matched_path_or_any_parents(&path, is_dir).is_ignore() {
                continue;
            }
        }
        entries.push(Entry { name, path, is_dir });
    }
    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}

fn load_ignore(dir: &Path) -> Option<Gitignore> {
    let mut builder = GitignoreBuilder::new(dir);
    let mut found = false;
    for file in IGNORE_FILES {
        let ignore_path = dir.join(file);
        if !ignore_path.is_file() {
            continue;
        }
        found = true;
        if let Some(err) = builder.add(&ignore_path) {
            tracing::warn!(
                path = %ignore_path.display(),
                error = %err,
                "Skipping unreadable ignore patterns"
            );
        }
    }
    if !found {
        return None;
    }
    builder.build().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn workspace() -> (TempDir, Sandbox) {
        let dir = TempDir::new().unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        (dir, sandbox)
    }

    #[tokio::test]
    async fn test_read_file_content() {
        let (dir, sandbox) = workspace();
        fs::write(dir.path().join("foo.py"), "def X():\n    return 1\n").unwrap();

        let out = ReadFileTool::new(sandbox)
            .call(json!({"filepath": "foo.py"}))
            .await;
        assert_eq!(out, "def X():\n    return 1\n");
    }

    #[tokio::test]
    async fn test_read_outside_root_is_denied() {
        let (_dir, sandbox) = workspace();
        let out = ReadFileTool::new(sandbox)
            .call(json!({"filepath": "../../etc/passwd"}))
            .await;
        assert_eq!(out, "Access denied.");
    }

    #[tokio::test]
    async fn test_read_failure_texts() {
        let (dir, sandbox) = workspace();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        let tool = ReadFileTool::new(sandbox);

        assert_eq!(tool.call(json!({"filepath": "missing.rs"})).await, "File not found.");
        assert_eq!(tool.call(json!({"filepath": "pkg"})).await, "Target is not a file.");
        assert_eq!(
            tool.call(json!({"filepath": "blob.bin"})).await,
            "Unable to read file as text."
        );
        assert!(tool
            .call(json!({}))
            .await
            .starts_with("Invalid arguments for read_file_content"));
    }

    #[tokio::test]
    async fn test_list_directory_tree() {
        let (dir, sandbox) = workspace();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        fs::write(dir.path().join("src/nested/mod.rs"), "").unwrap();
        fs::write(dir.path().join("Cargo.toml"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();

        let out = ListDirectoryTool::new(sandbox).call(json!({})).await;
        let root_name = dir.path().canonicalize().unwrap();
        let root_name = root_name.file_name().unwrap().to_string_lossy();

        let expected = format!(
            "{}/\n\
             ├── src/\n\
             │   ├── nested/\n\
             │   │   └── mod.rs\n\
             │   └── lib.rs\n\
             ├── Cargo.toml\n\
             └── README.md",
            root_name
        );
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn test_list_directory_respects_ignore_files() {
        let (dir, sandbox) = workspace();
        fs::create_dir(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("target/out.o"), "").unwrap();
        fs::write(dir.path().join("main.rs"), "").unwrap();
        fs::write(dir.path().join("debug.log"), "").unwrap();
        fs::write(dir.path().join("secret.env"), "").unwrap();
        fs::write(dir.path().join(".gitignore"), "target/\n*.log\n").unwrap();
        fs::write(dir.path().join(".dockerignore"), "secret.env\n").unwrap();

        let out = ListDirectoryTool::new(sandbox).call(json!({"directory": "."})).await;
        assert!(out.contains("main.rs"));
        assert!(out.contains(".gitignore"));
        assert!(!out.contains("target"));
        assert!(!out.contains("debug.log"));
        assert!(!out.contains("secret.env"));
    }

    #[tokio::test]
    async fn test_list_directory_failure_texts() {
        let (dir, sandbox) = workspace();
        fs::create_dir(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("file.txt"), "x").unwrap();
        let tool = ListDirectoryTool::new(sandbox);

        assert_eq!(tool.call(json!({"directory": "empty"})).await, "empty/\n└── (empty)");
        assert_eq!(tool.call(json!({"directory": "nope"})).await, "Directory not found.");
        assert_eq!(
            tool.call(json!({"directory": "file.txt"})).await,
            "Target is not a directory."
        );
        assert_eq!(tool.call(json!({"directory": "../.."})).await, "Access denied.");
    }
}
