//! File tools: read_file, write_file, list_dir, replace_in_file

use super::ToolContext;
use patchpilot_domain::{
    ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult, ToolResultMetadata,
};
use std::fs;
use std::path::Path;

/// Tool name constants
pub const READ_FILE: &str = "read_file";
pub const WRITE_FILE: &str = "write_file";
pub const LIST_DIR: &str = "list_dir";
pub const REPLACE_IN_FILE: &str = "replace_in_file";

/// Directories never descended into by listing and search
pub const SKIPPED_DIRS: &[&str] = &[
    ".git",
    ".patchpilot",
    "node_modules",
    "target",
    ".venv",
    "__pycache__",
];

const DEFAULT_LIST_DEPTH: usize = 3;
const MAX_LIST_ENTRIES: usize = 1000;

pub fn read_file_definition() -> ToolDefinition {
    ToolDefinition::new(
        READ_FILE,
        "Read a UTF-8 text file relative to the workspace root. Missing files return \
         NOT_FOUND.",
    )
    .with_parameter(ToolParameter::new("path", "File path relative to the workspace root", true))
    .with_parameter(
        ToolParameter::new("offset", "First line to return, 1-based (default: 1)", false)
            .with_type("integer"),
    )
    .with_parameter(
        ToolParameter::new("limit", "Maximum number of lines to return", false)
            .with_type("integer"),
    )
}

pub fn write_file_definition() -> ToolDefinition {
    ToolDefinition::new(
        WRITE_FILE,
        "Write a file, replacing any existing content. Parent directories are created.",
    )
    .with_parameter(ToolParameter::new("path", "File path relative to the workspace root", true))
    .with_parameter(ToolParameter::new("content", "Full file content", true))
}

pub fn list_dir_definition() -> ToolDefinition {
    ToolDefinition::new(
        LIST_DIR,
        "List files and directories as an indented tree. Directories end with '/'.",
    )
    .with_parameter(ToolParameter::new(
        "path",
        "Directory relative to the workspace root (default: '.')",
        false,
    ))
    .with_parameter(
        ToolParameter::new("max_depth", "How deep to descend (default: 3)", false)
            .with_type("integer"),
    )
}

pub fn replace_in_file_definition() -> ToolDefinition {
    ToolDefinition::new(
        REPLACE_IN_FILE,
        "Replace one exact occurrence of `old` with `new`. Fails with INVALID_CONTEXT \
         unless `old` occurs exactly once.",
    )
    .with_parameter(ToolParameter::new("path", "File path relative to the workspace root", true))
    .with_parameter(ToolParameter::new("old", "Exact text to replace", true))
    .with_parameter(ToolParameter::new("new", "Replacement text", true))
}

pub fn execute_read_file(ctx: &ToolContext, call: &ToolCall) -> ToolResult {
    let path_str = match call.require_string("path") {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(READ_FILE, ToolError::invalid_argument(e)),
    };
    let path = match ctx.workspace.resolve(path_str) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(READ_FILE, e),
    };

    if !path.exists() {
        return ToolResult::failure(READ_FILE, ToolError::not_found(path_str));
    }
    if path.is_dir() {
        return ToolResult::failure(
            READ_FILE,
            ToolError::invalid_argument(format!("'{}' is a directory; use list_dir", path_str)),
        );
    }

    let content = match fs::read(&path) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                return ToolResult::failure(
                    READ_FILE,
                    ToolError::invalid_argument(format!("'{}' is not valid UTF-8", path_str)),
                );
            }
        },
        Err(e) => {
            return ToolResult::failure(
                READ_FILE,
                ToolError::execution_failed(format!("Failed to read '{}': {}", path_str, e)),
            );
        }
    };

    let offset = call.get_i64("offset").unwrap_or(1).max(1) as usize;
    let limit = call.get_i64("limit").filter(|l| *l > 0).map(|l| l as usize);

    let output = if offset == 1 && limit.is_none() {
        content
    } else {
        let lines = content.lines().skip(offset - 1);
        let selected: Vec<&str> = match limit {
            Some(limit) => lines.take(limit).collect(),
            None => lines.collect(),
        };
        selected.join("\n")
    };

    let bytes = output.len();
    ToolResult::success(READ_FILE, output).with_metadata(ToolResultMetadata {
        bytes: Some(bytes),
        path: Some(ctx.workspace.display(&path)),
        ..Default::default()
    })
}

pub fn execute_write_file(ctx: &ToolContext, call: &ToolCall) -> ToolResult {
    let path_str = match call.require_string("path") {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(WRITE_FILE, ToolError::invalid_argument(e)),
    };
    let content = match call.require_string("content") {
        Ok(c) => c,
        Err(e) => return ToolResult::failure(WRITE_FILE, ToolError::invalid_argument(e)),
    };
    let path = match ctx.workspace.resolve(path_str) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(WRITE_FILE, e),
    };
    if path.is_dir() {
        return ToolResult::failure(
            WRITE_FILE,
            ToolError::invalid_argument(format!("'{}' is a directory", path_str)),
        );
    }

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        return ToolResult::failure(
            WRITE_FILE,
            ToolError::execution_failed(format!("Failed to create directories: {}", e)),
        );
    }

    match fs::write(&path, content) {
        Ok(()) => {
            let display = ctx.workspace.display(&path);
            ToolResult::success(
                WRITE_FILE,
                format!("WROTE {} ({} bytes)", display, content.len()),
            )
            .with_metadata(ToolResultMetadata {
                bytes: Some(content.len()),
                path: Some(display),
                ..Default::default()
            })
        }
        Err(e) => ToolResult::failure(
            WRITE_FILE,
            ToolError::execution_failed(format!("Failed to write '{}': {}", path_str, e)),
        ),
    }
}

pub fn execute_list_dir(ctx: &ToolContext, call: &ToolCall) -> ToolResult {
    let path_str = call.get_string("path").unwrap_or(".");
    let path = match ctx.workspace.resolve(path_str) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(LIST_DIR, e),
    };
    if !path.exists() {
        return ToolResult::failure(LIST_DIR, ToolError::not_found(path_str));
    }
    if !path.is_dir() {
        return ToolResult::failure(
            LIST_DIR,
            ToolError::invalid_argument(format!("'{}' is not a directory", path_str)),
        );
    }

    let max_depth = call
        .get_i64("max_depth")
        .filter(|d| *d > 0)
        .map(|d| d as usize)
        .unwrap_or(DEFAULT_LIST_DEPTH);

    let mut lines = Vec::new();
    walk(&path, 0, max_depth, &mut lines);

    let truncated = lines.len() >= MAX_LIST_ENTRIES;
    let count = lines.len();
    let mut output = format!("{}/\n{}", ctx.workspace.display(&path), lines.join("\n"));
    if truncated {
        output.push_str(&format!("\n... (limited to {} entries)", MAX_LIST_ENTRIES));
    }

    ToolResult::success(LIST_DIR, output).with_metadata(ToolResultMetadata {
        match_count: Some(count),
        ..Default::default()
    })
}

fn walk(dir: &Path, depth: usize, max_depth: usize, lines: &mut Vec<String>) {
    if depth >= max_depth || lines.len() >= MAX_LIST_ENTRIES {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let mut entries: Vec<_> = entries.filter_map(Result::ok).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        if lines.len() >= MAX_LIST_ENTRIES {
            return;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        let indent = "  ".repeat(depth + 1);
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            if SKIPPED_DIRS.contains(&name.as_str()) {
                continue;
            }
            lines.push(format!("{}{}/", indent, name));
            walk(&entry.path(), depth + 1, max_depth, lines);
        } else {
            lines.push(format!("{}{}", indent, name));
        }
    }
}

pub fn execute_replace_in_file(ctx: &ToolContext, call: &ToolCall) -> ToolResult {
    let (path_str, old, new) = match (
        call.require_string("path"),
        call.require_string("old"),
        call.require_string("new"),
    ) {
        (Ok(p), Ok(o), Ok(n)) => (p, o, n),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            return ToolResult::failure(REPLACE_IN_FILE, ToolError::invalid_argument(e));
        }
    };
    if old.is_empty() {
        return ToolResult::failure(
            REPLACE_IN_FILE,
            ToolError::invalid_argument("'old' must not be empty"),
        );
    }

    let path = match ctx.workspace.resolve(path_str) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(REPLACE_IN_FILE, e),
    };
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return ToolResult::failure(REPLACE_IN_FILE, ToolError::not_found(path_str));
        }
        Err(e) => {
            return ToolResult::failure(
                REPLACE_IN_FILE,
                ToolError::execution_failed(format!("Failed to read '{}': {}", path_str, e)),
            );
        }
    };

    match content.matches(old).count() {
        1 => {}
        0 => {
            return ToolResult::failure(
                REPLACE_IN_FILE,
                ToolError::invalid_context(format!("'old' text not found in {}", path_str)),
            );
        }
        n => {
            return ToolResult::failure(
                REPLACE_IN_FILE,
                ToolError::invalid_context(format!(
                    "'old' text occurs {} times in {}; include more surrounding context",
                    n, path_str
                )),
            );
        }
    }

    let updated = content.replacen(old, new, 1);
    match fs::write(&path, &updated) {
        Ok(()) => ToolResult::success(
            REPLACE_IN_FILE,
            format!("REPLACED 1 occurrence in {}", ctx.workspace.display(&path)),
        )
        .with_metadata(ToolResultMetadata {
            bytes: Some(updated.len()),
            path: Some(ctx.workspace.display(&path)),
            ..Default::default()
        }),
        Err(e) => ToolResult::failure(
            REPLACE_IN_FILE,
            ToolError::execution_failed(format!("Failed to write '{}': {}", path_str, e)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolContext, ToolLimits};
    use patchpilot_domain::ToolErrorKind;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ToolContext) {
        let dir = TempDir::new().unwrap();
        let ctx =
            ToolContext::new(dir.path(), dir.path().join(".patchpilot"), ToolLimits::default())
                .unwrap();
        (dir, ctx)
    }

    #[test]
    fn test_read_file_with_range() {
        let (dir, ctx) = setup();
        fs::write(dir.path().join("a.txt"), "one\ntwo\nthree\nfour\n").unwrap();

        let all = execute_read_file(&ctx, &ToolCall::new(READ_FILE).with_arg("path", "a.txt"));
        assert_eq!(all.output, "one\ntwo\nthree\nfour\n");

        let call = ToolCall::new(READ_FILE)
            .with_arg("path", "a.txt")
            .with_arg("offset", 2)
            .with_arg("limit", 2);
        let part = execute_read_file(&ctx, &call);
        assert_eq!(part.output, "two\nthree");
    }

    #[test]
    fn test_read_missing_file_is_sentinel() {
        let (_dir, ctx) = setup();
        let result = execute_read_file(&ctx, &ToolCall::new(READ_FILE).with_arg("path", "nope.rs"));
        assert_eq!(result.error_kind(), Some(ToolErrorKind::NotFound));
        assert!(result.render().contains("NOT_FOUND: nope.rs"));
    }

    #[test]
    fn test_read_outside_workspace() {
        let (_dir, ctx) = setup();
        let result =
            execute_read_file(&ctx, &ToolCall::new(READ_FILE).with_arg("path", "../etc/passwd"));
        assert_eq!(result.error_kind(), Some(ToolErrorKind::PathEscape));
    }

    #[test]
    fn test_write_creates_parents() {
        let (dir, ctx) = setup();
        let call = ToolCall::new(WRITE_FILE)
            .with_arg("path", "src/deep/mod.rs")
            .with_arg("content", "pub fn x() {}\n");

        let result = execute_write_file(&ctx, &call);
        assert!(result.is_success());
        assert_eq!(result.output, "WROTE src/deep/mod.rs (14 bytes)");
        assert_eq!(
            fs::read_to_string(dir.path().join("src/deep/mod.rs")).unwrap(),
            "pub fn x() {}\n"
        );
    }

    #[test]
    fn test_list_dir_skips_vendor_dirs() {
        let (dir, ctx) = setup();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();

        let result = execute_list_dir(&ctx, &ToolCall::new(LIST_DIR));
        assert!(result.is_success());
        assert!(result.output.contains("src/"));
        assert!(result.output.contains("main.rs"));
        assert!(result.output.contains("README.md"));
        assert!(!result.output.contains(".git"));
        assert!(!result.output.contains("node_modules"));
    }

    #[test]
    fn test_list_dir_depth() {
        let (dir, ctx) = setup();
        fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
        fs::write(dir.path().join("a/b/c/deep.txt"), "").unwrap();

        let call = ToolCall::new(LIST_DIR).with_arg("max_depth", 1);
        let result = execute_list_dir(&ctx, &call);
        assert!(result.output.contains("a/"));
        assert!(!result.output.contains("b/"));
    }

    #[test]
    fn test_replace_exactly_once() {
        let (dir, ctx) = setup();
        fs::write(dir.path().join("lib.rs"), "let x = 1;\nlet y = 2;\n").unwrap();
        let call = ToolCall::new(REPLACE_IN_FILE)
            .with_arg("path", "lib.rs")
            .with_arg("old", "let y = 2;")
            .with_arg("new", "let y = 3;");

        let result = execute_replace_in_file(&ctx, &call);
        assert!(result.is_success(), "{}", result.render());
        assert_eq!(
            fs::read_to_string(dir.path().join("lib.rs")).unwrap(),
            "let x = 1;\nlet y = 3;\n"
        );
    }

    #[test]
    fn test_replace_ambiguous_or_missing() {
        let (dir, ctx) = setup();
        fs::write(dir.path().join("lib.rs"), "a\na\n").unwrap();

        let ambiguous = ToolCall::new(REPLACE_IN_FILE)
            .with_arg("path", "lib.rs")
            .with_arg("old", "a")
            .with_arg("new", "b");
        let result = execute_replace_in_file(&ctx, &ambiguous);
        assert_eq!(result.error_kind(), Some(ToolErrorKind::InvalidContext));
        assert!(result.render().contains("occurs 2 times"));

        let missing = ToolCall::new(REPLACE_IN_FILE)
            .with_arg("path", "lib.rs")
            .with_arg("old", "zzz")
            .with_arg("new", "b");
        let result = execute_replace_in_file(&ctx, &missing);
        assert_eq!(result.error_kind(), Some(ToolErrorKind::InvalidContext));
        assert_eq!(fs::read_to_string(dir.path().join("lib.rs")).unwrap(), "a\na\n");
    }
}
