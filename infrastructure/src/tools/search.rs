//! Search tool: regex search over workspace files

use super::ToolContext;
use super::file::SKIPPED_DIRS;
use glob::Pattern;
use patchpilot_domain::{
    ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult, ToolResultMetadata, truncate,
};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Tool name constant
pub const SEARCH: &str = "search";

/// Maximum number of matching lines returned
const MAX_MATCHES: usize = 200;

/// Files larger than this are skipped (5 MB)
const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Longest line text echoed per match
const MAX_LINE_LEN: usize = 200;

pub fn search_definition() -> ToolDefinition {
    ToolDefinition::new(
        SEARCH,
        "Search file contents with a regular expression. Results are `path:line: text`, \
         at most 200 matches.",
    )
    .with_parameter(ToolParameter::new("pattern", "Regular expression to search for", true))
    .with_parameter(ToolParameter::new(
        "path",
        "File or directory to search (default: workspace root)",
        false,
    ))
    .with_parameter(ToolParameter::new(
        "file_glob",
        "Only search files whose name or relative path matches, e.g. '*.rs'",
        false,
    ))
}

pub fn execute_search(ctx: &ToolContext, call: &ToolCall) -> ToolResult {
    let start = Instant::now();

    let pattern = match call.require_string("pattern") {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(SEARCH, ToolError::invalid_argument(e)),
    };
    let regex = match Regex::new(pattern) {
        Ok(r) => r,
        Err(e) => {
            return ToolResult::failure(
                SEARCH,
                ToolError::invalid_argument(format!("Invalid regex pattern: {}", e)),
            );
        }
    };
    let file_glob = match call.get_string("file_glob").map(Pattern::new).transpose() {
        Ok(g) => g,
        Err(e) => {
            return ToolResult::failure(
                SEARCH,
                ToolError::invalid_argument(format!("Invalid file_glob: {}", e)),
            );
        }
    };

    let path_str = call.get_string("path").unwrap_or(".");
    let base = match ctx.workspace.resolve(path_str) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(SEARCH, e),
    };
    if !base.exists() {
        return ToolResult::failure(SEARCH, ToolError::not_found(path_str));
    }

    let mut files = Vec::new();
    collect_files(&base, &mut files);

    let mut matches = Vec::new();
    let mut truncated = false;
    'files: for file in &files {
        let display = ctx.workspace.display(file);
        if let Some(glob) = &file_glob {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if !glob.matches(&name) && !glob.matches(&display) {
                continue;
            }
        }
        if fs::metadata(file).map(|m| m.len() > MAX_FILE_SIZE).unwrap_or(true) {
            continue;
        }
        let Ok(content) = fs::read_to_string(file) else {
            // binary or unreadable
            continue;
        };

        for (idx, line) in content.lines().enumerate() {
            if regex.is_match(line) {
                if matches.len() >= MAX_MATCHES {
                    truncated = true;
                    break 'files;
                }
                matches.push(format!(
                    "{}:{}: {}",
                    display,
                    idx + 1,
                    truncate(line.trim(), MAX_LINE_LEN)
                ));
            }
        }
    }

    let match_count = matches.len();
    let output = if matches.is_empty() {
        format!("No matches for /{}/", pattern)
    } else {
        let mut output = matches.join("\n");
        if truncated {
            output.push_str(&format!("\n... (limited to {} matches)", MAX_MATCHES));
        }
        output
    };

    ToolResult::success(SEARCH, output).with_metadata(ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        match_count: Some(match_count),
        ..Default::default()
    })
}

/// Collect regular files under `path` in sorted order, skipping vendor dirs.
fn collect_files(path: &Path, files: &mut Vec<PathBuf>) {
    if path.is_file() {
        files.push(path.to_path_buf());
        return;
    }
    let Ok(entries) = fs::read_dir(path) else {
        return;
    };
    let mut entries: Vec<_> = entries.filter_map(Result::ok).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !SKIPPED_DIRS.contains(&name.as_str()) {
                collect_files(&entry.path(), files);
            }
        } else if file_type.is_file() {
            files.push(entry.path());
        }
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
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(
            dir.path().join("src/lib.rs"),
            "pub fn parse() {}\n// TODO: handle errors\nfn helper() {}\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.md"), "TODO: docs\n").unwrap();
        fs::create_dir_all(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("target/out.rs"), "TODO: generated\n").unwrap();
        let ctx =
            ToolContext::new(dir.path(), dir.path().join(".patchpilot"), ToolLimits::default())
                .unwrap();
        (dir, ctx)
    }

    #[test]
    fn test_search_format() {
        let (_dir, ctx) = setup();
        let result = execute_search(&ctx, &ToolCall::new(SEARCH).with_arg("pattern", "TODO"));
        assert!(result.is_success());
        assert!(result.output.contains("notes.md:1: TODO: docs"));
        assert!(result.output.contains("src/lib.rs:2: // TODO: handle errors"));
        assert!(!result.output.contains("target"));
        assert_eq!(result.metadata.match_count, Some(2));
    }

    #[test]
    fn test_search_file_glob() {
        let (_dir, ctx) = setup();
        let call = ToolCall::new(SEARCH)
            .with_arg("pattern", "TODO")
            .with_arg("file_glob", "*.rs");
        let result = execute_search(&ctx, &call);
        assert_eq!(result.metadata.match_count, Some(1));
        assert!(!result.output.contains("notes.md"));
    }

    #[test]
    fn test_search_caps_matches() {
        let (dir, ctx) = setup();
        let many = "hit\n".repeat(300);
        fs::write(dir.path().join("many.txt"), many).unwrap();
        let call = ToolCall::new(SEARCH)
            .with_arg("pattern", "^hit$")
            .with_arg("path", "many.txt");

        let result = execute_search(&ctx, &call);
        assert_eq!(result.metadata.match_count, Some(200));
        assert!(result.output.ends_with("(limited to 200 matches)"));
    }

    #[test]
    fn test_invalid_regex() {
        let (_dir, ctx) = setup();
        let result = execute_search(&ctx, &ToolCall::new(SEARCH).with_arg("pattern", "(unclosed"));
        assert_eq!(result.error_kind(), Some(ToolErrorKind::InvalidArgument));
    }

    #[test]
    fn test_no_matches() {
        let (_dir, ctx) = setup();
        let result = execute_search(&ctx, &ToolCall::new(SEARCH).with_arg("pattern", "zebra"));
        assert!(result.is_success());
        assert!(result.output.starts_with("No matches"));
    }
}
